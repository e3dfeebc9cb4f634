use anyhow::Result;
use ndarray::{Array4, ArrayView4};

/// Spatial features entering the head, wrapper over [`Array4<f32>`] in `[N, C, H, W]` layout.
#[derive(Debug, Clone)]
pub struct FeatureMap(pub Array4<f32>);

impl From<Array4<f32>> for FeatureMap {
    fn from(x: Array4<f32>) -> Self {
        Self(x)
    }
}

impl std::ops::Deref for FeatureMap {
    type Target = Array4<f32>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl FeatureMap {
    pub fn from_shape_vec(shape: (usize, usize, usize, usize), xs: Vec<f32>) -> Result<Self> {
        Ok(Self::from(Array4::from_shape_vec(shape, xs)?))
    }

    pub fn zeros(shape: (usize, usize, usize, usize)) -> Self {
        Self(Array4::zeros(shape))
    }

    pub fn view(&self) -> ArrayView4<'_, f32> {
        self.0.view()
    }

    pub fn batch_size(&self) -> usize {
        self.0.dim().0
    }

    pub fn channels(&self) -> usize {
        self.0.dim().1
    }

    pub fn height(&self) -> usize {
        self.0.dim().2
    }

    pub fn width(&self) -> usize {
        self.0.dim().3
    }
}
