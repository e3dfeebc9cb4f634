use anyhow::{bail, Result};
use ndarray::{Array1, Array2, Array4, ArrayView4, Axis, Order};
use rand::Rng;
use rand_distr::{Distribution, Normal, Uniform};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// 2-D convolution with a 1x1 kernel, stride 1 and no padding.
///
/// Each output pixel is `weight · x[.., h, w] + bias`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Conv1x1Parts")]
pub struct Conv1x1 {
    /// `[out_channels, in_channels]`
    weight: Array2<f32>,
    /// `[out_channels]`
    bias: Array1<f32>,
}

/// Unchecked serialized form, validated through [`Conv1x1::from_parts`].
#[derive(Deserialize)]
struct Conv1x1Parts {
    weight: Array2<f32>,
    bias: Array1<f32>,
}

impl TryFrom<Conv1x1Parts> for Conv1x1 {
    type Error = anyhow::Error;

    fn try_from(parts: Conv1x1Parts) -> Result<Self> {
        Self::from_parts(parts.weight, parts.bias)
    }
}

impl Conv1x1 {
    /// Creates a layer with weight and bias drawn from `U(-1/sqrt(in), 1/sqrt(in))`.
    pub fn new<R: Rng + ?Sized>(in_channels: usize, out_channels: usize, rng: &mut R) -> Result<Self> {
        if in_channels == 0 || out_channels == 0 {
            bail!("Conv1x1 needs positive channel counts, got {} -> {}", in_channels, out_channels);
        }
        let bound = 1.0 / (in_channels as f32).sqrt();
        let dist = Uniform::new_inclusive(-bound, bound);
        let weight = Array2::from_shape_simple_fn((out_channels, in_channels), || dist.sample(rng));
        let bias = Array1::from_shape_simple_fn(out_channels, || dist.sample(rng));
        Ok(Self { weight, bias })
    }

    pub fn from_parts(weight: Array2<f32>, bias: Array1<f32>) -> Result<Self> {
        if weight.nrows() != bias.len() {
            bail!(
                "Conv1x1 weight has {} output channels but bias has {}",
                weight.nrows(),
                bias.len(),
            );
        }
        if weight.is_empty() {
            bail!("Conv1x1 weight must not be empty");
        }
        Ok(Self { weight, bias })
    }

    pub fn in_channels(&self) -> usize {
        self.weight.ncols()
    }

    pub fn out_channels(&self) -> usize {
        self.weight.nrows()
    }

    pub fn weight(&self) -> &Array2<f32> {
        &self.weight
    }

    pub fn bias(&self) -> &Array1<f32> {
        &self.bias
    }

    pub fn fill_bias(&mut self, value: f32) {
        self.bias.fill(value);
    }

    pub fn init_weight_normal<R: Rng + ?Sized>(&mut self, mean: f32, std: f32, rng: &mut R) -> Result<()> {
        let dist = Normal::new(mean, std)?;
        self.weight.mapv_inplace(|_| dist.sample(rng));
        Ok(())
    }

    /// Applies the layer to `[N, C, H, W]` input and returns contiguous `[N, H, W, out]`.
    pub fn forward_channels_last(&self, x: ArrayView4<f32>) -> Result<Array4<f32>> {
        let (n, c, h, w) = x.dim();
        if c != self.in_channels() {
            bail!(
                "Conv1x1 expects {} input channels, got {} (input shape {:?})",
                self.in_channels(),
                c,
                x.shape(),
            );
        }
        let out = self.out_channels();

        // [H*W, C] x [C, out] per batch item
        let per_item = x
            .axis_iter(Axis(0))
            .into_par_iter()
            .map(|xb| -> Result<Array2<f32>> {
                let pixels = xb.permuted_axes([1, 2, 0]);
                let pixels = pixels.to_shape(((h * w, c), Order::RowMajor))?;
                Ok(pixels.dot(&self.weight.t()) + &self.bias)
            })
            .collect::<Result<Vec<Array2<f32>>>>()?;

        let mut y = Array4::<f32>::zeros((n, h, w, out));
        for (mut yb, ob) in y.axis_iter_mut(Axis(0)).zip(per_item) {
            yb.assign(&ob.to_shape(((h, w, out), Order::RowMajor))?);
        }
        Ok(y)
    }

    /// Applies the layer to `[N, C, H, W]` input and returns `[N, out, H, W]`.
    pub fn forward(&self, x: ArrayView4<f32>) -> Result<Array4<f32>> {
        let y = self.forward_channels_last(x)?;
        Ok(y.permuted_axes([0, 3, 1, 2]).as_standard_layout().into_owned())
    }

    /// Number of trainable parameters.
    pub fn num_params(&self) -> usize {
        self.weight.len() + self.bias.len()
    }
}
