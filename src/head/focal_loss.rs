use anyhow::{bail, Result};
use ndarray::{Array3, ArrayView2, ArrayView3, Axis, Zip};

/// Sigmoid focal loss for dense per-anchor classification.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SigmoidFocalClassificationLoss {
    pub alpha: f32,
    pub gamma: f32,
}

impl Default for SigmoidFocalClassificationLoss {
    fn default() -> Self {
        Self {
            alpha: 0.25,
            gamma: 2.0,
        }
    }
}

impl SigmoidFocalClassificationLoss {
    pub fn new(alpha: f32, gamma: f32) -> Self {
        Self { alpha, gamma }
    }

    /// Numerically stable `BCE(sigmoid(x), t)` computed from the logit.
    pub fn sigmoid_cross_entropy_with_logits(x: f32, t: f32) -> f32 {
        x.max(0.0) - x * t + (-x.abs()).exp().ln_1p()
    }

    /// Weighted focal loss per anchor and class.
    ///
    /// # Arguments
    ///
    /// * `input` - Logits `[B, M, C]`.
    /// * `target` - One-hot targets `[B, M, C]`.
    /// * `weights` - Per-anchor weights `[B, M]`.
    ///
    /// # Returns
    ///
    /// * `Array3<f32>` - Loss `[B, M, C]`, not reduced.
    pub fn forward(
        &self,
        input: ArrayView3<f32>,
        target: ArrayView3<f32>,
        weights: ArrayView2<f32>,
    ) -> Result<Array3<f32>> {
        if input.shape() != target.shape() {
            bail!(
                "Focal loss input {:?} and target {:?} shapes differ",
                input.shape(),
                target.shape(),
            );
        }
        if input.shape()[..2] != *weights.shape() {
            bail!(
                "Focal loss weights {:?} do not match input {:?}",
                weights.shape(),
                input.shape(),
            );
        }

        let (alpha, gamma) = (self.alpha, self.gamma);
        let mut loss = Array3::<f32>::zeros(input.raw_dim());
        Zip::from(&mut loss)
            .and(&input)
            .and(&target)
            .and(&weights.insert_axis(Axis(2)).broadcast(input.raw_dim()).ok_or_else(|| {
                anyhow::anyhow!("Failed to broadcast focal loss weights to {:?}", input.shape())
            })?)
            .par_for_each(|l, &x, &t, &w| {
                let p = 1.0 / (1.0 + (-x).exp());
                let alpha_weight = t * alpha + (1.0 - t) * (1.0 - alpha);
                let pt = t * (1.0 - p) + (1.0 - t) * p;
                let focal_weight = alpha_weight * pt.powf(gamma);
                *l = focal_weight * Self::sigmoid_cross_entropy_with_logits(x, t) * w;
            });
        Ok(loss)
    }
}
