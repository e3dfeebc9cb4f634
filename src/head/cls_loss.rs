//! Classification targets, anchor weights and the reduced classification loss.

use anyhow::{bail, Result};
use ndarray::{Array2, Array3, ArrayView2, ArrayView3, Axis};

use crate::head::SigmoidFocalClassificationLoss;

/// One-hot encodes anchor labels over `n_labels` foreground classes.
///
/// Ignored anchors (`-1`) are encoded as background, and background is all zeros.
/// With a single foreground class every positive label counts as class 1.
pub fn one_hot_box_labels(box_cls_labels: ArrayView2<i64>, n_labels: usize) -> Result<Array3<f32>> {
    let (batch, num_anchors) = box_cls_labels.dim();
    let mut one_hot = Array3::<f32>::zeros((batch, num_anchors, n_labels));

    for ((b, m), &label) in box_cls_labels.indexed_iter() {
        if label < -1 {
            bail!("Invalid anchor label {} at [{}, {}]", label, b, m);
        }
        if label <= 0 {
            continue;
        }
        let label = if n_labels == 1 { 1 } else { label as usize };
        if label > n_labels {
            bail!(
                "Anchor label {} at [{}, {}] exceeds the {} configured classes",
                label,
                b,
                m,
                n_labels,
            );
        }
        one_hot[[b, m, label - 1]] = 1.0;
    }
    Ok(one_hot)
}

/// Per-anchor classification weights `[B, M]`.
///
/// Positives and negatives weigh 1, ignored anchors 0, normalised per sample by the
/// positive count (at least 1).
pub fn cls_weights(box_cls_labels: ArrayView2<i64>) -> Array2<f32> {
    let mut weights = box_cls_labels.mapv(|label| if label >= 0 { 1.0f32 } else { 0.0 });
    for (mut row, labels) in weights
        .axis_iter_mut(Axis(0))
        .zip(box_cls_labels.axis_iter(Axis(0)))
    {
        let positives = labels.iter().filter(|&&label| label > 0).count();
        let normalizer = (positives as f32).max(1.0);
        row.mapv_inplace(|w| w / normalizer);
    }
    weights
}

/// Focal loss summed over anchors and classes, averaged over the batch and scaled by `cls_weight`.
pub fn weighted_loss(
    loss_func: &SigmoidFocalClassificationLoss,
    cls_preds: ArrayView3<f32>,
    one_hot_targets: ArrayView3<f32>,
    cls_weights: ArrayView2<f32>,
    batch_size: usize,
    cls_weight: f32,
) -> Result<f32> {
    if batch_size == 0 {
        bail!("Cannot compute a classification loss over an empty batch");
    }
    let loss_src = loss_func.forward(cls_preds, one_hot_targets, cls_weights)?;
    Ok(loss_src.sum() / batch_size as f32 * cls_weight)
}
