use anyhow::Result;
use ndarray::{Array3, ArrayView3, ArrayView4};

use crate::data::{AnchorTargets, ForwardRet, TbDict};

/// Anchor bookkeeping shared by dense anchor heads.
///
/// Anchor generation, target assignment and box decoding live behind this trait so the
/// head only deals with its own layers and classification loss.
pub trait AnchorTemplate {
    /// Matches ground-truth boxes `[B, M, 7 + 1]` to the anchors of the feature map.
    fn assign_targets(&self, gt_boxes: ArrayView3<f32>) -> Result<AnchorTargets>;

    /// Decodes channels-last predictions into per-anchor scores `[B, num_anchors, C]`
    /// and boxes `[B, num_anchors, code_size]`.
    fn generate_predicted_boxes(
        &self,
        batch_size: usize,
        cls_preds: ArrayView4<f32>,
        box_preds: ArrayView4<f32>,
        dir_cls_preds: Option<ArrayView4<f32>>,
    ) -> Result<(Array3<f32>, Array3<f32>)>;

    /// Box regression (and direction) loss over the last forward pass.
    fn get_box_reg_layer_loss(&self, forward_ret: &ForwardRet) -> Result<(f32, TbDict)>;
}
