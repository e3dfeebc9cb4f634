use ndarray::Array3;

use crate::data::FeatureMap;

/// Data passed between the stages of the detection model.
///
/// # Fields
///
/// * `spatial_features_2d` - BEV features entering the head, `[N, C, H, W]`.
/// * `gt_boxes` - Ground-truth boxes `[B, M, 7 + 1]`, required while training.
/// * `batch_size` - Number of samples in the batch.
/// * `batch_cls_preds` - Per-anchor category scores `[B, num_anchors, C0]`, set by the head.
/// * `batch_box_preds` - Decoded boxes `[B, num_anchors, code_size]`, set by the head.
/// * `batch_cls_type_preds` - Per-anchor type scores `[B, num_anchors, C1]`, set by the head.
/// * `cls_preds_normalized` - Whether the scores above already went through a sigmoid.
#[derive(Debug, Clone)]
pub struct BatchDict {
    pub spatial_features_2d: FeatureMap,
    pub gt_boxes: Option<Array3<f32>>,
    pub batch_size: usize,

    pub batch_cls_preds: Option<Array3<f32>>,
    pub batch_box_preds: Option<Array3<f32>>,
    pub batch_cls_type_preds: Option<Array3<f32>>,
    pub cls_preds_normalized: bool,
}

impl BatchDict {
    pub fn new(spatial_features_2d: FeatureMap) -> Self {
        let batch_size = spatial_features_2d.batch_size();
        Self {
            spatial_features_2d,
            gt_boxes: None,
            batch_size,
            batch_cls_preds: None,
            batch_box_preds: None,
            batch_cls_type_preds: None,
            cls_preds_normalized: false,
        }
    }

    pub fn with_gt_boxes(mut self, gt_boxes: Array3<f32>) -> Self {
        self.gt_boxes = Some(gt_boxes);
        self
    }

    pub fn has_predictions(&self) -> bool {
        self.batch_cls_preds.is_some() && self.batch_box_preds.is_some()
    }
}
