use ndarray::{Array2, Array3};

/// Per-anchor training targets produced by target assignment.
///
/// Label arrays are `[B, num_anchors]`: `-1` ignored, `0` background, `k > 0` class `k`.
#[derive(Debug, Clone, PartialEq)]
pub struct AnchorTargets {
    pub box_cls_labels: Array2<i64>,
    pub box_cls_type_labels: Option<Array2<i64>>,
    pub box_reg_targets: Array3<f32>,
    pub reg_weights: Array2<f32>,
}

impl AnchorTargets {
    pub fn new(box_cls_labels: Array2<i64>, box_reg_targets: Array3<f32>, reg_weights: Array2<f32>) -> Self {
        Self {
            box_cls_labels,
            box_cls_type_labels: None,
            box_reg_targets,
            reg_weights,
        }
    }

    pub fn with_type_labels(mut self, labels: Array2<i64>) -> Self {
        self.box_cls_type_labels = Some(labels);
        self
    }

    pub fn num_anchors(&self) -> usize {
        self.box_cls_labels.ncols()
    }
}
