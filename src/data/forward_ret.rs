use ndarray::Array4;

use crate::data::AnchorTargets;

/// Tensors kept from the last forward pass for the loss computation.
///
/// Predictions are channels-last `[N, H, W, A * C]`.
#[derive(Clone, PartialEq, Default)]
pub struct ForwardRet {
    pub cls_preds: Option<Array4<f32>>,
    pub box_preds: Option<Array4<f32>>,
    pub cls_type_preds: Option<Array4<f32>>,
    pub dir_cls_preds: Option<Array4<f32>>,
    pub targets: Option<AnchorTargets>,
}

impl std::fmt::Debug for ForwardRet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut f = f.debug_struct("ForwardRet");
        if let Some(x) = &self.cls_preds {
            f.field("cls_preds", &x.shape());
        }
        if let Some(x) = &self.box_preds {
            f.field("box_preds", &x.shape());
        }
        if let Some(x) = &self.cls_type_preds {
            f.field("cls_type_preds", &x.shape());
        }
        if let Some(x) = &self.dir_cls_preds {
            f.field("dir_cls_preds", &x.shape());
        }
        if let Some(x) = &self.targets {
            f.field("num_anchors", &x.num_anchors());
        }
        f.finish()
    }
}

impl ForwardRet {
    pub fn cls_preds(&self) -> Option<&Array4<f32>> {
        self.cls_preds.as_ref()
    }

    pub fn box_preds(&self) -> Option<&Array4<f32>> {
        self.box_preds.as_ref()
    }

    pub fn cls_type_preds(&self) -> Option<&Array4<f32>> {
        self.cls_type_preds.as_ref()
    }

    pub fn dir_cls_preds(&self) -> Option<&Array4<f32>> {
        self.dir_cls_preds.as_ref()
    }

    pub fn targets(&self) -> Option<&AnchorTargets> {
        self.targets.as_ref()
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
