use std::time::Instant;

use anyhow::{anyhow, bail, Result};
use ndarray::{Array4, ArrayView2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::common::{HeadConfig, HeadOptions};
use crate::data::{BatchDict, ForwardRet, TbDict, TimeCalc};
use crate::head::cls_loss::{cls_weights, one_hot_box_labels, weighted_loss};
use crate::head::{AnchorTemplate, Conv1x1, SigmoidFocalClassificationLoss};

/// Prior probability of foreground used to initialise the classification biases.
const PRIOR_PROB: f32 = 0.01;

/// Parameters of every layer of an [`AnchorHeadSingle`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeadState {
    pub conv_cls: Conv1x1,
    pub conv_box: Conv1x1,
    pub conv_type_cls: Conv1x1,
    pub conv_dir_cls: Option<Conv1x1>,
}

/// Single-level dense anchor head with a category task, a type task, box regression
/// and an optional direction classifier.
#[derive(Debug)]
pub struct AnchorHeadSingle<T: AnchorTemplate> {
    template: T,
    model_cfg: HeadConfig,
    num_class: [usize; 2],
    class_names: [Vec<String>; 2],
    grid_size: [usize; 3],
    point_cloud_range: [f32; 6],
    num_anchors_per_location: usize,
    code_size: usize,
    predict_boxes_when_training: bool,
    training: bool,

    conv_cls: Conv1x1,
    conv_box: Conv1x1,
    conv_type_cls: Conv1x1,
    conv_dir_cls: Option<Conv1x1>,

    cls_loss_func: SigmoidFocalClassificationLoss,
    forward_ret_dict: ForwardRet,
    profile: bool,
    timer: TimeCalc,
}

impl<T: AnchorTemplate> AnchorHeadSingle<T> {
    pub fn new(options: HeadOptions, template: T) -> Result<Self> {
        let model_cfg = options.validate()?.clone();
        let num_anchors_per_location: usize = model_cfg.num_anchors_per_location().iter().sum();
        let code_size = model_cfg.code_size();
        let input_channels = options.input_channels;
        let num_class = options.num_class;

        let mut rng = match options.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let conv_cls = Conv1x1::new(input_channels, num_anchors_per_location * num_class[0], &mut rng)?;
        let conv_box = Conv1x1::new(input_channels, num_anchors_per_location * code_size, &mut rng)?;
        let conv_type_cls = Conv1x1::new(input_channels, num_anchors_per_location * num_class[1], &mut rng)?;
        let conv_dir_cls = if model_cfg.use_direction_classifier() {
            Some(Conv1x1::new(
                input_channels,
                num_anchors_per_location * model_cfg.num_dir_bins,
                &mut rng,
            )?)
        } else {
            None
        };

        let mut head = Self {
            template,
            model_cfg,
            num_class,
            class_names: options.class_names,
            grid_size: options.grid_size,
            point_cloud_range: options.point_cloud_range,
            num_anchors_per_location,
            code_size,
            predict_boxes_when_training: options.predict_boxes_when_training,
            training: true,
            conv_cls,
            conv_box,
            conv_type_cls,
            conv_dir_cls,
            cls_loss_func: SigmoidFocalClassificationLoss::default(),
            forward_ret_dict: ForwardRet::default(),
            profile: options.profile,
            timer: TimeCalc::default(),
        };
        head.init_weights(&mut rng)?;

        log::info!(
            "AnchorHeadSingle: {} input channels, {} anchors/location, classes {:?}, code size {}, direction bins {}",
            input_channels,
            num_anchors_per_location,
            num_class,
            code_size,
            head.conv_dir_cls.as_ref().map_or(0, |_| head.model_cfg.num_dir_bins),
        );
        Ok(head)
    }

    /// Focal-loss prior on both classification biases, small normal box weights.
    pub fn init_weights<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<()> {
        let bias = -((1.0 - PRIOR_PROB) / PRIOR_PROB).ln();
        self.conv_cls.fill_bias(bias);
        self.conv_type_cls.fill_bias(bias);
        self.conv_box.init_weight_normal(0.0, 0.001, rng)?;
        Ok(())
    }

    pub fn train(&mut self) {
        self.training = true;
    }

    pub fn eval(&mut self) {
        self.training = false;
    }

    pub fn is_training(&self) -> bool {
        self.training
    }

    /// Runs the head on `batch_dict.spatial_features_2d`.
    ///
    /// While training, targets are assigned from `gt_boxes`. Outside training, or when
    /// `predict_boxes_when_training` is set, decoded predictions are written back into the dict.
    pub fn forward(&mut self, mut batch_dict: BatchDict) -> Result<BatchDict> {
        self.forward_ret_dict.clear();
        let t_conv = Instant::now();
        let features = batch_dict.spatial_features_2d.view();

        let cls_preds = self.conv_cls.forward_channels_last(features)?;
        let box_preds = self.conv_box.forward_channels_last(features)?;
        let cls_type_preds = self.conv_type_cls.forward_channels_last(features)?;
        let dir_cls_preds = match &self.conv_dir_cls {
            Some(conv) => Some(conv.forward_channels_last(features)?),
            None => None,
        };
        let t_conv = t_conv.elapsed();

        log::debug!(
            "cls_preds {:?} | box_preds {:?} | cls_type_preds {:?} | dir_cls_preds {:?}",
            cls_preds.shape(),
            box_preds.shape(),
            cls_type_preds.shape(),
            dir_cls_preds.as_ref().map(|x| x.shape().to_vec()),
        );

        let t_post = Instant::now();
        let targets = if self.training {
            let gt_boxes = batch_dict
                .gt_boxes
                .as_ref()
                .ok_or_else(|| anyhow!("gt_boxes are required to assign targets while training"))?;
            let targets = self.template.assign_targets(gt_boxes.view())?;
            log::trace!("Assigned targets for {} anchors", targets.num_anchors());
            Some(targets)
        } else {
            None
        };

        if !self.training || self.predict_boxes_when_training {
            let (batch_cls_preds, batch_box_preds) = self.template.generate_predicted_boxes(
                batch_dict.batch_size,
                cls_preds.view(),
                box_preds.view(),
                dir_cls_preds.as_ref().map(|x| x.view()),
            )?;
            let (batch_cls_type_preds, _) = self.template.generate_predicted_boxes(
                batch_dict.batch_size,
                cls_type_preds.view(),
                box_preds.view(),
                None,
            )?;
            batch_dict.batch_cls_preds = Some(batch_cls_preds);
            batch_dict.batch_box_preds = Some(batch_box_preds);
            batch_dict.batch_cls_type_preds = Some(batch_cls_type_preds);
            batch_dict.cls_preds_normalized = false;
        }
        let t_post = t_post.elapsed();

        if self.profile {
            self.timer.add_or_push(0, t_conv);
            self.timer.add_or_push(1, t_post);
            log::info!("> Convolutions: {t_conv:?} | Targets & boxes: {t_post:?}");
        }

        self.forward_ret_dict = ForwardRet {
            cls_preds: Some(cls_preds),
            box_preds: Some(box_preds),
            cls_type_preds: Some(cls_type_preds),
            dir_cls_preds,
            targets,
        };

        Ok(batch_dict)
    }

    /// Category plus type classification loss over the last forward pass.
    pub fn get_cls_layer_loss(&self) -> Result<(f32, TbDict)> {
        let ret = &self.forward_ret_dict;
        let targets = ret
            .targets()
            .ok_or_else(|| anyhow!("No assigned targets; run forward in training mode first"))?;

        // classification loss head 0
        let cls_preds = ret
            .cls_preds()
            .ok_or_else(|| anyhow!("No cls_preds; run forward first"))?;
        let cls_fdi_loss = self.cls_task_loss(cls_preds, targets.box_cls_labels.view(), self.num_class[0])?;

        // classification loss head 1
        let cls_type_preds = ret
            .cls_type_preds()
            .ok_or_else(|| anyhow!("No cls_type_preds; run forward first"))?;
        let box_cls_type_labels = targets
            .box_cls_type_labels
            .as_ref()
            .ok_or_else(|| anyhow!("Target assignment produced no box_cls_type_labels"))?;
        let cls_type_loss = self.cls_task_loss(cls_type_preds, box_cls_type_labels.view(), self.num_class[1])?;

        let cls_loss = cls_fdi_loss + cls_type_loss;
        let mut tb_dict = TbDict::new();
        tb_dict.insert("rpn_loss_type_cls", cls_type_loss);
        tb_dict.insert("rpn_loss_fdi_cls", cls_fdi_loss);
        tb_dict.insert("rpn_loss_cls", cls_loss);
        Ok((cls_loss, tb_dict))
    }

    /// Classification loss plus the template's box regression loss.
    pub fn get_loss(&self) -> Result<(f32, TbDict)> {
        let (cls_loss, mut tb_dict) = self.get_cls_layer_loss()?;
        let (box_loss, tb_dict_box) = self.template.get_box_reg_layer_loss(&self.forward_ret_dict)?;
        tb_dict.update(tb_dict_box);

        let rpn_loss = cls_loss + box_loss;
        tb_dict.insert("rpn_loss", rpn_loss);
        Ok((rpn_loss, tb_dict))
    }

    fn cls_task_loss(&self, preds: &Array4<f32>, labels: ArrayView2<i64>, n_labels: usize) -> Result<f32> {
        let (batch_size, h, w, channels) = preds.dim();
        if channels != self.num_anchors_per_location * n_labels {
            bail!(
                "Prediction channels {} do not match {} anchors x {} classes",
                channels,
                self.num_anchors_per_location,
                n_labels,
            );
        }
        let num_anchors = h * w * self.num_anchors_per_location;
        if labels.dim() != (batch_size, num_anchors) {
            bail!(
                "Anchor labels {:?} do not match predictions for {} samples x {} anchors",
                labels.shape(),
                batch_size,
                num_anchors,
            );
        }

        let one_hot_targets = one_hot_box_labels(labels, n_labels)?;
        let weights = cls_weights(labels);
        let preds = preds.view().into_shape_with_order((batch_size, num_anchors, n_labels))?;
        weighted_loss(
            &self.cls_loss_func,
            preds,
            one_hot_targets.view(),
            weights.view(),
            batch_size,
            self.model_cfg.cls_weight(),
        )
    }

    pub fn state(&self) -> HeadState {
        HeadState {
            conv_cls: self.conv_cls.clone(),
            conv_box: self.conv_box.clone(),
            conv_type_cls: self.conv_type_cls.clone(),
            conv_dir_cls: self.conv_dir_cls.clone(),
        }
    }

    /// Replaces the layer parameters; every layer must keep its shape.
    pub fn load_state(&mut self, state: HeadState) -> Result<()> {
        Self::check_layer("conv_cls", &self.conv_cls, &state.conv_cls)?;
        Self::check_layer("conv_box", &self.conv_box, &state.conv_box)?;
        Self::check_layer("conv_type_cls", &self.conv_type_cls, &state.conv_type_cls)?;
        match (&self.conv_dir_cls, &state.conv_dir_cls) {
            (Some(current), Some(loaded)) => Self::check_layer("conv_dir_cls", current, loaded)?,
            (None, None) => {}
            (current, _) => bail!(
                "conv_dir_cls presence mismatch: head has {}, state has {}",
                current.is_some(),
                state.conv_dir_cls.is_some(),
            ),
        }

        self.conv_cls = state.conv_cls;
        self.conv_box = state.conv_box;
        self.conv_type_cls = state.conv_type_cls;
        self.conv_dir_cls = state.conv_dir_cls;
        Ok(())
    }

    fn check_layer(name: &str, current: &Conv1x1, loaded: &Conv1x1) -> Result<()> {
        if current.in_channels() != loaded.in_channels()
            || current.out_channels() != loaded.out_channels()
            || loaded.bias().len() != loaded.out_channels()
        {
            bail!(
                "{} shape mismatch: head {}->{}, state {}->{} with {} biases",
                name,
                current.in_channels(),
                current.out_channels(),
                loaded.in_channels(),
                loaded.out_channels(),
                loaded.bias().len(),
            );
        }
        Ok(())
    }

    pub fn forward_ret(&self) -> &ForwardRet {
        &self.forward_ret_dict
    }

    pub fn template(&self) -> &T {
        &self.template
    }

    pub fn model_cfg(&self) -> &HeadConfig {
        &self.model_cfg
    }

    pub fn num_class(&self) -> [usize; 2] {
        self.num_class
    }

    pub fn class_names(&self) -> &[Vec<String>; 2] {
        &self.class_names
    }

    pub fn grid_size(&self) -> [usize; 3] {
        self.grid_size
    }

    pub fn point_cloud_range(&self) -> [f32; 6] {
        self.point_cloud_range
    }

    pub fn num_anchors_per_location(&self) -> usize {
        self.num_anchors_per_location
    }

    pub fn code_size(&self) -> usize {
        self.code_size
    }

    pub fn conv_cls(&self) -> &Conv1x1 {
        &self.conv_cls
    }

    pub fn conv_box(&self) -> &Conv1x1 {
        &self.conv_box
    }

    pub fn conv_type_cls(&self) -> &Conv1x1 {
        &self.conv_type_cls
    }

    pub fn conv_dir_cls(&self) -> Option<&Conv1x1> {
        self.conv_dir_cls.as_ref()
    }

    pub fn num_params(&self) -> usize {
        self.conv_cls.num_params()
            + self.conv_box.num_params()
            + self.conv_type_cls.num_params()
            + self.conv_dir_cls.as_ref().map_or(0, Conv1x1::num_params)
    }

    pub fn timer(&self) -> &TimeCalc {
        &self.timer
    }

    pub fn print_time(&self) {
        match self.timer.avg() {
            Some(avg) => log::info!("Avg forward: {:?} over {} passes", avg, self.timer.n()),
            None => log::info!("Avg forward: no profiled passes"),
        }
    }
}
