use anyhow::{bail, Result};

use crate::common::HeadConfig;

/// Construction arguments for an anchor head.
#[derive(Debug, Clone)]
pub struct HeadOptions {
    pub model_cfg: Option<HeadConfig>,
    pub input_channels: usize,
    pub num_class: [usize; 2],
    pub class_names: [Vec<String>; 2],
    pub grid_size: [usize; 3],
    pub point_cloud_range: [f32; 6],
    pub predict_boxes_when_training: bool,
    pub seed: Option<u64>,
    pub profile: bool,
}

impl Default for HeadOptions {
    fn default() -> Self {
        Self {
            model_cfg: None,
            input_channels: 0,
            num_class: [0, 0],
            class_names: [vec![], vec![]],
            grid_size: [0, 0, 1],
            point_cloud_range: [0.0; 6],
            predict_boxes_when_training: true,
            seed: None,
            profile: false,
        }
    }
}

#[allow(dead_code)]
impl HeadOptions {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn with_model_cfg(mut self, cfg: HeadConfig) -> Self {
        self.model_cfg = Some(cfg);
        self
    }

    pub fn with_input_channels(mut self, n: usize) -> Self {
        self.input_channels = n;
        self
    }

    /// Sets both class-name lists; class counts follow their lengths.
    pub fn with_class_names(mut self, names: &[&str], type_names: &[&str]) -> Self {
        let names: Vec<String> = names.iter().map(|x| x.to_string()).collect();
        let type_names: Vec<String> = type_names.iter().map(|x| x.to_string()).collect();
        self.num_class = [names.len(), type_names.len()];
        self.class_names = [names, type_names];
        self
    }

    pub fn with_num_class(mut self, num_class: [usize; 2]) -> Self {
        self.num_class = num_class;
        self
    }

    pub fn with_grid_size(mut self, grid_size: [usize; 3]) -> Self {
        self.grid_size = grid_size;
        self
    }

    pub fn with_point_cloud_range(mut self, range: [f32; 6]) -> Self {
        self.point_cloud_range = range;
        self
    }

    pub fn with_predict_boxes_when_training(mut self, x: bool) -> Self {
        self.predict_boxes_when_training = x;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_profile(mut self, profile: bool) -> Self {
        self.profile = profile;
        self
    }

    pub fn validate(&self) -> Result<&HeadConfig> {
        let cfg = match &self.model_cfg {
            Some(cfg) => cfg,
            None => bail!("No model config given. Use `options.with_model_cfg(HeadConfig)`."),
        };
        cfg.validate()?;

        if self.input_channels == 0 {
            bail!("Input channel count must be positive.");
        }
        for (k, (&n, names)) in self.num_class.iter().zip(self.class_names.iter()).enumerate() {
            if n == 0 {
                bail!("Classification task {} has no classes.", k);
            }
            if names.len() != n {
                bail!(
                    "Classification task {} declares {} classes but {} class names.",
                    k,
                    n,
                    names.len(),
                );
            }
        }
        if cfg.num_anchors_per_location().iter().sum::<usize>() == 0 {
            bail!("Anchor generators produce no anchors per location.");
        }
        Ok(cfg)
    }
}
