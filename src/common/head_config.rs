use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

/// Model config block of an anchor head, in the detection framework's key spelling.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct HeadConfig {
    pub anchor_generator_config: Vec<AnchorGeneratorConfig>,

    /// Presence of the key enables the direction classifier, its value is not inspected.
    #[serde(default)]
    pub use_direction_classifier: Option<bool>,
    #[serde(default = "default_num_dir_bins")]
    pub num_dir_bins: usize,
    #[serde(default = "default_dir_offset")]
    pub dir_offset: f32,
    #[serde(default)]
    pub dir_limit_offset: f32,

    #[serde(default)]
    pub target_assigner_config: TargetAssignerConfig,
    #[serde(default)]
    pub loss_config: LossConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct AnchorGeneratorConfig {
    pub class_name: String,
    pub anchor_sizes: Vec<[f32; 3]>,
    pub anchor_rotations: Vec<f32>,
    pub anchor_bottom_heights: Vec<f32>,
    #[serde(default)]
    pub align_center: bool,
    #[serde(default = "default_feature_map_stride")]
    pub feature_map_stride: usize,
    #[serde(default = "default_matched_threshold")]
    pub matched_threshold: f32,
    #[serde(default = "default_unmatched_threshold")]
    pub unmatched_threshold: f32,
}

impl AnchorGeneratorConfig {
    pub fn num_anchors_per_location(&self) -> usize {
        self.anchor_sizes.len() * self.anchor_rotations.len() * self.anchor_bottom_heights.len()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct TargetAssignerConfig {
    #[serde(default = "default_box_coder")]
    pub box_coder: String,
    #[serde(default)]
    pub box_coder_config: BoxCoderConfig,
}

impl Default for TargetAssignerConfig {
    fn default() -> Self {
        Self {
            box_coder: default_box_coder(),
            box_coder_config: BoxCoderConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct BoxCoderConfig {
    #[serde(default)]
    pub code_size: Option<usize>,
    #[serde(default)]
    pub encode_angle_by_sincos: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct LossConfig {
    #[serde(default)]
    pub loss_weights: LossWeights,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LossWeights {
    #[serde(default = "default_cls_weight")]
    pub cls_weight: f32,
    #[serde(default = "default_loc_weight")]
    pub loc_weight: f32,
    #[serde(default = "default_dir_weight")]
    pub dir_weight: f32,
    #[serde(default = "default_code_weights")]
    pub code_weights: Vec<f32>,
}

impl Default for LossWeights {
    fn default() -> Self {
        Self {
            cls_weight: default_cls_weight(),
            loc_weight: default_loc_weight(),
            dir_weight: default_dir_weight(),
            code_weights: default_code_weights(),
        }
    }
}

fn default_num_dir_bins() -> usize {
    2
}

fn default_dir_offset() -> f32 {
    0.78539
}

fn default_feature_map_stride() -> usize {
    1
}

fn default_matched_threshold() -> f32 {
    0.6
}

fn default_unmatched_threshold() -> f32 {
    0.45
}

fn default_box_coder() -> String {
    "ResidualCoder".to_string()
}

fn default_code_weights() -> Vec<f32> {
    vec![1.0; 7]
}

fn default_cls_weight() -> f32 {
    1.0
}

fn default_loc_weight() -> f32 {
    2.0
}

fn default_dir_weight() -> f32 {
    0.2
}

impl HeadConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let cfg: HeadConfig = serde_json::from_str(json).context("Failed to parse head config")?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read head config {}", path.display()))?;
        log::debug!("Loaded head config from {}", path.display());
        Self::from_json(&json)
    }

    pub fn validate(&self) -> Result<()> {
        if self.anchor_generator_config.is_empty() {
            bail!("ANCHOR_GENERATOR_CONFIG must list at least one anchor generator.");
        }
        if self.use_direction_classifier() && self.num_dir_bins == 0 {
            bail!("NUM_DIR_BINS must be positive when the direction classifier is enabled.");
        }
        if self.code_size() == 0 {
            bail!("Box coder code size must be positive.");
        }
        Ok(())
    }

    /// Anchors per feature-map location, one entry per anchor generator.
    pub fn num_anchors_per_location(&self) -> Vec<usize> {
        self.anchor_generator_config
            .iter()
            .map(AnchorGeneratorConfig::num_anchors_per_location)
            .collect()
    }

    /// Box code length produced by the configured box coder.
    pub fn code_size(&self) -> usize {
        let cfg = &self.target_assigner_config.box_coder_config;
        let base = cfg.code_size.unwrap_or(7);
        if cfg.encode_angle_by_sincos {
            base + 1
        } else {
            base
        }
    }

    pub fn use_direction_classifier(&self) -> bool {
        self.use_direction_classifier.is_some()
    }

    pub fn cls_weight(&self) -> f32 {
        self.loss_config.loss_weights.cls_weight
    }
}
