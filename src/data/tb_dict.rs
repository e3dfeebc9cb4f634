use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Named scalar losses reported to the training logger.
#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TbDict(BTreeMap<String, f32>);

impl TbDict {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn insert(&mut self, key: &str, value: f32) {
        self.0.insert(key.to_string(), value);
    }

    pub fn get(&self, key: &str) -> Option<f32> {
        self.0.get(key).copied()
    }

    /// Merges `other` into `self`, overwriting shared keys.
    pub fn update(&mut self, other: TbDict) {
        self.0.extend(other.0);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &f32)> {
        self.0.iter()
    }

    pub fn to_json(&self) -> anyhow::Result<String> {
        Ok(serde_json::to_string(&self.0)?)
    }
}
