//! Pipeline configuration.

use crate::AssetError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Settings read once when the pipeline is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    /// Background decode threads. `0` uses the hardware concurrency.
    pub worker_threads: usize,
    /// Directory relative asset paths are resolved against.
    pub asset_root: Option<PathBuf>,
    /// Deepest dependency chain a load may walk before it is failed.
    pub max_dependency_depth: usize,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            worker_threads: 0,
            asset_root: None,
            max_dependency_depth: 64,
        }
    }
}

impl PipelineSettings {
    pub fn from_json_str(json: &str) -> Result<Self, AssetError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, AssetError> {
        let json = fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }
}
