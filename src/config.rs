use crate::error::ConfigError;
use crate::evolving::{DEFAULT_GENERALIZATION, DEFAULT_LEARNING_RATE};
use crate::search::DEFAULT_DEPTH;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_DATA_FILE: &str = "ReversiEvolvingAI.dat";

/// Engine settings. Every field has a default, so `{}` is a valid config.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub search: SearchConfig,
    pub evolving: EvolvingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub depth: u32,
}

impl Default for SearchConfig {
    fn default() -> Self {
        SearchConfig {
            depth: DEFAULT_DEPTH,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvolvingConfig {
    pub data_file: PathBuf,
    pub learning_rate: f32,
    pub generalization: f32,
    /// Fixed tie-break seed; OS entropy when absent.
    pub seed: Option<u64>,
}

impl Default for EvolvingConfig {
    fn default() -> Self {
        EvolvingConfig {
            data_file: PathBuf::from(DEFAULT_DATA_FILE),
            learning_rate: DEFAULT_LEARNING_RATE,
            generalization: DEFAULT_GENERALIZATION,
            seed: None,
        }
    }
}

impl EngineConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }
}
