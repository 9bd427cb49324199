//! Runtime configuration for the engine and the SQLite store.
//!
//! Every field has a default, so an empty JSON object is a valid config.

use crate::expression::{SplitPolicy, DEFAULT_MAX_NESTING};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("cannot parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub engine: EngineConfig,
    pub store: StoreConfig,
}

impl Config {
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_json::from_str(raw)?;
        config.check()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    fn check(&self) -> Result<(), ConfigError> {
        if self.engine.max_depth == 0 || self.engine.max_nesting == 0 {
            return Err(ConfigError::Invalid(
                "engine.max_depth and engine.max_nesting must be at least 1".into(),
            ));
        }
        if self.store.calculations_table == self.store.relations_table {
            return Err(ConfigError::Invalid(format!(
                "store tables must differ, both are '{}'",
                self.store.calculations_table
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Longest chain of references resolved by one read.
    pub max_depth: usize,
    /// Recursion limit of the evaluator inside a single expression.
    pub max_nesting: usize,
    pub split_policy: SplitPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_depth: 64,
            max_nesting: DEFAULT_MAX_NESTING,
            split_policy: SplitPolicy::Legacy,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub calculations_table: String,
    pub relations_table: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            calculations_table: "calculations".to_string(),
            relations_table: "relations".to_string(),
        }
    }
}
