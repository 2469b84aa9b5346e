use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// ## Engine settings
///
/// Every field has a default, so a partial JSON document is enough.

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Numbers within this distance of zero or of an integer are snapped.
    pub sensitivity: f64,
    /// Iterations a single `loop` may run before it is aborted.
    pub loop_limit: usize,
    pub max_stack: usize,
    /// Temporary values alive at once.
    pub max_temp: usize,
    /// User function calls nested at once. Each level costs native stack.
    pub max_call_depth: usize,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            sensitivity: 1e-12,
            loop_limit: 100_000,
            max_stack: 65535,
            max_temp: 1 << 20,
            max_call_depth: 32,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read configuration: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid configuration: {0}")]
    Json(#[from] serde_json::Error),
}

impl Config {
    pub fn from_json(text: &str) -> Result<Config, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Config::from_json(&text)
    }
}
