use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::LookupError;

/// How to treat a tainted search query that reaches a quoting driver
/// without having been quoted for it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaintPolicy {
    /// Log a warning and run the lookup anyway.
    Warn,
    /// Defer the lookup.
    #[default]
    Enforce,
}

/// Dispatcher tunables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatcherConfig {
    /// Upper bound on concurrently open file-backed handles. Reaching it
    /// closes the least recently used handle before opening another.
    #[serde(default = "default_max_open_files")]
    pub max_open_files: usize,

    #[serde(default)]
    pub taint_policy: TaintPolicy,
}

fn default_max_open_files() -> usize {
    25
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            max_open_files: default_max_open_files(),
            taint_policy: TaintPolicy::default(),
        }
    }
}

impl DispatcherConfig {
    /// Load from a JSON file; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, LookupError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| LookupError::InvalidConfig(e.to_string()))
    }
}
