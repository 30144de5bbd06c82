//! Caching policy.
//!
//! Decides whether an invocation may fast-forward when the caller does not say so
//! explicitly. The policy is loaded from a JSON document:
//!
//! ```json
//! { "default_enabled": false, "enabled": ["simple_cached_wf"], "disabled": [] }
//! ```

use crate::core::error::ConfigError;
use crate::core::workfunction::FunctionId;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CachingConfig {
    /// Policy for functions named in neither list.
    pub default_enabled: bool,
    /// Function names that always fast-forward.
    pub enabled: Vec<String>,
    /// Function names that never fast-forward. Takes precedence over `enabled`.
    pub disabled: Vec<String>,
}

impl CachingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(s)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let config = Self::from_json_str(&contents)?;
        log::debug!("Loaded caching configuration from {}", path.display());
        Ok(config)
    }

    pub fn with_default(mut self, enabled: bool) -> Self {
        self.default_enabled = enabled;
        self
    }

    pub fn enable(mut self, function: impl Into<String>) -> Self {
        self.enabled.push(function.into());
        self
    }

    pub fn disable(mut self, function: impl Into<String>) -> Self {
        self.disabled.push(function.into());
        self
    }

    /// Whether `function` may fast-forward by default.
    pub fn is_enabled(&self, function: &FunctionId) -> bool {
        let name = function.name.as_str();
        if self.disabled.iter().any(|f| f == name) {
            false
        } else if self.enabled.iter().any(|f| f == name) {
            true
        } else {
            self.default_enabled
        }
    }
}
