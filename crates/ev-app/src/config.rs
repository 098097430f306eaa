//! Orchestrator configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

/// Switches for the orchestrator's optional services.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Load plugins when a session opens.
    pub enable_plugins: bool,
    /// Deliver run events to subscribers.
    pub enable_event_stream: bool,
    /// Samples buffered per append in the stepping loop.
    pub sample_batch_size: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            enable_plugins: true,
            enable_event_stream: true,
            sample_batch_size: 100,
        }
    }
}

impl OrchestratorConfig {
    /// Load from a `.yaml`/`.yml` or `.json` file. Missing keys keep defaults.
    pub fn load(path: &Path) -> AppResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| AppError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => {
                serde_json::from_str(&content).map_err(|e| AppError::Config(e.to_string()))?
            }
            _ => serde_yaml::from_str(&content).map_err(|e| AppError::Config(e.to_string()))?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.sample_batch_size == 0 {
            return Err(AppError::Config(
                "sample_batch_size must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_yaml_keeps_defaults() {
        let config: OrchestratorConfig = serde_yaml::from_str("enable_plugins: false\n").unwrap();
        assert!(!config.enable_plugins);
        assert!(config.enable_event_stream);
        assert_eq!(config.sample_batch_size, 100);
    }

    #[test]
    fn zero_batch_size_is_invalid() {
        let config = OrchestratorConfig {
            sample_batch_size: 0,
            ..OrchestratorConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
