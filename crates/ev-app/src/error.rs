//! Error types for the ev-app service layer.

use std::path::PathBuf;

/// Configuration-level failures raised straight to the caller.
///
/// Failures inside a started run are reported as `RunFailed` events instead.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Registry error: {0}")]
    Registry(#[from] ev_core::RegistryError),

    #[error("Run not found: {0}")]
    RunNotFound(String),

    #[error("Results error: {0}")]
    Results(String),

    #[error("Data I/O error: {0}")]
    DataIo(String),

    #[error("Plugin error: {0}")]
    Plugin(String),

    #[error("Scenario error: {0}")]
    Scenario(String),

    #[error("Unknown event kind: {0}")]
    UnknownEvent(String),

    #[error("Failed to read config file: {path}")]
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid config: {0}")]
    Config(String),
}

/// Result type for ev-app operations.
pub type AppResult<T> = Result<T, AppError>;

impl From<ev_results::ResultsError> for AppError {
    fn from(err: ev_results::ResultsError) -> Self {
        match err {
            ev_results::ResultsError::RunNotFound { run_id } => AppError::RunNotFound(run_id),
            other => AppError::Results(other.to_string()),
        }
    }
}

impl From<ev_io::DataIoError> for AppError {
    fn from(err: ev_io::DataIoError) -> Self {
        AppError::DataIo(err.to_string())
    }
}

impl From<ev_plugins::PluginError> for AppError {
    fn from(err: ev_plugins::PluginError) -> Self {
        AppError::Plugin(err.to_string())
    }
}

impl From<ev_core::ScenarioError> for AppError {
    fn from(err: ev_core::ScenarioError) -> Self {
        AppError::Scenario(err.to_string())
    }
}

impl From<ev_core::UnknownEventKind> for AppError {
    fn from(err: ev_core::UnknownEventKind) -> Self {
        AppError::UnknownEvent(err.0)
    }
}
