use std::path::PathBuf;

use thiserror::Error;

pub type ScenarioResult<T> = Result<T, ScenarioError>;

#[derive(Error, Debug)]
pub enum ScenarioError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unsupported scenario file extension: {path}")]
    UnsupportedFormat { path: PathBuf },
}
