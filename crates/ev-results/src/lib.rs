//! ev-results: durable per-run storage.

pub mod store;
pub mod types;

use std::path::PathBuf;

pub use store::{METADATA_FILE, ResultStore, SAMPLES_FILE};
pub use types::RunMetadata;

pub type ResultsResult<T> = Result<T, ResultsError>;

#[derive(thiserror::Error, Debug)]
pub enum ResultsError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Run not found: {run_id}")]
    RunNotFound { run_id: String },

    #[error("Invalid sample record at {path}:{line}: {source}")]
    InvalidRecord {
        path: PathBuf,
        line: usize,
        source: serde_json::Error,
    },
}
