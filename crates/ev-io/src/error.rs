use std::path::PathBuf;

use thiserror::Error;

pub type DataIoResult<T> = Result<T, DataIoError>;

#[derive(Error, Debug)]
pub enum DataIoError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error at {path}:{line}: {message}")]
    Parse {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("Column '{column}' not found in {path}")]
    MissingColumn { path: PathBuf, column: String },

    #[error("Invalid {format} file {path}: {message}")]
    InvalidFormat {
        format: &'static str,
        path: PathBuf,
        message: String,
    },
}
