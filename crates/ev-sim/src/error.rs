//! Error types for model and solver operations.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by models and solvers while configuring or stepping.
#[derive(Error, Debug)]
pub enum SimError {
    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    #[error("Missing parameter: {name}")]
    MissingParameter { name: String },

    #[error("Non-physical condition: {what}")]
    NonPhysical { what: String },

    #[error("Input file {}: {message}", path.display())]
    InputFile { path: PathBuf, message: String },
}

pub type SimResult<T> = Result<T, SimError>;
