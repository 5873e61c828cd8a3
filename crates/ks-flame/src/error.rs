//! Error types for flame solves.

use ks_core::CoreError;
use ks_kinetics::KineticsError;
use ks_model::ModelError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FlameError {
    #[error("Convergence failed: {what}")]
    ConvergenceFailed { what: String },

    #[error("Invalid flame setup: {what}")]
    InvalidSetup { what: String },

    #[error("No flame solution is available")]
    NoSolution,

    #[error("Solution '{name}' not found in {path}")]
    SolutionNotFound { path: PathBuf, name: String },

    #[error("Restart file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Restart file format error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] serde_yaml::Error),

    #[error("Kinetics error: {0}")]
    Kinetics(#[from] KineticsError),

    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    #[error("Numeric error: {0}")]
    Core(#[from] CoreError),
}

pub type FlameResult<T> = Result<T, FlameError>;

impl From<FlameError> for ModelError {
    fn from(e: FlameError) -> Self {
        match e {
            FlameError::Model(inner) => inner,
            FlameError::Kinetics(inner) => ModelError::Kinetics(inner),
            other => ModelError::Backend {
                message: other.to_string(),
            },
        }
    }
}
