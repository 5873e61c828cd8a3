//! Error types for model operations.

use ks_kinetics::KineticsError;
use thiserror::Error;

/// Errors raised by chemistry models.
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Invalid parameter id {id} (catalog has {len} parameters)")]
    InvalidParameterId { id: usize, len: usize },

    #[error("Chemistry is not initialized")]
    UninitializedMechanism,

    #[error("Parameter {id} does not match reaction {reaction}: {reason}")]
    CatalogMismatch {
        id: usize,
        reaction: usize,
        reason: String,
    },

    #[error("Invalid value for {what}: {value}")]
    InvalidValue { what: &'static str, value: f64 },

    #[error("Parameter {id} ({name}) cannot be perturbed through the adjoint solver")]
    UnsupportedAdjointParameter { id: usize, name: String },

    #[error("Kinetics error: {0}")]
    Kinetics(#[from] KineticsError),

    #[error("Log write failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Backend error: {message}")]
    Backend { message: String },
}

pub type ModelResult<T> = Result<T, ModelError>;

impl From<ks_core::CoreError> for ModelError {
    fn from(e: ks_core::CoreError) -> Self {
        ModelError::Kinetics(e.into())
    }
}
