//! Kinetics and mechanism errors.

use ks_core::CoreError;
use thiserror::Error;

/// Result type for kinetics operations.
pub type KineticsResult<T> = Result<T, KineticsError>;

/// Errors raised while loading or manipulating a reaction mechanism.
#[derive(Error, Debug)]
pub enum KineticsError {
    /// Mechanism file could not be read.
    #[error("Failed to read mechanism {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Mechanism document is not valid YAML for the expected schema.
    #[error("Failed to parse mechanism: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// Mechanism parsed but is internally inconsistent.
    #[error("Invalid mechanism: {reason}")]
    InvalidMechanism { reason: String },

    /// Reaction index outside the mechanism.
    #[error("Reaction index {index} out of range (mechanism has {len} reactions)")]
    ReactionIndex { index: usize, len: usize },

    /// Replacement reaction does not match the one it replaces.
    #[error("Cannot modify reaction {index}: {reason}")]
    IncompatibleModification { index: usize, reason: String },

    #[error("Unknown species: {name}")]
    UnknownSpecies { name: String },

    #[error("Invalid composition: {reason}")]
    InvalidComposition { reason: String },

    #[error(transparent)]
    Core(#[from] CoreError),
}
