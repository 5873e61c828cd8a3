//! ks-model: parameterized chemistry models for kinsens.
//!
//! Provides:
//! - The tunable-parameter catalog of a mechanism and its filters
//! - Parameter reads and writes on a live mechanism
//! - Lifecycle of the live mechanism and reactor
//! - The `ChemistryModel` trait with finite-difference sensitivities

pub mod accessor;
pub mod catalog;
pub mod error;
pub mod lifecycle;
pub mod model;
pub mod sensitivity;
pub mod state;

pub use catalog::{CatalogFilter, ParameterCatalog, ParameterDescriptor, ParameterKind, build_catalog};
pub use error::{ModelError, ModelResult};
pub use lifecycle::Lifecycle;
pub use model::{
    ChemistryModel, ConvergenceStatus, Evaluation, GasOf, ModelCore, SolveMode, StageOutcome,
};
pub use sensitivity::{SensitivityReport, print_sensitivities};
pub use state::InitialState;
