//! ks-flame: laminar flame speed and its sensitivities for kinsens.
//!
//! Provides:
//! - The `FlameSolver`/`FlameBackend` seam to a one-dimensional flame code
//! - Staged continuation with per-stage retry and outcome reporting
//! - `FlameSpeed`, a `ChemistryModel` with restart handling and adjoint
//!   sensitivities
//! - `SurrogateFlame`, a reduced-order solver behind the same seam

pub mod adjoint;
pub mod continuation;
pub mod error;
pub mod flame_speed;
pub mod solver;
pub mod surrogate;

pub use continuation::{SolvePath, Stage};
pub use error::{FlameError, FlameResult};
pub use flame_speed::{FlameSpeed, FlameSpeedConfig, SensitivityMethod, SurrogateFlameSpeed};
pub use solver::{FlameBackend, FlameSolver, RefineCriteria, TransportModel, UnknownLayout};
pub use surrogate::{SurrogateBackend, SurrogateFlame};
