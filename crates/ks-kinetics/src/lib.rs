//! ks-kinetics: reaction mechanisms for kinsens.
//!
//! Provides:
//! - Arrhenius and falloff rate laws
//! - Reaction records classified by engine type code
//! - YAML mechanism definitions
//! - Composition handling by species name
//! - The `Kinetics`/`MechanismLoader` seam to the chemistry engine, with an
//!   in-process `Solution` implementation

pub mod composition;
pub mod error;
pub mod kinetics;
pub mod mechanism;
pub mod rate;
pub mod reaction;
pub mod solution;

pub use composition::Composition;
pub use error::{KineticsError, KineticsResult};
pub use kinetics::{Kinetics, MechanismLoader, YamlMechanismLoader};
pub use mechanism::{EnergyUnit, MechanismDefinition, SpeciesDefinition};
pub use rate::{Arrhenius, FalloffRate, Troe};
pub use reaction::{RateLaw, Reaction, ReactionType, ThirdBody};
pub use solution::Solution;
