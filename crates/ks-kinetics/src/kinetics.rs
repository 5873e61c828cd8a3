//! Interfaces to a live reaction mechanism.
//!
//! Everything above this crate talks to the chemistry engine only through
//! [`Kinetics`] and [`MechanismLoader`]; [`crate::Solution`] is the
//! in-process implementation.

use crate::composition::Composition;
use crate::error::KineticsResult;
use crate::reaction::Reaction;
use crate::solution::Solution;
use ks_core::units::{Pressure, Temperature};
use std::path::Path;

/// A live mechanism: reactions that can be inspected and modified, plus a
/// thermodynamic state.
pub trait Kinetics {
    fn n_reactions(&self) -> usize;

    /// Copy of reaction `index`.
    fn reaction(&self, index: usize) -> KineticsResult<Reaction>;

    fn reaction_equation(&self, index: usize) -> KineticsResult<&str>;

    /// Replace reaction `index` and refresh any rate data derived from it.
    ///
    /// The replacement must keep the reaction type of the original.
    fn modify_reaction(&mut self, index: usize, reaction: Reaction) -> KineticsResult<()>;

    fn set_state(
        &mut self,
        t: Temperature,
        p: Pressure,
        composition: &Composition,
    ) -> KineticsResult<()>;
}

/// Factory for fresh, independent mechanism objects.
pub trait MechanismLoader {
    type Gas: Kinetics;

    fn load(&self, path: &Path) -> KineticsResult<Self::Gas>;
}

/// Loads YAML mechanism files into [`Solution`] objects.
#[derive(Debug, Clone, Copy, Default)]
pub struct YamlMechanismLoader;

impl MechanismLoader for YamlMechanismLoader {
    type Gas = Solution;

    fn load(&self, path: &Path) -> KineticsResult<Solution> {
        let gas = Solution::from_path(path)?;
        tracing::debug!(
            path = %path.display(),
            species = gas.n_species(),
            reactions = gas.n_reactions(),
            "loaded mechanism"
        );
        Ok(gas)
    }
}
