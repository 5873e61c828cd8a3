//! In-process ideal-gas mechanism with a forward rate-constant cache.

use crate::composition::Composition;
use crate::error::{KineticsError, KineticsResult};
use crate::kinetics::Kinetics;
use crate::mechanism::{MechanismDefinition, SpeciesDefinition};
use crate::reaction::{RateLaw, Reaction};
use ks_core::numeric::ensure_positive;
use ks_core::units::constants::{GAS_CONSTANT, ONE_ATM_PA};
use ks_core::units::{Pressure, Temperature, to_kelvin, to_pascal};
use std::path::Path;

/// Ideal-gas mixture over a mechanism.
///
/// Forward rate constants at the current state are cached per reaction;
/// [`Kinetics::modify_reaction`] and [`Kinetics::set_state`] refresh the cache.
#[derive(Debug, Clone)]
pub struct Solution {
    mechanism: MechanismDefinition,
    temperature: f64,
    pressure: f64,
    mole_fractions: Vec<f64>,
    rate_cache: Vec<f64>,
}

impl Solution {
    pub fn new(mechanism: MechanismDefinition) -> Self {
        let n_species = mechanism.species.len();
        let mut mole_fractions = vec![0.0; n_species];
        if let Some(first) = mole_fractions.first_mut() {
            *first = 1.0;
        }
        let mut gas = Self {
            mechanism,
            temperature: 300.0,
            pressure: ONE_ATM_PA,
            mole_fractions,
            rate_cache: Vec::new(),
        };
        gas.rate_cache = gas.rate_constants_at(gas.temperature);
        gas
    }

    pub fn from_path(path: &Path) -> KineticsResult<Self> {
        Ok(Self::new(MechanismDefinition::from_path(path)?))
    }

    pub fn from_yaml_str(text: &str) -> KineticsResult<Self> {
        Ok(Self::new(MechanismDefinition::from_yaml_str(text)?))
    }

    pub fn n_species(&self) -> usize {
        self.mechanism.species.len()
    }

    pub fn species(&self) -> &[SpeciesDefinition] {
        &self.mechanism.species
    }

    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    pub fn pressure(&self) -> f64 {
        self.pressure
    }

    pub fn mole_fractions(&self) -> &[f64] {
        &self.mole_fractions
    }

    /// Molar concentration of the mixture [kmol/m³] at temperature `t`.
    pub fn molar_density_at(&self, t: f64) -> f64 {
        self.pressure / (GAS_CONSTANT * t)
    }

    /// Effective third-body concentration `[M] = Σ ε_k C_k` for `reaction`.
    pub fn third_body_concentration(&self, reaction: &Reaction, t: f64) -> f64 {
        let c_total = self.molar_density_at(t);
        match &reaction.third_body {
            None => c_total,
            Some(tb) => self
                .mechanism
                .species
                .iter()
                .zip(&self.mole_fractions)
                .map(|(s, x)| tb.efficiency(&s.name) * x * c_total)
                .sum(),
        }
    }

    /// Forward rate constant of one reaction at temperature `t` and the
    /// current pressure/composition.
    pub fn rate_constant(&self, reaction: &Reaction, t: f64) -> f64 {
        match &reaction.rate {
            RateLaw::Elementary(k) => k.eval(t),
            RateLaw::ThreeBody(k) => k.eval(t) * self.third_body_concentration(reaction, t),
            RateLaw::Falloff(f) => f.falloff(t, self.third_body_concentration(reaction, t)),
            RateLaw::ChemicallyActivated(f) => {
                f.chemically_activated(t, self.third_body_concentration(reaction, t))
            }
        }
    }

    /// Forward rate constants of all reactions at temperature `t`.
    pub fn rate_constants_at(&self, t: f64) -> Vec<f64> {
        self.mechanism
            .reactions
            .iter()
            .map(|r| self.rate_constant(r, t))
            .collect()
    }

    /// Cached forward rate constants at the current state.
    pub fn forward_rate_constants(&self) -> &[f64] {
        &self.rate_cache
    }

    /// Mole-fraction-weighted atom count of `element` per molecule of mixture.
    pub fn elemental_moles(&self, element: &str) -> f64 {
        self.mechanism
            .species
            .iter()
            .zip(&self.mole_fractions)
            .map(|(s, x)| s.atoms(element) * x)
            .sum()
    }

    /// Equivalence ratio from elemental oxygen balance, `(2 C + H / 2) / O`.
    pub fn equivalence_ratio(&self) -> Option<f64> {
        let oxygen = self.elemental_moles("O");
        if oxygen <= 0.0 {
            return None;
        }
        let demand = 2.0 * self.elemental_moles("C") + 0.5 * self.elemental_moles("H");
        Some(demand / oxygen)
    }

    fn check_index(&self, index: usize) -> KineticsResult<()> {
        let len = self.mechanism.reactions.len();
        if index < len {
            Ok(())
        } else {
            Err(KineticsError::ReactionIndex { index, len })
        }
    }
}

impl Kinetics for Solution {
    fn n_reactions(&self) -> usize {
        self.mechanism.reactions.len()
    }

    fn reaction(&self, index: usize) -> KineticsResult<Reaction> {
        self.check_index(index)?;
        Ok(self.mechanism.reactions[index].clone())
    }

    fn reaction_equation(&self, index: usize) -> KineticsResult<&str> {
        self.check_index(index)?;
        Ok(&self.mechanism.reactions[index].equation)
    }

    fn modify_reaction(&mut self, index: usize, reaction: Reaction) -> KineticsResult<()> {
        self.check_index(index)?;
        let current = &self.mechanism.reactions[index];
        if current.reaction_type() != reaction.reaction_type() {
            return Err(KineticsError::IncompatibleModification {
                index,
                reason: format!(
                    "type changes from {} to {}",
                    current.reaction_type().as_str(),
                    reaction.reaction_type().as_str()
                ),
            });
        }
        let k = self.rate_constant(&reaction, self.temperature);
        self.mechanism.reactions[index] = reaction;
        self.rate_cache[index] = k;
        Ok(())
    }

    fn set_state(
        &mut self,
        t: Temperature,
        p: Pressure,
        composition: &Composition,
    ) -> KineticsResult<()> {
        let t = ensure_positive(to_kelvin(t), "temperature")?;
        let p = ensure_positive(to_pascal(p), "pressure")?;
        let mut x = vec![0.0; self.n_species()];
        for (name, frac) in composition.iter() {
            let idx = self
                .mechanism
                .species_index(name)
                .ok_or_else(|| KineticsError::UnknownSpecies {
                    name: name.to_string(),
                })?;
            x[idx] = frac;
        }
        self.temperature = t;
        self.pressure = p;
        self.mole_fractions = x;
        self.rate_cache = self.rate_constants_at(t);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rate::Arrhenius;
    use ks_core::units::{atm, k};

    const MECH: &str = r#"
species:
- name: CH4
  composition: {C: 1, H: 4}
- name: O2
  composition: {O: 2}
- name: N2
  composition: {N: 2}
- name: O
  composition: {O: 1}
reactions:
- equation: O + CH4 <=> OH + CH3
  rate-constant: {A: 1.02e9, b: 1.5, Ea: 8600}
- equation: 2 O + M <=> O2 + M
  rate-constant: {A: 1.2e17, b: -1.0, Ea: 0.0}
  efficiencies: {CH4: 2.0}
"#;

    fn methane_air() -> Solution {
        let mut gas = Solution::from_yaml_str(MECH).unwrap();
        let comp = Composition::parse("CH4:1, O2:2, N2:7.52").unwrap();
        gas.set_state(k(300.0), atm(1.0), &comp).unwrap();
        gas
    }

    #[test]
    fn stoichiometric_methane_air_has_unit_equivalence_ratio() {
        let gas = methane_air();
        assert!((gas.equivalence_ratio().unwrap() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn unknown_species_rejected() {
        let mut gas = Solution::from_yaml_str(MECH).unwrap();
        let comp = Composition::parse("H2:1, O2:1").unwrap();
        let err = gas.set_state(k(300.0), atm(1.0), &comp).unwrap_err();
        assert!(matches!(err, KineticsError::UnknownSpecies { .. }));
    }

    #[test]
    fn modify_reaction_refreshes_cache() {
        let mut gas = methane_air();
        let before = gas.forward_rate_constants()[0];
        let mut rxn = gas.reaction(0).unwrap();
        let rate = *rxn.rate().unwrap();
        rxn.set_rate(rate.with_pre_exponential_factor(2.0 * rate.pre_exponential_factor))
            .unwrap();
        gas.modify_reaction(0, rxn).unwrap();
        let after = gas.forward_rate_constants()[0];
        assert!((after / before - 2.0).abs() < 1e-12);
    }

    #[test]
    fn modify_reaction_rejects_type_change() {
        let mut gas = methane_air();
        let replacement = Reaction::elementary("2 O <=> O2", Arrhenius::new(1.0, 0.0, 0.0));
        assert!(matches!(
            gas.modify_reaction(1, replacement),
            Err(KineticsError::IncompatibleModification { index: 1, .. })
        ));
    }

    #[test]
    fn reaction_index_is_checked() {
        let gas = methane_air();
        assert!(matches!(
            gas.reaction(5),
            Err(KineticsError::ReactionIndex { index: 5, len: 2 })
        ));
    }

    #[test]
    fn efficiencies_weight_third_body_concentration() {
        let gas = methane_air();
        let rxn = gas.reaction(1).unwrap();
        let c = gas.molar_density_at(300.0);
        let x_ch4 = 1.0 / 10.52;
        let expected = c * (1.0 + x_ch4);
        assert!((gas.third_body_concentration(&rxn, 300.0) / expected - 1.0).abs() < 1e-12);
    }
}
