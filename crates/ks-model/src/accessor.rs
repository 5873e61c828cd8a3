//! Read and write catalog parameters on a live mechanism.

use crate::catalog::{ParameterCatalog, ParameterDescriptor, ParameterKind};
use crate::error::{ModelError, ModelResult};
use ks_kinetics::{Arrhenius, Kinetics, Reaction};

fn mismatch(id: usize, desc: &ParameterDescriptor, reason: &str) -> ModelError {
    ModelError::CatalogMismatch {
        id,
        reaction: desc.reaction,
        reason: reason.to_string(),
    }
}

fn single_limit(id: usize, desc: &ParameterDescriptor, rxn: &Reaction) -> ModelResult<Arrhenius> {
    rxn.rate()
        .copied()
        .ok_or_else(|| mismatch(id, desc, "reaction has no single-limit rate"))
}

fn high_limit(id: usize, desc: &ParameterDescriptor, rxn: &Reaction) -> ModelResult<Arrhenius> {
    rxn.high_rate()
        .copied()
        .ok_or_else(|| mismatch(id, desc, "reaction has no high-pressure limit"))
}

fn low_limit(id: usize, desc: &ParameterDescriptor, rxn: &Reaction) -> ModelResult<Arrhenius> {
    rxn.low_rate()
        .copied()
        .ok_or_else(|| mismatch(id, desc, "reaction has no low-pressure limit"))
}

fn efficiency_species<'a>(id: usize, desc: &'a ParameterDescriptor) -> ModelResult<&'a str> {
    desc.species
        .as_deref()
        .ok_or_else(|| mismatch(id, desc, "efficiency parameter without species"))
}

/// Current value of parameter `id`.
///
/// Activation energies are returned in J/kmol.
pub fn get_parameter<G: Kinetics + ?Sized>(
    gas: &G,
    catalog: &ParameterCatalog,
    id: usize,
) -> ModelResult<f64> {
    let desc = catalog.get(id)?;
    let rxn = gas.reaction(desc.reaction)?;
    let value = match desc.kind {
        ParameterKind::AFactor => single_limit(id, desc, &rxn)?.pre_exponential_factor,
        ParameterKind::Energy => single_limit(id, desc, &rxn)?.activation_energy,
        ParameterKind::HighPressureA => high_limit(id, desc, &rxn)?.pre_exponential_factor,
        ParameterKind::HighPressureE => high_limit(id, desc, &rxn)?.activation_energy,
        ParameterKind::LowPressureA => low_limit(id, desc, &rxn)?.pre_exponential_factor,
        ParameterKind::LowPressureE => low_limit(id, desc, &rxn)?.activation_energy,
        ParameterKind::Efficiency => {
            let species = efficiency_species(id, desc)?;
            rxn.efficiency(species)
                .ok_or_else(|| mismatch(id, desc, "reaction has no third body"))?
        }
    };
    Ok(value)
}

/// Write parameter `id` and push the rebuilt reaction to the mechanism.
///
/// With `couple_low_pressure`, a write to the high-pressure A-factor scales
/// the low-pressure A-factor by the same ratio. The temperature exponent of
/// every rate is left unchanged.
pub fn set_parameter<G: Kinetics + ?Sized>(
    gas: &mut G,
    catalog: &ParameterCatalog,
    id: usize,
    value: f64,
    couple_low_pressure: bool,
) -> ModelResult<()> {
    if !value.is_finite() {
        return Err(ModelError::InvalidValue {
            what: "parameter",
            value,
        });
    }
    let desc = catalog.get(id)?;
    let mut rxn = gas.reaction(desc.reaction)?;

    match desc.kind {
        ParameterKind::AFactor => {
            let k = single_limit(id, desc, &rxn)?;
            rxn.set_rate(k.with_pre_exponential_factor(value))?;
        }
        ParameterKind::Energy => {
            let k = single_limit(id, desc, &rxn)?;
            rxn.set_rate(k.with_activation_energy(value))?;
        }
        ParameterKind::HighPressureA => {
            let high = high_limit(id, desc, &rxn)?;
            if couple_low_pressure {
                let old = high.pre_exponential_factor;
                if old == 0.0 {
                    return Err(ModelError::InvalidValue {
                        what: "high-pressure A-factor to scale from",
                        value: old,
                    });
                }
                let ratio = value / old;
                let low = low_limit(id, desc, &rxn)?;
                rxn.set_low_rate(low.with_pre_exponential_factor(low.pre_exponential_factor * ratio))?;
            }
            rxn.set_high_rate(high.with_pre_exponential_factor(value))?;
        }
        ParameterKind::HighPressureE => {
            let high = high_limit(id, desc, &rxn)?;
            rxn.set_high_rate(high.with_activation_energy(value))?;
        }
        ParameterKind::LowPressureA => {
            let low = low_limit(id, desc, &rxn)?;
            rxn.set_low_rate(low.with_pre_exponential_factor(value))?;
        }
        ParameterKind::LowPressureE => {
            let low = low_limit(id, desc, &rxn)?;
            rxn.set_low_rate(low.with_activation_energy(value))?;
        }
        ParameterKind::Efficiency => {
            let species = efficiency_species(id, desc)?;
            rxn.set_efficiency(species, value)?;
        }
    }

    tracing::trace!(id, name = %desc.name, value, "set parameter");
    gas.modify_reaction(desc.reaction, rxn)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CatalogFilter, full_catalog};
    use ks_kinetics::Solution;

    const MECH: &str = r#"
species:
- name: H
  composition: {H: 1}
- name: H2
  composition: {H: 2}
- name: CH3
  composition: {C: 1, H: 3}
- name: CH4
  composition: {C: 1, H: 4}
- name: N2
  composition: {N: 2}
reactions:
- equation: H + CH4 <=> CH3 + H2
  rate-constant: {A: 6.6e8, b: 1.62, Ea: 10840}
- equation: H + CH3 (+M) <=> CH4 (+M)
  high-P-rate-constant: {A: 1.39e16, b: -0.534, Ea: 536}
  low-P-rate-constant: {A: 2.62e33, b: -4.76, Ea: 2440}
  efficiencies: {H2: 2.0, CH4: 3.0, N2: 0.0}
"#;

    fn setup() -> (Solution, ParameterCatalog) {
        let gas = Solution::from_yaml_str(MECH).unwrap();
        let catalog = full_catalog(&gas).unwrap();
        (gas, catalog)
    }

    fn id_of(catalog: &ParameterCatalog, name: &str) -> usize {
        catalog.iter().position(|d| d.name == name).unwrap()
    }

    #[test]
    fn reads_every_kind() {
        let (gas, catalog) = setup();
        assert_eq!(catalog.len(), 8);
        let a = get_parameter(&gas, &catalog, 0).unwrap();
        assert!((a - 6.6e8).abs() < 1.0);
        let e = get_parameter(&gas, &catalog, 1).unwrap();
        assert!((e - 10840.0 * 4184.0).abs() < 1e-3);
        let eff = id_of(&catalog, "H + CH3 (+M) <=> CH4 (+M):Eff:CH4");
        assert_eq!(get_parameter(&gas, &catalog, eff).unwrap(), 3.0);
    }

    #[test]
    fn coupled_high_pressure_write_scales_low_pressure() {
        let (mut gas, catalog) = setup();
        let hpa = id_of(&catalog, "H + CH3 (+M) <=> CH4 (+M):HpA");
        let lpa = id_of(&catalog, "H + CH3 (+M) <=> CH4 (+M):LpA");
        let low_before = get_parameter(&gas, &catalog, lpa).unwrap();
        let high_before = get_parameter(&gas, &catalog, hpa).unwrap();

        set_parameter(&mut gas, &catalog, hpa, high_before * 1.5, true).unwrap();

        let low_after = get_parameter(&gas, &catalog, lpa).unwrap();
        assert!((low_after / low_before - 1.5).abs() < 1e-12);
    }

    #[test]
    fn uncoupled_high_pressure_write_leaves_low_pressure() {
        let (mut gas, catalog) = setup();
        let hpa = id_of(&catalog, "H + CH3 (+M) <=> CH4 (+M):HpA");
        let lpa = id_of(&catalog, "H + CH3 (+M) <=> CH4 (+M):LpA");
        let low_before = get_parameter(&gas, &catalog, lpa).unwrap();
        set_parameter(&mut gas, &catalog, hpa, 1.0e15, false).unwrap();
        assert_eq!(get_parameter(&gas, &catalog, lpa).unwrap(), low_before);
        assert_eq!(get_parameter(&gas, &catalog, hpa).unwrap(), 1.0e15);
    }

    #[test]
    fn energy_write_touches_one_branch() {
        let (mut gas, catalog) = setup();
        let hpe = id_of(&catalog, "H + CH3 (+M) <=> CH4 (+M):HpE");
        let lpe = id_of(&catalog, "H + CH3 (+M) <=> CH4 (+M):LpE");
        let low_before = get_parameter(&gas, &catalog, lpe).unwrap();
        set_parameter(&mut gas, &catalog, hpe, 1.0e6, true).unwrap();
        assert_eq!(get_parameter(&gas, &catalog, hpe).unwrap(), 1.0e6);
        assert_eq!(get_parameter(&gas, &catalog, lpe).unwrap(), low_before);
    }

    #[test]
    fn write_keeps_temperature_exponent_and_refreshes_rates() {
        let (mut gas, catalog) = setup();
        let before = gas.forward_rate_constants()[0];
        set_parameter(&mut gas, &catalog, 0, 6.6e8 * 2.0, false).unwrap();
        let rxn = gas.reaction(0).unwrap();
        assert_eq!(rxn.rate().unwrap().temperature_exponent, 1.62);
        let after = gas.forward_rate_constants()[0];
        assert!((after / before - 2.0).abs() < 1e-9);
    }

    #[test]
    fn efficiency_write() {
        let (mut gas, catalog) = setup();
        let eff = id_of(&catalog, "H + CH3 (+M) <=> CH4 (+M):Eff:H2");
        set_parameter(&mut gas, &catalog, eff, 2.5, false).unwrap();
        assert_eq!(get_parameter(&gas, &catalog, eff).unwrap(), 2.5);
    }

    #[test]
    fn out_of_range_id() {
        let (mut gas, catalog) = setup();
        assert!(matches!(
            get_parameter(&gas, &catalog, 42),
            Err(ModelError::InvalidParameterId { id: 42, len: 8 })
        ));
        assert!(set_parameter(&mut gas, &catalog, 42, 1.0, true).is_err());
    }

    #[test]
    fn default_filter_catalog_reads_a_factors() {
        let (gas, catalog) = setup();
        let strict = catalog.filtered(CatalogFilter::default());
        assert_eq!(strict.len(), 2);
        assert!(get_parameter(&gas, &strict, 1).unwrap() > 1.0e15);
    }
}
