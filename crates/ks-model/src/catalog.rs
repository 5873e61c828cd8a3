//! Catalog of tunable rate-law parameters.
//!
//! The catalog is rebuilt from a scratch copy of the mechanism every time a
//! model is constructed; parameter ids are positions in declaration order.

use crate::error::{ModelError, ModelResult};
use ks_kinetics::{Kinetics, MechanismLoader, Reaction};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Activation energies with magnitude at or below this (J/kmol) are not
/// treated as parameters.
pub const ACTIVATION_ENERGY_THRESHOLD: f64 = 0.1;

/// Which coefficient of a reaction a parameter names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParameterKind {
    AFactor,
    Energy,
    HighPressureA,
    HighPressureE,
    LowPressureA,
    LowPressureE,
    Efficiency,
}

impl ParameterKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ParameterKind::AFactor => "A_factor",
            ParameterKind::Energy => "Energy",
            ParameterKind::HighPressureA => "High_pressure_A",
            ParameterKind::HighPressureE => "High_pressure_E",
            ParameterKind::LowPressureA => "Low_pressure_A",
            ParameterKind::LowPressureE => "Low_pressure_E",
            ParameterKind::Efficiency => "Efficiency",
        }
    }

    fn suffix(self) -> &'static str {
        match self {
            ParameterKind::AFactor => "A",
            ParameterKind::Energy => "E",
            ParameterKind::HighPressureA => "HpA",
            ParameterKind::HighPressureE => "HpE",
            ParameterKind::LowPressureA => "LpA",
            ParameterKind::LowPressureE => "LpE",
            ParameterKind::Efficiency => "Eff",
        }
    }

    /// Activation energy of either pressure branch.
    pub fn is_energy(self) -> bool {
        matches!(
            self,
            ParameterKind::Energy | ParameterKind::HighPressureE | ParameterKind::LowPressureE
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterDescriptor {
    pub reaction: usize,
    pub kind: ParameterKind,
    pub name: String,
    pub species: Option<String>,
}

impl ParameterDescriptor {
    fn new(reaction: usize, kind: ParameterKind, equation: &str) -> Self {
        Self {
            reaction,
            kind,
            name: format!("{equation}:{}", kind.suffix()),
            species: None,
        }
    }

    fn efficiency(reaction: usize, equation: &str, species: &str) -> Self {
        Self {
            reaction,
            kind: ParameterKind::Efficiency,
            name: format!("{equation}:Eff:{species}"),
            species: Some(species.to_string()),
        }
    }
}

/// Exclusion policy applied after the full catalog is enumerated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogFilter {
    pub no_efficiencies: bool,
    pub no_energy: bool,
    pub no_falloff: bool,
}

impl CatalogFilter {
    /// Keep every eligible parameter.
    pub const ALL: CatalogFilter = CatalogFilter {
        no_efficiencies: false,
        no_energy: false,
        no_falloff: false,
    };

    pub fn admits(&self, kind: ParameterKind) -> bool {
        use ParameterKind::*;
        let dropped_by_efficiencies = self.no_efficiencies && kind == Efficiency;
        let dropped_by_energy = self.no_energy && matches!(kind, Energy | LowPressureE | HighPressureE);
        let dropped_by_falloff =
            self.no_falloff && matches!(kind, LowPressureA | LowPressureE | HighPressureE);
        !(dropped_by_efficiencies || dropped_by_energy || dropped_by_falloff)
    }
}

impl Default for CatalogFilter {
    fn default() -> Self {
        Self {
            no_efficiencies: true,
            no_energy: true,
            no_falloff: true,
        }
    }
}

/// Ordered parameter catalog; the index of a descriptor is its parameter id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParameterCatalog {
    entries: Vec<ParameterDescriptor>,
}

impl ParameterCatalog {
    pub fn from_entries(entries: Vec<ParameterDescriptor>) -> Self {
        Self { entries }
    }

    pub fn get(&self, id: usize) -> ModelResult<&ParameterDescriptor> {
        self.entries.get(id).ok_or(ModelError::InvalidParameterId {
            id,
            len: self.entries.len(),
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ParameterDescriptor> + '_ {
        self.entries.iter()
    }

    /// Ids of all parameters belonging to `reaction`.
    pub fn ids_for_reaction(&self, reaction: usize) -> Vec<usize> {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, d)| d.reaction == reaction)
            .map(|(id, _)| id)
            .collect()
    }

    pub fn filtered(self, filter: CatalogFilter) -> Self {
        Self {
            entries: self
                .entries
                .into_iter()
                .filter(|d| filter.admits(d.kind))
                .collect(),
        }
    }
}

fn significant(activation_energy: f64) -> bool {
    activation_energy.abs() > ACTIVATION_ENERGY_THRESHOLD
}

/// Every eligible parameter of one reaction, before filtering.
pub fn reaction_parameters(index: usize, reaction: &Reaction) -> Vec<ParameterDescriptor> {
    let equation = reaction.equation.as_str();
    let mut params = Vec::new();

    let (has_falloff, has_third_body) = match reaction.reaction_type().code() {
        4 | 8 => (true, true),
        2 => (false, true),
        _ => (false, false),
    };

    if has_falloff {
        if let (Some(high), Some(low)) = (reaction.high_rate(), reaction.low_rate()) {
            params.push(ParameterDescriptor::new(index, ParameterKind::HighPressureA, equation));
            if significant(high.activation_energy) {
                params.push(ParameterDescriptor::new(index, ParameterKind::HighPressureE, equation));
            }
            params.push(ParameterDescriptor::new(index, ParameterKind::LowPressureA, equation));
            if significant(low.activation_energy) {
                params.push(ParameterDescriptor::new(index, ParameterKind::LowPressureE, equation));
            }
        }
    } else if let Some(rate) = reaction.rate() {
        params.push(ParameterDescriptor::new(index, ParameterKind::AFactor, equation));
        if significant(rate.activation_energy) {
            params.push(ParameterDescriptor::new(index, ParameterKind::Energy, equation));
        }
    }

    if has_third_body {
        for (species, eff) in reaction.efficiencies() {
            if *eff > 0.0 {
                params.push(ParameterDescriptor::efficiency(index, equation, species));
            }
        }
    }

    params
}

/// Enumerate all parameters of a mechanism in reaction order.
pub fn full_catalog<G: Kinetics + ?Sized>(gas: &G) -> ModelResult<ParameterCatalog> {
    let mut entries = Vec::new();
    for index in 0..gas.n_reactions() {
        entries.extend(reaction_parameters(index, &gas.reaction(index)?));
    }
    Ok(ParameterCatalog { entries })
}

/// Build the filtered catalog from a freshly loaded, scratch copy of the
/// mechanism at `path`.
pub fn build_catalog<L: MechanismLoader>(
    loader: &L,
    path: &Path,
    filter: CatalogFilter,
) -> ModelResult<ParameterCatalog> {
    let scratch = loader.load(path)?;
    let catalog = full_catalog(&scratch)?.filtered(filter);
    tracing::debug!(
        mechanism = %path.display(),
        parameters = catalog.len(),
        "built parameter catalog"
    );
    Ok(catalog)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ks_kinetics::{Arrhenius, FalloffRate, ThirdBody};

    fn falloff(ea_high: f64, ea_low: f64) -> Reaction {
        Reaction::falloff(
            "H + CH3 (+M) <=> CH4 (+M)",
            FalloffRate {
                high: Arrhenius::new(1.39e16, -0.534, ea_high),
                low: Arrhenius::new(2.62e33, -4.76, ea_low),
                troe: None,
            },
            ThirdBody {
                efficiencies: vec![("H2".into(), 2.0), ("N2".into(), 0.0), ("AR".into(), 0.7)],
                default_efficiency: 1.0,
            },
        )
    }

    fn kinds(params: &[ParameterDescriptor]) -> Vec<ParameterKind> {
        params.iter().map(|p| p.kind).collect()
    }

    #[test]
    fn elementary_with_energy() {
        let rxn = Reaction::elementary("O + H2 <=> H + OH", Arrhenius::new(3.87e4, 2.7, 2.6e7));
        let params = reaction_parameters(3, &rxn);
        assert_eq!(kinds(&params), [ParameterKind::AFactor, ParameterKind::Energy]);
        assert_eq!(params[0].reaction, 3);
        assert_eq!(params[0].name, "O + H2 <=> H + OH:A");
        assert_eq!(params[1].name, "O + H2 <=> H + OH:E");
    }

    #[test]
    fn near_zero_energy_is_skipped() {
        let rxn = Reaction::elementary("CH3 + O <=> CH2O + H", Arrhenius::new(5.06e13, 0.0, 0.05));
        assert_eq!(kinds(&reaction_parameters(0, &rxn)), [ParameterKind::AFactor]);
    }

    #[test]
    fn falloff_enumerates_both_limits_and_positive_efficiencies() {
        let params = reaction_parameters(5, &falloff(2.24e6, 1.02e7));
        use ParameterKind::*;
        assert_eq!(
            kinds(&params),
            [HighPressureA, HighPressureE, LowPressureA, LowPressureE, Efficiency, Efficiency]
        );
        assert_eq!(params[4].species.as_deref(), Some("H2"));
        assert_eq!(params[5].name, "H + CH3 (+M) <=> CH4 (+M):Eff:AR");
    }

    #[test]
    fn falloff_with_zero_high_energy() {
        let params = reaction_parameters(0, &falloff(0.0, 1.0e6));
        use ParameterKind::*;
        assert_eq!(&kinds(&params)[..3], [HighPressureA, LowPressureA, LowPressureE]);
    }

    #[test]
    fn three_body_keeps_single_limit() {
        let rxn = Reaction::three_body(
            "2 O + M <=> O2 + M",
            Arrhenius::new(1.2e17, -1.0, 0.0),
            ThirdBody {
                efficiencies: vec![("H2".into(), 2.4)],
                default_efficiency: 1.0,
            },
        );
        use ParameterKind::*;
        assert_eq!(kinds(&reaction_parameters(0, &rxn)), [AFactor, Efficiency]);
    }

    #[test]
    fn ids_group_by_reaction() {
        let rxn = Reaction::elementary("O + H2 <=> H + OH", Arrhenius::new(3.87e4, 2.7, 2.6e7));
        let mut entries = reaction_parameters(0, &rxn);
        entries.extend(reaction_parameters(1, &falloff(2.24e6, 1.02e7)));
        let catalog = ParameterCatalog::from_entries(entries);
        assert_eq!(catalog.ids_for_reaction(0), [0, 1]);
        assert_eq!(catalog.ids_for_reaction(1), [2, 3, 4, 5, 6, 7]);
        assert!(catalog.ids_for_reaction(2).is_empty());
    }

    #[test]
    fn filter_flags() {
        use ParameterKind::*;
        let all = [AFactor, Energy, HighPressureA, HighPressureE, LowPressureA, LowPressureE, Efficiency];
        let keep = |f: CatalogFilter| all.iter().copied().filter(|k| f.admits(*k)).collect::<Vec<_>>();

        assert_eq!(keep(CatalogFilter::ALL), all);
        assert_eq!(keep(CatalogFilter::default()), [AFactor, HighPressureA]);
        assert_eq!(
            keep(CatalogFilter { no_efficiencies: true, ..CatalogFilter::ALL }),
            [AFactor, Energy, HighPressureA, HighPressureE, LowPressureA, LowPressureE]
        );
        assert_eq!(
            keep(CatalogFilter { no_energy: true, ..CatalogFilter::ALL }),
            [AFactor, HighPressureA, LowPressureA, Efficiency]
        );
        assert_eq!(
            keep(CatalogFilter { no_falloff: true, ..CatalogFilter::ALL }),
            [AFactor, Energy, HighPressureA, Efficiency]
        );
    }

    #[test]
    fn catalog_lookup_out_of_range() {
        let catalog = ParameterCatalog::from_entries(reaction_parameters(0, &falloff(1.0, 1.0)));
        assert!(catalog.get(0).is_ok());
        assert!(matches!(
            catalog.get(99),
            Err(ModelError::InvalidParameterId { id: 99, .. })
        ));
    }
}
