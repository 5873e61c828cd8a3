//! Mechanism definition documents.
//!
//! Mechanisms are written in a Cantera-flavoured YAML layout:
//!
//! ```yaml
//! units: {activation-energy: cal/mol}
//! species:
//! - name: CH4
//!   composition: {C: 1, H: 4}
//! reactions:
//! - equation: H + O2 <=> O + OH
//!   rate-constant: {A: 2.65e16, b: -0.671, Ea: 17041}
//! - equation: H + O2 (+M) <=> HO2 (+M)
//!   type: falloff
//!   high-P-rate-constant: {A: 4.65e12, b: 0.44, Ea: 0}
//!   low-P-rate-constant: {A: 6.37e20, b: -1.72, Ea: 525}
//!   Troe: {A: 0.5, T3: 1.0e-30, T1: 1.0e30}
//!   efficiencies: {H2O: 14.0, AR: 0.67}
//! ```
//!
//! Reactions without an explicit `type` are classified from the equation:
//! `(+M)` marks falloff, a bare `M` collider marks a three-body reaction.
//! Activation energies are converted to J/kmol on load; pre-exponential
//! factors are kept in the units of the file.

use crate::error::{KineticsError, KineticsResult};
use crate::rate::{Arrhenius, FalloffRate, Troe};
use crate::reaction::{RateLaw, Reaction, ThirdBody};
use ks_core::units::constants::{GAS_CONSTANT, JOULES_PER_CALORIE};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Activation-energy units accepted in mechanism files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum EnergyUnit {
    #[default]
    #[serde(rename = "cal/mol")]
    CalPerMol,
    #[serde(rename = "kcal/mol")]
    KcalPerMol,
    #[serde(rename = "J/mol")]
    JPerMol,
    #[serde(rename = "kJ/mol")]
    KjPerMol,
    #[serde(rename = "J/kmol")]
    JPerKmol,
    #[serde(rename = "K")]
    Kelvin,
}

impl EnergyUnit {
    /// Multiplier converting this unit to J/kmol.
    pub fn to_j_per_kmol(self) -> f64 {
        match self {
            EnergyUnit::CalPerMol => JOULES_PER_CALORIE * 1.0e3,
            EnergyUnit::KcalPerMol => JOULES_PER_CALORIE * 1.0e6,
            EnergyUnit::JPerMol => 1.0e3,
            EnergyUnit::KjPerMol => 1.0e6,
            EnergyUnit::JPerKmol => 1.0,
            EnergyUnit::Kelvin => GAS_CONSTANT,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct UnitsDoc {
    #[serde(default, rename = "activation-energy")]
    activation_energy: EnergyUnit,
}

#[derive(Debug, Deserialize)]
struct SpeciesDoc {
    name: String,
    #[serde(default)]
    composition: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
struct RateDoc {
    #[serde(rename = "A")]
    a: f64,
    #[serde(default)]
    b: f64,
    #[serde(default, rename = "Ea")]
    ea: f64,
}

#[derive(Debug, Clone, Copy, Deserialize)]
struct TroeDoc {
    #[serde(rename = "A")]
    a: f64,
    #[serde(rename = "T3")]
    t3: f64,
    #[serde(rename = "T1")]
    t1: f64,
    #[serde(default, rename = "T2")]
    t2: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct ReactionDoc {
    equation: String,
    #[serde(default, rename = "type")]
    kind: Option<String>,
    #[serde(default, rename = "rate-constant")]
    rate_constant: Option<RateDoc>,
    #[serde(default, rename = "high-P-rate-constant")]
    high_rate: Option<RateDoc>,
    #[serde(default, rename = "low-P-rate-constant")]
    low_rate: Option<RateDoc>,
    #[serde(default, rename = "Troe")]
    troe: Option<TroeDoc>,
    // Mapping keeps the declaration order of the efficiencies.
    #[serde(default)]
    efficiencies: Option<serde_yaml::Mapping>,
    #[serde(default, rename = "default-efficiency")]
    default_efficiency: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct MechanismDoc {
    #[serde(default)]
    units: UnitsDoc,
    #[serde(default)]
    species: Vec<SpeciesDoc>,
    #[serde(default)]
    reactions: Vec<ReactionDoc>,
}

/// A species and its elemental make-up.
#[derive(Debug, Clone, PartialEq)]
pub struct SpeciesDefinition {
    pub name: String,
    pub composition: BTreeMap<String, f64>,
}

impl SpeciesDefinition {
    pub fn atoms(&self, element: &str) -> f64 {
        self.composition.get(element).copied().unwrap_or(0.0)
    }
}

/// Parsed mechanism: species list and reactions in declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct MechanismDefinition {
    pub species: Vec<SpeciesDefinition>,
    pub reactions: Vec<Reaction>,
}

impl MechanismDefinition {
    pub fn from_path(path: &Path) -> KineticsResult<Self> {
        let text = fs::read_to_string(path).map_err(|source| KineticsError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml_str(&text)
    }

    pub fn from_yaml_str(text: &str) -> KineticsResult<Self> {
        let doc: MechanismDoc = serde_yaml::from_str(text)?;
        let energy_scale = doc.units.activation_energy.to_j_per_kmol();

        let species: Vec<SpeciesDefinition> = doc
            .species
            .into_iter()
            .map(|s| SpeciesDefinition {
                name: s.name,
                composition: s.composition,
            })
            .collect();

        let reactions = doc
            .reactions
            .into_iter()
            .map(|r| build_reaction(r, energy_scale))
            .collect::<KineticsResult<Vec<_>>>()?;

        let mechanism = Self { species, reactions };
        mechanism.validate()?;
        Ok(mechanism)
    }

    pub fn species_index(&self, name: &str) -> Option<usize> {
        self.species.iter().position(|s| s.name == name)
    }

    fn validate(&self) -> KineticsResult<()> {
        if !self.species.is_empty() {
            for reaction in &self.reactions {
                for (name, _) in reaction.efficiencies() {
                    if self.species_index(name).is_none() {
                        return Err(KineticsError::InvalidMechanism {
                            reason: format!(
                                "reaction '{}' lists efficiency for undeclared species {name}",
                                reaction.equation
                            ),
                        });
                    }
                }
            }
        }
        Ok(())
    }
}

fn arrhenius(doc: RateDoc, energy_scale: f64) -> Arrhenius {
    Arrhenius::new(doc.a, doc.b, doc.ea * energy_scale)
}

fn classify(doc: &ReactionDoc) -> KineticsResult<&'static str> {
    if let Some(kind) = doc.kind.as_deref() {
        return match kind {
            "elementary" | "reaction" => Ok("elementary"),
            "three-body" => Ok("three-body"),
            "falloff" => Ok("falloff"),
            "chemically-activated" => Ok("chemically-activated"),
            other => Err(KineticsError::InvalidMechanism {
                reason: format!("unsupported reaction type '{other}' in '{}'", doc.equation),
            }),
        };
    }
    let compact: String = doc.equation.chars().filter(|c| !c.is_whitespace()).collect();
    if compact.contains("(+") {
        return Ok("falloff");
    }
    let has_collider = doc
        .equation
        .split(|c: char| c.is_whitespace() || c == '+')
        .any(|token| token == "M");
    Ok(if has_collider { "three-body" } else { "elementary" })
}

fn third_body(doc: &ReactionDoc) -> KineticsResult<ThirdBody> {
    let mut efficiencies = Vec::new();
    if let Some(map) = &doc.efficiencies {
        for (key, value) in map {
            let name = key.as_str().ok_or_else(|| KineticsError::InvalidMechanism {
                reason: format!("non-string efficiency key in '{}'", doc.equation),
            })?;
            let eff = value.as_f64().ok_or_else(|| KineticsError::InvalidMechanism {
                reason: format!("efficiency for {name} in '{}' is not a number", doc.equation),
            })?;
            efficiencies.push((name.to_string(), eff));
        }
    }
    Ok(ThirdBody {
        efficiencies,
        default_efficiency: doc.default_efficiency.unwrap_or(1.0),
    })
}

fn build_reaction(doc: ReactionDoc, energy_scale: f64) -> KineticsResult<Reaction> {
    let missing = |what: &str| KineticsError::InvalidMechanism {
        reason: format!("reaction '{}' is missing {what}", doc.equation),
    };
    let rate = match classify(&doc)? {
        "elementary" => RateLaw::Elementary(arrhenius(
            doc.rate_constant.ok_or_else(|| missing("rate-constant"))?,
            energy_scale,
        )),
        "three-body" => RateLaw::ThreeBody(arrhenius(
            doc.rate_constant.ok_or_else(|| missing("rate-constant"))?,
            energy_scale,
        )),
        kind => {
            let falloff = FalloffRate {
                high: arrhenius(
                    doc.high_rate.ok_or_else(|| missing("high-P-rate-constant"))?,
                    energy_scale,
                ),
                low: arrhenius(
                    doc.low_rate.ok_or_else(|| missing("low-P-rate-constant"))?,
                    energy_scale,
                ),
                troe: doc.troe.map(|t| Troe {
                    a: t.a,
                    t3: t.t3,
                    t1: t.t1,
                    t2: t.t2,
                }),
            };
            if kind == "falloff" {
                RateLaw::Falloff(falloff)
            } else {
                RateLaw::ChemicallyActivated(falloff)
            }
        }
    };
    let third_body = match rate {
        RateLaw::Elementary(_) => None,
        _ => Some(third_body(&doc)?),
    };
    Ok(Reaction {
        equation: doc.equation,
        rate,
        third_body,
    })
}
