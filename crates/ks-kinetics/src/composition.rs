//! Gas composition by species name.

use crate::error::{KineticsError, KineticsResult};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Mixture composition defined by normalized mole fractions.
///
/// Species order follows the order of declaration; fractions always sum to 1.
#[derive(Debug, Clone, PartialEq)]
pub struct Composition {
    items: Vec<(String, f64)>,
}

impl Composition {
    /// Create a composition from (possibly unnormalized) mole numbers.
    pub fn new_mole_fractions<S: Into<String>>(fractions: Vec<(S, f64)>) -> KineticsResult<Self> {
        if fractions.is_empty() {
            return Err(KineticsError::InvalidComposition {
                reason: "empty composition".into(),
            });
        }

        let mut items: Vec<(String, f64)> = Vec::with_capacity(fractions.len());
        let mut sum = 0.0;
        for (name, frac) in fractions {
            let name = name.into();
            if !frac.is_finite() || frac < 0.0 {
                return Err(KineticsError::InvalidComposition {
                    reason: format!("mole fraction of {name} must be finite and non-negative"),
                });
            }
            sum += frac;
            match items.iter_mut().find(|(existing, _)| *existing == name) {
                Some((_, f)) => *f += frac,
                None => items.push((name, frac)),
            }
        }

        if sum <= 0.0 || !sum.is_finite() {
            return Err(KineticsError::InvalidComposition {
                reason: "mole fractions sum to zero or non-finite".into(),
            });
        }

        let items = items
            .into_iter()
            .map(|(s, f)| (s, f / sum))
            .filter(|(_, f)| *f > 1e-15)
            .collect();
        Ok(Self { items })
    }

    /// Parse the `"CH4:1, O2:2, N2:7.52"` encoding.
    pub fn parse(text: &str) -> KineticsResult<Self> {
        let mut pairs = Vec::new();
        for entry in text.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let (name, value) = entry.split_once(':').ok_or_else(|| {
                KineticsError::InvalidComposition {
                    reason: format!("expected 'species:amount', found '{entry}'"),
                }
            })?;
            let value: f64 = value.trim().parse().map_err(|_| KineticsError::InvalidComposition {
                reason: format!("amount for '{}' is not a number", name.trim()),
            })?;
            pairs.push((name.trim().to_string(), value));
        }
        Self::new_mole_fractions(pairs)
    }

    /// Mole fraction of a species (0.0 if absent).
    pub fn mole_fraction(&self, species: &str) -> f64 {
        self.items
            .iter()
            .find(|(s, _)| s == species)
            .map(|(_, f)| *f)
            .unwrap_or(0.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        self.items.iter().map(|(s, f)| (s.as_str(), *f))
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl FromStr for Composition {
    type Err = KineticsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Composition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (name, frac)) in self.items.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{name}:{frac:.6}")?;
        }
        Ok(())
    }
}

impl Serialize for Composition {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CompositionInput {
    Text(String),
    Fractions(BTreeMap<String, f64>),
}

impl<'de> Deserialize<'de> for Composition {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let parsed = match CompositionInput::deserialize(deserializer)? {
            CompositionInput::Text(text) => Composition::parse(&text),
            CompositionInput::Fractions(map) => Composition::new_mole_fractions(map.into_iter().collect()),
        };
        parsed.map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ks_core::numeric::{Tolerances, nearly_equal};

    const TOL: Tolerances = Tolerances {
        abs: 1e-12,
        rel: 1e-10,
    };

    #[test]
    fn parse_methane_air() {
        let comp = Composition::parse("CH4:1, O2:2, N2:7.52").unwrap();
        assert_eq!(comp.len(), 3);
        assert!(nearly_equal(comp.mole_fraction("CH4"), 1.0 / 10.52, TOL));
        assert!(nearly_equal(comp.mole_fraction("N2"), 7.52 / 10.52, TOL));
        assert_eq!(comp.mole_fraction("AR"), 0.0);
    }

    #[test]
    fn parse_rejects_malformed_entries() {
        assert!(Composition::parse("CH4").is_err());
        assert!(Composition::parse("CH4:abc").is_err());
        assert!(Composition::parse("").is_err());
        assert!(Composition::parse("CH4:-1, O2:2").is_err());
    }

    #[test]
    fn duplicate_species_accumulate() {
        let comp = Composition::parse("O2:1, N2:2, O2:1").unwrap();
        assert_eq!(comp.len(), 2);
        assert!(nearly_equal(comp.mole_fraction("O2"), 0.5, TOL));
    }

    #[test]
    fn display_round_trips_through_parse() {
        let comp = Composition::parse("H2:2, O2:1").unwrap();
        let again = Composition::parse(&comp.to_string()).unwrap();
        assert!(nearly_equal(again.mole_fraction("H2"), comp.mole_fraction("H2"), Tolerances {
            abs: 1e-6,
            rel: 1e-6
        }));
    }

    #[test]
    fn deserializes_from_string_or_map() {
        let from_text: Composition = serde_yaml::from_str("\"CH4:1, O2:2\"").unwrap();
        let from_map: Composition = serde_yaml::from_str("{CH4: 1.0, O2: 2.0}").unwrap();
        assert!(nearly_equal(from_text.mole_fraction("O2"), from_map.mole_fraction("O2"), TOL));
    }
}
