//! Reaction records and their rate-law classification.

use crate::error::{KineticsError, KineticsResult};
use crate::rate::{Arrhenius, FalloffRate};
use serde::{Deserialize, Serialize};

/// Reaction classes, carrying the numeric type codes used by Cantera-style engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReactionType {
    Elementary,
    ThreeBody,
    Falloff,
    ChemicallyActivated,
}

impl ReactionType {
    /// Engine reaction-type code.
    pub fn code(self) -> u32 {
        match self {
            ReactionType::Elementary => 1,
            ReactionType::ThreeBody => 2,
            ReactionType::Falloff => 4,
            ReactionType::ChemicallyActivated => 8,
        }
    }

    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            1 => Some(ReactionType::Elementary),
            2 => Some(ReactionType::ThreeBody),
            4 => Some(ReactionType::Falloff),
            8 => Some(ReactionType::ChemicallyActivated),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ReactionType::Elementary => "elementary",
            ReactionType::ThreeBody => "three-body",
            ReactionType::Falloff => "falloff",
            ReactionType::ChemicallyActivated => "chemically-activated",
        }
    }
}

/// Rate law of a single reaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RateLaw {
    Elementary(Arrhenius),
    ThreeBody(Arrhenius),
    Falloff(FalloffRate),
    ChemicallyActivated(FalloffRate),
}

/// Collision efficiencies for third-body-mediated reactions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThirdBody {
    /// Species-specific efficiencies in declaration order.
    pub efficiencies: Vec<(String, f64)>,
    /// Efficiency of every species not listed.
    pub default_efficiency: f64,
}

impl Default for ThirdBody {
    fn default() -> Self {
        Self {
            efficiencies: Vec::new(),
            default_efficiency: 1.0,
        }
    }
}

impl ThirdBody {
    pub fn efficiency(&self, species: &str) -> f64 {
        self.efficiencies
            .iter()
            .find(|(name, _)| name == species)
            .map(|(_, eff)| *eff)
            .unwrap_or(self.default_efficiency)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reaction {
    pub equation: String,
    pub rate: RateLaw,
    pub third_body: Option<ThirdBody>,
}

impl Reaction {
    pub fn elementary(equation: impl Into<String>, rate: Arrhenius) -> Self {
        Self {
            equation: equation.into(),
            rate: RateLaw::Elementary(rate),
            third_body: None,
        }
    }

    pub fn three_body(equation: impl Into<String>, rate: Arrhenius, third_body: ThirdBody) -> Self {
        Self {
            equation: equation.into(),
            rate: RateLaw::ThreeBody(rate),
            third_body: Some(third_body),
        }
    }

    pub fn falloff(equation: impl Into<String>, rate: FalloffRate, third_body: ThirdBody) -> Self {
        Self {
            equation: equation.into(),
            rate: RateLaw::Falloff(rate),
            third_body: Some(third_body),
        }
    }

    pub fn reaction_type(&self) -> ReactionType {
        match self.rate {
            RateLaw::Elementary(_) => ReactionType::Elementary,
            RateLaw::ThreeBody(_) => ReactionType::ThreeBody,
            RateLaw::Falloff(_) => ReactionType::Falloff,
            RateLaw::ChemicallyActivated(_) => ReactionType::ChemicallyActivated,
        }
    }

    /// Whether the rate has separate high- and low-pressure limits.
    pub fn has_falloff(&self) -> bool {
        matches!(self.rate, RateLaw::Falloff(_) | RateLaw::ChemicallyActivated(_))
    }

    /// Single-limit rate constant (elementary and three-body reactions).
    pub fn rate(&self) -> Option<&Arrhenius> {
        match &self.rate {
            RateLaw::Elementary(k) | RateLaw::ThreeBody(k) => Some(k),
            _ => None,
        }
    }

    pub fn set_rate(&mut self, rate: Arrhenius) -> KineticsResult<()> {
        match &mut self.rate {
            RateLaw::Elementary(k) | RateLaw::ThreeBody(k) => {
                *k = rate;
                Ok(())
            }
            _ => Err(self.limit_mismatch("single-limit rate")),
        }
    }

    pub fn falloff_rate(&self) -> Option<&FalloffRate> {
        match &self.rate {
            RateLaw::Falloff(f) | RateLaw::ChemicallyActivated(f) => Some(f),
            _ => None,
        }
    }

    pub fn high_rate(&self) -> Option<&Arrhenius> {
        self.falloff_rate().map(|f| &f.high)
    }

    pub fn low_rate(&self) -> Option<&Arrhenius> {
        self.falloff_rate().map(|f| &f.low)
    }

    pub fn set_high_rate(&mut self, rate: Arrhenius) -> KineticsResult<()> {
        match &mut self.rate {
            RateLaw::Falloff(f) | RateLaw::ChemicallyActivated(f) => {
                f.high = rate;
                Ok(())
            }
            _ => Err(self.limit_mismatch("high-pressure rate")),
        }
    }

    pub fn set_low_rate(&mut self, rate: Arrhenius) -> KineticsResult<()> {
        match &mut self.rate {
            RateLaw::Falloff(f) | RateLaw::ChemicallyActivated(f) => {
                f.low = rate;
                Ok(())
            }
            _ => Err(self.limit_mismatch("low-pressure rate")),
        }
    }

    /// Declared third-body efficiencies (empty when the reaction has no third body).
    pub fn efficiencies(&self) -> &[(String, f64)] {
        self.third_body
            .as_ref()
            .map(|tb| tb.efficiencies.as_slice())
            .unwrap_or(&[])
    }

    pub fn efficiency(&self, species: &str) -> Option<f64> {
        self.third_body.as_ref().map(|tb| tb.efficiency(species))
    }

    /// Set the efficiency of `species`, appending it when not yet declared.
    pub fn set_efficiency(&mut self, species: &str, value: f64) -> KineticsResult<()> {
        let equation = self.equation.clone();
        let tb = self
            .third_body
            .as_mut()
            .ok_or_else(|| KineticsError::InvalidMechanism {
                reason: format!("reaction '{equation}' has no third-body efficiencies"),
            })?;
        match tb.efficiencies.iter_mut().find(|(name, _)| name == species) {
            Some((_, eff)) => *eff = value,
            None => tb.efficiencies.push((species.to_string(), value)),
        }
        Ok(())
    }

    fn limit_mismatch(&self, what: &str) -> KineticsError {
        KineticsError::InvalidMechanism {
            reason: format!(
                "{} reaction '{}' has no {}",
                self.reaction_type().as_str(),
                self.equation,
                what
            ),
        }
    }
}
