//! Rate-law coefficients: modified Arrhenius expressions and falloff blending.

use ks_core::units::constants::GAS_CONSTANT;
use serde::{Deserialize, Serialize};

/// Modified Arrhenius rate constant `k = A T^b exp(-Ea / (R T))`.
///
/// The activation energy is held in J/kmol regardless of the units the
/// mechanism file declares.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Arrhenius {
    pub pre_exponential_factor: f64,
    pub temperature_exponent: f64,
    pub activation_energy: f64,
}

impl Arrhenius {
    pub fn new(pre_exponential_factor: f64, temperature_exponent: f64, activation_energy: f64) -> Self {
        Self {
            pre_exponential_factor,
            temperature_exponent,
            activation_energy,
        }
    }

    /// Evaluate the rate constant at temperature `t` [K].
    pub fn eval(&self, t: f64) -> f64 {
        self.pre_exponential_factor
            * t.powf(self.temperature_exponent)
            * (-self.activation_energy / (GAS_CONSTANT * t)).exp()
    }

    /// Copy with a new pre-exponential factor; exponent and energy unchanged.
    pub fn with_pre_exponential_factor(self, a: f64) -> Self {
        Self {
            pre_exponential_factor: a,
            ..self
        }
    }

    /// Copy with a new activation energy; factor and exponent unchanged.
    pub fn with_activation_energy(self, ea: f64) -> Self {
        Self {
            activation_energy: ea,
            ..self
        }
    }
}

/// Troe falloff broadening parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Troe {
    pub a: f64,
    pub t3: f64,
    pub t1: f64,
    pub t2: Option<f64>,
}

impl Troe {
    /// Broadening factor `F` for reduced pressure `pr` at temperature `t`.
    pub fn broadening(&self, t: f64, pr: f64) -> f64 {
        let mut f_cent = (1.0 - self.a) * (-t / self.t3).exp() + self.a * (-t / self.t1).exp();
        if let Some(t2) = self.t2 {
            f_cent += (-t2 / t).exp();
        }
        let log_fcent = f_cent.max(f64::MIN_POSITIVE).log10();
        let c = -0.4 - 0.67 * log_fcent;
        let n = 0.75 - 1.27 * log_fcent;
        let log_pr = pr.max(f64::MIN_POSITIVE).log10();
        let f1 = (log_pr + c) / (n - 0.14 * (log_pr + c));
        10f64.powf(log_fcent / (1.0 + f1 * f1))
    }
}

/// High/low-pressure limits of a pressure-dependent reaction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FalloffRate {
    pub high: Arrhenius,
    pub low: Arrhenius,
    pub troe: Option<Troe>,
}

impl FalloffRate {
    fn broadening(&self, t: f64, pr: f64) -> f64 {
        self.troe.map_or(1.0, |troe| troe.broadening(t, pr))
    }

    /// Falloff rate constant (Lindemann form with optional Troe broadening).
    pub fn falloff(&self, t: f64, third_body_concentration: f64) -> f64 {
        let k_inf = self.high.eval(t);
        let pr = reduced_pressure(self.low.eval(t), k_inf, third_body_concentration);
        k_inf * (pr / (1.0 + pr)) * self.broadening(t, pr)
    }

    /// Chemically activated rate constant, which tends to the low-pressure
    /// limit as pressure drops.
    pub fn chemically_activated(&self, t: f64, third_body_concentration: f64) -> f64 {
        let k_inf = self.high.eval(t);
        let k0 = self.low.eval(t);
        let pr = reduced_pressure(k0, k_inf, third_body_concentration);
        k0 * (1.0 / (1.0 + pr)) * self.broadening(t, pr)
    }
}

fn reduced_pressure(k0: f64, k_inf: f64, third_body_concentration: f64) -> f64 {
    if k_inf > 0.0 {
        k0 * third_body_concentration / k_inf
    } else {
        0.0
    }
}
