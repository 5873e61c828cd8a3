//! Initial thermodynamic state of a model.

use crate::error::ModelResult;
use ks_core::numeric::ensure_positive;
use ks_core::units::{Pressure, Temperature, atm, k, to_kelvin, to_pascal};
use ks_kinetics::{Composition, Kinetics};
use serde::Serialize;

/// Unburned-gas temperature, pressure and composition.
///
/// Pressure is given in atmospheres and stored in SI.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InitialState {
    temperature: Temperature,
    pressure: Pressure,
    composition: Composition,
}

impl InitialState {
    pub fn new(temperature_k: f64, pressure_atm: f64, composition: Composition) -> ModelResult<Self> {
        let t = ensure_positive(temperature_k, "temperature")?;
        let p = ensure_positive(pressure_atm, "pressure")?;
        Ok(Self {
            temperature: k(t),
            pressure: atm(p),
            composition,
        })
    }

    pub fn temperature(&self) -> Temperature {
        self.temperature
    }

    pub fn pressure(&self) -> Pressure {
        self.pressure
    }

    pub fn temperature_k(&self) -> f64 {
        to_kelvin(self.temperature)
    }

    pub fn pressure_pa(&self) -> f64 {
        to_pascal(self.pressure)
    }

    pub fn composition(&self) -> &Composition {
        &self.composition
    }

    /// Push this state onto a mechanism.
    pub fn apply<G: Kinetics + ?Sized>(&self, gas: &mut G) -> ModelResult<()> {
        gas.set_state(self.temperature, self.pressure, &self.composition)?;
        Ok(())
    }
}
