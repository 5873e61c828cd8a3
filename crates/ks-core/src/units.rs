// ks-core/src/units.rs

use uom::si::f64::{
    Pressure as UomPressure, ThermodynamicTemperature as UomThermodynamicTemperature, Velocity as UomVelocity,
};

// Public canonical unit types (SI, f64)
pub type Pressure = UomPressure;
pub type Temperature = UomThermodynamicTemperature;
pub type Velocity = UomVelocity;

#[inline]
pub fn pa(v: f64) -> Pressure {
    use uom::si::pressure::pascal;
    Pressure::new::<pascal>(v)
}

#[inline]
pub fn atm(v: f64) -> Pressure {
    use uom::si::pressure::atmosphere;
    Pressure::new::<atmosphere>(v)
}

#[inline]
pub fn k(v: f64) -> Temperature {
    use uom::si::thermodynamic_temperature::kelvin;
    Temperature::new::<kelvin>(v)
}

#[inline]
pub fn mps(v: f64) -> Velocity {
    use uom::si::velocity::meter_per_second;
    Velocity::new::<meter_per_second>(v)
}

#[inline]
pub fn to_kelvin(t: Temperature) -> f64 {
    use uom::si::thermodynamic_temperature::kelvin;
    t.get::<kelvin>()
}

#[inline]
pub fn to_pascal(p: Pressure) -> f64 {
    use uom::si::pressure::pascal;
    p.get::<pascal>()
}

#[inline]
pub fn to_atm(p: Pressure) -> f64 {
    use uom::si::pressure::atmosphere;
    p.get::<atmosphere>()
}

#[inline]
pub fn to_mps(v: Velocity) -> f64 {
    use uom::si::velocity::meter_per_second;
    v.get::<meter_per_second>()
}

/// Flame speeds are reported in cm/s.
#[inline]
pub fn to_cm_per_s(v: Velocity) -> f64 {
    to_mps(v) / 1.0e-2
}

pub mod constants {
    /// Universal gas constant [J/(kmol·K)].
    pub const GAS_CONSTANT: f64 = 8_314.462_618;

    /// One standard atmosphere [Pa].
    pub const ONE_ATM_PA: f64 = 101_325.0;

    /// Thermochemical calorie [J].
    pub const JOULES_PER_CALORIE: f64 = 4.184;
}
