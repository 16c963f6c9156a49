// sq-core/src/units.rs

use uom::si::f64::{
    Energy as UomEnergy, Length as UomLength, Ratio as UomRatio,
    ThermodynamicTemperature as UomThermodynamicTemperature, Time as UomTime,
    Velocity as UomVelocity,
};

// Public canonical unit types (SI, f64)
pub type Energy = UomEnergy;
pub type Length = UomLength;
pub type Ratio = UomRatio;
pub type Temperature = UomThermodynamicTemperature;
pub type Time = UomTime;
pub type Velocity = UomVelocity;

#[inline]
pub fn k(v: f64) -> Temperature {
    use uom::si::thermodynamic_temperature::kelvin;
    Temperature::new::<kelvin>(v)
}

#[inline]
pub fn m(v: f64) -> Length {
    use uom::si::length::meter;
    Length::new::<meter>(v)
}

#[inline]
pub fn s(v: f64) -> Time {
    use uom::si::time::second;
    Time::new::<second>(v)
}

#[inline]
pub fn mps(v: f64) -> Velocity {
    use uom::si::velocity::meter_per_second;
    Velocity::new::<meter_per_second>(v)
}

#[inline]
pub fn joule(v: f64) -> Energy {
    use uom::si::energy::joule;
    Energy::new::<joule>(v)
}

#[inline]
pub fn ev(v: f64) -> Energy {
    use uom::si::energy::electronvolt;
    Energy::new::<electronvolt>(v)
}

#[inline]
pub fn unitless(v: f64) -> Ratio {
    use uom::si::ratio::ratio;
    Ratio::new::<ratio>(v)
}

/// Raw SI magnitudes used by the numeric kernels.
#[inline]
pub fn kelvin_of(t: Temperature) -> f64 {
    use uom::si::thermodynamic_temperature::kelvin;
    t.get::<kelvin>()
}

#[inline]
pub fn meters_of(l: Length) -> f64 {
    use uom::si::length::meter;
    l.get::<meter>()
}

#[inline]
pub fn seconds_of(t: Time) -> f64 {
    use uom::si::time::second;
    t.get::<second>()
}

#[inline]
pub fn mps_of(v: Velocity) -> f64 {
    use uom::si::velocity::meter_per_second;
    v.get::<meter_per_second>()
}

#[inline]
pub fn joules_of(e: Energy) -> f64 {
    use uom::si::energy::joule;
    e.get::<joule>()
}

pub mod constants {
    use super::*;

    /// Boltzmann constant, J/K.
    pub const BOLTZMANN: f64 = 1.380_649e-23;
    /// Elementary charge, C.
    pub const ELECTRON_CHARGE: f64 = 1.602_176_634e-19;
    /// Free electron mass, kg.
    pub const ELECTRON_MASS: f64 = 9.109_383_7015e-31;
    /// Reduced Planck constant, J s.
    pub const HBAR: f64 = 1.054_571_817e-34;

    #[inline]
    pub fn ev_to_joule(v: f64) -> f64 {
        v * ELECTRON_CHARGE
    }

    #[inline]
    pub fn joule_to_ev(v: f64) -> f64 {
        v / ELECTRON_CHARGE
    }

    #[inline]
    pub fn thermal_energy(t: Temperature) -> Energy {
        joule(BOLTZMANN * kelvin_of(t))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors_smoke() {
        let _t = k(300.0);
        let _l = m(1e-7);
        let _dt = s(5e-15);
        let _v = mps(6000.0);
        let _e = joule(1e-21);
        let _r = unitless(0.5);
    }

    #[test]
    fn electronvolt_matches_charge_constant() {
        let e = joules_of(ev(6.0));
        let expected = constants::ev_to_joule(6.0);
        assert!((e - expected).abs() <= 1e-12 * expected);
    }

    #[test]
    fn thermal_energy_at_300k() {
        let kt = joules_of(constants::thermal_energy(k(300.0)));
        assert!((kt - 4.141_947e-21).abs() < 1e-26);
    }
}
