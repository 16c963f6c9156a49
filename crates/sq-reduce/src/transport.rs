//! Linear-response transport coefficients of one block at one sample.
//!
//! Electron kernels use adjacent-mode finite differences of the occupation:
//! `K_n = sum dos * v^2 * tau / 3 * (p_i - p_{i+1}) / dE * (E_mid - mu)^n`
//! with every factor evaluated at the pair midpoint.

use sq_core::units::constants::{BOLTZMANN, ELECTRON_CHARGE, ELECTRON_MASS};
use sq_modes::{Mode, Species};

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ElectronKernels {
    pub k0: f64,
    pub k1: f64,
    pub k2: f64,
}

pub fn electron_kernels(modes: &[Mode], ys: &[f64], mu_j: f64, effective_mass: f64) -> ElectronKernels {
    let mut k = ElectronKernels::default();
    let mass = effective_mass * ELECTRON_MASS;
    for i in 0..modes.len().saturating_sub(1) {
        let (a, b) = (&modes[i], &modes[i + 1]);
        let de = b.energy_j - a.energy_j;
        if de == 0.0 || !de.is_finite() {
            continue;
        }
        let e_mid = 0.5 * (a.energy_j + b.energy_j);
        let dos = 0.5 * (a.dos_weight + b.dos_weight);
        let tau = 0.5 * (a.relaxation_time_s + b.relaxation_time_s);
        let v2 = 2.0 * e_mid.max(0.0) / mass;
        let dp = Species::Electron.occupation(ys[i]) - Species::Electron.occupation(ys[i + 1]);
        let xi = dos * v2 * tau / 3.0 * dp / de;
        let de_mu = e_mid - mu_j;
        k.k0 += xi;
        k.k1 += xi * de_mu;
        k.k2 += xi * de_mu * de_mu;
    }
    k
}

/// Electrical conductivity, Seebeck coefficient and electronic thermal
/// conductivity at temperature `t_k`.
pub fn electron_coefficients(k: ElectronKernels, t_k: f64) -> (Option<f64>, Option<f64>, Option<f64>) {
    let sigma = ELECTRON_CHARGE * ELECTRON_CHARGE * k.k0;
    if k.k0 == 0.0 || !(t_k > 0.0) {
        return (finite(sigma), None, None);
    }
    let seebeck = -k.k1 / (ELECTRON_CHARGE * t_k * k.k0);
    let kappa_e = (k.k2 - k.k1 * k.k1 / k.k0) / t_k;
    (finite(sigma), finite(seebeck), finite(kappa_e))
}

/// `sum dos * c * v_g^2 * tau / 3` with mode heat capacity
/// `c = k_B y^2 p (1 + p)`.
pub fn phonon_conductivity(modes: &[Mode], ys: &[f64], group_velocity: f64) -> Option<f64> {
    let v2 = group_velocity * group_velocity;
    let kappa: f64 = modes
        .iter()
        .zip(ys)
        .map(|(mode, &y)| {
            let c = BOLTZMANN * y * y * Species::Phonon.moment_factor(y);
            mode.dos_weight * c * v2 * mode.relaxation_time_s / 3.0
        })
        .sum();
    finite(kappa)
}

/// `ZT = sigma S^2 T / kappa`; absent when `kappa` is zero.
pub fn figure_of_merit(sigma: f64, seebeck: f64, t_k: f64, kappa: f64) -> Option<f64> {
    if kappa == 0.0 {
        return None;
    }
    finite(sigma * seebeck * seebeck * t_k / kappa)
}

fn finite(v: f64) -> Option<f64> {
    v.is_finite().then_some(v)
}
