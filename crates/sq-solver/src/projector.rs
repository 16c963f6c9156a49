//! Occupation projector.
//!
//! Fits the pooled activities `y` with the weighted least-squares model
//! `y0 = beta*E + gamma`, using weights `w_i a_i` where `w_i` is the mode's
//! `dos_weight / relaxation_time` and `a_i = -dp/dy`. Modes whose species
//! conserves only energy contribute to the energy moments alone, so the same
//! solve covers single-species transport and the joint electron-phonon
//! coupling projection.

use sq_core::units::constants::BOLTZMANN;
use sq_modes::{ModeRegistry, ProjectionBasis, Species};
use std::ops::{Add, AddAssign, Range};

use crate::error::{ProjectionScope, SolverError, SolverResult};

/// Relative size below which the 2x2 determinant is treated as cancelled
/// round-off.
const DEGENERACY_RTOL: f64 = 1e-12;

/// Weighted moment sums over a pooled mode set.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Moments {
    pub nn: f64,
    pub ne: f64,
    pub ee: f64,
    pub ns: f64,
    pub es: f64,
    /// Whether any pooled species conserves particle number.
    pub has_number: bool,
}

/// The normal equations have no unique solution.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Degenerate {
    pub determinant: f64,
}

/// Coefficients of the pseudo-equilibrium potential.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Projection {
    pub beta: f64,
    /// Present only when a number-conserving species was pooled.
    pub gamma: Option<f64>,
}

impl Moments {
    /// Add one mode with rate weight `weight`, energy `energy` and activity `y`.
    #[inline]
    pub fn push(&mut self, species: Species, weight: f64, energy: f64, y: f64) {
        let wa = weight * species.moment_factor(y);
        self.ee += wa * energy * energy;
        self.es += wa * y * energy;
        if species.basis() == ProjectionBasis::EnergyAndNumber {
            self.has_number = true;
            self.nn += wa;
            self.ne += wa * energy;
            self.ns += wa * y;
        }
    }

    pub fn solve(&self) -> Result<Projection, Degenerate> {
        if !self.has_number {
            let beta = self.es / self.ee;
            if !(self.ee > 0.0) || !beta.is_finite() {
                return Err(Degenerate {
                    determinant: self.ee,
                });
            }
            return Ok(Projection { beta, gamma: None });
        }

        let c1 = self.ee * self.nn - self.ne * self.ne;
        let c2 = self.es * self.nn - self.ne * self.ns;
        let c3 = self.es * self.ne - self.ee * self.ns;
        if !(c1 > DEGENERACY_RTOL * self.ee * self.nn) {
            return Err(Degenerate { determinant: c1 });
        }
        let beta = c2 / c1;
        let gamma = -c3 / c1;
        if !(beta.is_finite() && gamma.is_finite()) {
            return Err(Degenerate { determinant: c1 });
        }
        Ok(Projection {
            beta,
            gamma: Some(gamma),
        })
    }
}

impl AddAssign for Moments {
    fn add_assign(&mut self, rhs: Self) {
        self.nn += rhs.nn;
        self.ne += rhs.ne;
        self.ee += rhs.ee;
        self.ns += rhs.ns;
        self.es += rhs.es;
        self.has_number |= rhs.has_number;
    }
}

impl Add for Moments {
    type Output = Moments;

    fn add(mut self, rhs: Self) -> Self::Output {
        self += rhs;
        self
    }
}

impl Projection {
    /// Projected activity `y0` of a mode of `species` at `energy`.
    #[inline]
    pub fn target(&self, species: Species, energy: f64) -> f64 {
        match species.basis() {
            ProjectionBasis::EnergyAndNumber => self.beta * energy + self.gamma.unwrap_or(0.0),
            ProjectionBasis::EnergyOnly => self.beta * energy,
        }
    }

    /// `1 / (k_B beta)`, when positive and finite.
    pub fn temperature_k(&self) -> Option<f64> {
        let t = 1.0 / (BOLTZMANN * self.beta);
        (t.is_finite() && t > 0.0).then_some(t)
    }

    /// `mu = -gamma / beta` in joules.
    pub fn chemical_potential_j(&self) -> Option<f64> {
        let mu = -self.gamma? / self.beta;
        mu.is_finite().then_some(mu)
    }
}

/// Accumulate moments over the given global ranges, rejecting activities
/// outside each species' domain.
pub(crate) fn pool_moments(
    registry: &ModeRegistry,
    ranges: &[Range<usize>],
    y: &[f64],
) -> SolverResult<Moments> {
    let modes = registry.modes();
    let mut moments = Moments::default();
    for range in ranges {
        for i in range.clone() {
            let mode = &modes[i];
            let yi = y[i];
            if !mode.species.activity_in_domain(yi) {
                return Err(SolverError::NonPhysicalActivity {
                    species: mode.species,
                    block: mode.block,
                    mode: i - range.start,
                    value: yi,
                });
            }
            moments.push(mode.species, mode.rate_weight(), mode.energy_j, yi);
        }
    }
    Ok(moments)
}

pub(crate) fn project(
    registry: &ModeRegistry,
    scope: ProjectionScope,
    ranges: &[Range<usize>],
    y: &[f64],
    time: f64,
) -> SolverResult<Projection> {
    pool_moments(registry, ranges, y)?
        .solve()
        .map_err(|d| SolverError::ProjectionDegeneracy {
            scope,
            time,
            determinant: d.determinant,
        })
}

/// Projection of one block's modes of one species; used for local
/// temperature and chemical potential.
pub fn project_block(
    registry: &ModeRegistry,
    species: Species,
    block: usize,
    y: &[f64],
    time: f64,
) -> SolverResult<Projection> {
    let range = registry.block_range(species, block)?;
    project(
        registry,
        ProjectionScope::Block { species, block },
        &[range],
        y,
        time,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn electron_moments(energies: &[f64], ys: &[f64]) -> Moments {
        let mut m = Moments::default();
        for (&e, &y) in energies.iter().zip(ys) {
            m.push(Species::Electron, 1.0, e, y);
        }
        m
    }

    #[test]
    fn exact_linear_activities_are_recovered() {
        let energies = [0.5, 1.0, 1.5, 2.0];
        let ys: Vec<f64> = energies.iter().map(|e| 3.0 * e - 4.0).collect();
        let p = electron_moments(&energies, &ys).solve().unwrap();
        assert!((p.beta - 3.0).abs() < 1e-12);
        assert!((p.gamma.unwrap() + 4.0).abs() < 1e-12);
    }

    #[test]
    fn single_electron_mode_is_degenerate() {
        let m = electron_moments(&[1.0], &[0.3]);
        assert!(m.solve().is_err());
    }

    #[test]
    fn equal_energies_are_degenerate() {
        let m = electron_moments(&[1.0, 1.0, 1.0], &[0.3, 0.1, -0.2]);
        assert!(m.solve().is_err());
    }

    #[test]
    fn phonon_projection_is_energy_only() {
        let mut m = Moments::default();
        m.push(Species::Phonon, 1.0, 2.0, 4.0);
        assert!(!m.has_number);
        let p = m.solve().unwrap();
        assert!(p.gamma.is_none());
        assert!((p.beta - 2.0).abs() < 1e-12);
        assert_eq!(p.target(Species::Phonon, 3.0), p.beta * 3.0);
    }

    #[test]
    fn empty_phonon_moments_are_degenerate() {
        assert!(Moments::default().solve().is_err());
    }

    #[test]
    fn joint_projection_shares_beta() {
        let mut m = Moments::default();
        for (e, y) in [(0.5, 0.2), (1.0, 1.1), (1.5, 1.9)] {
            m.push(Species::Electron, 1.0, e, y);
        }
        m.push(Species::Phonon, 1.0, 0.8, 1.5);
        let p = m.solve().unwrap();
        let gamma = p.gamma.unwrap();
        assert_eq!(p.target(Species::Electron, 1.0), p.beta + gamma);
        assert_eq!(p.target(Species::Phonon, 1.0), p.beta);
    }

    #[test]
    fn temperature_from_beta() {
        let t = 300.0;
        let p = Projection {
            beta: 1.0 / (BOLTZMANN * t),
            gamma: Some(-1e-19 / (BOLTZMANN * t)),
        };
        assert!((p.temperature_k().unwrap() - t).abs() < 1e-9);
        assert!((p.chemical_potential_j().unwrap() - 1e-19).abs() < 1e-30);
    }
}
