//! Species tags and their formula table.
//!
//! Every place that needs species-specific physics goes through
//! [`Species::rules`]; adding a species means adding one variant and one
//! [`SpeciesRules`] entry.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Physical carrier family a mode belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Species {
    Electron,
    Phonon,
}

/// Which linear model a species' pseudo-equilibrium potential follows.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProjectionBasis {
    /// `y0 = beta*E + gamma`: energy and particle number are both conserved.
    EnergyAndNumber,
    /// `y0 = beta*E`: only energy is conserved.
    EnergyOnly,
}

/// Species-specific formulas, all functions of the activity `y` or the
/// occupation `p`.
pub struct SpeciesRules {
    pub name: &'static str,
    /// Occupation `p(y)`.
    pub occupation: fn(f64) -> f64,
    /// `-dp/dy`, the weight each mode carries in the projector moments.
    pub moment_factor: fn(f64) -> f64,
    /// Single-mode entropy in units of `k_B`, as a function of `p`.
    pub mode_entropy: fn(f64) -> f64,
    pub basis: ProjectionBasis,
    /// Whether `y` lies inside the domain where `p(y)` is physical.
    pub activity_in_domain: fn(f64) -> bool,
}

static ELECTRON_RULES: SpeciesRules = SpeciesRules {
    name: "electron",
    occupation: fermi_occupation,
    moment_factor: fermi_moment_factor,
    mode_entropy: fermi_entropy,
    basis: ProjectionBasis::EnergyAndNumber,
    activity_in_domain: f64::is_finite,
};

static PHONON_RULES: SpeciesRules = SpeciesRules {
    name: "phonon",
    occupation: bose_occupation,
    moment_factor: bose_moment_factor,
    mode_entropy: bose_entropy,
    basis: ProjectionBasis::EnergyOnly,
    activity_in_domain: bose_activity_in_domain,
};

impl Species {
    pub const ALL: [Species; 2] = [Species::Electron, Species::Phonon];

    #[inline]
    pub fn rules(self) -> &'static SpeciesRules {
        match self {
            Species::Electron => &ELECTRON_RULES,
            Species::Phonon => &PHONON_RULES,
        }
    }

    #[inline]
    pub fn occupation(self, y: f64) -> f64 {
        (self.rules().occupation)(y)
    }

    #[inline]
    pub fn moment_factor(self, y: f64) -> f64 {
        (self.rules().moment_factor)(y)
    }

    #[inline]
    pub fn mode_entropy(self, p: f64) -> f64 {
        (self.rules().mode_entropy)(p)
    }

    #[inline]
    pub fn basis(self) -> ProjectionBasis {
        self.rules().basis
    }

    #[inline]
    pub fn activity_in_domain(self, y: f64) -> bool {
        (self.rules().activity_in_domain)(y)
    }

    pub fn as_str(self) -> &'static str {
        self.rules().name
    }
}

impl fmt::Display for Species {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which species a run evolves.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum SpeciesSet {
    Electron,
    Phonon,
    #[default]
    Both,
}

impl SpeciesSet {
    pub fn includes(self, species: Species) -> bool {
        matches!(
            (self, species),
            (SpeciesSet::Both, _)
                | (SpeciesSet::Electron, Species::Electron)
                | (SpeciesSet::Phonon, Species::Phonon)
        )
    }

    pub fn iter(self) -> impl Iterator<Item = Species> {
        Species::ALL.into_iter().filter(move |s| self.includes(*s))
    }
}

// Fermi-Dirac: p = 1/(1+e^y), evaluated without overflow for either sign.
fn fermi_occupation(y: f64) -> f64 {
    if y >= 0.0 {
        let e = (-y).exp();
        e / (1.0 + e)
    } else {
        1.0 / (1.0 + y.exp())
    }
}

// p(1-p) = e^{-|y|} / (1 + e^{-|y|})^2
fn fermi_moment_factor(y: f64) -> f64 {
    let e = (-y.abs()).exp();
    e / ((1.0 + e) * (1.0 + e))
}

fn fermi_entropy(p: f64) -> f64 {
    -(x_ln_x(p) + x_ln_x(1.0 - p))
}

// Bose-Einstein: p = 1/(e^y - 1), pole at y = 0.
fn bose_occupation(y: f64) -> f64 {
    1.0 / y.exp_m1()
}

fn bose_moment_factor(y: f64) -> f64 {
    let p = bose_occupation(y);
    p * (1.0 + p)
}

fn bose_entropy(p: f64) -> f64 {
    x_ln_x(1.0 + p) - x_ln_x(p)
}

fn bose_activity_in_domain(y: f64) -> bool {
    y > 0.0 && !y.is_nan()
}

#[inline]
fn x_ln_x(x: f64) -> f64 {
    if x <= 0.0 { 0.0 } else { x * x.ln() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fermi_half_filling_at_zero() {
        assert_eq!(Species::Electron.occupation(0.0), 0.5);
        assert_eq!(Species::Electron.moment_factor(0.0), 0.25);
        let s = Species::Electron.mode_entropy(0.5);
        assert!((s - std::f64::consts::LN_2).abs() < 1e-15);
    }

    #[test]
    fn fermi_extremes_do_not_overflow() {
        assert_eq!(Species::Electron.occupation(1e4), 0.0);
        assert_eq!(Species::Electron.occupation(-1e4), 1.0);
        assert_eq!(Species::Electron.moment_factor(1e4), 0.0);
        assert_eq!(Species::Electron.mode_entropy(0.0), 0.0);
        assert_eq!(Species::Electron.mode_entropy(1.0), 0.0);
    }

    #[test]
    fn bose_matches_closed_form() {
        let y: f64 = 0.7;
        let p = Species::Phonon.occupation(y);
        assert!((p - 1.0 / (y.exp() - 1.0)).abs() < 1e-14);
        let a = Species::Phonon.moment_factor(y);
        assert!((a - p * (1.0 + p)).abs() < 1e-14);
    }

    #[test]
    fn bose_domain_excludes_non_positive() {
        assert!(Species::Phonon.activity_in_domain(1e-3));
        assert!(!Species::Phonon.activity_in_domain(0.0));
        assert!(!Species::Phonon.activity_in_domain(-2.0));
        assert!(!Species::Phonon.activity_in_domain(f64::NAN));
        assert!(Species::Electron.activity_in_domain(-2.0));
        assert!(!Species::Electron.activity_in_domain(f64::INFINITY));
    }

    #[test]
    fn bose_large_activity_is_empty() {
        assert_eq!(Species::Phonon.occupation(800.0), 0.0);
        assert_eq!(Species::Phonon.moment_factor(800.0), 0.0);
        assert_eq!(Species::Phonon.mode_entropy(0.0), 0.0);
    }

    #[test]
    fn projection_basis_per_species() {
        assert_eq!(Species::Electron.basis(), ProjectionBasis::EnergyAndNumber);
        assert_eq!(Species::Phonon.basis(), ProjectionBasis::EnergyOnly);
    }

    #[test]
    fn species_set_membership() {
        assert!(SpeciesSet::Both.includes(Species::Phonon));
        assert!(!SpeciesSet::Electron.includes(Species::Phonon));
        let phonon_only: Vec<_> = SpeciesSet::Phonon.iter().collect();
        assert_eq!(phonon_only, vec![Species::Phonon]);
    }
}
