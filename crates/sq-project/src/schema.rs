//! Project schema definitions.
//!
//! Energies are joules except `fermi_energy_ev`; lengths meters; times
//! seconds.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Project {
    pub version: u32,
    pub name: String,
    #[serde(default)]
    pub runs: Vec<RunDef>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunDef {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub run_type: RunType,
    /// Electron-phonon coupling term; only meaningful for `Both`.
    #[serde(default = "default_true")]
    pub coupling: bool,
    #[serde(default)]
    pub finish: FinishDef,
    #[serde(default)]
    pub integrator: IntegratorDef,
    #[serde(default)]
    pub tolerances: TolerancesDef,
    #[serde(default = "default_max_steps")]
    pub max_steps: usize,
    #[serde(default = "default_record_every")]
    pub record_every: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_dt_s: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_dt_s: Option<f64>,
    #[serde(default)]
    pub reduce: ReduceDef,
    pub blocks: Vec<BlockDef>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum RunType {
    Electron,
    Phonon,
    #[default]
    Both,
}

impl RunType {
    pub fn has_electrons(self) -> bool {
        matches!(self, RunType::Electron | RunType::Both)
    }

    pub fn has_phonons(self) -> bool {
        matches!(self, RunType::Phonon | RunType::Both)
    }
}

/// Run length as a multiple of the shortest or longest relaxation time.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct FinishDef {
    pub multiplier: f64,
    pub basis: FinishBasis,
}

impl Default for FinishDef {
    fn default() -> Self {
        Self {
            multiplier: 100.0,
            basis: FinishBasis::MinTau,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum FinishBasis {
    MinTau,
    MaxTau,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum IntegratorDef {
    #[default]
    DormandPrince45,
    /// Fixed step; needs `initial_dt_s`.
    RK4,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct TolerancesDef {
    pub abs: f64,
    pub rel: f64,
}

impl Default for TolerancesDef {
    fn default() -> Self {
        Self {
            abs: 1e-10,
            rel: 1e-6,
        }
    }
}

/// At most one of `samples` and `stride` may be set; neither keeps every
/// recorded sample.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ReduceDef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub samples: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stride: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub representative_phonon_mode: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BlockDef {
    pub size_m: f64,
    pub temperature_k: f64,
    /// Required when the run includes electrons.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fermi_energy_ev: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub electron: Option<BandDef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phonon: Option<BandDef>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BandDef {
    pub table: BandTableDef,
    /// Characteristic relaxation constant used to derive per-mode times
    /// the table does not list.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relaxation_time_s: Option<f64>,
    /// Electrons only, in units of the free-electron mass.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effective_mass: Option<f64>,
    /// Phonons only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_velocity_m_s: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum BandTableDef {
    Explicit {
        energies_j: Vec<f64>,
        dos_weights: Vec<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        relaxation_times_s: Option<Vec<f64>>,
    },
    /// `count` evenly spaced energies from `e_min_j` to `e_max_j`.
    Uniform {
        e_min_j: f64,
        e_max_j: f64,
        count: usize,
        dos_weight: f64,
    },
}

impl BandTableDef {
    pub fn len(&self) -> usize {
        match self {
            BandTableDef::Explicit { energies_j, .. } => energies_j.len(),
            BandTableDef::Uniform { count, .. } => *count,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn energies_j(&self) -> Vec<f64> {
        match self {
            BandTableDef::Explicit { energies_j, .. } => energies_j.clone(),
            BandTableDef::Uniform {
                e_min_j,
                e_max_j,
                count,
                ..
            } => match *count {
                0 => Vec::new(),
                1 => vec![*e_min_j],
                n => (0..n)
                    .map(|i| e_min_j + (e_max_j - e_min_j) * i as f64 / (n - 1) as f64)
                    .collect(),
            },
        }
    }

    pub fn dos_weights(&self) -> Vec<f64> {
        match self {
            BandTableDef::Explicit { dos_weights, .. } => dos_weights.clone(),
            BandTableDef::Uniform {
                count, dos_weight, ..
            } => vec![*dos_weight; *count],
        }
    }

    pub fn relaxation_times_s(&self) -> Option<&[f64]> {
        match self {
            BandTableDef::Explicit {
                relaxation_times_s, ..
            } => relaxation_times_s.as_deref(),
            BandTableDef::Uniform { .. } => None,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_max_steps() -> usize {
    1_000_000
}

fn default_record_every() -> usize {
    1
}
