//! Starting-point run definitions.
//!
//! Scalars follow the reference desktop front-end. That front-end loads its
//! band tables from data files, so the tables here are uniform stand-ins.

use sq_core::units::constants::ev_to_joule;

use crate::schema::*;

pub const DEFAULT_BLOCK_COUNT: usize = 20;
pub const DEFAULT_BLOCK_SIZE_M: f64 = 1e-7;
pub const DEFAULT_TEMPERATURE_A_K: f64 = 295.0;
pub const DEFAULT_TEMPERATURE_B_K: f64 = 300.0;
pub const DEFAULT_FERMI_ENERGY_EV: f64 = 6.0;
pub const DEFAULT_ELECTRON_RELAXATION_S: f64 = 5e-15;
pub const DEFAULT_EFFECTIVE_MASS: f64 = 1.0;
pub const DEFAULT_GROUP_VELOCITY_M_S: f64 = 6000.0;
pub const DEFAULT_PHONON_RELAXATION_S: f64 = 5e-12;

const ELECTRON_MODES: usize = 21;
const PHONON_MODES: usize = 16;

impl Project {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            version: crate::migrate::LATEST_VERSION,
            name: name.into(),
            runs: Vec::new(),
        }
    }
}

impl RunDef {
    /// A coupled electron+phonon chain of `block_count` blocks, the first
    /// half at 295 K and the rest at 300 K.
    pub fn default_chain(id: impl Into<String>, name: impl Into<String>, block_count: usize) -> Self {
        let blocks = (0..block_count)
            .map(|i| {
                let t = if 2 * i < block_count {
                    DEFAULT_TEMPERATURE_A_K
                } else {
                    DEFAULT_TEMPERATURE_B_K
                };
                BlockDef::default_at(t)
            })
            .collect();
        Self {
            id: id.into(),
            name: name.into(),
            run_type: RunType::Both,
            coupling: true,
            finish: FinishDef::default(),
            integrator: IntegratorDef::default(),
            tolerances: TolerancesDef::default(),
            max_steps: 1_000_000,
            record_every: 1,
            initial_dt_s: None,
            min_dt_s: None,
            reduce: ReduceDef::default(),
            blocks,
        }
    }
}

impl BlockDef {
    pub fn default_at(temperature_k: f64) -> Self {
        Self {
            size_m: DEFAULT_BLOCK_SIZE_M,
            temperature_k,
            fermi_energy_ev: Some(DEFAULT_FERMI_ENERGY_EV),
            electron: Some(BandDef::default_electron()),
            phonon: Some(BandDef::default_phonon()),
        }
    }
}

impl BandDef {
    /// 5.5 to 6.5 eV around the default Fermi level.
    pub fn default_electron() -> Self {
        Self {
            table: BandTableDef::Uniform {
                e_min_j: ev_to_joule(5.5),
                e_max_j: ev_to_joule(6.5),
                count: ELECTRON_MODES,
                dos_weight: 1.0,
            },
            relaxation_time_s: Some(DEFAULT_ELECTRON_RELAXATION_S),
            effective_mass: Some(DEFAULT_EFFECTIVE_MASS),
            group_velocity_m_s: None,
        }
    }

    /// Up to roughly 50 meV.
    pub fn default_phonon() -> Self {
        Self {
            table: BandTableDef::Uniform {
                e_min_j: 5e-22,
                e_max_j: 8e-21,
                count: PHONON_MODES,
                dos_weight: 1.0,
            },
            relaxation_time_s: Some(DEFAULT_PHONON_RELAXATION_S),
            effective_mass: None,
            group_velocity_m_s: Some(DEFAULT_GROUP_VELOCITY_M_S),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_chain_splits_at_midpoint() {
        let run = RunDef::default_chain("r", "Default", DEFAULT_BLOCK_COUNT);
        assert_eq!(run.blocks.len(), 20);
        assert_eq!(run.blocks[9].temperature_k, 295.0);
        assert_eq!(run.blocks[10].temperature_k, 300.0);
        assert_eq!(run.finish.multiplier, 100.0);
        assert_eq!(run.finish.basis, FinishBasis::MinTau);

        let odd = RunDef::default_chain("r", "Odd", 5);
        let temps: Vec<f64> = odd.blocks.iter().map(|b| b.temperature_k).collect();
        assert_eq!(temps, vec![295.0, 295.0, 295.0, 300.0, 300.0]);
    }

    #[test]
    fn uniform_table_spans_endpoints() {
        let band = BandDef::default_electron();
        let e = band.table.energies_j();
        assert_eq!(e.len(), ELECTRON_MODES);
        assert_eq!(e[0], ev_to_joule(5.5));
        assert!((e[ELECTRON_MODES - 1] - ev_to_joule(6.5)).abs() < 1e-30);
        assert!(e.windows(2).all(|w| w[1] > w[0]));
        assert_eq!(band.table.dos_weights(), vec![1.0; ELECTRON_MODES]);
        assert_eq!(band.table.relaxation_times_s(), None);
    }
}
