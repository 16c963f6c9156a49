use serde::{Deserialize, Serialize};

use crate::species::Species;

/// One electron band sample or one phonon branch sample within one block.
///
/// Energies are joules, times are seconds.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Mode {
    pub species: Species,
    pub block: usize,
    pub energy_j: f64,
    pub dos_weight: f64,
    /// Strictly positive and finite once the registry is built.
    pub relaxation_time_s: f64,
}

impl Mode {
    /// Fill value for a preallocated registry buffer; every slot is
    /// overwritten before the registry is handed out.
    pub(crate) const PLACEHOLDER: Mode = Mode {
        species: Species::Electron,
        block: 0,
        energy_j: 0.0,
        dos_weight: 0.0,
        relaxation_time_s: 1.0,
    };

    /// Projector weight `dos_weight / relaxation_time`.
    #[inline]
    pub fn rate_weight(&self) -> f64 {
        self.dos_weight / self.relaxation_time_s
    }
}

/// Per-block geometry and carrier parameters kept for the reducer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BlockInfo {
    pub size_m: f64,
    /// Electron effective mass in units of the free electron mass.
    pub effective_mass: Option<f64>,
    pub group_velocity_m_s: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_weight_divides_by_tau() {
        let mode = Mode {
            species: Species::Phonon,
            block: 2,
            energy_j: 1e-21,
            dos_weight: 4.0,
            relaxation_time_s: 2e-12,
        };
        assert_eq!(mode.rate_weight(), 2e12);
    }
}
