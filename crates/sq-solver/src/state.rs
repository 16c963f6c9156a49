//! Initial activities from per-block temperature and Fermi level.

use nalgebra::DVector;
use sq_core::units::constants::BOLTZMANN;
use sq_core::{Energy, Temperature, joules_of, kelvin_of};
use sq_modes::{ModeRegistry, Species};

use crate::error::{SolverError, SolverResult};

/// Equilibrium a block starts from.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BlockState {
    pub temperature: Temperature,
    /// Electron chemical potential; ignored for phonons.
    pub fermi_energy: Energy,
}

impl BlockState {
    pub fn new(temperature: Temperature, fermi_energy: Energy) -> Self {
        Self {
            temperature,
            fermi_energy,
        }
    }
}

/// Electron `y = (E - mu) / (k_B T)`, phonon `y = E / (k_B T)`, in state order.
pub fn initial_state(registry: &ModeRegistry, blocks: &[BlockState]) -> SolverResult<DVector<f64>> {
    if blocks.len() != registry.block_count() {
        return Err(SolverError::InitialCondition {
            block: blocks.len().min(registry.block_count()),
            reason: format!(
                "expected {} block states, got {}",
                registry.block_count(),
                blocks.len()
            ),
        });
    }
    for (b, state) in blocks.iter().enumerate() {
        let t = kelvin_of(state.temperature);
        if !(t.is_finite() && t > 0.0) {
            return Err(SolverError::InitialCondition {
                block: b,
                reason: format!("temperature must be positive and finite, got {t} K"),
            });
        }
        let mu = joules_of(state.fermi_energy);
        if !mu.is_finite() {
            return Err(SolverError::InitialCondition {
                block: b,
                reason: format!("Fermi energy must be finite, got {mu} J"),
            });
        }
    }

    let y = registry.modes().iter().map(|mode| {
        let state = &blocks[mode.block];
        let kt = BOLTZMANN * kelvin_of(state.temperature);
        match mode.species {
            Species::Electron => (mode.energy_j - joules_of(state.fermi_energy)) / kt,
            Species::Phonon => mode.energy_j / kt,
        }
    });
    Ok(DVector::from_iterator(registry.len(), y))
}
