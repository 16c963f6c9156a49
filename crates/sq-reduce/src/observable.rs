//! Reduced observables and series extraction.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{ReduceError, ReduceResult};

/// One block at one sample. Quantities the run cannot define (missing
/// species, degenerate fit, zero denominator) are `None`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BlockObservables {
    pub electron_temperature_k: Option<f64>,
    pub electron_chemical_potential_ev: Option<f64>,
    pub electron_number: Option<f64>,
    pub electron_energy_j: Option<f64>,
    pub phonon_temperature_k: Option<f64>,
    pub phonon_number: Option<f64>,
    pub phonon_energy_j: Option<f64>,
    /// Electron plus phonon entropy, J/K.
    pub entropy_j_per_k: f64,
    pub electrical_conductivity: Option<f64>,
    pub seebeck_v_per_k: Option<f64>,
    pub electronic_thermal_conductivity: Option<f64>,
    pub phonon_thermal_conductivity: Option<f64>,
    pub thermal_conductivity: Option<f64>,
    pub zt: Option<f64>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SampleObservables {
    pub time_s: f64,
    pub blocks: Vec<BlockObservables>,
    pub total_entropy_j_per_k: f64,
    /// `|T_first - T_last|` of the lattice (phonon) temperature, or the
    /// electron temperature in electron-only runs.
    pub temperature_gradient_k: Option<f64>,
}

/// Reduced trajectory, one entry per kept sample in time order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ObservableSeries {
    pub samples: Vec<SampleObservables>,
}

/// Named scalar series that can be extracted from an [`ObservableSeries`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Observable {
    ElectronTemperature,
    ElectronChemicalPotential,
    ElectronNumber,
    ElectronEnergy,
    PhononTemperature,
    PhononNumber,
    PhononEnergy,
    Entropy,
    ElectricalConductivity,
    Seebeck,
    ElectronicThermalConductivity,
    PhononThermalConductivity,
    ThermalConductivity,
    ZT,
    TotalEntropy,
    TemperatureGradient,
}

impl Observable {
    pub const ALL: [Observable; 16] = [
        Observable::ElectronTemperature,
        Observable::ElectronChemicalPotential,
        Observable::ElectronNumber,
        Observable::ElectronEnergy,
        Observable::PhononTemperature,
        Observable::PhononNumber,
        Observable::PhononEnergy,
        Observable::Entropy,
        Observable::ElectricalConductivity,
        Observable::Seebeck,
        Observable::ElectronicThermalConductivity,
        Observable::PhononThermalConductivity,
        Observable::ThermalConductivity,
        Observable::ZT,
        Observable::TotalEntropy,
        Observable::TemperatureGradient,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Observable::ElectronTemperature => "electron_temperature",
            Observable::ElectronChemicalPotential => "electron_chemical_potential",
            Observable::ElectronNumber => "electron_number",
            Observable::ElectronEnergy => "electron_energy",
            Observable::PhononTemperature => "phonon_temperature",
            Observable::PhononNumber => "phonon_number",
            Observable::PhononEnergy => "phonon_energy",
            Observable::Entropy => "entropy",
            Observable::ElectricalConductivity => "electrical_conductivity",
            Observable::Seebeck => "seebeck",
            Observable::ElectronicThermalConductivity => "electronic_thermal_conductivity",
            Observable::PhononThermalConductivity => "phonon_thermal_conductivity",
            Observable::ThermalConductivity => "thermal_conductivity",
            Observable::ZT => "zt",
            Observable::TotalEntropy => "total_entropy",
            Observable::TemperatureGradient => "temperature_gradient",
        }
    }

    /// Chain-level series take no block index.
    pub fn is_chain_level(self) -> bool {
        matches!(
            self,
            Observable::TotalEntropy | Observable::TemperatureGradient
        )
    }

    fn of_block(self, b: &BlockObservables) -> Option<f64> {
        match self {
            Observable::ElectronTemperature => b.electron_temperature_k,
            Observable::ElectronChemicalPotential => b.electron_chemical_potential_ev,
            Observable::ElectronNumber => b.electron_number,
            Observable::ElectronEnergy => b.electron_energy_j,
            Observable::PhononTemperature => b.phonon_temperature_k,
            Observable::PhononNumber => b.phonon_number,
            Observable::PhononEnergy => b.phonon_energy_j,
            Observable::Entropy => Some(b.entropy_j_per_k),
            Observable::ElectricalConductivity => b.electrical_conductivity,
            Observable::Seebeck => b.seebeck_v_per_k,
            Observable::ElectronicThermalConductivity => b.electronic_thermal_conductivity,
            Observable::PhononThermalConductivity => b.phonon_thermal_conductivity,
            Observable::ThermalConductivity => b.thermal_conductivity,
            Observable::ZT => b.zt,
            Observable::TotalEntropy | Observable::TemperatureGradient => None,
        }
    }
}

impl fmt::Display for Observable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Observable {
    type Err = ReduceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('-', "_");
        Observable::ALL
            .into_iter()
            .find(|o| o.as_str() == wanted)
            .ok_or_else(|| ReduceError::InvalidOption {
                what: format!("unknown observable '{s}'"),
            })
    }
}

impl ObservableSeries {
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn times(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.time_s).collect()
    }

    pub fn block_count(&self) -> usize {
        self.samples.first().map_or(0, |s| s.blocks.len())
    }

    /// `(time, value)` pairs of one observable. Block-level observables
    /// need `block`; chain-level ones ignore it.
    pub fn series(
        &self,
        observable: Observable,
        block: Option<usize>,
    ) -> ReduceResult<Vec<(f64, Option<f64>)>> {
        if observable.is_chain_level() {
            return Ok(self
                .samples
                .iter()
                .map(|s| {
                    let v = match observable {
                        Observable::TotalEntropy => Some(s.total_entropy_j_per_k),
                        _ => s.temperature_gradient_k,
                    };
                    (s.time_s, v)
                })
                .collect());
        }
        let block = block.ok_or_else(|| ReduceError::InvalidOption {
            what: format!("{observable} needs a block index"),
        })?;
        if block >= self.block_count() {
            return Err(ReduceError::InvalidOption {
                what: format!(
                    "block {block} out of range ({} blocks)",
                    self.block_count()
                ),
            });
        }
        Ok(self
            .samples
            .iter()
            .map(|s| (s.time_s, observable.of_block(&s.blocks[block])))
            .collect())
    }
}
