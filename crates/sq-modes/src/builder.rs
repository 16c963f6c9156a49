//! Registry assembly from per-block input tables.

use sq_core::units::constants::ELECTRON_MASS;
use sq_core::{Length, Time, Velocity, meters_of, mps_of, seconds_of};

use crate::error::{ModesError, ModesResult};
use crate::layout::BlockLayout;
use crate::mode::{BlockInfo, Mode};
use crate::registry::ModeRegistry;
use crate::species::{Species, SpeciesSet};

/// How a band's carrier velocity is obtained when relaxation times are
/// derived from geometry.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum CarrierModel {
    /// `v = sqrt(2 max(E, 0) / (m* m_e))`, with `m*` in free-electron masses.
    EffectiveMass(f64),
    /// Constant group velocity for every mode of the band.
    GroupVelocity(Velocity),
}

/// One species' table for one block.
#[derive(Clone, Debug, PartialEq)]
pub struct BandInput {
    pub energies_j: Vec<f64>,
    pub dos_weights: Vec<f64>,
    /// Explicit per-mode relaxation times; derived from geometry when absent.
    pub relaxation_times_s: Option<Vec<f64>>,
    /// Characteristic relaxation constant used by the derivation.
    pub relaxation_constant: Option<Time>,
    pub carrier: CarrierModel,
}

impl BandInput {
    /// Band whose relaxation times are derived from block geometry.
    pub fn derived(
        energies_j: Vec<f64>,
        dos_weights: Vec<f64>,
        relaxation_constant: Time,
        carrier: CarrierModel,
    ) -> Self {
        Self {
            energies_j,
            dos_weights,
            relaxation_times_s: None,
            relaxation_constant: Some(relaxation_constant),
            carrier,
        }
    }

    /// Band with explicit per-mode relaxation times.
    pub fn explicit(
        energies_j: Vec<f64>,
        dos_weights: Vec<f64>,
        relaxation_times_s: Vec<f64>,
        carrier: CarrierModel,
    ) -> Self {
        Self {
            energies_j,
            dos_weights,
            relaxation_times_s: Some(relaxation_times_s),
            relaxation_constant: None,
            carrier,
        }
    }

    pub fn len(&self) -> usize {
        self.energies_j.len()
    }

    pub fn is_empty(&self) -> bool {
        self.energies_j.is_empty()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct BlockInput {
    pub size: Length,
    pub electron: Option<BandInput>,
    pub phonon: Option<BandInput>,
}

impl BlockInput {
    pub fn new(size: Length) -> Self {
        Self {
            size,
            electron: None,
            phonon: None,
        }
    }

    pub fn with_electron(mut self, band: BandInput) -> Self {
        self.electron = Some(band);
        self
    }

    pub fn with_phonon(mut self, band: BandInput) -> Self {
        self.phonon = Some(band);
        self
    }

    fn band(&self, species: Species) -> Option<&BandInput> {
        match species {
            Species::Electron => self.electron.as_ref(),
            Species::Phonon => self.phonon.as_ref(),
        }
    }
}

/// `tau = (L / v)^2 / tau_c`, falling back to `tau_c` when the velocity is
/// zero or not finite.
pub fn derive_relaxation_time(
    size: Length,
    constant: Time,
    carrier: CarrierModel,
    energy_j: f64,
) -> f64 {
    let tau_c = seconds_of(constant);
    let v = match carrier {
        CarrierModel::GroupVelocity(v) => mps_of(v).abs(),
        CarrierModel::EffectiveMass(m_star) => {
            (2.0 * energy_j.max(0.0) / (m_star * ELECTRON_MASS)).sqrt()
        }
    };
    if !(v.is_finite() && v > 0.0) {
        return tau_c;
    }
    let ratio = meters_of(size) / v;
    let tau = ratio * ratio / tau_c;
    if tau.is_finite() && tau > 0.0 {
        tau
    } else {
        tau_c
    }
}

/// Collects block inputs and assembles a validated [`ModeRegistry`].
#[derive(Clone, Debug, Default)]
pub struct RegistryBuilder {
    species_set: SpeciesSet,
    blocks: Vec<BlockInput>,
}

impl RegistryBuilder {
    pub fn new(species_set: SpeciesSet) -> Self {
        Self {
            species_set,
            blocks: Vec::new(),
        }
    }

    pub fn push_block(&mut self, block: BlockInput) -> &mut Self {
        self.blocks.push(block);
        self
    }

    pub fn with_block(mut self, block: BlockInput) -> Self {
        self.blocks.push(block);
        self
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    pub fn build(&self) -> ModesResult<ModeRegistry> {
        if self.blocks.is_empty() {
            return Err(ModesError::config("blocks", "at least one block is required"));
        }

        let mut lengths = [Vec::new(), Vec::new()];
        for (b, block) in self.blocks.iter().enumerate() {
            let size = meters_of(block.size);
            if !(size.is_finite() && size > 0.0) {
                return Err(ModesError::config(
                    format!("blocks[{b}].size"),
                    format!("must be positive and finite, got {size}"),
                ));
            }
            for (slot, species) in Species::ALL.into_iter().enumerate() {
                let len = if self.species_set.includes(species) {
                    let band = block.band(species).ok_or_else(|| {
                        ModesError::config(
                            format!("blocks[{b}].{species}"),
                            "missing band table for a species the run evolves",
                        )
                    })?;
                    validate_band(band, species, &format!("blocks[{b}].{species}"))?;
                    band.len()
                } else {
                    0
                };
                lengths[slot].push(len);
            }
        }

        let electrons = BlockLayout::from_lengths(0, &lengths[0]);
        let phonons = BlockLayout::from_lengths(electrons.len(), &lengths[1]);
        let total = electrons.len() + phonons.len();

        let mut modes = vec![Mode::PLACEHOLDER; total];
        for (b, block) in self.blocks.iter().enumerate() {
            for species in self.species_set.iter() {
                let layout = match species {
                    Species::Electron => &electrons,
                    Species::Phonon => &phonons,
                };
                let Some(band) = block.band(species) else {
                    continue;
                };
                let range = layout.range(b)?;
                for (local, slot) in modes[range].iter_mut().enumerate() {
                    let energy_j = band.energies_j[local];
                    let relaxation_time_s = match (&band.relaxation_times_s, band.relaxation_constant) {
                        (Some(taus), _) => taus[local],
                        (None, Some(constant)) => {
                            derive_relaxation_time(block.size, constant, band.carrier, energy_j)
                        }
                        // rejected by validate_band
                        (None, None) => continue,
                    };
                    *slot = Mode {
                        species,
                        block: b,
                        energy_j,
                        dos_weight: band.dos_weights[local],
                        relaxation_time_s,
                    };
                }
            }
        }

        let blocks = self
            .blocks
            .iter()
            .map(|block| BlockInfo {
                size_m: meters_of(block.size),
                effective_mass: block
                    .electron
                    .as_ref()
                    .and_then(|band| match band.carrier {
                        CarrierModel::EffectiveMass(m) => Some(m),
                        CarrierModel::GroupVelocity(_) => None,
                    }),
                group_velocity_m_s: block.phonon.as_ref().and_then(|band| match band.carrier {
                    CarrierModel::GroupVelocity(v) => Some(mps_of(v)),
                    CarrierModel::EffectiveMass(_) => None,
                }),
            })
            .collect();

        Ok(ModeRegistry {
            modes,
            electrons,
            phonons,
            species_set: self.species_set,
            blocks,
        })
    }
}

fn validate_band(band: &BandInput, species: Species, path: &str) -> ModesResult<()> {
    if band.energies_j.is_empty() {
        return Err(ModesError::config(
            format!("{path}.energies_j"),
            "band table is empty",
        ));
    }
    if band.dos_weights.len() != band.energies_j.len() {
        return Err(ModesError::config(
            format!("{path}.dos_weights"),
            format!(
                "length {} does not match {} energies",
                band.dos_weights.len(),
                band.energies_j.len()
            ),
        ));
    }
    for (i, &e) in band.energies_j.iter().enumerate() {
        let ok = match species {
            Species::Electron => e.is_finite(),
            Species::Phonon => e.is_finite() && e > 0.0,
        };
        if !ok {
            return Err(ModesError::config(
                format!("{path}.energies_j[{i}]"),
                format!("invalid {species} energy {e}"),
            ));
        }
    }
    for (i, &w) in band.dos_weights.iter().enumerate() {
        if !(w.is_finite() && w >= 0.0) {
            return Err(ModesError::config(
                format!("{path}.dos_weights[{i}]"),
                format!("must be non-negative and finite, got {w}"),
            ));
        }
    }

    match (&band.relaxation_times_s, band.relaxation_constant) {
        (Some(taus), _) => {
            if taus.len() != band.energies_j.len() {
                return Err(ModesError::config(
                    format!("{path}.relaxation_times_s"),
                    format!(
                        "length {} does not match {} energies",
                        taus.len(),
                        band.energies_j.len()
                    ),
                ));
            }
            for (i, &tau) in taus.iter().enumerate() {
                if !(tau.is_finite() && tau > 0.0) {
                    return Err(ModesError::config(
                        format!("{path}.relaxation_times_s[{i}]"),
                        format!("must be positive and finite, got {tau}"),
                    ));
                }
            }
        }
        (None, Some(constant)) => {
            let tau_c = seconds_of(constant);
            if !(tau_c.is_finite() && tau_c > 0.0) {
                return Err(ModesError::config(
                    format!("{path}.relaxation_time_s"),
                    format!("must be positive and finite, got {tau_c}"),
                ));
            }
        }
        (None, None) => {
            return Err(ModesError::config(
                format!("{path}.relaxation_time_s"),
                "either explicit relaxation times or a relaxation constant is required",
            ));
        }
    }

    match band.carrier {
        CarrierModel::EffectiveMass(m) if !(m.is_finite() && m > 0.0) => {
            Err(ModesError::config(
                format!("{path}.effective_mass"),
                format!("must be positive and finite, got {m}"),
            ))
        }
        CarrierModel::GroupVelocity(v) if !mps_of(v).is_finite() => Err(ModesError::config(
            format!("{path}.group_velocity_m_s"),
            "must be finite",
        )),
        _ => Ok(()),
    }
}
