//! Immutable per-run mode registry.

use serde::{Deserialize, Serialize};
use sq_core::{CoreError, CoreResult};
use std::ops::Range;

use crate::layout::BlockLayout;
use crate::mode::{BlockInfo, Mode};
use crate::species::{Species, SpeciesSet};

/// Where a global state index lives.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModeLocation {
    pub species: Species,
    pub block: usize,
    /// Index within the block's run of this species.
    pub local: usize,
}

/// All modes of one run in state-vector order:
/// `[electron modes, block order][phonon modes, block order]`.
///
/// Built once by [`crate::RegistryBuilder`] and never mutated; the solver
/// shares it by reference across every derivative call.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModeRegistry {
    pub(crate) modes: Vec<Mode>,
    pub(crate) electrons: BlockLayout,
    pub(crate) phonons: BlockLayout,
    pub(crate) species_set: SpeciesSet,
    pub(crate) blocks: Vec<BlockInfo>,
}

impl ModeRegistry {
    pub fn len(&self) -> usize {
        self.modes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modes.is_empty()
    }

    pub fn modes(&self) -> &[Mode] {
        &self.modes
    }

    pub fn mode(&self, index: usize) -> CoreResult<&Mode> {
        self.modes.get(index).ok_or(CoreError::IndexOob {
            what: "mode",
            index,
            len: self.modes.len(),
        })
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    pub fn species_set(&self) -> SpeciesSet {
        self.species_set
    }

    pub fn layout(&self, species: Species) -> &BlockLayout {
        match species {
            Species::Electron => &self.electrons,
            Species::Phonon => &self.phonons,
        }
    }

    /// Whether the run evolves `species` and it has at least one mode.
    pub fn has_species(&self, species: Species) -> bool {
        self.species_set.includes(species) && !self.layout(species).is_empty()
    }

    /// Global index range of one block's modes of one species.
    pub fn block_range(&self, species: Species, block: usize) -> CoreResult<Range<usize>> {
        self.layout(species).range(block)
    }

    pub fn block_modes(&self, species: Species, block: usize) -> CoreResult<&[Mode]> {
        let range = self.block_range(species, block)?;
        Ok(&self.modes[range])
    }

    pub fn block_info(&self, block: usize) -> CoreResult<&BlockInfo> {
        self.blocks.get(block).ok_or(CoreError::IndexOob {
            what: "block",
            index: block,
            len: self.blocks.len(),
        })
    }

    pub fn blocks(&self) -> &[BlockInfo] {
        &self.blocks
    }

    /// Map a global state index to species, block and local index.
    pub fn locate(&self, index: usize) -> Option<ModeLocation> {
        for species in Species::ALL {
            if let Some((block, local)) = self.layout(species).locate(index) {
                return Some(ModeLocation {
                    species,
                    block,
                    local,
                });
            }
        }
        None
    }

    pub fn min_relaxation_time(&self) -> Option<f64> {
        self.modes
            .iter()
            .map(|m| m.relaxation_time_s)
            .reduce(f64::min)
    }

    pub fn max_relaxation_time(&self) -> Option<f64> {
        self.modes
            .iter()
            .map(|m| m.relaxation_time_s)
            .reduce(f64::max)
    }

    /// Per-mode energies in state order.
    pub fn energies(&self) -> impl Iterator<Item = f64> + '_ {
        self.modes.iter().map(|m| m.energy_j)
    }
}
