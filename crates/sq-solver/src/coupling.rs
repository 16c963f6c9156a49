//! Electron-phonon energy exchange inside one block.

use sq_modes::{ModeRegistry, Species};

use crate::error::{ProjectionScope, SolverResult};
use crate::projector::project;
use crate::term::Term;

/// Pool a block's electrons and phonons under a shared `beta` and an
/// electron-only `gamma`, then relax both species toward it.
pub fn coupling_term(
    registry: &ModeRegistry,
    block: usize,
    y: &[f64],
    time: f64,
) -> SolverResult<Term> {
    let ranges = [
        registry.block_range(Species::Electron, block)?,
        registry.block_range(Species::Phonon, block)?,
    ];
    let projection = project(
        registry,
        ProjectionScope::Coupling { block },
        &ranges,
        y,
        time,
    )?;
    Ok(Term::relax(registry, ranges, y, &projection))
}

/// Coupling needs both species present.
pub fn coupling_applies(registry: &ModeRegistry) -> bool {
    registry.has_species(Species::Electron) && registry.has_species(Species::Phonon)
}
