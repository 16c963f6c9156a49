//! Nearest-neighbour transport between adjacent blocks.

use sq_modes::{ModeRegistry, Species};

use crate::error::{ProjectionScope, SolverResult};
use crate::projector::project;
use crate::term::Term;

/// Pool one species of blocks `left` and `left + 1`, project once, and relax
/// every pooled mode toward the shared pseudo-equilibrium.
pub fn transport_term(
    registry: &ModeRegistry,
    species: Species,
    left: usize,
    y: &[f64],
    time: f64,
) -> SolverResult<Term> {
    let ranges = [
        registry.block_range(species, left)?,
        registry.block_range(species, left + 1)?,
    ];
    let projection = project(
        registry,
        ProjectionScope::Pair { species, left },
        &ranges,
        y,
        time,
    )?;
    Ok(Term::relax(registry, ranges, y, &projection))
}

/// Every `(species, left)` pair that carries a transport term, species major.
pub fn transport_pairs(registry: &ModeRegistry) -> Vec<(Species, usize)> {
    let pairs = registry.block_count().saturating_sub(1);
    Species::ALL
        .into_iter()
        .filter(|&s| registry.has_species(s))
        .flat_map(|s| (0..pairs).map(move |left| (s, left)))
        .collect()
}
