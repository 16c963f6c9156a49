//! Error types for derivative evaluation.

use sq_core::CoreError;
use sq_modes::{ModesError, Species};
use std::fmt;
use thiserror::Error;

/// Which pooled mode set a projection was computed over.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProjectionScope {
    /// One species of one block.
    Block { species: Species, block: usize },
    /// One species of blocks `left` and `left + 1`.
    Pair { species: Species, left: usize },
    /// Both species of one block.
    Coupling { block: usize },
}

impl ProjectionScope {
    pub fn species_label(&self) -> &'static str {
        match self {
            ProjectionScope::Block { species, .. } | ProjectionScope::Pair { species, .. } => {
                species.as_str()
            }
            ProjectionScope::Coupling { .. } => "electron+phonon",
        }
    }
}

impl fmt::Display for ProjectionScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProjectionScope::Block { block, .. } => write!(f, "block {block}"),
            ProjectionScope::Pair { left, .. } => write!(f, "blocks {left}-{}", left + 1),
            ProjectionScope::Coupling { block } => write!(f, "coupling in block {block}"),
        }
    }
}

/// Errors raised while evaluating the right-hand side.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SolverError {
    #[error(
        "Projection degenerate over {scope} ({species}) at t={time:e} s: determinant {determinant:e}",
        species = .scope.species_label()
    )]
    ProjectionDegeneracy {
        scope: ProjectionScope,
        time: f64,
        determinant: f64,
    },

    /// Activity outside the species' physical domain (phonon `y <= 0`).
    #[error("Non-physical {species} activity y={value} in block {block}, mode {mode}")]
    NonPhysicalActivity {
        species: Species,
        block: usize,
        mode: usize,
        value: f64,
    },

    #[error("Non-finite derivative at state index {index}: {value}")]
    NonFiniteDerivative { index: usize, value: f64 },

    #[error("State dimension mismatch: expected {expected}, got {got}")]
    StateDimension { expected: usize, got: usize },

    #[error("Invalid initial condition for block {block}: {reason}")]
    InitialCondition { block: usize, reason: String },

    #[error("Registry error: {0}")]
    Modes(#[from] ModesError),

    #[error("Core error: {0}")]
    Core(#[from] CoreError),
}

impl SolverError {
    /// Whether a smaller step may avoid the failure.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SolverError::NonPhysicalActivity { .. })
    }
}

pub type SolverResult<T> = Result<T, SolverError>;
