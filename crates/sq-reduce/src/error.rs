use sq_core::CoreError;
use sq_solver::SolverError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ReduceError {
    /// Widen the run or request fewer samples.
    #[error("Insufficient samples: {available} available, {requested} requested")]
    InsufficientSamples { available: usize, requested: usize },

    #[error("Invalid reduction option: {what}")]
    InvalidOption { what: String },

    #[error("Solver error: {0}")]
    Solver(#[from] SolverError),

    #[error("Core error: {0}")]
    Core(#[from] CoreError),
}

pub type ReduceResult<T> = Result<T, ReduceError>;
