//! Error types for simulation operations.

use sq_solver::SolverError;
use thiserror::Error;

/// Errors encountered during transient simulation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimError {
    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    /// A stage left the physical domain; a shorter step may succeed.
    #[error("Retryable failure: {message}")]
    Retryable { message: String },

    /// The model produced a non-finite derivative component.
    #[error("Non-finite value {value} at state index {index}")]
    NonFinite { index: usize, value: f64 },

    /// Integration cannot continue; `time` is the last valid time.
    #[error("Integration diverged at t={time:e} s: {what}{}", location_suffix(.location))]
    Divergence {
        time: f64,
        what: String,
        index: Option<usize>,
        location: Option<String>,
    },

    #[error("Run cancelled at t={time:e} s")]
    Cancelled { time: f64 },

    #[error("Step limit of {steps} reached at t={time:e} s")]
    StepLimit { steps: usize, time: f64 },

    #[error("Solver error: {0}")]
    Solver(SolverError),
}

fn location_suffix(location: &Option<String>) -> String {
    location
        .as_ref()
        .map(|l| format!(" ({l})"))
        .unwrap_or_default()
}

impl SimError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, SimError::Retryable { .. })
    }
}

pub type SimResult<T> = Result<T, SimError>;

impl From<SolverError> for SimError {
    fn from(e: SolverError) -> Self {
        match e {
            SolverError::NonPhysicalActivity { .. } => SimError::Retryable {
                message: e.to_string(),
            },
            SolverError::NonFiniteDerivative { index, value } => {
                SimError::NonFinite { index, value }
            }
            other => SimError::Solver(other),
        }
    }
}
