//! Error types for the sq-app service layer.

use std::path::PathBuf;

/// Application error type that wraps errors from the backend crates and
/// gives the CLI one error surface.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Project error: {0}")]
    Project(String),

    #[error("Failed to read project file: {path}")]
    ProjectFileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Project validation failed: {0}")]
    Validation(String),

    #[error("Run definition not found: {0}")]
    RunDefNotFound(String),

    #[error("Run compilation failed: {0}")]
    Compile(String),

    #[error("Solver error: {0}")]
    Solver(String),

    #[error("Simulation error: {0}")]
    Simulation(String),

    /// Integration stopped early; the partial trajectory is stored under
    /// `run_id`.
    #[error("Run {run_id} failed: {message}")]
    RunFailed { run_id: String, message: String },

    #[error("Reduction error: {0}")]
    Reduce(String),

    #[error("Results error: {0}")]
    Results(String),

    #[error("Run not found: {0}")]
    RunNotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for sq-app operations.
pub type AppResult<T> = Result<T, AppError>;

impl From<sq_project::ProjectError> for AppError {
    fn from(err: sq_project::ProjectError) -> Self {
        match err {
            sq_project::ProjectError::Validation(v) => AppError::Validation(v.to_string()),
            other => AppError::Project(other.to_string()),
        }
    }
}

impl From<sq_project::ValidationError> for AppError {
    fn from(err: sq_project::ValidationError) -> Self {
        AppError::Validation(err.to_string())
    }
}

impl From<sq_modes::ModesError> for AppError {
    fn from(err: sq_modes::ModesError) -> Self {
        AppError::Compile(err.to_string())
    }
}

impl From<sq_solver::SolverError> for AppError {
    fn from(err: sq_solver::SolverError) -> Self {
        AppError::Solver(err.to_string())
    }
}

impl From<sq_sim::SimError> for AppError {
    fn from(err: sq_sim::SimError) -> Self {
        AppError::Simulation(err.to_string())
    }
}

impl From<sq_reduce::ReduceError> for AppError {
    fn from(err: sq_reduce::ReduceError) -> Self {
        AppError::Reduce(err.to_string())
    }
}

impl From<sq_results::ResultsError> for AppError {
    fn from(err: sq_results::ResultsError) -> Self {
        match err {
            sq_results::ResultsError::RunNotFound { run_id } => AppError::RunNotFound(run_id),
            other => AppError::Results(other.to_string()),
        }
    }
}
