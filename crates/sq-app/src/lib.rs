//! Shared application service layer for seaqt.
//!
//! Centralizes project management, run compilation, integration, reduction,
//! run caching and series queries for the CLI.

pub mod compile;
pub mod error;
pub mod progress;
pub mod project_service;
pub mod query;
pub mod run_service;

pub use compile::{CompiledRun, compile_run};
pub use error::{AppError, AppResult};
pub use progress::{RunProgressEvent, RunStage, TransientProgress};
pub use project_service::{
    RunDefSummary, get_run_def, list_run_defs, load_project, save_project, validate_project,
};
pub use query::{
    RunSummary, extract_series, get_run_summary, observables, reduce_stored, series_to_csv,
};
pub use run_service::{
    LoadedRun, RunOptions, RunRequest, RunResponse, RunTimingSummary, SOLVER_VERSION, ensure_run,
    ensure_run_with_progress, list_runs, load_run, resolve_run,
};
