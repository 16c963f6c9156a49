//! sq-results: run cache and trajectory storage.
//!
//! A stored run keeps everything needed to re-reduce it without
//! re-integrating: the manifest, the mode registry, and the raw activity
//! trajectory, written with shortest round-trip float formatting so every
//! value reloads bit-for-bit.

pub mod hash;
pub mod store;
pub mod types;

pub use hash::compute_run_id;
pub use store::RunStore;
pub use types::*;

pub type ResultsResult<T> = Result<T, ResultsError>;

#[derive(thiserror::Error, Debug)]
pub enum ResultsError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Run not found: {run_id}")]
    RunNotFound { run_id: String },

    #[error("Invalid path: {message}")]
    InvalidPath { message: String },

    #[error("Corrupt trajectory for run {run_id} at line {line}: {message}")]
    CorruptTrajectory {
        run_id: String,
        line: usize,
        message: String,
    },
}
