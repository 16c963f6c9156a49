//! Content-based hashing for run IDs.

use sha2::{Digest, Sha256};
use sq_project::schema::RunDef;

/// SHA-256 over the canonical JSON of the run definition and the solver
/// version, hex encoded.
pub fn compute_run_id(run: &RunDef, solver_version: &str) -> String {
    let mut hasher = Sha256::new();

    let run_json = serde_json::to_string(run).unwrap_or_default();
    hasher.update(run_json.as_bytes());

    hasher.update(solver_version.as_bytes());

    let result = hasher.finalize();
    format!("{:x}", result)
}
