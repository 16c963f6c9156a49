//! Result data types.

use serde::{Deserialize, Serialize};
use sq_project::schema::RunType;

pub type RunId = String;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunManifest {
    pub run_id: RunId,
    /// Id of the run definition inside the project file.
    pub run_def_id: String,
    pub run_name: String,
    pub timestamp: String,
    pub solver_version: String,
    pub run_type: RunType,
    pub status: RunStatus,
    pub block_count: usize,
    pub mode_count: usize,
    pub t_end_s: f64,
    /// Time of the last stored sample; equals `t_end_s` when completed.
    pub last_time_s: f64,
    pub samples: usize,
    pub steps: usize,
    pub rejected_steps: usize,
    pub cutback_retries: usize,
    pub wall_time_s: f64,
}

impl RunManifest {
    pub fn is_completed(&self) -> bool {
        matches!(self.status, RunStatus::Completed)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum RunStatus {
    Completed,
    /// Integration stopped early; the partial trajectory is stored.
    Failed { message: String },
    Cancelled,
}

/// One line of `trajectory.jsonl`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrajectoryRecord {
    pub time_s: f64,
    pub y: Vec<f64>,
}
