//! Run storage API.
//!
//! Layout: `<root>/<run_id>/{manifest.json, registry.json,
//! trajectory.jsonl, observables.json}`. The manifest is written last, so a
//! run directory without one is an interrupted write and is ignored.

use crate::types::{RunManifest, TrajectoryRecord};
use crate::{ResultsError, ResultsResult};
use sq_modes::ModeRegistry;
use sq_reduce::ObservableSeries;
use std::fs;
use std::path::{Path, PathBuf};

const MANIFEST: &str = "manifest.json";
const REGISTRY: &str = "registry.json";
const TRAJECTORY: &str = "trajectory.jsonl";
const OBSERVABLES: &str = "observables.json";

#[derive(Clone, Debug)]
pub struct RunStore {
    root_dir: PathBuf,
}

impl RunStore {
    pub fn new(root_dir: PathBuf) -> ResultsResult<Self> {
        if !root_dir.exists() {
            fs::create_dir_all(&root_dir)?;
        }
        Ok(Self { root_dir })
    }

    /// Store next to the project file, under `.seaqt/runs`.
    pub fn for_project(project_path: &Path) -> ResultsResult<Self> {
        let project_dir = project_path
            .parent()
            .ok_or_else(|| ResultsError::InvalidPath {
                message: "project path has no parent directory".to_string(),
            })?;
        let runs_dir = project_dir.join(".seaqt").join("runs");
        Self::new(runs_dir)
    }

    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    fn run_dir(&self, run_id: &str) -> PathBuf {
        self.root_dir.join(run_id)
    }

    pub fn has_run(&self, run_id: &str) -> bool {
        self.run_dir(run_id).join(MANIFEST).exists()
    }

    pub fn save_run(
        &self,
        manifest: &RunManifest,
        registry: &ModeRegistry,
        trajectory: &[TrajectoryRecord],
        observables: Option<&ObservableSeries>,
    ) -> ResultsResult<()> {
        let run_dir = self.run_dir(&manifest.run_id);
        fs::create_dir_all(&run_dir)?;

        fs::write(run_dir.join(REGISTRY), serde_json::to_string(registry)?)?;

        let mut trajectory_content = String::new();
        for record in trajectory {
            let line = serde_json::to_string(record)?;
            trajectory_content.push_str(&line);
            trajectory_content.push('\n');
        }
        fs::write(run_dir.join(TRAJECTORY), trajectory_content)?;

        match observables {
            Some(series) => self.save_observables(&manifest.run_id, series)?,
            None => {
                let stale = run_dir.join(OBSERVABLES);
                if stale.exists() {
                    fs::remove_file(stale)?;
                }
            }
        }

        let manifest_json = serde_json::to_string_pretty(manifest)?;
        fs::write(run_dir.join(MANIFEST), manifest_json)?;
        Ok(())
    }

    /// Replace the reduced series of an existing run.
    pub fn save_observables(&self, run_id: &str, series: &ObservableSeries) -> ResultsResult<()> {
        let run_dir = self.run_dir(run_id);
        fs::create_dir_all(&run_dir)?;
        fs::write(run_dir.join(OBSERVABLES), serde_json::to_string(series)?)?;
        Ok(())
    }

    pub fn load_manifest(&self, run_id: &str) -> ResultsResult<RunManifest> {
        let content = self.read(run_id, MANIFEST)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn load_registry(&self, run_id: &str) -> ResultsResult<ModeRegistry> {
        let content = self.read(run_id, REGISTRY)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn load_trajectory(&self, run_id: &str) -> ResultsResult<Vec<TrajectoryRecord>> {
        let content = self.read(run_id, TRAJECTORY)?;
        let mut records = Vec::new();
        for (i, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let record: TrajectoryRecord =
                serde_json::from_str(line).map_err(|e| ResultsError::CorruptTrajectory {
                    run_id: run_id.to_string(),
                    line: i + 1,
                    message: e.to_string(),
                })?;
            records.push(record);
        }
        Ok(records)
    }

    /// `None` when the run was stored without a reduction.
    pub fn load_observables(&self, run_id: &str) -> ResultsResult<Option<ObservableSeries>> {
        if !self.has_run(run_id) {
            return Err(ResultsError::RunNotFound {
                run_id: run_id.to_string(),
            });
        }
        let path = self.run_dir(run_id).join(OBSERVABLES);
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(path)?;
        Ok(Some(serde_json::from_str(&content)?))
    }

    /// Stored runs, oldest first; `run_def_id` filters by run definition.
    pub fn list_runs(&self, run_def_id: Option<&str>) -> ResultsResult<Vec<RunManifest>> {
        let mut runs = Vec::new();

        if !self.root_dir.exists() {
            return Ok(runs);
        }

        for entry in fs::read_dir(&self.root_dir)? {
            let entry = entry?;
            if !entry.path().is_dir() {
                continue;
            }
            let run_id = entry.file_name().to_string_lossy().to_string();
            if let Ok(manifest) = self.load_manifest(&run_id) {
                if run_def_id.is_none_or(|id| manifest.run_def_id == id) {
                    runs.push(manifest);
                }
            }
        }

        runs.sort_by(|a, b| {
            a.timestamp
                .cmp(&b.timestamp)
                .then_with(|| a.run_id.cmp(&b.run_id))
        });
        Ok(runs)
    }

    /// Full run id from a unique prefix of at least four characters.
    pub fn resolve(&self, prefix: &str) -> ResultsResult<String> {
        if self.has_run(prefix) {
            return Ok(prefix.to_string());
        }
        let not_found = || ResultsError::RunNotFound {
            run_id: prefix.to_string(),
        };
        if prefix.len() < 4 {
            return Err(not_found());
        }
        let mut matches = self
            .list_runs(None)?
            .into_iter()
            .filter(|m| m.run_id.starts_with(prefix));
        match (matches.next(), matches.next()) {
            (Some(m), None) => Ok(m.run_id),
            _ => Err(not_found()),
        }
    }

    pub fn delete_run(&self, run_id: &str) -> ResultsResult<()> {
        let run_dir = self.run_dir(run_id);
        if run_dir.exists() {
            fs::remove_dir_all(run_dir)?;
        }
        Ok(())
    }

    fn read(&self, run_id: &str, file: &str) -> ResultsResult<String> {
        let path = self.run_dir(run_id).join(file);
        if !path.exists() {
            return Err(ResultsError::RunNotFound {
                run_id: run_id.to_string(),
            });
        }
        Ok(fs::read_to_string(path)?)
    }
}
