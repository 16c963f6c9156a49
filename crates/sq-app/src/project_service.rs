//! Project loading, saving, validation, and introspection.

use sq_project::schema::{Project, RunDef, RunType};
use std::path::Path;

use crate::error::{AppError, AppResult};

/// Summary of a run definition for listing.
#[derive(Debug, Clone)]
pub struct RunDefSummary {
    pub id: String,
    pub name: String,
    pub run_type: RunType,
    pub block_count: usize,
    pub coupling: bool,
}

/// Load and validate a project file (`.json` as JSON, anything else as YAML).
pub fn load_project(path: &Path) -> AppResult<Project> {
    if !path.exists() {
        return Err(AppError::ProjectFileRead {
            path: path.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
        });
    }
    Ok(sq_project::load(path)?)
}

/// Save project as YAML or JSON by extension.
pub fn save_project(path: &Path, project: &Project) -> AppResult<()> {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("json") => sq_project::save_json(path, project)?,
        _ => sq_project::save_yaml(path, project)?,
    }
    Ok(())
}

pub fn validate_project(project: &Project) -> AppResult<()> {
    if project.runs.is_empty() {
        return Err(AppError::Validation(
            "Project must define at least one run".to_string(),
        ));
    }
    sq_project::validate_project(project)?;
    Ok(())
}

pub fn list_run_defs(project: &Project) -> Vec<RunDefSummary> {
    project
        .runs
        .iter()
        .map(|run| RunDefSummary {
            id: run.id.clone(),
            name: run.name.clone(),
            run_type: run.run_type,
            block_count: run.blocks.len(),
            coupling: run.coupling,
        })
        .collect()
}

pub fn get_run_def<'a>(project: &'a Project, run_def_id: &str) -> AppResult<&'a RunDef> {
    project
        .runs
        .iter()
        .find(|r| r.id == run_def_id)
        .ok_or_else(|| AppError::RunDefNotFound(run_def_id.to_string()))
}
