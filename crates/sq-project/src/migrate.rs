//! Schema migration framework.

use crate::ProjectError;
use crate::schema::Project;

pub const LATEST_VERSION: u32 = 1;

pub fn migrate_to_latest(mut project: Project) -> Result<Project, ProjectError> {
    while project.version < LATEST_VERSION {
        project = migrate_one_version(project)?;
    }
    Ok(project)
}

fn migrate_one_version(project: Project) -> Result<Project, ProjectError> {
    match project.version {
        0 => migrate_v0_to_v1(project),
        v => Err(ProjectError::Migration {
            what: format!("No migration path from version {}", v),
        }),
    }
}

// Version 0 files spelled out every run id; blank ids take the run's
// position so the cache key stays stable.
fn migrate_v0_to_v1(mut project: Project) -> Result<Project, ProjectError> {
    for (i, run) in project.runs.iter_mut().enumerate() {
        if run.id.trim().is_empty() {
            run.id = format!("run-{i}");
        }
    }
    project.version = 1;
    Ok(project)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::RunDef;

    #[test]
    fn v0_fills_blank_run_ids() {
        let mut project = Project::new("old");
        project.version = 0;
        project.runs.push(RunDef::default_chain("", "First", 2));
        project.runs.push(RunDef::default_chain("keep", "Second", 2));
        let migrated = migrate_to_latest(project).unwrap();
        assert_eq!(migrated.version, LATEST_VERSION);
        assert_eq!(migrated.runs[0].id, "run-0");
        assert_eq!(migrated.runs[1].id, "keep");
    }
}
