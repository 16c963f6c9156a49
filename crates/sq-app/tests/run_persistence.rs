//! Service-level runs of a two-block phonon chain: caching, progress,
//! partial trajectories and series export.

use std::fs;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use sq_app::{
    AppError, RunOptions, RunProgressEvent, RunRequest, RunResponse, RunStage,
    ensure_run_with_progress, query, run_service,
};
use sq_reduce::ReduceOptions;
use sq_results::{RunStatus, RunStore};
use sq_sim::CancelToken;

const PAIR_PROJECT: &str = r#"
version: 1
name: Phonon pair
runs:
  - id: pair
    name: Hot and cold block
    run_type: Phonon
    coupling: false
    finish: { multiplier: 50.0, basis: MinTau }
    tolerances: { abs: 1.0e-12, rel: 1.0e-8 }
    blocks:
      - size_m: 1.0e-7
        temperature_k: 500.0
        phonon:
          table: { type: Explicit, energies_j: [1.0e-21], dos_weights: [1.0], relaxation_times_s: [1.0e-12] }
          group_velocity_m_s: 6000.0
      - size_m: 1.0e-7
        temperature_k: 300.0
        phonon:
          table: { type: Explicit, energies_j: [1.0e-21], dos_weights: [1.0], relaxation_times_s: [1.0e-12] }
          group_velocity_m_s: 6000.0
  - id: short
    name: Step limited
    run_type: Phonon
    coupling: false
    max_steps: 3
    blocks:
      - size_m: 1.0e-7
        temperature_k: 500.0
        phonon:
          table: { type: Explicit, energies_j: [1.0e-21], dos_weights: [1.0], relaxation_times_s: [1.0e-12] }
          group_velocity_m_s: 6000.0
      - size_m: 1.0e-7
        temperature_k: 300.0
        phonon:
          table: { type: Explicit, energies_j: [1.0e-21], dos_weights: [1.0], relaxation_times_s: [1.0e-12] }
          group_velocity_m_s: 6000.0
"#;

fn project(prefix: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let dir = std::env::temp_dir().join(format!("{}_{}", prefix, nanos));
    fs::create_dir_all(&dir).expect("failed to create temp project dir");
    let path = dir.join("project.yaml");
    fs::write(&path, PAIR_PROJECT).expect("failed to write project file");
    path
}

fn run(
    request: &RunRequest<'_>,
) -> (Result<RunResponse, AppError>, Vec<RunProgressEvent>) {
    let mut events = Vec::new();
    let response = ensure_run_with_progress(request, Some(&mut |event| events.push(event)));
    (response, events)
}

#[test]
fn pair_run_is_cached_and_reloaded() {
    let project_path = project("sq_app_pair");
    let request = RunRequest {
        project_path: &project_path,
        run_def_id: "pair",
        options: RunOptions::default(),
    };

    let (first, events) = run(&request);
    let first = first.expect("pair run failed");
    assert!(!first.loaded_from_cache);
    assert!(first.manifest.is_completed());
    assert_eq!(first.manifest.block_count, 2);
    assert_eq!(first.manifest.mode_count, 2);
    assert_eq!(first.manifest.last_time_s, first.manifest.t_end_s);
    assert!(first.timing.rhs_calls > 0);
    assert!(first.timing.steps > 0);

    let stages: Vec<RunStage> = events.iter().map(|e| e.stage).collect();
    let position = |stage: RunStage| stages.iter().position(|s| *s == stage);
    let integrating = position(RunStage::Integrating).expect("no integrate event");
    let reducing = position(RunStage::Reducing).expect("no reduce event");
    let saving = position(RunStage::SavingResults).expect("no save event");
    assert!(integrating < reducing && reducing < saving);
    assert_eq!(stages.last(), Some(&RunStage::Completed));
    assert!(
        events
            .iter()
            .filter_map(|e| e.transient.as_ref())
            .any(|p| p.step > 0 && p.fraction_complete > 0.0)
    );

    let (second, events) = run(&request);
    let second = second.expect("cached run failed");
    assert!(second.loaded_from_cache);
    assert_eq!(second.run_id, first.run_id);
    assert!(events.iter().any(|e| e.stage == RunStage::LoadingCachedResult));
    assert!(!events.iter().any(|e| e.stage == RunStage::Integrating));

    let rerun = RunRequest {
        options: RunOptions {
            use_cache: false,
            ..RunOptions::default()
        },
        ..request
    };
    let (third, _) = run(&rerun);
    let third = third.expect("uncached run failed");
    assert!(!third.loaded_from_cache);
    assert_eq!(third.run_id, first.run_id);

    let runs = run_service::list_runs(&project_path, Some("pair")).expect("failed to list runs");
    assert_eq!(runs.len(), 1);

    let prefix = &first.run_id[..8];
    let loaded = run_service::load_run(&project_path, prefix).expect("failed to load run");
    assert_eq!(loaded.manifest.run_id, first.run_id);
    let summary = query::get_run_summary(&loaded).expect("failed to summarize run");
    assert_eq!(summary.sample_count, loaded.manifest.samples);
    assert_eq!(summary.reduced_samples, Some(loaded.manifest.samples));

    let series = query::observables(&loaded, &ReduceOptions::default()).unwrap();
    for block in 0..2 {
        let temps = query::extract_series(&series, "phonon_temperature", Some(block)).unwrap();
        let (_, last) = *temps.last().unwrap();
        assert!((last - 400.0).abs() < 0.02 * 400.0, "block {block}: {last} K");
    }
    let entropy = query::extract_series(&series, "total_entropy", None).unwrap();
    for pair in entropy.windows(2) {
        assert!(pair[1].1 >= pair[0].1 * (1.0 - 1e-9));
    }

    let recomputed = query::reduce_stored(&loaded, &ReduceOptions::default()).unwrap();
    assert_eq!(recomputed, series);

    let csv = query::series_to_csv(
        &query::extract_series(&series, "temperature_gradient", None).unwrap(),
    );
    let mut lines = csv.lines();
    assert_eq!(lines.next(), Some("time_s,value"));
    let first_row = lines.next().expect("csv has no rows");
    let (t0, gradient) = first_row.split_once(',').expect("malformed csv row");
    assert_eq!(t0, "0");
    let gradient: f64 = gradient.parse().unwrap();
    assert!((gradient - 200.0).abs() < 1e-9);
}

#[test]
fn step_limited_run_keeps_partial_trajectory() {
    let project_path = project("sq_app_partial");
    let request = RunRequest {
        project_path: &project_path,
        run_def_id: "short",
        options: RunOptions::default(),
    };

    let (result, events) = run(&request);
    let run_id = match result {
        Err(AppError::RunFailed { run_id, .. }) => run_id,
        other => panic!("expected a failed run, got {other:?}"),
    };
    assert!(events.iter().any(|e| e.stage == RunStage::SavingResults));
    assert!(!events.iter().any(|e| e.stage == RunStage::Completed));

    let store = RunStore::for_project(&project_path).unwrap();
    let manifest = store.load_manifest(&run_id).unwrap();
    assert!(matches!(manifest.status, RunStatus::Failed { .. }));
    assert_eq!(manifest.steps, 3);
    assert!(manifest.last_time_s < manifest.t_end_s);
    let trajectory = store.load_trajectory(&run_id).unwrap();
    assert_eq!(trajectory.len(), manifest.samples);
    assert!(trajectory.len() > 1);
    assert!(store.load_observables(&run_id).unwrap().is_some());

    // failed runs are never served from the cache
    let (again, events) = run(&request);
    assert!(matches!(again, Err(AppError::RunFailed { .. })));
    assert!(events.iter().any(|e| e.stage == RunStage::Integrating));
}

#[test]
fn cancelled_run_is_stored_as_cancelled() {
    let project_path = project("sq_app_cancel");
    let token = CancelToken::new();
    token.cancel();
    let request = RunRequest {
        project_path: &project_path,
        run_def_id: "pair",
        options: RunOptions {
            cancel: Some(token),
            ..RunOptions::default()
        },
    };

    let (result, _) = run(&request);
    let run_id = match result {
        Err(AppError::RunFailed { run_id, .. }) => run_id,
        other => panic!("expected a cancelled run, got {other:?}"),
    };
    let loaded = run_service::load_run(&project_path, &run_id).unwrap();
    assert_eq!(loaded.manifest.status, RunStatus::Cancelled);
    assert_eq!(loaded.trajectory.len(), 1);
    assert_eq!(loaded.trajectory[0].time_s, 0.0);
}

#[test]
fn unknown_run_definition_is_reported() {
    let project_path = project("sq_app_unknown");
    let request = RunRequest {
        project_path: &project_path,
        run_def_id: "missing",
        options: RunOptions::default(),
    };
    let (result, _) = run(&request);
    assert!(matches!(result, Err(AppError::RunDefNotFound(id)) if id == "missing"));
}
