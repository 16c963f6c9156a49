//! Run execution and caching service.

use nalgebra::DVector;
use sq_core::timing::PerfStats;
use sq_modes::ModeRegistry;
use sq_project::schema::RunDef;
use sq_reduce::ObservableSeries;
use sq_results::{RunManifest, RunStatus, RunStore, TrajectoryRecord};
use sq_sim::{CancelToken, SimError, SimRecord, SeaModel, run_sim_with_progress};
use std::path::Path;
use std::time::Instant;
use tracing::{info, warn};

use crate::compile::compile_run;
use crate::error::{AppError, AppResult};
use crate::progress::{RunProgressEvent, RunStage, TransientProgress};
use crate::project_service;

/// Version folded into every run id; a new build invalidates the cache.
pub const SOLVER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Options for running simulations.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub use_cache: bool,
    pub solver_version: String,
    pub cancel: Option<CancelToken>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            use_cache: true,
            solver_version: SOLVER_VERSION.to_string(),
            cancel: None,
        }
    }
}

/// Request to execute a run.
pub struct RunRequest<'a> {
    pub project_path: &'a Path,
    pub run_def_id: &'a str,
    pub options: RunOptions,
}

/// Concise timing and execution summary for a run.
#[derive(Debug, Clone, Default)]
pub struct RunTimingSummary {
    pub compile_time_s: f64,
    pub solve_time_s: f64,
    pub reduce_time_s: f64,
    pub save_time_s: f64,
    pub load_cache_time_s: f64,
    pub total_time_s: f64,
    pub rhs_calls: usize,
    pub steps: usize,
    pub rejected_steps: usize,
    pub cutback_retries: usize,
}

impl RunTimingSummary {
    pub fn perf_stats(&self) -> PerfStats {
        PerfStats {
            build_time_s: self.compile_time_s,
            integrate_time_s: self.solve_time_s,
            accepted_steps: self.steps,
            rejected_steps: self.rejected_steps,
            reduce_time_s: self.reduce_time_s,
            save_time_s: self.save_time_s,
        }
    }
}

/// Response from a run execution.
#[derive(Debug, Clone)]
pub struct RunResponse {
    pub run_id: String,
    pub manifest: RunManifest,
    pub loaded_from_cache: bool,
    pub timing: RunTimingSummary,
}

fn emit_progress(
    progress_cb: &mut Option<&mut dyn FnMut(RunProgressEvent)>,
    stage: RunStage,
    started: Instant,
    message: Option<String>,
    transient: Option<TransientProgress>,
) {
    if let Some(cb) = progress_cb.as_deref_mut() {
        cb(RunProgressEvent {
            stage,
            elapsed_wall_s: started.elapsed().as_secs_f64(),
            message,
            transient,
        });
    }
}

/// Execute or load a run based on request.
pub fn ensure_run(request: &RunRequest) -> AppResult<RunResponse> {
    ensure_run_with_progress(request, None)
}

/// Execute or load a run and stream progress events.
///
/// Only completed runs are served from the cache; a failed or cancelled
/// run with the same id is integrated again and overwritten.
pub fn ensure_run_with_progress(
    request: &RunRequest,
    mut progress_cb: Option<&mut dyn FnMut(RunProgressEvent)>,
) -> AppResult<RunResponse> {
    let started = Instant::now();
    let mut timing = RunTimingSummary::default();

    emit_progress(
        &mut progress_cb,
        RunStage::LoadingProject,
        started,
        Some("Loading project".to_string()),
        None,
    );

    let project = project_service::load_project(request.project_path)?;
    let run_def = project_service::get_run_def(&project, request.run_def_id)?;

    emit_progress(
        &mut progress_cb,
        RunStage::CheckingCache,
        started,
        Some("Checking run cache".to_string()),
        None,
    );

    let run_id = sq_results::compute_run_id(run_def, &request.options.solver_version);
    let store = RunStore::for_project(request.project_path)?;

    if request.options.use_cache && store.has_run(&run_id) {
        let load_started = Instant::now();
        let manifest = store.load_manifest(&run_id)?;
        if manifest.is_completed() {
            emit_progress(
                &mut progress_cb,
                RunStage::LoadingCachedResult,
                started,
                Some("Loading cached run".to_string()),
                None,
            );
            timing.load_cache_time_s = load_started.elapsed().as_secs_f64();
            timing.steps = manifest.steps;
            timing.rejected_steps = manifest.rejected_steps;
            timing.cutback_retries = manifest.cutback_retries;
            timing.total_time_s = started.elapsed().as_secs_f64();

            emit_progress(
                &mut progress_cb,
                RunStage::Completed,
                started,
                Some("Loaded cached run".to_string()),
                None,
            );
            info!(run_id = %run_id, "loaded cached run");

            return Ok(RunResponse {
                run_id,
                manifest,
                loaded_from_cache: true,
                timing,
            });
        }
        info!(run_id = %run_id, "cached run did not complete; running again");
    }

    let manifest = execute_run(
        run_def,
        &store,
        &run_id,
        &request.options,
        &mut progress_cb,
        started,
        &mut timing,
    )?;

    timing.total_time_s = started.elapsed().as_secs_f64();

    emit_progress(
        &mut progress_cb,
        RunStage::Completed,
        started,
        Some("Run completed".to_string()),
        None,
    );

    Ok(RunResponse {
        run_id,
        manifest,
        loaded_from_cache: false,
        timing,
    })
}

/// Build, integrate, reduce and store one run. A run that stops early is
/// still stored, with its partial trajectory, before the error is returned.
fn execute_run(
    run_def: &RunDef,
    store: &RunStore,
    run_id: &str,
    options: &RunOptions,
    progress_cb: &mut Option<&mut dyn FnMut(RunProgressEvent)>,
    started: Instant,
    timing: &mut RunTimingSummary,
) -> AppResult<RunManifest> {
    emit_progress(
        progress_cb,
        RunStage::BuildingRegistry,
        started,
        Some("Building mode registry".to_string()),
        None,
    );

    let compile_started = Instant::now();
    let compiled = compile_run(run_def)?;
    let mut model = SeaModel::new(compiled.context(), compiled.initial.clone())?;
    timing.compile_time_s = compile_started.elapsed().as_secs_f64();

    let mut sim_options = compiled.sim_options.clone();
    sim_options.cancel = options.cancel.clone();
    let t_end_s = sim_options.t_end;

    info!(
        run_id = %run_id,
        modes = compiled.registry.len(),
        blocks = compiled.registry.block_count(),
        t_end_s,
        "integrating run"
    );

    emit_progress(
        progress_cb,
        RunStage::Integrating,
        started,
        Some("Integrating".to_string()),
        Some(TransientProgress {
            t_end_s,
            ..TransientProgress::default()
        }),
    );

    let solve_started = Instant::now();
    let outcome = run_sim_with_progress(
        &mut model,
        &sim_options,
        Some(&mut |p| {
            emit_progress(
                progress_cb,
                RunStage::Integrating,
                started,
                Some(format!(
                    "Step {} | t={:.4e}/{:.4e} s | rejected={}",
                    p.step, p.sim_time, p.t_end, p.rejected_steps
                )),
                Some(TransientProgress {
                    sim_time_s: p.sim_time,
                    t_end_s: p.t_end,
                    fraction_complete: p.fraction_complete,
                    step: p.step,
                    rejected_steps: p.rejected_steps,
                    cutback_retries: p.cutback_retries,
                }),
            )
        }),
    );
    timing.solve_time_s = solve_started.elapsed().as_secs_f64();
    timing.rhs_calls = model.rhs_calls();

    let (record, status, failure) = match outcome {
        Ok(record) => (record, RunStatus::Completed, None),
        Err(failure) => {
            warn!(
                run_id = %run_id,
                error = %failure.error,
                samples = failure.partial.len(),
                "integration stopped early; keeping partial trajectory"
            );
            let status = match failure.error {
                SimError::Cancelled { .. } => RunStatus::Cancelled,
                ref err => RunStatus::Failed {
                    message: err.to_string(),
                },
            };
            (failure.partial, status, Some(failure.error))
        }
    };
    timing.steps = record.steps;
    timing.rejected_steps = record.rejected_steps;
    timing.cutback_retries = record.cutback_retries;

    emit_progress(
        progress_cb,
        RunStage::Reducing,
        started,
        Some("Reducing observables".to_string()),
        None,
    );

    let reduce_started = Instant::now();
    let observables = reduce_record(&compiled.registry, &record, &compiled.reduce_options);
    timing.reduce_time_s = reduce_started.elapsed().as_secs_f64();

    let manifest = RunManifest {
        run_id: run_id.to_string(),
        run_def_id: run_def.id.clone(),
        run_name: run_def.name.clone(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        solver_version: options.solver_version.clone(),
        run_type: run_def.run_type,
        status,
        block_count: compiled.registry.block_count(),
        mode_count: compiled.registry.len(),
        t_end_s,
        last_time_s: record.last_time().unwrap_or(0.0),
        samples: record.len(),
        steps: record.steps,
        rejected_steps: record.rejected_steps,
        cutback_retries: record.cutback_retries,
        wall_time_s: started.elapsed().as_secs_f64(),
    };

    emit_progress(
        progress_cb,
        RunStage::SavingResults,
        started,
        Some("Saving run output".to_string()),
        None,
    );

    let save_started = Instant::now();
    let trajectory = trajectory_records(&record);
    store.save_run(
        &manifest,
        &compiled.registry,
        &trajectory,
        observables.as_ref(),
    )?;
    timing.save_time_s = save_started.elapsed().as_secs_f64();

    match failure {
        Some(error) => Err(AppError::RunFailed {
            run_id: run_id.to_string(),
            message: error.to_string(),
        }),
        None => Ok(manifest),
    }
}

/// A reduction failure does not discard the integration; the run is stored
/// without observables and can be reduced again later.
fn reduce_record(
    registry: &ModeRegistry,
    record: &SimRecord<DVector<f64>>,
    options: &sq_reduce::ReduceOptions,
) -> Option<ObservableSeries> {
    if record.is_empty() {
        return None;
    }
    match sq_reduce::reduce(registry, &record.t, &record.x, options) {
        Ok(series) => Some(series),
        Err(err) => {
            warn!(error = %err, "reduction failed; storing run without observables");
            None
        }
    }
}

fn trajectory_records(record: &SimRecord<DVector<f64>>) -> Vec<TrajectoryRecord> {
    record
        .t
        .iter()
        .zip(&record.x)
        .map(|(&time_s, y)| TrajectoryRecord {
            time_s,
            y: y.iter().copied().collect(),
        })
        .collect()
}

/// List stored runs, most recent first; `run_def_id` filters by definition.
pub fn list_runs(project_path: &Path, run_def_id: Option<&str>) -> AppResult<Vec<RunManifest>> {
    let store = RunStore::for_project(project_path)?;

    let mut runs = store.list_runs(run_def_id)?;
    runs.reverse();
    Ok(runs)
}

/// A stored run, reloaded.
#[derive(Debug, Clone)]
pub struct LoadedRun {
    pub manifest: RunManifest,
    pub registry: ModeRegistry,
    pub trajectory: Vec<TrajectoryRecord>,
    pub observables: Option<ObservableSeries>,
}

impl LoadedRun {
    pub fn times(&self) -> Vec<f64> {
        self.trajectory.iter().map(|r| r.time_s).collect()
    }

    pub fn states(&self) -> Vec<DVector<f64>> {
        self.trajectory
            .iter()
            .map(|r| DVector::from_column_slice(&r.y))
            .collect()
    }
}

/// Full run id from an id or a unique prefix of one.
pub fn resolve_run(project_path: &Path, run_id_or_prefix: &str) -> AppResult<String> {
    let store = RunStore::for_project(project_path)?;
    Ok(store.resolve(run_id_or_prefix)?)
}

/// Load a specific run by id or unique prefix.
pub fn load_run(project_path: &Path, run_id_or_prefix: &str) -> AppResult<LoadedRun> {
    let store = RunStore::for_project(project_path)?;
    let run_id = store.resolve(run_id_or_prefix)?;

    let manifest = store.load_manifest(&run_id)?;
    let registry = store.load_registry(&run_id)?;
    let trajectory = store.load_trajectory(&run_id)?;
    let observables = store.load_observables(&run_id)?;

    Ok(LoadedRun {
        manifest,
        registry,
        trajectory,
        observables,
    })
}
