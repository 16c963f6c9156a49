//! Query helpers for extracting data from loaded runs.

use sq_reduce::{Observable, ObservableSeries, ReduceOptions};
use sq_results::RunStatus;

use crate::error::{AppError, AppResult};
use crate::run_service::LoadedRun;

/// Summary of a run's time range and data.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub time_range: (f64, f64),
    pub sample_count: usize,
    pub block_count: usize,
    pub mode_count: usize,
    pub status: RunStatus,
    /// Samples in the stored reduction, if one was stored.
    pub reduced_samples: Option<usize>,
}

pub fn get_run_summary(run: &LoadedRun) -> AppResult<RunSummary> {
    if run.trajectory.is_empty() {
        return Err(AppError::InvalidInput("No samples in run".to_string()));
    }

    let t_min = run.trajectory.first().map(|r| r.time_s).unwrap_or(0.0);
    let t_max = run.trajectory.last().map(|r| r.time_s).unwrap_or(0.0);

    Ok(RunSummary {
        time_range: (t_min, t_max),
        sample_count: run.trajectory.len(),
        block_count: run.registry.block_count(),
        mode_count: run.registry.len(),
        status: run.manifest.status.clone(),
        reduced_samples: run.observables.as_ref().map(ObservableSeries::len),
    })
}

/// The stored reduction, or a fresh one with `options` when the run was
/// stored without observables.
pub fn observables(run: &LoadedRun, options: &ReduceOptions) -> AppResult<ObservableSeries> {
    if let Some(series) = &run.observables {
        return Ok(series.clone());
    }
    reduce_stored(run, options)
}

/// Reduce the stored trajectory again, ignoring any stored reduction.
pub fn reduce_stored(run: &LoadedRun, options: &ReduceOptions) -> AppResult<ObservableSeries> {
    if run.trajectory.is_empty() {
        return Err(AppError::InvalidInput("No samples in run".to_string()));
    }
    Ok(sq_reduce::reduce(
        &run.registry,
        &run.times(),
        &run.states(),
        options,
    )?)
}

/// `(time, value)` pairs of a named observable. Samples where the value is
/// undefined (for example a degenerate projector fit) are skipped.
pub fn extract_series(
    series: &ObservableSeries,
    observable: &str,
    block: Option<usize>,
) -> AppResult<Vec<(f64, f64)>> {
    let observable: Observable = observable.parse()?;
    Ok(series
        .series(observable, block)?
        .into_iter()
        .filter_map(|(t, v)| v.map(|v| (t, v)))
        .collect())
}

/// CSV with a `time_s,value` header.
pub fn series_to_csv(points: &[(f64, f64)]) -> String {
    let mut csv = String::from("time_s,value\n");
    for (t, v) in points {
        csv.push_str(&format!("{},{}\n", t, v));
    }
    csv
}
