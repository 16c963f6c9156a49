//! Simulation runner and result recording.

use sq_core::Tolerances;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, warn};

use crate::error::SimError;
use crate::integrator::{DormandPrince45, Integrator, RK4, StepAttempt};
use crate::model::TransientModel;

/// Integrator selection for simulation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum IntegratorType {
    /// Adaptive Dormand-Prince 5(4) (default).
    #[default]
    DormandPrince45,
    /// Fixed-step 4th-order Runge-Kutta; `dt` is the nominal step.
    RK4,
}

/// Shared flag checked between steps; setting it stops the run at the next
/// step boundary.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Options for simulation runs.
#[derive(Clone, Debug)]
pub struct SimOptions {
    /// Final simulation time (seconds)
    pub t_end: f64,
    /// Fixed step for RK4; first step for the adaptive method when set
    pub dt: Option<f64>,
    /// Error tolerances for the adaptive method
    pub tolerances: Tolerances,
    /// Maximum number of accepted steps (safety limit)
    pub max_steps: usize,
    /// Record every N-th accepted step (decimation)
    pub record_every: usize,
    pub integrator: IntegratorType,
    /// Smallest step before the run is declared divergent
    pub min_dt: f64,
    /// Consecutive cut-backs allowed for one step
    pub max_retries: usize,
    pub cutback_factor: f64,
    /// Growth applied to a cut-back fixed step until it reaches `dt` again
    pub grow_factor: f64,
    pub cancel: Option<CancelToken>,
}

impl Default for SimOptions {
    fn default() -> Self {
        Self {
            t_end: 1.0,
            dt: None,
            tolerances: Tolerances {
                abs: 1e-10,
                rel: 1e-6,
            },
            max_steps: 1_000_000,
            record_every: 1,
            integrator: IntegratorType::default(),
            min_dt: 1e-30,
            max_retries: 8,
            cutback_factor: 0.5,
            grow_factor: 1.5,
            cancel: None,
        }
    }
}

/// Progress reported after every accepted step.
#[derive(Clone, Debug)]
pub struct SimProgress {
    pub step: usize,
    pub sim_time: f64,
    pub t_end: f64,
    pub fraction_complete: f64,
    pub rejected_steps: usize,
    pub cutback_retries: usize,
}

/// Record of simulation results.
#[derive(Clone, Debug)]
pub struct SimRecord<S> {
    /// Time points (seconds)
    pub t: Vec<f64>,
    /// State snapshots
    pub x: Vec<S>,
    /// Accepted steps
    pub steps: usize,
    /// Steps rejected by the error controller
    pub rejected_steps: usize,
    /// Steps cut back after a retryable stage failure
    pub cutback_retries: usize,
}

impl<S> SimRecord<S> {
    fn new() -> Self {
        Self {
            t: Vec::new(),
            x: Vec::new(),
            steps: 0,
            rejected_steps: 0,
            cutback_retries: 0,
        }
    }

    fn push(&mut self, t: f64, x: S) {
        self.t.push(t);
        self.x.push(x);
    }

    pub fn len(&self) -> usize {
        self.t.len()
    }

    pub fn is_empty(&self) -> bool {
        self.t.is_empty()
    }

    /// Last recorded time, if any.
    pub fn last_time(&self) -> Option<f64> {
        self.t.last().copied()
    }
}

/// A failed run: the error plus every sample recorded before it.
#[derive(Debug)]
pub struct SimFailure<S> {
    pub error: SimError,
    pub partial: SimRecord<S>,
}

/// Run a transient simulation.
pub fn run_sim<M: TransientModel>(
    model: &mut M,
    opts: &SimOptions,
) -> Result<SimRecord<M::State>, SimFailure<M::State>> {
    run_sim_with_progress(model, opts, None)
}

/// Run a transient simulation and report progress after every accepted step.
pub fn run_sim_with_progress<M: TransientModel>(
    model: &mut M,
    opts: &SimOptions,
    progress: Option<&mut dyn FnMut(SimProgress)>,
) -> Result<SimRecord<M::State>, SimFailure<M::State>> {
    let mut record = SimRecord::new();
    if let Err(error) = validate(opts) {
        return Err(SimFailure {
            error,
            partial: record,
        });
    }
    let outcome = match opts.integrator {
        IntegratorType::DormandPrince45 => {
            drive(&DormandPrince45, model, opts, progress, &mut record)
        }
        IntegratorType::RK4 => drive(&RK4, model, opts, progress, &mut record),
    };
    match outcome {
        Ok(()) => Ok(record),
        Err(error) => Err(SimFailure {
            error,
            partial: record,
        }),
    }
}

fn validate(opts: &SimOptions) -> Result<(), SimError> {
    if !(opts.t_end.is_finite() && opts.t_end >= 0.0) {
        return Err(SimError::InvalidArg {
            what: "t_end must be non-negative and finite",
        });
    }
    if let Some(dt) = opts.dt {
        if !(dt.is_finite() && dt > 0.0) {
            return Err(SimError::InvalidArg {
                what: "dt must be positive",
            });
        }
    }
    if opts.integrator == IntegratorType::RK4 && opts.dt.is_none() {
        return Err(SimError::InvalidArg {
            what: "RK4 requires a fixed dt",
        });
    }
    if opts.max_steps == 0 {
        return Err(SimError::InvalidArg {
            what: "max_steps must be positive",
        });
    }
    if opts.record_every == 0 {
        return Err(SimError::InvalidArg {
            what: "record_every must be positive",
        });
    }
    if !(opts.tolerances.abs >= 0.0 && opts.tolerances.rel >= 0.0)
        || opts.tolerances.abs + opts.tolerances.rel <= 0.0
    {
        return Err(SimError::InvalidArg {
            what: "tolerances must be non-negative and not both zero",
        });
    }
    if !(opts.cutback_factor > 0.0 && opts.cutback_factor < 1.0) {
        return Err(SimError::InvalidArg {
            what: "cutback_factor must lie in (0, 1)",
        });
    }
    Ok(())
}

/// Mixed absolute/relative max norm of an error estimate.
pub(crate) fn error_norm(err: &[f64], x: &[f64], x_new: &[f64], tol: Tolerances) -> f64 {
    err.iter()
        .zip(x.iter().zip(x_new))
        .map(|(e, (a, b))| e.abs() / (tol.abs + tol.rel * a.abs().max(b.abs())))
        .fold(0.0, f64::max)
}

fn divergence<M: TransientModel>(model: &M, time: f64, what: String, index: Option<usize>) -> SimError {
    SimError::Divergence {
        time,
        what,
        index,
        location: index.and_then(|i| model.describe_index(i)),
    }
}

/// Translate a model failure into the run-level error.
fn fatal<M: TransientModel>(model: &M, time: f64, error: SimError) -> SimError {
    match error {
        SimError::NonFinite { index, value } => divergence(
            model,
            time,
            format!("non-finite derivative {value}"),
            Some(index),
        ),
        other => other,
    }
}

// Hairer's starting step: 1% of the ratio of state to derivative scales.
fn initial_step<M: TransientModel>(model: &M, x: &M::State, k1: &M::State, opts: &SimOptions) -> f64 {
    let tol = opts.tolerances;
    let xs = model.components(x);
    let ks = model.components(k1);
    let mut d0 = 0.0_f64;
    let mut d1 = 0.0_f64;
    for (a, k) in xs.iter().zip(ks) {
        let sc = tol.abs + tol.rel * a.abs();
        d0 = d0.max(a.abs() / sc);
        d1 = d1.max(k.abs() / sc);
    }
    let h = if d0 < 1e-5 || d1 < 1e-5 {
        opts.t_end * 1e-3
    } else {
        0.01 * d0 / d1
    };
    h.min(opts.t_end).max(opts.min_dt)
}

fn drive<I: Integrator, M: TransientModel>(
    integrator: &I,
    model: &mut M,
    opts: &SimOptions,
    mut progress: Option<&mut dyn FnMut(SimProgress)>,
    record: &mut SimRecord<M::State>,
) -> Result<(), SimError> {
    let mut t = 0.0;
    let mut x = model.initial_state();
    if let Some(i) = model.components(&x).iter().position(|v| !v.is_finite()) {
        return Err(divergence(model, t, "non-finite initial state".to_string(), Some(i)));
    }
    record.push(t, x.clone());

    info!(
        t_end = opts.t_end,
        integrator = ?opts.integrator,
        dimension = model.components(&x).len(),
        "starting integration"
    );

    if opts.t_end == 0.0 {
        return Ok(());
    }

    let mut k1: Option<M::State> = None;
    let mut dt = match opts.dt {
        Some(dt) => dt,
        None => {
            let k = model.rhs(t, &x).map_err(|e| fatal(model, t, e))?;
            let h = initial_step(model, &x, &k, opts);
            k1 = Some(k);
            h
        }
    };
    let nominal_dt = opts.dt;
    let mut retries = 0usize;
    let mut last_recorded_step = 0usize;

    while t < opts.t_end {
        if opts.cancel.as_ref().is_some_and(CancelToken::is_cancelled) {
            info!(time = t, steps = record.steps, "integration cancelled");
            return Err(SimError::Cancelled { time: t });
        }
        if record.steps >= opts.max_steps {
            return Err(SimError::StepLimit {
                steps: record.steps,
                time: t,
            });
        }

        let remaining = opts.t_end - t;
        // absorb round-off so accumulated fixed steps land on t_end
        let h = if remaining <= dt * (1.0 + 1e-9) { remaining } else { dt };

        let attempt = match integrator.attempt(model, t, &x, h, k1.as_ref()) {
            Ok(attempt) => attempt,
            Err(e) if e.is_retryable() => {
                retries += 1;
                record.cutback_retries += 1;
                let next = h * opts.cutback_factor;
                warn!(time = t, dt = h, retry = retries, error = %e, "stage failed, cutting step back");
                if retries > opts.max_retries || next < opts.min_dt {
                    return Err(divergence(
                        model,
                        t,
                        format!("step cut back {retries} times without success: {e}"),
                        None,
                    ));
                }
                dt = next;
                continue;
            }
            Err(e) => return Err(fatal(model, t, e)),
        };

        let StepAttempt {
            x_new,
            error,
            first_derivative,
            last_derivative,
        } = attempt;

        if let Some(i) = model.components(&x_new).iter().position(|v| !v.is_finite()) {
            return Err(divergence(model, t, "non-finite state after step".to_string(), Some(i)));
        }

        match error {
            Some(err) => {
                let norm = error_norm(
                    model.components(&err),
                    model.components(&x),
                    model.components(&x_new),
                    opts.tolerances,
                );
                let order = integrator.control_order();
                if !(norm <= 1.0) {
                    record.rejected_steps += 1;
                    let factor = if norm.is_finite() {
                        (0.9 * norm.powf(-1.0 / order)).clamp(0.2, 1.0)
                    } else {
                        0.2
                    };
                    dt = h * factor;
                    k1 = Some(first_derivative);
                    if dt < opts.min_dt {
                        return Err(divergence(
                            model,
                            t,
                            format!("step size {dt:e} fell below minimum {:e}", opts.min_dt),
                            None,
                        ));
                    }
                    continue;
                }
                let factor = if norm == 0.0 {
                    5.0
                } else {
                    (0.9 * norm.powf(-1.0 / order)).clamp(0.2, 5.0)
                };
                // a step shortened to hit t_end says nothing about the next one
                dt = if h < dt { dt } else { h * factor };
                k1 = last_derivative;
            }
            None => {
                let nominal = nominal_dt.unwrap_or(h);
                dt = if retries > 0 || h < nominal {
                    (h * opts.grow_factor).min(nominal)
                } else {
                    nominal
                };
                k1 = last_derivative;
            }
        }

        t = if h >= remaining { opts.t_end } else { t + h };
        x = x_new;
        record.steps += 1;
        retries = 0;

        if record.steps % opts.record_every == 0 {
            record.push(t, x.clone());
            last_recorded_step = record.steps;
        }

        if record.steps % 1000 == 0 {
            debug!(step = record.steps, time = t, dt, rejected = record.rejected_steps, "integration progress");
        }

        if let Some(cb) = progress.as_deref_mut() {
            cb(SimProgress {
                step: record.steps,
                sim_time: t,
                t_end: opts.t_end,
                fraction_complete: (t / opts.t_end).min(1.0),
                rejected_steps: record.rejected_steps,
                cutback_retries: record.cutback_retries,
            });
        }
    }

    if last_recorded_step != record.steps {
        record.push(t, x);
    }

    info!(
        steps = record.steps,
        rejected = record.rejected_steps,
        cutbacks = record.cutback_retries,
        samples = record.len(),
        "integration finished"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sim_options_defaults() {
        let opts = SimOptions::default();
        assert_eq!(opts.t_end, 1.0);
        assert_eq!(opts.integrator, IntegratorType::DormandPrince45);
        assert_eq!(opts.record_every, 1);
        assert!(opts.cancel.is_none());
    }

    #[test]
    fn error_norm_uses_larger_magnitude() {
        let tol = Tolerances { abs: 0.0, rel: 0.1 };
        let n = error_norm(&[0.1], &[1.0], &[2.0], tol);
        assert!((n - 0.5).abs() < 1e-15);
    }

    #[test]
    fn rk4_requires_dt() {
        let opts = SimOptions {
            integrator: IntegratorType::RK4,
            ..SimOptions::default()
        };
        assert!(validate(&opts).is_err());
    }

    #[test]
    fn cancel_token_is_shared() {
        let token = CancelToken::new();
        let clone = token.clone();
        clone.cancel();
        assert!(token.is_cancelled());
    }
}
