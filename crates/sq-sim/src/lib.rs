//! Transient integration of SEAQT relaxation runs.
//!
//! Provides:
//! - the `TransientModel` trait and the `SeaModel` adapter over `SeaContext`
//! - fixed-step RK4 and adaptive Dormand-Prince 5(4) integrators
//! - a run loop with step cut-back on non-physical stages, cancellation at
//!   step boundaries, progress callbacks and partial trajectories on failure

pub mod error;
pub mod integrator;
pub mod model;
pub mod sea_model;
pub mod sim;

pub use error::{SimError, SimResult};
pub use integrator::{DormandPrince45, Integrator, RK4, StepAttempt};
pub use model::TransientModel;
pub use sea_model::SeaModel;
pub use sim::{
    CancelToken, IntegratorType, SimFailure, SimOptions, SimProgress, SimRecord, run_sim,
    run_sim_with_progress,
};
