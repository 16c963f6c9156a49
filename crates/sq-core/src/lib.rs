//! sq-core: shared foundation for the SEAQT relaxation engine.
//!
//! Contains:
//! - units (uom SI types, constructors, physical constants)
//! - numeric (Real + tolerances + float helpers)
//! - timing (opt-in wall-clock counters for the derivative hot path)
//! - error (shared error types)

pub mod error;
pub mod numeric;
pub mod timing;
pub mod units;

pub use error::{CoreError, CoreResult};
pub use numeric::*;
pub use units::*;
