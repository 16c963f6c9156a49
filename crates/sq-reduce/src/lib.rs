//! Observable reducer: turns a recorded activity trajectory into per-block,
//! per-sample physical quantities.
//!
//! Reductions are pure functions of the trajectory and the mode registry;
//! samples are reduced in parallel and collected in sample order.

pub mod downsample;
pub mod error;
pub mod observable;
pub mod reduce;
pub mod transport;

pub use downsample::Downsample;
pub use error::{ReduceError, ReduceResult};
pub use observable::{BlockObservables, Observable, ObservableSeries, SampleObservables};
pub use reduce::{ReduceOptions, reduce, reduce_sample};
