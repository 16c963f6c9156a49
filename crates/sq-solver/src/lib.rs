//! Steepest-entropy-ascent right-hand side for electron/phonon relaxation.
//!
//! Every mode relaxes toward the pseudo-equilibrium potential obtained by
//! projecting the current activities of a pooled mode set onto the linear
//! model `y0 = beta*E + gamma` (electrons) or `y0 = beta*E` (phonons):
//!
//! - transport pools one species of two adjacent blocks
//! - coupling pools both species of one block, sharing `beta`
//!
//! [`SeaContext::derivative`] sums all terms into `dy/dt`.

pub mod context;
pub mod coupling;
pub mod error;
pub mod projector;
pub mod state;
pub mod term;
pub mod transport;

pub use context::SeaContext;
pub use error::{ProjectionScope, SolverError, SolverResult};
pub use projector::{Degenerate, Moments, Projection, project_block};
pub use state::{BlockState, initial_state};
pub use term::Term;
