//! Immutable evaluation context and the full right-hand side.

use nalgebra::DVector;
use rayon::prelude::*;
use sq_core::first_non_finite;
use sq_core::timing::{Timer, rhs_timing};
use sq_modes::{ModeRegistry, Species};
use std::sync::Arc;

use crate::coupling::{coupling_applies, coupling_term};
use crate::error::{SolverError, SolverResult};
use crate::term::Term;
use crate::transport::{transport_pairs, transport_term};

/// Everything `derivative(t, y)` reads. Shared read-only between
/// integrator stages and rayon workers; never mutated after construction.
#[derive(Clone, Debug)]
pub struct SeaContext {
    registry: Arc<ModeRegistry>,
    coupling: bool,
    pairs: Vec<(Species, usize)>,
}

impl SeaContext {
    /// `coupling` enables the electron-phonon term; it only contributes
    /// when the registry holds both species.
    pub fn new(registry: Arc<ModeRegistry>, coupling: bool) -> Self {
        let pairs = transport_pairs(&registry);
        let coupling = coupling && coupling_applies(&registry);
        Self {
            registry,
            coupling,
            pairs,
        }
    }

    pub fn registry(&self) -> &ModeRegistry {
        &self.registry
    }

    pub fn shared_registry(&self) -> Arc<ModeRegistry> {
        Arc::clone(&self.registry)
    }

    pub fn coupling_enabled(&self) -> bool {
        self.coupling
    }

    pub fn dimension(&self) -> usize {
        self.registry.len()
    }

    /// `dy/dt` at `(t, y)`.
    ///
    /// Terms are computed in parallel and summed in a fixed order, so the
    /// result does not depend on thread scheduling. Every quantity is real;
    /// non-finite entries are reported with their state index.
    pub fn derivative(&self, t: f64, y: &DVector<f64>) -> SolverResult<DVector<f64>> {
        let n = self.registry.len();
        if y.len() != n {
            return Err(SolverError::StateDimension {
                expected: n,
                got: y.len(),
            });
        }
        let timer = Timer::start();
        let ys = y.as_slice();
        let mut acc = DVector::<f64>::zeros(n);

        let transport_timer = Timer::start();
        let transport: Vec<SolverResult<Term>> = self
            .pairs
            .par_iter()
            .map(|&(species, left)| transport_term(&self.registry, species, left, ys, t))
            .collect();
        transport_timer.stop_into(&rhs_timing::TRANSPORT);
        for term in transport {
            term?.add_into(acc.as_mut_slice());
        }

        if self.coupling {
            let coupling_timer = Timer::start();
            let coupling: Vec<SolverResult<Term>> = (0..self.registry.block_count())
                .into_par_iter()
                .map(|block| coupling_term(&self.registry, block, ys, t))
                .collect();
            coupling_timer.stop_into(&rhs_timing::COUPLING);
            for term in coupling {
                term?.add_into(acc.as_mut_slice());
            }
        }

        timer.stop_into(&rhs_timing::DERIVATIVE);

        if let Some(index) = first_non_finite(acc.as_slice()) {
            return Err(SolverError::NonFiniteDerivative {
                index,
                value: acc[index],
            });
        }
        Ok(acc)
    }
}
