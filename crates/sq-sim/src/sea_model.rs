//! [`TransientModel`] adapter over the SEAQT right-hand side.

use nalgebra::DVector;
use sq_solver::SeaContext;

use crate::error::{SimError, SimResult};
use crate::model::TransientModel;

pub struct SeaModel {
    context: SeaContext,
    initial: DVector<f64>,
    rhs_calls: usize,
}

impl SeaModel {
    pub fn new(context: SeaContext, initial: DVector<f64>) -> SimResult<Self> {
        if initial.len() != context.dimension() {
            return Err(SimError::InvalidArg {
                what: "initial state length does not match the mode registry",
            });
        }
        Ok(Self {
            context,
            initial,
            rhs_calls: 0,
        })
    }

    pub fn context(&self) -> &SeaContext {
        &self.context
    }

    /// Number of derivative evaluations so far.
    pub fn rhs_calls(&self) -> usize {
        self.rhs_calls
    }
}

impl TransientModel for SeaModel {
    type State = DVector<f64>;

    fn initial_state(&self) -> Self::State {
        self.initial.clone()
    }

    fn rhs(&mut self, t: f64, x: &Self::State) -> SimResult<Self::State> {
        self.rhs_calls += 1;
        Ok(self.context.derivative(t, x)?)
    }

    fn add(&self, a: &Self::State, b: &Self::State) -> Self::State {
        a + b
    }

    fn scale(&self, a: &Self::State, scale: f64) -> Self::State {
        a * scale
    }

    fn components<'a>(&self, x: &'a Self::State) -> &'a [f64] {
        x.as_slice()
    }

    fn combine(&self, x: &Self::State, terms: &[(f64, &Self::State)]) -> Self::State {
        let mut out = x.clone();
        for (c, k) in terms {
            out.axpy(*c, k, 1.0);
        }
        out
    }

    fn describe_index(&self, index: usize) -> Option<String> {
        self.context.registry().locate(index).map(|loc| {
            format!(
                "{} mode {} of block {}",
                loc.species, loc.local, loc.block
            )
        })
    }
}
