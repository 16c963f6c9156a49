//! TransientModel trait for pluggable dynamic systems.

use crate::error::SimResult;

/// Trait for transient (dynamic) system models.
///
/// A TransientModel must implement:
/// - State type (Clone, for snapshots)
/// - Initial state
/// - RHS computation: x_dot = f(t, x)
/// - Vector arithmetic for integration: add states, scale by scalar
/// - A flat view of the state for error norms and finiteness checks
pub trait TransientModel {
    /// State type (must be Clone).
    type State: Clone;

    /// Return the initial state at t=0.
    fn initial_state(&self) -> Self::State;

    /// Compute state derivative dxdt = f(t, x).
    ///
    /// Takes &mut self so models can keep call counters or caches.
    fn rhs(&mut self, t: f64, x: &Self::State) -> SimResult<Self::State>;

    /// Add two states element-wise: result = a + b.
    fn add(&self, a: &Self::State, b: &Self::State) -> Self::State;

    /// Scale a state by a scalar: result = scale * a.
    fn scale(&self, a: &Self::State, scale: f64) -> Self::State;

    /// Components of a state in a fixed order.
    fn components<'a>(&self, x: &'a Self::State) -> &'a [f64];

    /// `x + sum(c_j * k_j)`. Override when the state type has a cheaper
    /// fused update.
    fn combine(&self, x: &Self::State, terms: &[(f64, &Self::State)]) -> Self::State {
        terms
            .iter()
            .fold(x.clone(), |acc, (c, k)| self.add(&acc, &self.scale(k, *c)))
    }

    /// Human-readable name of a state component, used in divergence reports.
    fn describe_index(&self, _index: usize) -> Option<String> {
        None
    }
}
