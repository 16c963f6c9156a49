//! Explicit Runge-Kutta integrators.

use crate::error::SimResult;
use crate::model::TransientModel;

/// Result of one trial step from `(t, x)` with step `dt`.
#[derive(Clone, Debug)]
pub struct StepAttempt<S> {
    pub x_new: S,
    /// Embedded local error estimate; `None` for fixed-step methods.
    pub error: Option<S>,
    /// Derivative at `(t, x)`, reusable if the step is retried from `x`.
    pub first_derivative: S,
    /// Derivative at `(t + dt, x_new)` when the method already evaluated it.
    pub last_derivative: Option<S>,
}

/// Trait for time integrators.
pub trait Integrator {
    /// Whether [`Integrator::attempt`] reports an error estimate.
    fn is_adaptive(&self) -> bool;

    /// Exponent denominator for step-size control (`order + 1` of the
    /// error estimate).
    fn control_order(&self) -> f64;

    /// Trial step. `k1`, when given, is the derivative at `(t, x)`.
    fn attempt<M: TransientModel>(
        &self,
        model: &mut M,
        t: f64,
        x: &M::State,
        dt: f64,
        k1: Option<&M::State>,
    ) -> SimResult<StepAttempt<M::State>>;

    /// Advance state by one time step.
    fn step<M: TransientModel>(
        &self,
        model: &mut M,
        t: f64,
        x: &M::State,
        dt: f64,
    ) -> SimResult<M::State> {
        Ok(self.attempt(model, t, x, dt, None)?.x_new)
    }
}

fn first_stage<M: TransientModel>(
    model: &mut M,
    t: f64,
    x: &M::State,
    k1: Option<&M::State>,
) -> SimResult<M::State> {
    match k1 {
        Some(k) => Ok(k.clone()),
        None => model.rhs(t, x),
    }
}

/// Classical RK4 (Runge-Kutta 4th order) integrator.
#[derive(Clone, Debug)]
pub struct RK4;

impl Integrator for RK4 {
    fn is_adaptive(&self) -> bool {
        false
    }

    fn control_order(&self) -> f64 {
        4.0
    }

    fn attempt<M: TransientModel>(
        &self,
        model: &mut M,
        t: f64,
        x: &M::State,
        dt: f64,
        k1: Option<&M::State>,
    ) -> SimResult<StepAttempt<M::State>> {
        let k1 = first_stage(model, t, x, k1)?;

        let x2 = model.combine(x, &[(0.5 * dt, &k1)]);
        let k2 = model.rhs(t + 0.5 * dt, &x2)?;

        let x3 = model.combine(x, &[(0.5 * dt, &k2)]);
        let k3 = model.rhs(t + 0.5 * dt, &x3)?;

        let x4 = model.combine(x, &[(dt, &k3)]);
        let k4 = model.rhs(t + dt, &x4)?;

        // x_new = x + (dt/6) * (k1 + 2*k2 + 2*k3 + k4)
        let x_new = model.combine(
            x,
            &[
                (dt / 6.0, &k1),
                (dt / 3.0, &k2),
                (dt / 3.0, &k3),
                (dt / 6.0, &k4),
            ],
        );

        Ok(StepAttempt {
            x_new,
            error: None,
            first_derivative: k1,
            last_derivative: None,
        })
    }
}

/// Dormand-Prince 5(4): seven stages, fifth-order solution, embedded
/// fourth-order error estimate. The last stage is evaluated at the new
/// point and handed back for reuse as the next step's first stage.
#[derive(Clone, Debug)]
pub struct DormandPrince45;

mod dp {
    pub const C2: f64 = 1.0 / 5.0;
    pub const C3: f64 = 3.0 / 10.0;
    pub const C4: f64 = 4.0 / 5.0;
    pub const C5: f64 = 8.0 / 9.0;

    pub const A21: f64 = 1.0 / 5.0;
    pub const A31: f64 = 3.0 / 40.0;
    pub const A32: f64 = 9.0 / 40.0;
    pub const A41: f64 = 44.0 / 45.0;
    pub const A42: f64 = -56.0 / 15.0;
    pub const A43: f64 = 32.0 / 9.0;
    pub const A51: f64 = 19372.0 / 6561.0;
    pub const A52: f64 = -25360.0 / 2187.0;
    pub const A53: f64 = 64448.0 / 6561.0;
    pub const A54: f64 = -212.0 / 729.0;
    pub const A61: f64 = 9017.0 / 3168.0;
    pub const A62: f64 = -355.0 / 33.0;
    pub const A63: f64 = 46732.0 / 5247.0;
    pub const A64: f64 = 49.0 / 176.0;
    pub const A65: f64 = -5103.0 / 18656.0;

    pub const B1: f64 = 35.0 / 384.0;
    pub const B3: f64 = 500.0 / 1113.0;
    pub const B4: f64 = 125.0 / 192.0;
    pub const B5: f64 = -2187.0 / 6784.0;
    pub const B6: f64 = 11.0 / 84.0;

    // fifth-order minus fourth-order weights
    pub const E1: f64 = 71.0 / 57600.0;
    pub const E3: f64 = -71.0 / 16695.0;
    pub const E4: f64 = 71.0 / 1920.0;
    pub const E5: f64 = -17253.0 / 339200.0;
    pub const E6: f64 = 22.0 / 525.0;
    pub const E7: f64 = -1.0 / 40.0;
}

impl Integrator for DormandPrince45 {
    fn is_adaptive(&self) -> bool {
        true
    }

    fn control_order(&self) -> f64 {
        5.0
    }

    fn attempt<M: TransientModel>(
        &self,
        model: &mut M,
        t: f64,
        x: &M::State,
        h: f64,
        k1: Option<&M::State>,
    ) -> SimResult<StepAttempt<M::State>> {
        use dp::*;

        let k1 = first_stage(model, t, x, k1)?;

        let x2 = model.combine(x, &[(h * A21, &k1)]);
        let k2 = model.rhs(t + C2 * h, &x2)?;

        let x3 = model.combine(x, &[(h * A31, &k1), (h * A32, &k2)]);
        let k3 = model.rhs(t + C3 * h, &x3)?;

        let x4 = model.combine(x, &[(h * A41, &k1), (h * A42, &k2), (h * A43, &k3)]);
        let k4 = model.rhs(t + C4 * h, &x4)?;

        let x5 = model.combine(
            x,
            &[
                (h * A51, &k1),
                (h * A52, &k2),
                (h * A53, &k3),
                (h * A54, &k4),
            ],
        );
        let k5 = model.rhs(t + C5 * h, &x5)?;

        let x6 = model.combine(
            x,
            &[
                (h * A61, &k1),
                (h * A62, &k2),
                (h * A63, &k3),
                (h * A64, &k4),
                (h * A65, &k5),
            ],
        );
        let k6 = model.rhs(t + h, &x6)?;

        let x_new = model.combine(
            x,
            &[
                (h * B1, &k1),
                (h * B3, &k3),
                (h * B4, &k4),
                (h * B5, &k5),
                (h * B6, &k6),
            ],
        );
        let k7 = model.rhs(t + h, &x_new)?;

        let error = model.combine(
            &model.scale(&k1, h * E1),
            &[
                (h * E3, &k3),
                (h * E4, &k4),
                (h * E5, &k5),
                (h * E6, &k6),
                (h * E7, &k7),
            ],
        );

        Ok(StepAttempt {
            x_new,
            error: Some(error),
            first_derivative: k1,
            last_derivative: Some(k7),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Decay;

    impl TransientModel for Decay {
        type State = f64;

        fn initial_state(&self) -> f64 {
            1.0
        }

        fn rhs(&mut self, _t: f64, x: &f64) -> SimResult<f64> {
            Ok(-x)
        }

        fn add(&self, a: &f64, b: &f64) -> f64 {
            a + b
        }

        fn scale(&self, a: &f64, s: f64) -> f64 {
            a * s
        }

        fn components<'a>(&self, x: &'a f64) -> &'a [f64] {
            std::slice::from_ref(x)
        }
    }

    #[test]
    fn weights_are_consistent() {
        use dp::*;
        assert!((B1 + B3 + B4 + B5 + B6 - 1.0).abs() < 1e-15);
        assert!((E1 + E3 + E4 + E5 + E6 + E7).abs() < 1e-15);
        assert!((A61 + A62 + A63 + A64 + A65 - 1.0).abs() < 1e-12);
    }

    #[test]
    fn rk4_single_step_accuracy() {
        let x = RK4.step(&mut Decay, 0.0, &1.0, 0.1).unwrap();
        assert!((x - (-0.1_f64).exp()).abs() < 1e-6);
    }

    #[test]
    fn dopri_error_estimate_is_small_and_fsal_matches() {
        let mut model = Decay;
        let attempt = DormandPrince45
            .attempt(&mut model, 0.0, &1.0, 0.1, None)
            .unwrap();
        assert!((attempt.x_new - (-0.1_f64).exp()).abs() < 1e-8);
        assert!(attempt.error.unwrap().abs() < 1e-6);
        assert_eq!(attempt.last_derivative.unwrap(), -attempt.x_new);
        assert_eq!(attempt.first_derivative, -1.0);
    }
}
