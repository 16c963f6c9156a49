//! Cutback retry test for the transient simulator.

use sq_sim::{IntegratorType, SimError, SimOptions, TransientModel, run_sim};

struct FailOnceModel {
    failures_left: usize,
}

impl TransientModel for FailOnceModel {
    type State = f64;

    fn initial_state(&self) -> Self::State {
        0.0
    }

    fn rhs(&mut self, _t: f64, _x: &Self::State) -> sq_sim::SimResult<Self::State> {
        if self.failures_left > 0 {
            self.failures_left -= 1;
            return Err(SimError::Retryable {
                message: "intentional retryable failure".to_string(),
            });
        }
        Ok(0.0)
    }

    fn add(&self, a: &Self::State, b: &Self::State) -> Self::State {
        a + b
    }

    fn scale(&self, a: &Self::State, scale: f64) -> Self::State {
        a * scale
    }

    fn components<'a>(&self, x: &'a Self::State) -> &'a [f64] {
        std::slice::from_ref(x)
    }
}

fn rk4_opts() -> SimOptions {
    SimOptions {
        t_end: 0.2,
        dt: Some(0.1),
        max_steps: 10,
        record_every: 1,
        integrator: IntegratorType::RK4,
        min_dt: 0.01,
        max_retries: 4,
        cutback_factor: 0.5,
        grow_factor: 2.0,
        ..SimOptions::default()
    }
}

#[test]
fn transient_cutback_retries_step() {
    let mut model = FailOnceModel { failures_left: 1 };
    let opts = rk4_opts();

    let record = run_sim(&mut model, &opts).expect("cutback retry should succeed");

    assert!(record.t.len() >= 2, "Expected at least one step recorded");
    assert!(record.t[1] < 0.1, "First step should be cut back");
    assert_eq!(record.cutback_retries, 1);
    assert_eq!(
        model.failures_left, 0,
        "Failure should have been consumed by retry"
    );
    assert_eq!(*record.t.last().unwrap(), 0.2);
}

#[test]
fn adaptive_cutback_retries_step() {
    let mut model = FailOnceModel { failures_left: 2 };
    let opts = SimOptions {
        t_end: 1.0,
        dt: Some(0.25),
        ..SimOptions::default()
    };
    let record = run_sim(&mut model, &opts).expect("cutback retry should succeed");
    assert_eq!(record.cutback_retries, 2);
    assert!(record.t[1] <= 0.25 * 0.25 + 1e-15);
}

#[test]
fn exhausted_retries_diverge_with_partial_record() {
    let mut model = FailOnceModel { failures_left: 100 };
    let failure = run_sim(&mut model, &rk4_opts()).unwrap_err();
    assert!(matches!(failure.error, SimError::Divergence { time, .. } if time == 0.0));
    assert_eq!(failure.partial.t, vec![0.0]);
}
