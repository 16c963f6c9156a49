use sq_modes::ModeRegistry;
use std::ops::Range;

use crate::projector::Projection;

/// Relaxation rates `-(y_i - y0_i) / tau_i` over two global ranges of the
/// state vector, stored back to back.
#[derive(Clone, Debug, PartialEq)]
pub struct Term {
    pub ranges: [Range<usize>; 2],
    pub rates: Vec<f64>,
}

impl Term {
    pub fn relax(
        registry: &ModeRegistry,
        ranges: [Range<usize>; 2],
        y: &[f64],
        projection: &Projection,
    ) -> Self {
        let modes = registry.modes();
        let rates = ranges
            .iter()
            .flat_map(|r| r.clone())
            .map(|i| {
                let mode = &modes[i];
                let y0 = projection.target(mode.species, mode.energy_j);
                -(y[i] - y0) / mode.relaxation_time_s
            })
            .collect();
        Self { ranges, rates }
    }

    /// Add the rates into a full-length accumulator.
    pub fn add_into(&self, acc: &mut [f64]) {
        let mut rates = self.rates.iter();
        for range in &self.ranges {
            for (slot, rate) in acc[range.clone()].iter_mut().zip(rates.by_ref()) {
                *slot += rate;
            }
        }
    }
}
