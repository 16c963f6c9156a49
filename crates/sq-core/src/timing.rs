//! Lightweight performance timing utilities.
//!
//! Counters are off unless `SQ_TIMING` is set or [`enable_timing`] is called.
//! They are process-wide and only ever accumulate, so concurrent runs share
//! totals but never share simulation state.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Instant;

static ENABLED: AtomicBool = AtomicBool::new(false);

/// Enable performance timing globally.
pub fn enable_timing() {
    ENABLED.store(true, Ordering::Relaxed);
}

/// Disable performance timing globally.
pub fn disable_timing() {
    ENABLED.store(false, Ordering::Relaxed);
}

/// Check if timing is enabled.
pub fn is_enabled() -> bool {
    ENABLED.load(Ordering::Relaxed) || std::env::var("SQ_TIMING").is_ok()
}

/// A simple timer that measures elapsed time.
pub struct Timer {
    start: Instant,
    enabled: bool,
}

impl Timer {
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
            enabled: is_enabled(),
        }
    }

    /// Stop the timer and return elapsed time in seconds.
    /// If timing is disabled, returns None.
    pub fn stop(self) -> Option<f64> {
        if self.enabled {
            Some(self.start.elapsed().as_secs_f64())
        } else {
            None
        }
    }

    /// Stop the timer and add the elapsed time to `acc` when enabled.
    pub fn stop_into(self, acc: &AccumulatingTimer) {
        if let Some(elapsed) = self.stop() {
            acc.record(elapsed);
        }
    }
}

/// Accumulating timer for tracking total time across multiple calls.
pub struct AccumulatingTimer {
    total_ns: AtomicU64,
    count: AtomicU64,
}

impl Default for AccumulatingTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl AccumulatingTimer {
    pub const fn new() -> Self {
        Self {
            total_ns: AtomicU64::new(0),
            count: AtomicU64::new(0),
        }
    }

    pub fn record(&self, duration_s: f64) {
        let nanos = (duration_s * 1e9) as u64;
        self.total_ns.fetch_add(nanos, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);
    }

    /// Total time spent (in seconds).
    pub fn total_seconds(&self) -> f64 {
        self.total_ns.load(Ordering::Relaxed) as f64 / 1e9
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    /// Average time per call (in seconds).
    pub fn average_seconds(&self) -> f64 {
        let count = self.count();
        if count > 0 {
            self.total_seconds() / count as f64
        } else {
            0.0
        }
    }

    pub fn reset(&self) {
        self.total_ns.store(0, Ordering::Relaxed);
        self.count.store(0, Ordering::Relaxed);
    }
}

/// Right-hand-side evaluation timers.
pub mod rhs_timing {
    use super::AccumulatingTimer;

    /// Full `derivative(t, y)` calls
    pub static DERIVATIVE: AccumulatingTimer = AccumulatingTimer::new();
    /// Transport terms over all adjacent block pairs
    pub static TRANSPORT: AccumulatingTimer = AccumulatingTimer::new();
    /// Electron-phonon coupling terms over all blocks
    pub static COUPLING: AccumulatingTimer = AccumulatingTimer::new();

    pub fn reset_all() {
        DERIVATIVE.reset();
        TRANSPORT.reset();
        COUPLING.reset();
    }

    pub fn print_summary() {
        if !super::is_enabled() {
            return;
        }

        println!("\n=== Derivative Breakdown ===");
        for (label, timer) in [
            ("derivative()", &DERIVATIVE),
            ("transport terms", &TRANSPORT),
            ("coupling terms", &COUPLING),
        ] {
            let count = timer.count();
            if count > 0 {
                println!(
                    "{:<18} {} calls, {:.3}s total, {:.4}ms avg",
                    label,
                    count,
                    timer.total_seconds(),
                    timer.average_seconds() * 1000.0
                );
            }
        }
        println!("============================\n");
    }
}

/// Performance statistics collector.
#[derive(Default)]
pub struct PerfStats {
    pub build_time_s: f64,
    pub integrate_time_s: f64,
    pub accepted_steps: usize,
    pub rejected_steps: usize,
    pub reduce_time_s: f64,
    pub save_time_s: f64,
}

impl PerfStats {
    pub fn print_summary(&self) {
        if !is_enabled() {
            return;
        }

        println!("\n=== Performance Summary ===");
        println!("Registry build:      {:.3}s", self.build_time_s);
        println!("Integration:         {:.3}s", self.integrate_time_s);
        if self.accepted_steps > 0 {
            println!("  Accepted steps:    {}", self.accepted_steps);
            println!("  Rejected steps:    {}", self.rejected_steps);
            println!(
                "  Avg step time:     {:.4}s",
                self.integrate_time_s / self.accepted_steps as f64
            );
        }
        println!("Reduction:           {:.3}s", self.reduce_time_s);
        if self.save_time_s > 0.0 {
            println!("Run save time:       {:.3}s", self.save_time_s);
        }
        println!("==========================\n");

        rhs_timing::print_summary();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accumulating_timer_averages() {
        let timer = AccumulatingTimer::new();
        timer.record(0.5);
        timer.record(1.5);
        assert_eq!(timer.count(), 2);
        assert!((timer.total_seconds() - 2.0).abs() < 1e-6);
        assert!((timer.average_seconds() - 1.0).abs() < 1e-6);
        timer.reset();
        assert_eq!(timer.count(), 0);
        assert_eq!(timer.average_seconds(), 0.0);
    }
}
