use serde::Serialize;

use super::Meter;

/// Read-only copy of a meter's observable values at one instant.
///
/// Detached from its source: later marks and ticks on the meter do not
/// reach it, and the arbiter never sees it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct MeterSnapshot {
    pub count: i64,
    pub rate1: f64,
    pub rate5: f64,
    pub rate15: f64,
    pub rate_mean: f64,
}

impl Meter for MeterSnapshot {
    fn count(&self) -> i64 {
        self.count
    }

    /// Snapshots are immutable; marking one is a caller bug.
    fn mark(&self, _n: i64) {
        panic!("mark called on a MeterSnapshot");
    }

    fn rate1(&self) -> f64 {
        self.rate1
    }

    fn rate5(&self) -> f64 {
        self.rate5
    }

    fn rate15(&self) -> f64 {
        self.rate15
    }

    fn rate_mean(&self) -> f64 {
        self.rate_mean
    }

    fn snapshot(&self) -> MeterSnapshot {
        *self
    }

    fn stop(&self) {}
}
