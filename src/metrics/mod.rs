pub mod arbiter;
pub mod ewma;
pub mod meter;
pub mod registry;
pub mod snapshot;

pub use arbiter::{Arbiter, DEFAULT_TICK_INTERVAL};
pub use ewma::Ewma;
pub use meter::{
    get_or_register_meter, new_meter, new_meter_with_arbiter, new_registered_meter, NilMeter,
    StandardMeter,
};
pub use registry::Registry;
pub use snapshot::MeterSnapshot;

/// Counts events and reports exponentially-weighted moving average rates at
/// one, five and fifteen minutes, plus the lifetime mean rate.
///
/// Windowed rates only move when the arbiter ticks the meter (every five
/// seconds by default). `count` and `rate_mean` reflect each `mark`
/// immediately.
pub trait Meter: Send + Sync {
    /// Events recorded so far.
    fn count(&self) -> i64;

    /// Record `n` events. No-op once stopped.
    fn mark(&self, n: i64);

    /// One-minute moving average, events/second.
    fn rate1(&self) -> f64;

    /// Five-minute moving average, events/second.
    fn rate5(&self) -> f64;

    /// Fifteen-minute moving average, events/second.
    fn rate15(&self) -> f64;

    /// Lifetime mean rate, events/second.
    fn rate_mean(&self) -> f64;

    /// Consistent read-only copy of the current values.
    fn snapshot(&self) -> MeterSnapshot;

    /// Stop ticking this meter and release it from the arbiter. Idempotent.
    fn stop(&self);
}
