use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;

use super::arbiter::{Arbiter, MeterId, Tick};
use super::ewma::Ewma;
use super::registry::Registry;
use super::snapshot::MeterSnapshot;
use super::Meter;
use crate::config::MetricsConfig;
use crate::error::MetricsError;

// ─── Constructors ────────────────────────────────────────────────

/// Build a meter according to `config`: a live [`StandardMeter`] on the
/// global arbiter, or a [`NilMeter`] when metrics are disabled.
///
/// Call [`Meter::stop`] once the meter is no longer needed, otherwise the
/// arbiter keeps ticking it.
pub fn new_meter(config: &MetricsConfig) -> Arc<dyn Meter> {
    new_meter_with_arbiter(config, &Arbiter::global())
}

/// Like [`new_meter`], but a live meter registers with `arbiter`. A disabled
/// config never touches `arbiter`.
pub fn new_meter_with_arbiter(config: &MetricsConfig, arbiter: &Arc<Arbiter>) -> Arc<dyn Meter> {
    if config.disabled {
        return Arc::new(NilMeter);
    }
    Arc::new(StandardMeter::with_arbiter(arbiter))
}

/// Return the meter registered as `name`, creating and registering one from
/// the registry's config if absent.
pub fn get_or_register_meter(name: &str, registry: &Registry) -> Arc<dyn Meter> {
    let config = *registry.config();
    registry.get_or_register(name, || new_meter(&config))
}

/// Create a meter and register it as `name`.
///
/// Fails if `name` is taken; the meter built for the attempt is stopped.
pub fn new_registered_meter(
    name: &str,
    registry: &Registry,
) -> Result<Arc<dyn Meter>, MetricsError> {
    let meter = new_meter(registry.config());
    if let Err(err) = registry.register(name, meter.clone()) {
        meter.stop();
        return Err(err);
    }
    Ok(meter)
}

// ─── StandardMeter ───────────────────────────────────────────────

/// The live meter: marks update state under a per-meter lock and the
/// arbiter folds pending events into the decay averages every tick.
///
/// Cloning yields another handle to the same meter.
#[derive(Clone)]
pub struct StandardMeter {
    core: Arc<MeterCore>,
    arbiter: Arc<Arbiter>,
    id: MeterId,
}

struct MeterCore {
    inner: Mutex<MeterState>,
}

struct MeterState {
    /// Last published values; count and all four rates move together
    snapshot: MeterSnapshot,
    m1: Ewma,
    m5: Ewma,
    m15: Ewma,
    start_time: Instant,
    stopped: bool,
}

impl StandardMeter {
    /// Register a new meter with the process-wide arbiter.
    pub fn new() -> Self {
        Self::with_arbiter(&Arbiter::global())
    }

    /// Register a new meter with `arbiter`. Decay averages are sized to
    /// the arbiter's tick interval.
    pub fn with_arbiter(arbiter: &Arc<Arbiter>) -> Self {
        let tick_interval = arbiter.interval();
        let core = Arc::new(MeterCore {
            inner: Mutex::new(MeterState {
                snapshot: MeterSnapshot::default(),
                m1: Ewma::one_minute(tick_interval),
                m5: Ewma::five_minutes(tick_interval),
                m15: Ewma::fifteen_minutes(tick_interval),
                start_time: Instant::now(),
                stopped: false,
            }),
        });

        let id = arbiter.register(Arc::downgrade(&core) as std::sync::Weak<dyn Tick>);

        Self {
            core,
            arbiter: arbiter.clone(),
            id,
        }
    }

    /// Whether [`Meter::stop`] has been called on this meter or a clone.
    pub fn is_stopped(&self) -> bool {
        self.core.inner.lock().stopped
    }
}

impl Default for StandardMeter {
    fn default() -> Self {
        Self::new()
    }
}

impl Meter for StandardMeter {
    fn count(&self) -> i64 {
        self.core.inner.lock().snapshot.count
    }

    fn mark(&self, n: i64) {
        let mut state = self.core.inner.lock();
        if state.stopped {
            return;
        }
        state.snapshot.count = state.snapshot.count.saturating_add(n);
        state.m1.update(n);
        state.m5.update(n);
        state.m15.update(n);
        state.publish();
    }

    fn rate1(&self) -> f64 {
        self.core.inner.lock().snapshot.rate1
    }

    fn rate5(&self) -> f64 {
        self.core.inner.lock().snapshot.rate5
    }

    fn rate15(&self) -> f64 {
        self.core.inner.lock().snapshot.rate15
    }

    fn rate_mean(&self) -> f64 {
        self.core.inner.lock().snapshot.rate_mean
    }

    fn snapshot(&self) -> MeterSnapshot {
        self.core.inner.lock().snapshot
    }

    fn stop(&self) {
        let was_stopped = {
            let mut state = self.core.inner.lock();
            std::mem::replace(&mut state.stopped, true)
        };

        if !was_stopped {
            self.arbiter.unregister(self.id);
            tracing::debug!(meter = self.id, "meter stopped");
        }
    }
}

impl Tick for MeterCore {
    fn tick(&self) {
        let mut state = self.inner.lock();
        // Stopped after the sweep collected us
        if state.stopped {
            return;
        }
        state.m1.tick();
        state.m5.tick();
        state.m15.tick();
        state.publish();
    }
}

impl MeterState {
    /// Refresh the published snapshot from the averages. Caller holds the lock.
    fn publish(&mut self) {
        self.snapshot.rate1 = self.m1.rate();
        self.snapshot.rate5 = self.m5.rate();
        self.snapshot.rate15 = self.m15.rate();
        self.snapshot.rate_mean = mean_rate(self.snapshot.count, self.start_time);
    }
}

fn mean_rate(count: i64, start_time: Instant) -> f64 {
    let elapsed = start_time.elapsed().as_secs_f64();
    if elapsed <= f64::EPSILON {
        return 0.0;
    }
    count as f64 / elapsed
}

// ─── NilMeter ────────────────────────────────────────────────────

/// Meter handed out when metrics are disabled. Every operation is a no-op
/// and every read is zero.
///
/// `snapshot` returns an all-zero [`MeterSnapshot`], not another `NilMeter`,
/// so marking that snapshot panics like any other.
#[derive(Debug, Clone, Copy, Default)]
pub struct NilMeter;

impl Meter for NilMeter {
    fn count(&self) -> i64 {
        0
    }

    fn mark(&self, _n: i64) {}

    fn rate1(&self) -> f64 {
        0.0
    }

    fn rate5(&self) -> f64 {
        0.0
    }

    fn rate15(&self) -> f64 {
        0.0
    }

    fn rate_mean(&self) -> f64 {
        0.0
    }

    fn snapshot(&self) -> MeterSnapshot {
        MeterSnapshot::default()
    }

    fn stop(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    /// Arbiter whose background thread never fires during a test, so sweeps
    /// happen only when the test calls `tick_meters`.
    fn manual_arbiter() -> Arc<Arbiter> {
        Arbiter::new(Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn zero_state() {
        let arbiter = manual_arbiter();
        let m = StandardMeter::with_arbiter(&arbiter);

        assert_eq!(m.count(), 0);
        assert_eq!(m.rate1(), 0.0);
        assert_eq!(m.rate5(), 0.0);
        assert_eq!(m.rate15(), 0.0);
        assert_eq!(m.rate_mean(), 0.0);
        assert_eq!(m.snapshot(), MeterSnapshot::default());
    }

    #[test]
    fn mark_updates_count_and_mean_but_not_windows() {
        let arbiter = manual_arbiter();
        let m = StandardMeter::with_arbiter(&arbiter);

        thread::sleep(Duration::from_millis(2));
        m.mark(3);

        assert_eq!(m.count(), 3);
        assert!(m.rate_mean() > 0.0);
        assert_eq!(m.rate1(), 0.0);
        assert_eq!(m.rate5(), 0.0);
        assert_eq!(m.rate15(), 0.0);
    }

    #[test]
    fn tick_folds_marks_into_windows() {
        let arbiter = manual_arbiter();
        let m = StandardMeter::with_arbiter(&arbiter);

        m.mark(10);
        arbiter.tick_meters();

        // 10 events over a 5s interval
        assert!((m.rate1() - 2.0).abs() < 1e-9);
        assert!((m.rate5() - 2.0).abs() < 1e-9);
        assert!((m.rate15() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn windows_decay_without_marks() {
        let arbiter = manual_arbiter();
        let m = StandardMeter::with_arbiter(&arbiter);

        m.mark(1);
        arbiter.tick_meters();

        let mut prev = m.snapshot();
        for _ in 0..20 {
            arbiter.tick_meters();
            let cur = m.snapshot();
            assert!(cur.rate1 < prev.rate1);
            assert!(cur.rate5 < prev.rate5);
            assert!(cur.rate15 < prev.rate15);
            prev = cur;
        }
        // Shorter windows forget faster
        assert!(prev.rate1 < prev.rate5 && prev.rate5 < prev.rate15);
    }

    #[test]
    fn stop_makes_mark_noop_and_deregisters_once() {
        let arbiter = manual_arbiter();
        let m = StandardMeter::with_arbiter(&arbiter);
        let other = StandardMeter::with_arbiter(&arbiter);
        assert_eq!(arbiter.len(), 2);

        m.mark(5);
        m.stop();
        assert!(m.is_stopped());
        assert_eq!(arbiter.len(), 1);

        m.mark(100);
        assert_eq!(m.count(), 5);

        m.stop();
        assert_eq!(arbiter.len(), 1);

        other.mark(2);
        assert_eq!(other.count(), 2);
    }

    #[test]
    fn stopped_meter_ignores_late_tick() {
        let arbiter = manual_arbiter();
        let m = StandardMeter::with_arbiter(&arbiter);
        m.mark(10);
        m.stop();

        m.core.tick();
        assert_eq!(m.rate1(), 0.0);
    }

    #[test]
    fn clones_share_state() {
        let arbiter = manual_arbiter();
        let a = StandardMeter::with_arbiter(&arbiter);
        let b = a.clone();

        a.mark(2);
        b.mark(3);
        assert_eq!(a.count(), 5);

        b.stop();
        assert!(a.is_stopped());
        assert!(arbiter.is_empty());
    }

    #[test]
    fn snapshot_is_detached() {
        let arbiter = manual_arbiter();
        let m = StandardMeter::with_arbiter(&arbiter);
        m.mark(4);

        let snap = m.snapshot();
        assert_eq!(snap.rate_mean(), m.rate_mean());

        m.mark(6);
        arbiter.tick_meters();
        assert_eq!(snap.count(), 4);
        assert_eq!(snap.rate1(), 0.0);
        assert_eq!(m.count(), 10);
    }

    #[test]
    fn mean_rate_decays_under_background_ticks() {
        let arbiter = Arbiter::new(Duration::from_millis(1)).unwrap();
        let m = StandardMeter::with_arbiter(&arbiter);

        m.mark(1);
        let rate_mean = m.rate_mean();
        thread::sleep(Duration::from_millis(100));
        assert!(m.rate_mean() < rate_mean);
        m.stop();
    }

    #[test]
    fn concurrent_marks_are_all_counted() {
        let arbiter = Arbiter::new(Duration::from_millis(1)).unwrap();
        let m = StandardMeter::with_arbiter(&arbiter);

        thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| {
                    for _ in 0..1_000 {
                        m.mark(1);
                    }
                });
            }
        });

        assert_eq!(m.count(), 8_000);
        m.stop();
    }

    #[test]
    fn mean_rate_guard() {
        assert_eq!(mean_rate(10, Instant::now() + Duration::from_secs(1)), 0.0);
        assert_eq!(mean_rate(0, Instant::now()), 0.0);
    }

    #[test]
    fn nil_meter_is_inert() {
        let m = NilMeter;
        m.mark(10);
        m.stop();
        assert_eq!(m.count(), 0);
        assert_eq!(m.rate1(), 0.0);
        assert_eq!(m.rate_mean(), 0.0);
        assert_eq!(m.snapshot(), MeterSnapshot::default());
    }

    #[test]
    fn disabled_config_yields_nil_meter() {
        let m = new_meter(&MetricsConfig::disabled());
        m.mark(47);
        assert_eq!(m.count(), 0);
    }

    #[test]
    fn disabled_config_leaves_arbiter_untouched() {
        let arbiter = manual_arbiter();
        let m = new_meter_with_arbiter(&MetricsConfig::disabled(), &arbiter);
        m.mark(5);
        m.stop();

        assert!(arbiter.is_empty());
        assert!(!arbiter.is_started());
    }

    #[test]
    fn enabled_config_registers_with_arbiter() {
        let arbiter = manual_arbiter();
        let m = new_meter_with_arbiter(&MetricsConfig::enabled(), &arbiter);
        assert_eq!(arbiter.len(), 1);
        assert!(arbiter.is_started());

        m.stop();
        assert!(arbiter.is_empty());
    }

    #[test]
    fn nil_meter_snapshot_is_zero() {
        let snap = NilMeter.snapshot();
        assert_eq!(snap, MeterSnapshot::default());
        assert_eq!(snap.count(), 0);
    }

    #[test]
    fn enabled_config_yields_live_meter() {
        let m = new_meter(&MetricsConfig::enabled());
        m.mark(47);
        assert_eq!(m.count(), 47);
        m.stop();
    }
}
