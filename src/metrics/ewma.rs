use std::time::Duration;

// ─── Standard windows ────────────────────────────────────────────

pub const ONE_MINUTE: Duration = Duration::from_secs(60);
pub const FIVE_MINUTES: Duration = Duration::from_secs(5 * 60);
pub const FIFTEEN_MINUTES: Duration = Duration::from_secs(15 * 60);

/// Fixed-interval exponentially-weighted moving average, the same smoothing
/// UNIX load averages use.
///
/// `update` only accumulates; the visible rate changes exclusively in `tick`,
/// which must be called once per `tick_interval`. Not synchronized: the
/// owning meter's lock serializes `update` against `tick`.
#[derive(Debug, Clone)]
pub struct Ewma {
    /// Events recorded since the last tick
    uncounted: i64,
    /// Smoothed rate in events/second
    rate: f64,
    alpha: f64,
    interval_secs: f64,
    /// False until the first tick seeds `rate`
    init: bool,
}

impl Ewma {
    /// Average over `window`, ticked every `tick_interval`.
    pub fn new(window: Duration, tick_interval: Duration) -> Self {
        let interval_secs = tick_interval.as_secs_f64();
        let alpha = 1.0 - (-interval_secs / window.as_secs_f64()).exp();
        Self {
            uncounted: 0,
            rate: 0.0,
            alpha,
            interval_secs,
            init: false,
        }
    }

    pub fn one_minute(tick_interval: Duration) -> Self {
        Self::new(ONE_MINUTE, tick_interval)
    }

    pub fn five_minutes(tick_interval: Duration) -> Self {
        Self::new(FIVE_MINUTES, tick_interval)
    }

    pub fn fifteen_minutes(tick_interval: Duration) -> Self {
        Self::new(FIFTEEN_MINUTES, tick_interval)
    }

    /// Per-tick decay coefficient.
    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    /// Smoothed rate in events per second as of the last tick.
    pub fn rate(&self) -> f64 {
        self.rate
    }

    pub fn update(&mut self, n: i64) {
        self.uncounted = self.uncounted.saturating_add(n);
    }

    /// Fold the pending count into the smoothed rate.
    pub fn tick(&mut self) {
        let instant_rate = self.uncounted as f64 / self.interval_secs;
        self.uncounted = 0;

        if self.init {
            self.rate += self.alpha * (instant_rate - self.rate);
        } else {
            // First interval has nothing to blend with
            self.init = true;
            self.rate = instant_rate;
        }

        self.rate = self.rate.max(0.0);
    }
}
