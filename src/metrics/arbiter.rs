use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock, Weak};
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::error::MetricsError;

/// Cadence of the process-wide arbiter.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(5);

const THREAD_NAME: &str = "meter-arbiter";

/// The one capability the arbiter needs from a meter.
pub(crate) trait Tick: Send + Sync {
    fn tick(&self);
}

/// Handle returned by [`Arbiter::register`], used to deregister.
pub(crate) type MeterId = u64;

/// Drives every registered meter's decay averages from a single thread.
///
/// Entries are non-owning: whoever holds the meter owns it, and the entry
/// lives until the meter is stopped. The set lock only guards membership and
/// the `started` flag; each meter's own lock serializes its tick.
pub struct Arbiter {
    interval: Duration,
    next_id: AtomicU64,
    state: Mutex<ArbiterState>,
}

struct ArbiterState {
    started: bool,
    meters: HashMap<MeterId, Weak<dyn Tick>>,
}

impl Arbiter {
    /// A private arbiter ticking every `interval`.
    ///
    /// Its thread exits once the arbiter is dropped, but only notices at its
    /// next wake-up, so a dropped arbiter with a long interval keeps a
    /// sleeping thread around for up to one interval.
    ///
    /// Fails for a zero interval or one too large to schedule.
    pub fn new(interval: Duration) -> Result<Arc<Self>, MetricsError> {
        if interval.is_zero() || Instant::now().checked_add(interval).is_none() {
            return Err(MetricsError::InvalidInterval { interval });
        }
        Ok(Self::with_interval(interval))
    }

    fn with_interval(interval: Duration) -> Arc<Self> {
        Arc::new(Self {
            interval,
            next_id: AtomicU64::new(0),
            state: Mutex::new(ArbiterState {
                started: false,
                meters: HashMap::new(),
            }),
        })
    }

    /// The process-wide arbiter used by [`crate::StandardMeter::new`].
    pub fn global() -> Arc<Self> {
        static GLOBAL: OnceLock<Arc<Arbiter>> = OnceLock::new();
        GLOBAL
            .get_or_init(|| Arbiter::with_interval(DEFAULT_TICK_INTERVAL))
            .clone()
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Number of meters currently registered.
    pub fn len(&self) -> usize {
        self.state.lock().meters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the tick thread has been launched.
    pub fn is_started(&self) -> bool {
        self.state.lock().started
    }

    /// Track `meter`, launching the tick thread on first use.
    pub(crate) fn register(self: &Arc<Self>, meter: Weak<dyn Tick>) -> MeterId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        let mut state = self.state.lock();
        state.meters.insert(id, meter);

        if !state.started {
            match self.spawn_loop() {
                Ok(()) => {
                    state.started = true;
                    tracing::debug!(interval = ?self.interval, "meter arbiter started");
                }
                // Left unstarted so the next registration retries
                Err(err) => {
                    tracing::error!(error = ?err, "failed to spawn meter arbiter thread");
                }
            }
        }

        id
    }

    /// Stop tracking `id`. Returns false if it was not registered.
    pub(crate) fn unregister(&self, id: MeterId) -> bool {
        self.state.lock().meters.remove(&id).is_some()
    }

    /// Run one sweep now: tick every live meter once.
    pub fn tick_meters(&self) {
        let live: Vec<Arc<dyn Tick>> = {
            let mut state = self.state.lock();
            let mut live = Vec::with_capacity(state.meters.len());
            state.meters.retain(|_, weak| match weak.upgrade() {
                Some(meter) => {
                    live.push(meter);
                    true
                }
                // Dropped without stop()
                None => false,
            });
            live
        };

        tracing::trace!(meters = live.len(), "ticking meters");

        for meter in live {
            meter.tick();
        }
    }

    fn spawn_loop(self: &Arc<Self>) -> std::io::Result<()> {
        let arbiter = Arc::downgrade(self);
        let interval = self.interval;

        thread::Builder::new()
            .name(THREAD_NAME.into())
            .spawn(move || {
                let mut deadline = Instant::now();
                loop {
                    let Some(next) = deadline.checked_add(interval) else {
                        tracing::error!(?interval, "tick deadline overflowed, tick thread exiting");
                        if let Some(arbiter) = arbiter.upgrade() {
                            // Lets the next registration restart the loop
                            arbiter.state.lock().started = false;
                        }
                        break;
                    };
                    deadline = next;
                    thread::sleep(deadline.saturating_duration_since(Instant::now()));

                    let Some(arbiter) = arbiter.upgrade() else {
                        tracing::debug!("meter arbiter dropped, tick thread exiting");
                        break;
                    };
                    arbiter.tick_meters();
                }
            })?;

        Ok(())
    }
}
