use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use ratemeter::{get_or_register_meter, Meter, Registry};

// ─── Meter names ─────────────────────────────────────────────────

pub const REQUESTS: &str = "requests";
pub const READS: &str = "reads";
pub const WRITES: &str = "writes";

/// Largest batch a single mark records
const MAX_BATCH: i64 = 20;

/// Upper bound on the pause between marks
const MAX_PAUSE_MS: u64 = 25;

// ─── Public entry point ──────────────────────────────────────────

/// Spawns `concurrency` Tokio tasks that mark the demo meters until the
/// deadline or until `running` is cleared.
pub async fn run(
    running: Arc<AtomicBool>,
    registry: Arc<Registry>,
    concurrency: u32,
    duration_secs: u64,
    read_pct: u8,
) {
    let deadline = Instant::now() + Duration::from_secs(duration_secs);

    let mut handles = Vec::with_capacity(concurrency as usize);

    for worker_id in 0..concurrency {
        let running = running.clone();
        let meters = WorkerMeters::new(&registry);

        handles.push(tokio::spawn(async move {
            worker(worker_id, running, meters, deadline, read_pct).await;
        }));
    }

    for h in handles {
        if let Err(err) = h.await {
            tracing::warn!(error = ?err, "load worker failed");
        }
    }

    running.store(false, Ordering::SeqCst);
}

/// Handles resolved once per worker so the hot loop skips the registry.
struct WorkerMeters {
    requests: Arc<dyn Meter>,
    reads: Arc<dyn Meter>,
    writes: Arc<dyn Meter>,
}

impl WorkerMeters {
    fn new(registry: &Registry) -> Self {
        Self {
            requests: get_or_register_meter(REQUESTS, registry),
            reads: get_or_register_meter(READS, registry),
            writes: get_or_register_meter(WRITES, registry),
        }
    }
}

// ─── Worker loop ─────────────────────────────────────────────────

async fn worker(
    id: u32,
    running: Arc<AtomicBool>,
    meters: WorkerMeters,
    deadline: Instant,
    read_pct: u8,
) {
    // Each worker gets its own deterministic RNG seeded uniquely.
    let mut rng = StdRng::seed_from_u64(1000 + id as u64);
    let mut batches = 0u64;

    while running.load(Ordering::Relaxed) && Instant::now() < deadline {
        let batch = rng.gen_range(1..=MAX_BATCH);

        meters.requests.mark(batch);
        if rng.gen_range(0u8..100) < read_pct {
            meters.reads.mark(batch);
        } else {
            meters.writes.mark(batch);
        }
        batches += 1;

        let pause = Duration::from_millis(rng.gen_range(1..=MAX_PAUSE_MS));
        tokio::time::sleep(pause).await;
    }

    tracing::debug!(worker = id, batches, "load worker finished");
}
