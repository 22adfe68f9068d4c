use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio_stream::wrappers::IntervalStream;
use tokio_stream::StreamExt;

use ratemeter::{MeterSnapshot, Registry};

/// One line of reporter output.
#[derive(Debug, Serialize)]
struct ReportLine<'a> {
    meter: &'a str,
    #[serde(flatten)]
    snapshot: MeterSnapshot,
}

/// Prints every registered meter's snapshot as a JSON line each `interval`
/// while `running` is set, ending with one pass after the load stops.
pub async fn run(registry: Arc<Registry>, running: Arc<AtomicBool>, interval: Duration) {
    let mut ticks = IntervalStream::new(tokio::time::interval(interval));

    while ticks.next().await.is_some() {
        print_all(&registry);
        if !running.load(Ordering::Relaxed) {
            break;
        }
    }
}

/// Emit one line per registered meter.
fn print_all(registry: &Registry) {
    for name in registry.names() {
        let Some(meter) = registry.get(&name) else {
            continue;
        };
        let line = ReportLine {
            meter: &name,
            snapshot: meter.snapshot(),
        };
        match serde_json::to_string(&line) {
            Ok(json) => println!("{json}"),
            Err(err) => tracing::warn!(meter = %name, error = %err, "failed to encode snapshot"),
        }
    }
}
