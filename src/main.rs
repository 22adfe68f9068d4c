use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

use ratemeter::{MetricsConfig, Registry};

mod load_generator;
mod logging;
mod report;

/// Demo settings, passed as an optional JSON argument.
#[derive(Debug, Clone, Deserialize)]
pub struct DemoConfig {
    /// Number of concurrent Tokio tasks marking meters
    #[serde(default = "default_concurrency")]
    pub concurrency: u32,

    /// How long the load runs (seconds)
    #[serde(default = "default_duration")]
    pub duration_secs: u64,

    /// How often snapshots are printed (milliseconds)
    #[serde(default = "default_report_interval")]
    pub report_interval_ms: u64,

    /// Percentage of batches counted as reads (0–100)
    #[serde(default = "default_read_pct")]
    pub read_pct: u8,
}

fn default_concurrency() -> u32 {
    8
}
fn default_duration() -> u64 {
    20
}
fn default_report_interval() -> u64 {
    1000
}
fn default_read_pct() -> u8 {
    70
}

impl DemoConfig {
    fn from_args() -> Result<Self, Box<dyn std::error::Error>> {
        let raw = std::env::args().nth(1).unwrap_or_else(|| "{}".into());
        let config: Self = serde_json::from_str(&raw)?;

        if config.concurrency == 0 || config.concurrency > 500 {
            return Err("concurrency must be between 1 and 500".into());
        }
        if config.read_pct > 100 {
            return Err("read_pct must be between 0 and 100".into());
        }
        if config.report_interval_ms == 0 {
            return Err("report_interval_ms must be positive".into());
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init();

    let demo = DemoConfig::from_args()?;
    let metrics = MetricsConfig::from_env()?;
    tracing::info!(?demo, disabled = metrics.disabled, "starting rate meter demo");

    let registry = Arc::new(Registry::new(metrics));
    let running = Arc::new(AtomicBool::new(true));

    let load = tokio::spawn(load_generator::run(
        running.clone(),
        registry.clone(),
        demo.concurrency,
        demo.duration_secs,
        demo.read_pct,
    ));
    let reporter = tokio::spawn(report::run(
        registry.clone(),
        running.clone(),
        Duration::from_millis(demo.report_interval_ms),
    ));

    load.await?;
    reporter.await?;

    registry.unregister_all();
    tracing::info!("all meters stopped");

    Ok(())
}
