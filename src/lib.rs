//! Event meters with 1/5/15-minute decaying rates and a lifetime mean rate.
//!
//! All live meters are ticked from one shared [`Arbiter`] thread. A meter is
//! tracked until [`Meter::stop`] is called.
//!
//! ```no_run
//! use ratemeter::{new_meter, Meter, MetricsConfig};
//!
//! let requests = new_meter(&MetricsConfig::default());
//! requests.mark(1);
//! println!("{} req/s over the last minute", requests.rate1());
//! requests.stop();
//! ```

pub mod config;
pub mod error;
pub mod metrics;

pub use config::MetricsConfig;
pub use error::MetricsError;
pub use metrics::{
    get_or_register_meter, new_meter, new_meter_with_arbiter, new_registered_meter, Arbiter, Ewma,
    Meter, MeterSnapshot, NilMeter, Registry, StandardMeter, DEFAULT_TICK_INTERVAL,
};
