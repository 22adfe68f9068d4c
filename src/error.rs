/// Errors surfaced by the registry and configuration layers.
///
/// Meter operations themselves never fail: post-stop marks are no-ops and
/// marking a snapshot is a contract violation that panics.
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    /// A metric with this name is already registered.
    #[error("duplicate metric: {name}")]
    DuplicateMetric { name: String },

    /// A tick interval that is zero or too large to schedule.
    #[error("invalid tick interval: {interval:?}")]
    InvalidInterval { interval: std::time::Duration },

    /// An environment variable held a value that could not be parsed.
    #[error("invalid value {value:?} for {var}")]
    InvalidEnv { var: &'static str, value: String },
}
