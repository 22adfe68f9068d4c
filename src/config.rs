use serde::Deserialize;

use crate::error::MetricsError;

/// Environment variable consulted by [`MetricsConfig::from_env`].
pub const DISABLED_ENV_VAR: &str = "RATEMETER_DISABLED";

/// Construction-time settings for meters.
///
/// Passed explicitly to every constructor and to [`crate::Registry::new`].
/// Changing it only affects meters built afterwards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// When set, constructors hand out [`crate::NilMeter`] and never touch
    /// the arbiter.
    pub disabled: bool,
}

impl MetricsConfig {
    pub fn enabled() -> Self {
        Self { disabled: false }
    }

    pub fn disabled() -> Self {
        Self { disabled: true }
    }

    /// Load from `RATEMETER_DISABLED`, falling back to defaults when unset.
    pub fn from_env() -> Result<Self, MetricsError> {
        match std::env::var(DISABLED_ENV_VAR) {
            Ok(raw) => Ok(Self {
                disabled: parse_flag(&raw)?,
            }),
            Err(_) => Ok(Self::default()),
        }
    }
}

fn parse_flag(raw: &str) -> Result<bool, MetricsError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "" | "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(MetricsError::InvalidEnv {
            var: DISABLED_ENV_VAR,
            value: raw.to_owned(),
        }),
    }
}
