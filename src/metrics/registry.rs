use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use super::Meter;
use crate::config::MetricsConfig;
use crate::error::MetricsError;

/// Named meters, shared across threads.
///
/// Carries the [`MetricsConfig`] used by the `*_registered_*` constructors
/// so callers don't thread it separately.
#[derive(Default)]
pub struct Registry {
    config: MetricsConfig,
    meters: DashMap<String, Arc<dyn Meter>>,
}

impl Registry {
    pub fn new(config: MetricsConfig) -> Self {
        Self {
            config,
            meters: DashMap::new(),
        }
    }

    pub fn config(&self) -> &MetricsConfig {
        &self.config
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Meter>> {
        self.meters.get(name).map(|m| m.value().clone())
    }

    /// Return the meter under `name`, or build one with `factory` and store
    /// it. `factory` runs at most once per name.
    pub fn get_or_register<F>(&self, name: &str, factory: F) -> Arc<dyn Meter>
    where
        F: FnOnce() -> Arc<dyn Meter>,
    {
        if let Some(existing) = self.get(name) {
            return existing;
        }

        self.meters
            .entry(name.to_owned())
            .or_insert_with(|| {
                tracing::debug!(name, "registering meter");
                factory()
            })
            .value()
            .clone()
    }

    /// Store `meter` under `name`, failing if the name is taken.
    pub fn register(&self, name: &str, meter: Arc<dyn Meter>) -> Result<(), MetricsError> {
        match self.meters.entry(name.to_owned()) {
            Entry::Occupied(_) => Err(MetricsError::DuplicateMetric {
                name: name.to_owned(),
            }),
            Entry::Vacant(slot) => {
                tracing::debug!(name, "registering meter");
                slot.insert(meter);
                Ok(())
            }
        }
    }

    /// Remove `name` and stop its meter so the arbiter releases it.
    pub fn unregister(&self, name: &str) -> Option<Arc<dyn Meter>> {
        let (_, meter) = self.meters.remove(name)?;
        meter.stop();
        tracing::debug!(name, "unregistered meter");
        Some(meter)
    }

    /// Remove and stop every meter.
    pub fn unregister_all(&self) {
        for name in self.names() {
            self.unregister(&name);
        }
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.meters.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.meters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.meters.is_empty()
    }
}
