//! Periodic logging of monitoring counters.
//!
//! Every interval the logger takes a flat snapshot of the registry and logs
//! the counters that changed since the previous tick.

use serde::Serialize;
use shared::monitoring::{collect_flat, Mode, Registry};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};

/// Counter changes observed over one interval.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatsDelta {
    /// Non-zero differences keyed by dotted counter path.
    pub changes: BTreeMap<String, i64>,
}

impl StatsDelta {
    /// Difference between two flat snapshots, keeping only non-zero entries.
    ///
    /// Counters missing from `previous` are treated as zero.
    #[must_use]
    pub fn between(previous: &BTreeMap<String, i64>, current: &BTreeMap<String, i64>) -> Self {
        let changes = current
            .iter()
            .filter_map(|(key, value)| {
                let delta = value - previous.get(key).copied().unwrap_or(0);
                (delta != 0).then(|| (key.clone(), delta))
            })
            .collect();
        Self { changes }
    }

    /// Returns true if nothing changed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}

/// Background task logging registry deltas.
pub struct StatsLogger {
    registry: Arc<Registry>,
    interval_duration: Duration,
}

impl StatsLogger {
    /// Creates a logger for `registry`.
    ///
    /// # Arguments
    ///
    /// * `registry` - Root of the monitoring tree
    /// * `interval_duration` - How often to log; must be non-zero
    #[must_use]
    pub fn new(registry: Arc<Registry>, interval_duration: Duration) -> Self {
        Self {
            registry,
            interval_duration,
        }
    }

    /// Takes a flat snapshot of the reported counters.
    #[must_use]
    pub fn snapshot(&self) -> BTreeMap<String, i64> {
        collect_flat(&self.registry, Mode::Reported)
    }

    /// Starts the logging loop.
    ///
    /// # Cancellation
    ///
    /// This function runs until cancelled via the task handle.
    pub async fn run(self: Arc<Self>) {
        let mut tick = interval(self.interval_duration);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        tick.tick().await;

        let mut previous = BTreeMap::new();
        loop {
            tick.tick().await;

            let current = self.snapshot();
            let delta = StatsDelta::between(&previous, &current);
            previous = current;

            if delta.is_empty() {
                tracing::info!(
                    interval_secs = self.interval_duration.as_secs(),
                    "No non-zero metrics in the last interval"
                );
                continue;
            }

            match serde_json::to_string(&delta.changes) {
                Ok(changes) => tracing::info!(
                    interval_secs = self.interval_duration.as_secs(),
                    monitoring = %changes,
                    "Non-zero metrics in the last interval"
                ),
                Err(e) => tracing::error!(error = %e, "Failed to encode metrics delta"),
            }
        }
    }
}
