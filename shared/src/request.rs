//! Request result identifiers and their counter maps.

use crate::monitoring::{Int, MonitoringError, Registry};
use std::collections::HashMap;
use std::sync::Arc;

/// Identifies one dimension of a call's outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResultId {
    /// A call was received.
    RequestCount,
    /// A call completed, whatever its outcome.
    ResponseCount,
    /// A call completed with an error.
    ResponseErrorsCount,
    /// A call completed successfully.
    ResponseValidCount,
}

impl ResultId {
    /// The ids every receiver group tracks.
    pub const RECEIVER_KEYS: [Self; 4] = [
        Self::RequestCount,
        Self::ResponseCount,
        Self::ResponseErrorsCount,
        Self::ResponseValidCount,
    ];

    /// Stable counter name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::RequestCount => "request_count",
            Self::ResponseCount => "response_count",
            Self::ResponseErrorsCount => "response_errors_count",
            Self::ResponseValidCount => "response_valid_count",
        }
    }
}

impl std::fmt::Display for ResultId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Counters for a fixed set of result ids, backed by a registry.
///
/// Cloning shares the underlying counters.
#[derive(Debug, Clone, Default)]
pub struct MonitoringMap {
    counters: HashMap<ResultId, Arc<Int>>,
}

impl MonitoringMap {
    /// Increments the counter for `id`. Ids outside the map are ignored.
    pub fn inc(&self, id: ResultId) {
        if let Some(counter) = self.counters.get(&id) {
            counter.inc();
        }
    }

    /// Current value for `id`, zero if the id is not tracked.
    #[must_use]
    pub fn get(&self, id: ResultId) -> i64 {
        self.counters.get(&id).map_or(0, |counter| counter.get())
    }
}

/// Registers one counter per key in `registry`.
///
/// # Errors
///
/// Returns an error if any key is already registered there.
pub fn monitoring_map_for_registry(
    registry: &Registry,
    keys: &[ResultId],
) -> Result<MonitoringMap, MonitoringError> {
    let mut counters = HashMap::with_capacity(keys.len());
    for id in keys {
        counters.insert(*id, registry.new_int(id.as_str())?);
    }
    Ok(MonitoringMap { counters })
}
