//! Slot holding the most recently installed monitored consumer.

use super::monitored::MonitoredConsumer;
use std::sync::{Arc, PoisonError, RwLock};

/// Routes snapshot reads to the live [`MonitoredConsumer`].
///
/// Holds at most one consumer. Each [`set`](Self::set) replaces the previous
/// one; the lock is only held to swap or clone the pointer.
#[derive(Debug, Default)]
pub struct CurrentConsumer {
    slot: RwLock<Option<Arc<MonitoredConsumer>>>,
}

impl CurrentConsumer {
    /// Creates an empty slot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs `consumer`, replacing whatever was there.
    pub fn set(&self, consumer: Arc<MonitoredConsumer>) {
        let previous = self
            .slot
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(consumer);
        if previous.is_some() {
            tracing::debug!("Replaced current monitored consumer");
        }
    }

    /// Returns the installed consumer, if any.
    #[must_use]
    pub fn get(&self) -> Option<Arc<MonitoredConsumer>> {
        self.slot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
