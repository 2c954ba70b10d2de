//! Application state module.
//!
//! Defines the shared application state that is passed to route handlers.

use shared::monitoring::Registry;
use shared::processor::{BatchProcessor, StoreProcessor};
use shared::storage::{InMemoryMetricStore, InMemoryTraceStore, MetricStore, TraceStore};
use std::sync::Arc;

/// Application state shared across all request handlers.
///
/// Holds the monitoring registry read by `/stats` and the stores written by
/// the default batch processor.
#[derive(Clone)]
pub struct AppState {
    /// Root of the monitoring tree.
    registry: Arc<Registry>,
    /// The metric storage backend.
    metric_store: Arc<dyn MetricStore>,
    /// The trace storage backend.
    trace_store: Arc<dyn TraceStore>,
}

impl AppState {
    /// Creates a new application state with the given registry and stores.
    pub fn new(
        registry: Arc<Registry>,
        metric_store: Arc<dyn MetricStore>,
        trace_store: Arc<dyn TraceStore>,
    ) -> Self {
        Self {
            registry,
            metric_store,
            trace_store,
        }
    }

    /// Creates a new application state with an empty registry and in-memory stores.
    #[must_use]
    pub fn with_in_memory_store() -> Self {
        Self::new(
            Arc::new(Registry::new()),
            Arc::new(InMemoryMetricStore::new()),
            Arc::new(InMemoryTraceStore::new()),
        )
    }

    /// Returns the monitoring registry.
    #[must_use]
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Returns a reference to the metric store.
    #[must_use]
    pub fn metric_store(&self) -> &dyn MetricStore {
        self.metric_store.as_ref()
    }

    /// Returns a reference to the trace store.
    #[must_use]
    pub fn trace_store(&self) -> &dyn TraceStore {
        self.trace_store.as_ref()
    }

    /// Builds a batch processor writing into this state's stores.
    #[must_use]
    pub fn store_processor(&self) -> Arc<dyn BatchProcessor> {
        Arc::new(StoreProcessor::new(
            Arc::clone(&self.trace_store),
            Arc::clone(&self.metric_store),
        ))
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::with_in_memory_store()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::context::Context;
    use shared::models::{Event, Metric, Span};

    #[tokio::test]
    async fn test_store_processor_writes_into_state() {
        let state = AppState::with_in_memory_store();
        let processor = state.store_processor();

        let mut batch = vec![
            Event::Span(Span::new("trace-1", "span-1", "checkout", "shop")),
            Event::Metric(Metric::gauge("queue_depth", 4.0)),
        ];
        processor
            .process_batch(&Context::background(), &mut batch)
            .await
            .unwrap();

        assert_eq!(state.trace_store().span_count().unwrap(), 1);
        assert_eq!(state.metric_store().count().unwrap(), 1);
    }

    #[test]
    fn test_app_state_is_clone() {
        let state = AppState::with_in_memory_store();
        let state2 = state.clone();

        state.registry().new_int("hits").unwrap().inc();

        assert!(Arc::ptr_eq(state.registry(), state2.registry()));
        assert!(state2.registry().new_int("hits").is_err());
    }
}
