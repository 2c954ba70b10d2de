//! Span sink written by the store-backed batch processor.

use crate::models::{Span, Trace};
use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;
use thiserror::Error;

/// Errors returned by a [`TraceStore`].
#[derive(Debug, Error)]
pub enum TraceStoreError {
    /// A writer panicked while holding the store lock.
    #[error("trace store lock poisoned")]
    Poisoned,

    /// No span with this trace id is stored.
    #[error("trace {0} not found")]
    NotFound(String),
}

/// Storage for spans, grouped into traces.
pub trait TraceStore: Send + Sync {
    /// Stores spans. A span whose trace and span id are already stored
    /// replaces the earlier copy, so retried exports are not duplicated.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written.
    fn insert_spans(&self, spans: Vec<Span>) -> Result<(), TraceStoreError>;

    /// Returns every stored span of a trace.
    ///
    /// # Errors
    ///
    /// Returns [`TraceStoreError::NotFound`] for an unknown trace id.
    fn get_trace(&self, trace_id: &str) -> Result<Trace, TraceStoreError>;

    /// Total number of stored spans.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn span_count(&self) -> Result<usize, TraceStoreError>;
}

/// Keeps spans in memory, indexed by trace id then span id.
#[derive(Debug, Default)]
pub struct InMemoryTraceStore {
    traces: RwLock<HashMap<String, BTreeMap<String, Span>>>,
}

impl InMemoryTraceStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl TraceStore for InMemoryTraceStore {
    fn insert_spans(&self, spans: Vec<Span>) -> Result<(), TraceStoreError> {
        let mut traces = self.traces.write().map_err(|_| TraceStoreError::Poisoned)?;
        for span in spans {
            traces
                .entry(span.trace_id.clone())
                .or_default()
                .insert(span.span_id.clone(), span);
        }
        Ok(())
    }

    fn get_trace(&self, trace_id: &str) -> Result<Trace, TraceStoreError> {
        let traces = self.traces.read().map_err(|_| TraceStoreError::Poisoned)?;
        traces
            .get(trace_id)
            .and_then(|spans| Trace::assemble(spans.values().cloned().collect()))
            .ok_or_else(|| TraceStoreError::NotFound(trace_id.to_string()))
    }

    fn span_count(&self) -> Result<usize, TraceStoreError> {
        let traces = self.traces.read().map_err(|_| TraceStoreError::Poisoned)?;
        Ok(traces.values().map(BTreeMap::len).sum())
    }
}
