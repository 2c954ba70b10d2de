//! Storage traits and in-memory implementations.
//!
//! These are the sinks behind the default batch processor; anything that
//! implements the traits can take their place.

pub mod metric_store;
pub mod trace_store;

pub use metric_store::{InMemoryMetricStore, MetricStore, MetricStoreError};
pub use trace_store::{InMemoryTraceStore, TraceStore, TraceStoreError};
