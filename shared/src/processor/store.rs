//! Batch processor writing events into trace and metric stores.

use super::{BatchProcessor, ProcessorError};
use crate::context::Context;
use crate::models::{Batch, Event, Metric, Span};
use crate::storage::{MetricStore, TraceStore};
use std::sync::Arc;

/// Validates a batch and writes its spans and metrics into stores.
///
/// Validation runs over the whole batch before anything is written, so a
/// rejected batch leaves the stores untouched.
#[derive(Clone)]
pub struct StoreProcessor {
    trace_store: Arc<dyn TraceStore>,
    metric_store: Arc<dyn MetricStore>,
}

impl StoreProcessor {
    /// Creates a processor over the given stores.
    #[must_use]
    pub fn new(trace_store: Arc<dyn TraceStore>, metric_store: Arc<dyn MetricStore>) -> Self {
        Self {
            trace_store,
            metric_store,
        }
    }

    fn validate(batch: &Batch) -> Result<(), ProcessorError> {
        let errors: Vec<String> = batch
            .iter()
            .filter_map(|event| match event {
                Event::Span(span) => span.validate_span().err().map(|e| e.to_string()),
                Event::Metric(metric) => metric.validate_metric().err().map(|e| e.to_string()),
            })
            .collect();

        match errors.first() {
            None => Ok(()),
            Some(first) => Err(ProcessorError::InvalidEvents {
                count: errors.len(),
                first: first.clone(),
            }),
        }
    }
}

#[tonic::async_trait]
impl BatchProcessor for StoreProcessor {
    async fn process_batch(&self, ctx: &Context, batch: &mut Batch) -> Result<(), ProcessorError> {
        Self::validate(batch)?;

        let mut spans: Vec<Span> = Vec::new();
        let mut metrics: Vec<Metric> = Vec::new();
        for event in batch.drain(..) {
            match event {
                Event::Span(span) => spans.push(span),
                Event::Metric(metric) => metrics.push(metric),
            }
        }

        let observations = metrics
            .iter()
            .map(Metric::observation_count)
            .fold(0u64, u64::saturating_add);
        tracing::debug!(
            spans = spans.len(),
            metrics = metrics.len(),
            observations,
            peer = ?ctx.peer_addr(),
            "Storing batch"
        );

        if !spans.is_empty() {
            self.trace_store
                .insert_spans(spans)
                .map_err(|e| ProcessorError::Storage(e.to_string()))?;
        }
        if !metrics.is_empty() {
            self.metric_store
                .insert_batch(metrics)
                .map_err(|e| ProcessorError::Storage(e.to_string()))?;
        }

        Ok(())
    }
}
