//! OTLP consumer converting exports into processor batches.

use super::{Consumer, ConsumerError, ConsumerStats, Metrics, Traces};
use crate::context::{Context, DeadlineExceeded};
use crate::models::Batch;
use crate::otlp::conversions::{metrics_to_batch, traces_to_batch};
use crate::processor::BatchProcessor;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

/// Converts OTLP exports into event batches and forwards them to a
/// [`BatchProcessor`], counting metrics it had to drop.
pub struct OtelConsumer {
    processor: Arc<dyn BatchProcessor>,
    unsupported_metrics_dropped: AtomicI64,
}

impl OtelConsumer {
    /// Creates a consumer feeding `processor`.
    #[must_use]
    pub fn new(processor: Arc<dyn BatchProcessor>) -> Self {
        Self {
            processor,
            unsupported_metrics_dropped: AtomicI64::new(0),
        }
    }

    async fn process(&self, ctx: &Context, mut batch: Batch) -> Result<(), ConsumerError> {
        if ctx.is_expired() {
            return Err(DeadlineExceeded.into());
        }
        ctx.run(self.processor.process_batch(ctx, &mut batch))
            .await??;
        Ok(())
    }
}

#[tonic::async_trait]
impl Consumer for OtelConsumer {
    async fn consume_traces(&self, ctx: &Context, traces: Traces) -> Result<(), ConsumerError> {
        let conversion = traces_to_batch(&traces);
        if conversion.invalid_spans > 0 {
            tracing::debug!(
                invalid_spans = conversion.invalid_spans,
                "Dropped spans without trace or span id"
            );
        }
        self.process(ctx, conversion.batch).await
    }

    async fn consume_metrics(
        &self,
        ctx: &Context,
        metrics: Metrics,
    ) -> Result<(), ConsumerError> {
        let conversion = metrics_to_batch(&metrics);
        if conversion.unsupported > 0 {
            let dropped = i64::try_from(conversion.unsupported).unwrap_or(i64::MAX);
            self.unsupported_metrics_dropped
                .fetch_add(dropped, Ordering::Relaxed);
        }
        self.process(ctx, conversion.batch).await
    }

    fn stats(&self) -> ConsumerStats {
        ConsumerStats {
            unsupported_metrics_dropped: self.unsupported_metrics_dropped.load(Ordering::Relaxed),
        }
    }
}
