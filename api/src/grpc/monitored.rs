//! Consumer decorator counting every call and its outcome.

use super::monitoring::OtlpMonitoring;
use shared::consumer::{Consumer, ConsumerError, ConsumerStats, Metrics, Traces};
use shared::context::Context;
use shared::models::TelemetryKind;
use shared::request::{MonitoringMap, ResultId};
use std::future::Future;
use std::sync::Arc;
use tracing::Span;

/// Wraps a downstream [`Consumer`] with per-kind request accounting.
///
/// For every call, `request_count` and `response_count` grow by exactly one
/// and exactly one of `response_errors_count` / `response_valid_count` grows
/// by one. Calls that never see the downstream result (the future was
/// dropped, or the downstream panicked) count as errors.
pub struct MonitoredConsumer {
    consumer: Arc<dyn Consumer>,
    traces: MonitoringMap,
    metrics: MonitoringMap,
    logger: Span,
}

impl std::fmt::Debug for MonitoredConsumer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MonitoredConsumer")
            .field("traces", &self.traces)
            .field("metrics", &self.metrics)
            .finish_non_exhaustive()
    }
}

impl MonitoredConsumer {
    /// Wraps `consumer`, counting into the groups owned by `monitoring`.
    ///
    /// Error records are emitted as children of `logger`.
    #[must_use]
    pub fn new(consumer: Arc<dyn Consumer>, monitoring: &OtlpMonitoring, logger: Span) -> Self {
        Self {
            consumer,
            traces: monitoring.traces().clone(),
            metrics: monitoring.metrics().clone(),
            logger,
        }
    }

    async fn observe<F>(&self, kind: TelemetryKind, call: F) -> Result<(), ConsumerError>
    where
        F: Future<Output = Result<(), ConsumerError>>,
    {
        let counters = match kind {
            TelemetryKind::Traces => &self.traces,
            TelemetryKind::Metrics => &self.metrics,
        };
        counters.inc(ResultId::RequestCount);
        let mut guard = CallGuard {
            counters,
            kind,
            logger: &self.logger,
            settled: false,
        };

        let result = call.await;
        match &result {
            Ok(()) => guard.settle(ResultId::ResponseValidCount),
            Err(err) => {
                guard.settle(ResultId::ResponseErrorsCount);
                tracing::error!(
                    parent: &self.logger,
                    kind = %kind,
                    error = %err,
                    "{} returned an error",
                    operation(kind)
                );
            }
        }
        result
    }
}

fn operation(kind: TelemetryKind) -> &'static str {
    match kind {
        TelemetryKind::Traces => "ConsumeTraces",
        TelemetryKind::Metrics => "ConsumeMetrics",
    }
}

/// Counts the response when the call is left, however it is left.
struct CallGuard<'a> {
    counters: &'a MonitoringMap,
    kind: TelemetryKind,
    logger: &'a Span,
    settled: bool,
}

impl CallGuard<'_> {
    fn settle(&mut self, outcome: ResultId) {
        self.counters.inc(outcome);
        self.settled = true;
    }
}

impl Drop for CallGuard<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.counters.inc(ResultId::ResponseErrorsCount);
            tracing::warn!(
                parent: self.logger,
                kind = %self.kind,
                "{} ended before the consumer returned",
                operation(self.kind)
            );
        }
        self.counters.inc(ResultId::ResponseCount);
    }
}

#[tonic::async_trait]
impl Consumer for MonitoredConsumer {
    async fn consume_traces(&self, ctx: &Context, traces: Traces) -> Result<(), ConsumerError> {
        self.observe(
            TelemetryKind::Traces,
            self.consumer.consume_traces(ctx, traces),
        )
        .await
    }

    async fn consume_metrics(
        &self,
        ctx: &Context,
        metrics: Metrics,
    ) -> Result<(), ConsumerError> {
        self.observe(
            TelemetryKind::Metrics,
            self.consumer.consume_metrics(ctx, metrics),
        )
        .await
    }

    fn stats(&self) -> ConsumerStats {
        self.consumer.stats()
    }
}
