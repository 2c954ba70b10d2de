//! Test doubles for the gRPC layer.

use shared::consumer::{Consumer, ConsumerError, ConsumerStats, Metrics, Traces};
use shared::context::Context;
use std::time::Duration;

/// Consumer returning a fixed outcome, optionally after a delay.
#[derive(Debug, Default)]
pub struct FakeConsumer {
    error: Option<ConsumerError>,
    delay: Option<Duration>,
    dropped: i64,
}

impl FakeConsumer {
    pub fn failing(error: ConsumerError) -> Self {
        Self {
            error: Some(error),
            ..Self::default()
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn with_dropped(mut self, dropped: i64) -> Self {
        self.dropped = dropped;
        self
    }

    async fn outcome(&self) -> Result<(), ConsumerError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match &self.error {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

#[tonic::async_trait]
impl Consumer for FakeConsumer {
    async fn consume_traces(&self, _ctx: &Context, _traces: Traces) -> Result<(), ConsumerError> {
        self.outcome().await
    }

    async fn consume_metrics(
        &self,
        _ctx: &Context,
        _metrics: Metrics,
    ) -> Result<(), ConsumerError> {
        self.outcome().await
    }

    fn stats(&self) -> ConsumerStats {
        ConsumerStats {
            unsupported_metrics_dropped: self.dropped,
        }
    }
}
