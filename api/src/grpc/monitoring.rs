//! Counter groups and snapshot reporting for the OTLP receivers.

use super::current::CurrentConsumer;
use shared::consumer::Consumer;
use shared::monitoring::{
    report_int, report_namespace, MonitoringError, Registry, Reporting, Visitor,
};
use shared::request::{monitoring_map_for_registry, MonitoringMap, ResultId};
use std::sync::Arc;

/// Registry path of the trace receiver counters.
pub const TRACES_REGISTRY: &str = "vigil.otlp.grpc.traces";

/// Registry path of the metrics receiver counters and consumer stats.
pub const METRICS_REGISTRY: &str = "vigil.otlp.grpc.metrics";

/// Monitoring state owned by the composition root.
///
/// Holds one counter group per telemetry kind and the slot of the current
/// monitored consumer. The metrics group additionally reports the current
/// consumer's stats under `consumer`, read on every visit.
#[derive(Debug, Clone)]
pub struct OtlpMonitoring {
    traces: MonitoringMap,
    metrics: MonitoringMap,
    current: Arc<CurrentConsumer>,
}

impl OtlpMonitoring {
    /// Registers the receiver counter groups and the stats reporter in `root`.
    ///
    /// # Errors
    ///
    /// Returns an error if the groups are already registered in `root`.
    pub fn new(root: &Registry) -> Result<Self, MonitoringError> {
        let traces_registry = root.new_registry(TRACES_REGISTRY)?;
        let metrics_registry = root.new_registry(METRICS_REGISTRY)?;

        let traces = monitoring_map_for_registry(&traces_registry, &ResultId::RECEIVER_KEYS)?;
        let metrics = monitoring_map_for_registry(&metrics_registry, &ResultId::RECEIVER_KEYS)?;

        let current = Arc::new(CurrentConsumer::new());
        let reporter = Arc::clone(&current);
        metrics_registry.add_func("consumer", Reporting::Report, move |_, v| {
            report_consumer_stats(&reporter, v);
        })?;

        Ok(Self {
            traces,
            metrics,
            current,
        })
    }

    /// Counters of the trace receiver.
    #[must_use]
    pub fn traces(&self) -> &MonitoringMap {
        &self.traces
    }

    /// Counters of the metrics receiver.
    #[must_use]
    pub fn metrics(&self) -> &MonitoringMap {
        &self.metrics
    }

    /// The current-consumer slot read by the stats reporter.
    #[must_use]
    pub fn current(&self) -> &CurrentConsumer {
        &self.current
    }
}

/// Writes the current consumer's stats; writes nothing without one.
///
/// Every report opens with an empty, keyless section.
pub fn report_consumer_stats(current: &CurrentConsumer, v: &mut dyn Visitor) {
    v.on_registry_start();
    v.on_registry_finished();

    let Some(consumer) = current.get() else {
        return;
    };
    let stats = consumer.stats();
    report_namespace(v, "consumer", |v| {
        report_int(v, "unsupported_dropped", stats.unsupported_metrics_dropped);
    });
}
