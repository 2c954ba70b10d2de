//! Conversions from OTLP protobuf messages into Vigil models.
//!
//! Export requests are flattened into a [`Batch`] of [`Event`]s. Metric kinds
//! without an internal representation (summaries, exponential histograms) are
//! dropped and counted so the consumer can report them.

use crate::models::{
    Attributes, Batch, Event, HistogramData, Metric, MetricData, Span, SpanEvent, SpanKind,
    SpanStatus,
};
use crate::otlp::proto;
use crate::otlp::proto::common::v1::{any_value, AnyValue, KeyValue};
use base64::Engine;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

const SERVICE_NAME: &str = "service.name";
const UNKNOWN_SERVICE: &str = "unknown_service";

/// Converts OTLP nanoseconds since the epoch; out of range values saturate.
fn nanos_to_datetime(nanos: u64) -> DateTime<Utc> {
    DateTime::from_timestamp_nanos(i64::try_from(nanos).unwrap_or(i64::MAX))
}

fn any_value_to_json(value: &AnyValue) -> serde_json::Value {
    use serde_json::Value as Json;

    let Some(value) = &value.value else {
        return Json::Null;
    };
    match value {
        any_value::Value::StringValue(s) => Json::String(s.clone()),
        any_value::Value::BoolValue(b) => Json::Bool(*b),
        any_value::Value::IntValue(i) => Json::from(*i),
        any_value::Value::DoubleValue(d) => Json::from(*d),
        any_value::Value::ArrayValue(array) => {
            Json::Array(array.values.iter().map(any_value_to_json).collect())
        }
        any_value::Value::KvlistValue(list) => Json::Object(
            list.values
                .iter()
                .map(|kv| (kv.key.clone(), kv.value.as_ref().map_or(Json::Null, any_value_to_json)))
                .collect(),
        ),
        any_value::Value::BytesValue(bytes) => {
            Json::String(base64::engine::general_purpose::STANDARD.encode(bytes))
        }
    }
}

/// Attributes with a value; keys without one are skipped.
fn to_attributes(key_values: &[KeyValue]) -> Attributes {
    key_values
        .iter()
        .filter_map(|kv| Some((kv.key.clone(), any_value_to_json(kv.value.as_ref()?))))
        .collect()
}

/// Only string-valued attributes, for metric labels.
fn to_labels(key_values: &[KeyValue]) -> BTreeMap<String, String> {
    key_values
        .iter()
        .filter_map(|kv| match kv.value.as_ref()?.value.as_ref()? {
            any_value::Value::StringValue(s) => Some((kv.key.clone(), s.clone())),
            _ => None,
        })
        .collect()
}

/// What a resource contributes to every span or data point under it.
#[derive(Debug, Default, Clone)]
pub struct ResourceInfo {
    /// `service.name`, when set as a string.
    pub service: Option<String>,
    /// The remaining resource attributes.
    pub attributes: Attributes,
}

impl ResourceInfo {
    /// Reads a resource; a missing resource yields no service and no attributes.
    #[must_use]
    pub fn from_otlp(resource: Option<&proto::resource::v1::Resource>) -> Self {
        let mut attributes = resource.map(|r| to_attributes(&r.attributes)).unwrap_or_default();
        let service = match attributes.remove(SERVICE_NAME) {
            Some(serde_json::Value::String(name)) if !name.is_empty() => Some(name),
            _ => None,
        };
        Self {
            service,
            attributes,
        }
    }
}

/// Converts one OTLP span.
///
/// Returns `None` when the trace or span id is missing. The service falls
/// back to the instrumentation scope name, then to `unknown_service`.
#[must_use]
pub fn span_from_otlp(
    span: &proto::trace::v1::Span,
    resource: &ResourceInfo,
    scope_name: &str,
) -> Option<Span> {
    if span.trace_id.is_empty() || span.span_id.is_empty() {
        return None;
    }

    let service = resource.service.clone().unwrap_or_else(|| {
        if scope_name.is_empty() {
            UNKNOWN_SERVICE.to_string()
        } else {
            scope_name.to_string()
        }
    });

    let mut attributes = to_attributes(&span.attributes);
    attributes.extend(
        resource
            .attributes
            .iter()
            .map(|(key, value)| (format!("resource.{key}"), value.clone())),
    );

    let events = span
        .events
        .iter()
        .map(|event| SpanEvent {
            name: event.name.clone(),
            time: nanos_to_datetime(event.time_unix_nano),
            attributes: to_attributes(&event.attributes),
        })
        .collect();

    Some(Span {
        trace_id: hex::encode(&span.trace_id),
        span_id: hex::encode(&span.span_id),
        parent_span_id: (!span.parent_span_id.is_empty()).then(|| hex::encode(&span.parent_span_id)),
        name: if span.name.is_empty() {
            "unknown".to_string()
        } else {
            span.name.clone()
        },
        service,
        kind: SpanKind::from_otlp(span.kind),
        status: span
            .status
            .as_ref()
            .map_or(SpanStatus::Unset, |s| SpanStatus::from_otlp(s.code)),
        start_time: nanos_to_datetime(span.start_time_unix_nano),
        end_time: nanos_to_datetime(span.end_time_unix_nano),
        attributes,
        events,
    })
}

/// Builds one internal data point; a zero timestamp means "now".
fn data_point(
    metric: &proto::metrics::v1::Metric,
    data: MetricData,
    time_unix_nano: u64,
    point_attributes: &[KeyValue],
    resource: &ResourceInfo,
) -> Metric {
    let mut point = Metric::new(&metric.name, data);
    if time_unix_nano > 0 {
        point.timestamp = nanos_to_datetime(time_unix_nano);
    }
    point.labels = to_labels(point_attributes);
    if let Some(service) = &resource.service {
        point.labels.insert("service".to_string(), service.clone());
    }
    point.unit = (!metric.unit.is_empty()).then(|| metric.unit.clone());
    point.description = (!metric.description.is_empty()).then(|| metric.description.clone());
    point
}

/// Converts one OTLP metric into data points.
///
/// Returns `None` when the metric's data kind has no internal representation
/// (summaries and exponential histograms). Number points without a value are
/// skipped; a metric without data yields an empty vec.
#[must_use]
pub fn metric_points_from_otlp(
    metric: &proto::metrics::v1::Metric,
    resource: &ResourceInfo,
) -> Option<Vec<Metric>> {
    use proto::metrics::v1::metric::Data;
    use proto::metrics::v1::number_data_point::Value;

    let numbers = |points: &[proto::metrics::v1::NumberDataPoint], counter: bool| -> Vec<Metric> {
        points
            .iter()
            .filter_map(|dp| {
                #[allow(clippy::cast_precision_loss)]
                let value = match dp.value.as_ref()? {
                    Value::AsDouble(d) => *d,
                    Value::AsInt(i) => *i as f64,
                };
                let data = if counter {
                    MetricData::Counter(value)
                } else {
                    MetricData::Gauge(value)
                };
                Some(data_point(metric, data, dp.time_unix_nano, &dp.attributes, resource))
            })
            .collect()
    };

    let points = match &metric.data {
        Some(Data::Gauge(gauge)) => numbers(&gauge.data_points, false),
        Some(Data::Sum(sum)) => numbers(&sum.data_points, sum.is_monotonic),
        Some(Data::Histogram(histogram)) => histogram
            .data_points
            .iter()
            .map(|dp| {
                let data = MetricData::Histogram(HistogramData {
                    bounds: dp.explicit_bounds.clone(),
                    bucket_counts: dp.bucket_counts.clone(),
                    sum: dp.sum.unwrap_or_default(),
                    count: dp.count,
                });
                data_point(metric, data, dp.time_unix_nano, &dp.attributes, resource)
            })
            .collect(),
        Some(Data::ExponentialHistogram(_) | Data::Summary(_)) => return None,
        None => Vec::new(),
    };
    Some(points)
}

/// Result of flattening a trace export request.
#[derive(Debug, Default)]
pub struct TraceConversion {
    /// Converted spans.
    pub batch: Batch,
    /// Spans dropped for lacking a trace or span id.
    pub invalid_spans: u64,
}

/// Flattens every span of a trace export request into a batch.
#[must_use]
pub fn traces_to_batch(
    request: &proto::collector::trace::v1::ExportTraceServiceRequest,
) -> TraceConversion {
    let mut conversion = TraceConversion::default();

    for resource_spans in &request.resource_spans {
        let resource = ResourceInfo::from_otlp(resource_spans.resource.as_ref());
        for scope_spans in &resource_spans.scope_spans {
            let scope_name = scope_spans.scope.as_ref().map_or("", |s| s.name.as_str());
            for span in &scope_spans.spans {
                match span_from_otlp(span, &resource, scope_name) {
                    Some(span) => conversion.batch.push(Event::Span(span)),
                    None => conversion.invalid_spans += 1,
                }
            }
        }
    }

    conversion
}

/// Result of flattening a metrics export request.
#[derive(Debug, Default)]
pub struct MetricConversion {
    /// Converted metric data points.
    pub batch: Batch,
    /// Metrics dropped because their data kind is not supported.
    pub unsupported: u64,
}

/// Flattens every metric data point of a metrics export request into a batch.
#[must_use]
pub fn metrics_to_batch(
    request: &proto::collector::metrics::v1::ExportMetricsServiceRequest,
) -> MetricConversion {
    let mut conversion = MetricConversion::default();

    for resource_metrics in &request.resource_metrics {
        let resource = ResourceInfo::from_otlp(resource_metrics.resource.as_ref());
        let metrics = resource_metrics
            .scope_metrics
            .iter()
            .flat_map(|scope| &scope.metrics);
        for metric in metrics {
            if let Some(points) = metric_points_from_otlp(metric, &resource) {
                conversion.batch.extend(points.into_iter().map(Event::Metric));
            } else {
                tracing::debug!(metric = %metric.name, "Dropping unsupported metric");
                conversion.unsupported += 1;
            }
        }
    }

    conversion
}

#[cfg(test)]
#[path = "conversions_test.rs"]
mod conversions_test;
