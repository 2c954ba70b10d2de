//! Integration tests for per-call accounting of the monitored consumer.
//!
//! Tests cover:
//! - Counter totals for mixed outcomes, sequential and concurrent
//! - Error passthrough
//! - Snapshot reporting before and across registrations
//! - Panicking and cancelled calls

use super::common::{Behavior, CapturingRegistrar, ScriptedConsumer};
use api::grpc::{register_consumer, MonitoredConsumer, OtlpMonitoring};
use shared::consumer::{Consumer, ConsumerError, Metrics, Traces};
use shared::context::Context;
use shared::monitoring::{collect_flat, collect_structured, Mode, Registry};
use shared::otlp::proto::collector::metrics::v1::metrics_service_server::MetricsService;
use shared::processor::ProcessorError;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tonic::Request;
use tracing::Span;

fn storage_error() -> ConsumerError {
    ConsumerError::Processor(ProcessorError::Storage("backend offline".to_string()))
}

fn setup(consumer: ScriptedConsumer) -> (Registry, Arc<MonitoredConsumer>) {
    let root = Registry::new();
    let monitoring = OtlpMonitoring::new(&root).unwrap();
    let monitored = Arc::new(MonitoredConsumer::new(
        Arc::new(consumer),
        &monitoring,
        Span::none(),
    ));
    monitoring.current().set(Arc::clone(&monitored));
    (root, monitored)
}

/// The four receiver counters of `kind` as (request, response, errors, valid).
fn counters(root: &Registry, kind: &str) -> (i64, i64, i64, i64) {
    let snapshot: BTreeMap<String, i64> = collect_flat(root, Mode::Reported);
    let read = |name: &str| snapshot[&format!("vigil.otlp.grpc.{kind}.{name}")];
    (
        read("request_count"),
        read("response_count"),
        read("response_errors_count"),
        read("response_valid_count"),
    )
}

#[tokio::test]
async fn test_n_calls_k_failures_per_kind() {
    // Every third call fails.
    let (root, consumer) = setup(ScriptedConsumer::new(|call| {
        if call % 3 == 0 {
            Behavior::Fail {
                yields: 0,
                error: storage_error(),
            }
        } else {
            Behavior::Succeed { yields: 0 }
        }
    }));
    let ctx = Context::background();

    for _ in 0..9 {
        let _ = consumer.consume_traces(&ctx, Traces::default()).await;
    }
    for _ in 0..3 {
        let _ = consumer.consume_metrics(&ctx, Metrics::default()).await;
    }

    // Calls 0, 3 and 6 fail for traces; 9 fails for metrics.
    assert_eq!(counters(&root, "traces"), (9, 9, 3, 6));
    assert_eq!(counters(&root, "metrics"), (3, 3, 1, 2));
}

#[tokio::test]
async fn test_failed_call_returns_downstream_error() {
    let (_root, consumer) = setup(ScriptedConsumer::new(|_| Behavior::Fail {
        yields: 1,
        error: storage_error(),
    }));

    let result = consumer
        .consume_metrics(&Context::background(), Metrics::default())
        .await;

    assert_eq!(result, Err(storage_error()));
}

#[tokio::test]
async fn test_successful_call_returns_ok() {
    let (root, consumer) = setup(ScriptedConsumer::always_ok());

    let result = consumer
        .consume_traces(&Context::background(), Traces::default())
        .await;

    assert_eq!(result, Ok(()));
    assert_eq!(counters(&root, "traces"), (1, 1, 0, 1));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_calls_keep_exact_totals() {
    // Odd calls fail; every call yields a scrambled number of times.
    let (root, consumer) = setup(ScriptedConsumer::new(|call| {
        let yields = (call * 7919) % 13;
        if call % 2 == 1 {
            Behavior::Fail {
                yields,
                error: storage_error(),
            }
        } else {
            Behavior::Succeed { yields }
        }
    }));

    let handles: Vec<_> = (0..100)
        .map(|_| {
            let consumer = Arc::clone(&consumer);
            tokio::spawn(async move {
                consumer
                    .consume_traces(&Context::background(), Traces::default())
                    .await
            })
        })
        .collect();

    let mut failures = 0;
    for handle in handles {
        if handle.await.unwrap().is_err() {
            failures += 1;
        }
    }

    assert_eq!(failures, 50);
    assert_eq!(counters(&root, "traces"), (100, 100, 50, 50));
    assert_eq!(counters(&root, "metrics"), (0, 0, 0, 0));
}

#[tokio::test]
async fn test_panicking_consumer_counts_as_error() {
    let (root, consumer) = setup(ScriptedConsumer::new(|_| Behavior::Panic));

    let joined = tokio::spawn(async move {
        consumer
            .consume_traces(&Context::background(), Traces::default())
            .await
    })
    .await;

    assert!(joined.unwrap_err().is_panic());
    assert_eq!(counters(&root, "traces"), (1, 1, 1, 0));
}

#[tokio::test]
async fn test_cancelled_call_counts_as_error() {
    let (root, consumer) = setup(ScriptedConsumer::new(|_| {
        Behavior::Stall(Duration::from_secs(60))
    }));

    let ctx = Context::background();
    let call = consumer.consume_metrics(&ctx, Metrics::default());
    assert!(tokio::time::timeout(Duration::from_millis(20), call)
        .await
        .is_err());

    assert_eq!(counters(&root, "metrics"), (1, 1, 1, 0));
}

#[test]
fn test_snapshot_before_registration_has_no_consumer() {
    let root = Registry::new();
    let _monitoring = OtlpMonitoring::new(&root).unwrap();

    let snapshot = collect_structured(&root, Mode::Reported);

    let metrics = &snapshot["vigil"]["otlp"]["grpc"]["metrics"];
    assert_eq!(metrics["request_count"], 0);
    assert!(metrics.get("consumer").is_none());
    assert!(!collect_flat(&root, Mode::Full)
        .keys()
        .any(|key| key.contains("consumer")));
}

#[tokio::test]
async fn test_second_registration_replaces_reported_stats() {
    let root = Registry::new();
    let monitoring = OtlpMonitoring::new(&root).unwrap();
    let mut first = CapturingRegistrar::default();
    register_consumer(
        &mut first,
        Arc::new(ScriptedConsumer::always_ok().with_dropped(2)),
        &monitoring,
        Span::none(),
    )
    .unwrap();
    let first_receiver = first.metrics.take().unwrap();
    first_receiver
        .export(Request::new(Metrics::default()))
        .await
        .unwrap();

    let flat = collect_flat(&root, Mode::Reported);
    assert_eq!(flat["vigil.otlp.grpc.metrics.consumer.unsupported_dropped"], 2);
    assert_eq!(flat["vigil.otlp.grpc.metrics.request_count"], 1);

    let mut second = CapturingRegistrar::default();
    register_consumer(
        &mut second,
        Arc::new(ScriptedConsumer::always_ok().with_dropped(11)),
        &monitoring,
        Span::none(),
    )
    .unwrap();

    let flat = collect_flat(&root, Mode::Reported);
    assert_eq!(flat["vigil.otlp.grpc.metrics.consumer.unsupported_dropped"], 11);
    // Earlier calls stay counted; the groups are shared.
    assert_eq!(flat["vigil.otlp.grpc.metrics.request_count"], 1);

    // The replaced consumer keeps serving and counting.
    first_receiver
        .export(Request::new(Metrics::default()))
        .await
        .unwrap();
    let flat = collect_flat(&root, Mode::Reported);
    assert_eq!(flat["vigil.otlp.grpc.metrics.request_count"], 2);
    assert_eq!(flat["vigil.otlp.grpc.metrics.response_valid_count"], 2);
    assert_eq!(flat["vigil.otlp.grpc.metrics.consumer.unsupported_dropped"], 11);
}

#[test]
fn test_trace_registration_failure_skips_metrics() {
    let monitoring = OtlpMonitoring::new(&Registry::new()).unwrap();
    let mut registrar = CapturingRegistrar {
        fail_traces: true,
        ..CapturingRegistrar::default()
    };

    let err = register_consumer(
        &mut registrar,
        Arc::new(ScriptedConsumer::always_ok()),
        &monitoring,
        Span::none(),
    )
    .unwrap_err();

    let message = format!("{err:#}");
    assert!(message.contains("trace"));
    assert!(message.contains("already registered"));
    assert!(registrar.traces.is_none());
    assert!(registrar.metrics.is_none());
}
