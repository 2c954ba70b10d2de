//! Vigil CLI
//!
//! Sends OTLP trace and metric exports to a Vigil server over gRPC, either
//! from an OTLP/JSON file or as a synthetic payload.
//!
//! # Usage
//!
//! ```bash
//! vigil --help
//! vigil send-traces --count 20
//! vigil send-metrics --count 5 --unsupported 2
//! vigil send-traces --file export.json
//! ```
//!
//! Byte fields (trace and span ids) in JSON files are base64 encoded.

#![deny(unsafe_code)]

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use shared::otlp::proto;
use shared::otlp::proto::collector::metrics::v1::{
    metrics_service_client::MetricsServiceClient, ExportMetricsServiceRequest,
};
use shared::otlp::proto::collector::trace::v1::{
    trace_service_client::TraceServiceClient, ExportTraceServiceRequest,
};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Vigil CLI - send OTLP exports to a Vigil server
#[derive(Parser)]
#[command(name = "vigil")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// gRPC endpoint of the server
    #[arg(
        short,
        long,
        env = "VIGIL_GRPC_URL",
        default_value = "http://localhost:4317"
    )]
    endpoint: String,

    /// Per-call timeout in seconds, sent as the gRPC deadline
    #[arg(long, default_value_t = 10)]
    timeout_secs: u64,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Export traces
    SendTraces {
        /// OTLP/JSON `ExportTraceServiceRequest` file
        #[arg(short, long, conflicts_with = "count")]
        file: Option<PathBuf>,

        /// Number of synthetic spans in one trace
        #[arg(short, long, default_value_t = 10)]
        count: usize,

        /// Service name of synthetic spans
        #[arg(long, default_value = "vigil-cli")]
        service: String,
    },
    /// Export metrics
    SendMetrics {
        /// OTLP/JSON `ExportMetricsServiceRequest` file
        #[arg(short, long, conflicts_with_all = ["count", "unsupported"])]
        file: Option<PathBuf>,

        /// Number of synthetic gauge metrics
        #[arg(short, long, default_value_t = 10)]
        count: usize,

        /// Number of synthetic summary metrics, which the server drops
        #[arg(long, default_value_t = 0)]
        unsupported: usize,

        /// Service name of synthetic metrics
        #[arg(long, default_value = "vigil-cli")]
        service: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    let timeout = Duration::from_secs(cli.timeout_secs);

    match cli.command {
        Some(Commands::SendTraces {
            file,
            count,
            service,
        }) => {
            let request = match file {
                Some(path) => read_json(&path)?,
                None => synthetic_traces(&service, count, now_nanos()),
            };
            let spans = span_count(&request);
            send_traces(&cli.endpoint, request, timeout).await?;
            println!("Exported {spans} span(s) to {}", cli.endpoint);
        }
        Some(Commands::SendMetrics {
            file,
            count,
            unsupported,
            service,
        }) => {
            let request = match file {
                Some(path) => read_json(&path)?,
                None => synthetic_metrics(&service, count, unsupported, now_nanos()),
            };
            let metrics = metric_count(&request);
            send_metrics(&cli.endpoint, request, timeout).await?;
            println!("Exported {metrics} metric(s) to {}", cli.endpoint);
        }
        None => {
            println!("Vigil CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("Use --help for usage information");
        }
    }

    Ok(())
}

async fn send_traces(
    endpoint: &str,
    request: ExportTraceServiceRequest,
    timeout: Duration,
) -> Result<()> {
    let mut client = TraceServiceClient::connect(endpoint.to_string())
        .await
        .with_context(|| format!("failed to connect to {endpoint}"))?;
    let mut request = tonic::Request::new(request);
    request.set_timeout(timeout);

    let response = client
        .export(request)
        .await
        .context("trace export rejected")?
        .into_inner();
    if let Some(partial) = response.partial_success {
        tracing::warn!(
            rejected = partial.rejected_spans,
            message = %partial.error_message,
            "Server reported partial success"
        );
    }
    Ok(())
}

async fn send_metrics(
    endpoint: &str,
    request: ExportMetricsServiceRequest,
    timeout: Duration,
) -> Result<()> {
    let mut client = MetricsServiceClient::connect(endpoint.to_string())
        .await
        .with_context(|| format!("failed to connect to {endpoint}"))?;
    let mut request = tonic::Request::new(request);
    request.set_timeout(timeout);

    let response = client
        .export(request)
        .await
        .context("metrics export rejected")?
        .into_inner();
    if let Some(partial) = response.partial_success {
        tracing::warn!(
            rejected = partial.rejected_data_points,
            message = %partial.error_message,
            "Server reported partial success"
        );
    }
    Ok(())
}

fn read_json<T: shared::serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("invalid OTLP/JSON in {}", path.display()))
}

fn now_nanos() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| u64::try_from(d.as_nanos()).unwrap_or(u64::MAX))
}

fn resource(service: &str) -> proto::resource::v1::Resource {
    proto::resource::v1::Resource {
        attributes: vec![proto::common::v1::KeyValue {
            key: "service.name".to_string(),
            value: Some(proto::common::v1::AnyValue {
                value: Some(proto::common::v1::any_value::Value::StringValue(
                    service.to_string(),
                )),
            }),
        }],
        dropped_attributes_count: 0,
    }
}

/// One trace of `count` spans: a root and children, 5ms apart.
fn synthetic_traces(service: &str, count: usize, start_nanos: u64) -> ExportTraceServiceRequest {
    let trace_id = start_nanos.to_be_bytes().repeat(2);
    let span_id = |i: usize| (start_nanos ^ (i as u64 + 1)).to_be_bytes().to_vec();

    let spans = (0..count)
        .map(|i| {
            let offset = i as u64 * 5_000_000;
            proto::trace::v1::Span {
                trace_id: trace_id.clone(),
                span_id: span_id(i),
                parent_span_id: if i == 0 { Vec::new() } else { span_id(0) },
                name: if i == 0 {
                    "synthetic request".to_string()
                } else {
                    format!("synthetic step {i}")
                },
                kind: if i == 0 { 2 } else { 1 },
                start_time_unix_nano: start_nanos + offset,
                end_time_unix_nano: start_nanos + offset + 4_000_000,
                ..Default::default()
            }
        })
        .collect();

    ExportTraceServiceRequest {
        resource_spans: vec![proto::trace::v1::ResourceSpans {
            resource: Some(resource(service)),
            scope_spans: vec![proto::trace::v1::ScopeSpans {
                scope: None,
                spans,
                schema_url: String::new(),
            }],
            schema_url: String::new(),
        }],
    }
}

/// `count` gauges plus `unsupported` summaries.
fn synthetic_metrics(
    service: &str,
    count: usize,
    unsupported: usize,
    time_nanos: u64,
) -> ExportMetricsServiceRequest {
    use proto::metrics::v1::{
        metric, number_data_point, Gauge, Metric, NumberDataPoint, Summary, SummaryDataPoint,
    };

    let gauges = (0..count).map(|i| Metric {
        name: format!("synthetic_gauge_{i}"),
        unit: "1".to_string(),
        data: Some(metric::Data::Gauge(Gauge {
            data_points: vec![NumberDataPoint {
                time_unix_nano: time_nanos,
                value: Some(number_data_point::Value::AsInt(i as i64)),
                ..Default::default()
            }],
        })),
        ..Default::default()
    });
    let summaries = (0..unsupported).map(|i| Metric {
        name: format!("synthetic_summary_{i}"),
        data: Some(metric::Data::Summary(Summary {
            data_points: vec![SummaryDataPoint {
                time_unix_nano: time_nanos,
                count: 1,
                sum: 1.0,
                ..Default::default()
            }],
        })),
        ..Default::default()
    });

    ExportMetricsServiceRequest {
        resource_metrics: vec![proto::metrics::v1::ResourceMetrics {
            resource: Some(resource(service)),
            scope_metrics: vec![proto::metrics::v1::ScopeMetrics {
                scope: None,
                metrics: gauges.chain(summaries).collect(),
                schema_url: String::new(),
            }],
            schema_url: String::new(),
        }],
    }
}

fn span_count(request: &ExportTraceServiceRequest) -> usize {
    request
        .resource_spans
        .iter()
        .flat_map(|rs| &rs.scope_spans)
        .map(|ss| ss.spans.len())
        .sum()
}

fn metric_count(request: &ExportMetricsServiceRequest) -> usize {
    request
        .resource_metrics
        .iter()
        .flat_map(|rm| &rm.scope_metrics)
        .map(|sm| sm.metrics.len())
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse() {
        let cli = Cli::try_parse_from(["vigil"]).unwrap();
        assert_eq!(cli.endpoint, "http://localhost:4317");
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_cli_send_metrics_command() {
        let cli =
            Cli::try_parse_from(["vigil", "send-metrics", "--count", "3", "--unsupported", "2"])
                .unwrap();
        assert!(matches!(
            cli.command,
            Some(Commands::SendMetrics {
                count: 3,
                unsupported: 2,
                file: None,
                ..
            })
        ));
    }

    #[test]
    fn test_cli_file_conflicts_with_count() {
        let parsed =
            Cli::try_parse_from(["vigil", "send-traces", "--file", "t.json", "--count", "4"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_synthetic_traces_share_trace_and_root() {
        let request = synthetic_traces("svc", 4, 1_700_000_000_000_000_000);
        let spans = &request.resource_spans[0].scope_spans[0].spans;

        assert_eq!(span_count(&request), 4);
        assert!(spans.iter().all(|s| s.trace_id == spans[0].trace_id));
        assert_eq!(spans[0].trace_id.len(), 16);
        assert!(spans[0].parent_span_id.is_empty());
        assert!(spans[1..].iter().all(|s| s.parent_span_id == spans[0].span_id));
        assert!(spans.iter().all(|s| s.end_time_unix_nano > s.start_time_unix_nano));
    }

    #[test]
    fn test_synthetic_metrics_mix() {
        let request = synthetic_metrics("svc", 3, 2, 1);
        let metrics = &request.resource_metrics[0].scope_metrics[0].metrics;

        assert_eq!(metric_count(&request), 5);
        let summaries = metrics
            .iter()
            .filter(|m| matches!(m.data, Some(proto::metrics::v1::metric::Data::Summary(_))))
            .count();
        assert_eq!(summaries, 2);
    }

    #[test]
    fn test_request_json_round_trip() {
        let request = synthetic_traces("svc", 2, 42);
        let json = serde_json::to_string(&request).unwrap();
        let parsed: ExportTraceServiceRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, request);
    }
}
