//! OpenTelemetry Protocol (OTLP) support.
//!
//! Generated OTLP protobuf types (traces and metrics only) and their
//! conversion into the internal [`crate::models`] types.
//!
//! The generated message types also carry pbjson serde impls, so an OTLP/JSON
//! payload file deserializes straight into an export request.

pub mod conversions;

/// Includes the prost/tonic output and the pbjson serde impls of one package.
macro_rules! otlp_package {
    ($package:literal) => {
        tonic::include_proto!($package);
        include!(concat!(env!("OUT_DIR"), "/", $package, ".serde.rs"));
    };
}

#[allow(clippy::all, clippy::pedantic, missing_docs)]
pub mod proto {
    //! Generated protobuf types from the OTLP definitions.

    pub mod common {
        //! Attribute values and instrumentation scopes.
        pub mod v1 {
            otlp_package!("opentelemetry.proto.common.v1");
        }
    }

    pub mod resource {
        //! The entity producing telemetry.
        pub mod v1 {
            otlp_package!("opentelemetry.proto.resource.v1");
        }
    }

    pub mod trace {
        //! Spans.
        pub mod v1 {
            otlp_package!("opentelemetry.proto.trace.v1");
        }
    }

    pub mod metrics {
        //! Metric data points.
        pub mod v1 {
            otlp_package!("opentelemetry.proto.metrics.v1");
        }
    }

    pub mod collector {
        //! The export services.

        pub mod trace {
            //! `TraceService`.
            pub mod v1 {
                otlp_package!("opentelemetry.proto.collector.trace.v1");
            }
        }

        pub mod metrics {
            //! `MetricsService`.
            pub mod v1 {
                otlp_package!("opentelemetry.proto.collector.metrics.v1");
            }
        }
    }
}
