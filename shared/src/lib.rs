//! Vigil Shared Library
//!
//! Types and building blocks shared by the Vigil OTLP intake server and CLI.
//!
//! # Modules
//!
//! - [`otlp`] - Generated OTLP protobuf types and conversions
//! - [`models`] - Internal span, metric and batch models
//! - [`consumer`] - The consumer capability and the OTLP consumer
//! - [`processor`] - Batch processors and their errors
//! - [`storage`] - In-memory stores behind the default processor
//! - [`monitoring`] - Counter registry and snapshot visitors
//! - [`request`] - Request result ids and counter maps
//!
//! # Example
//!
//! ```
//! use shared::monitoring::{collect_flat, Mode, Registry};
//! use shared::request::{monitoring_map_for_registry, ResultId};
//!
//! let root = Registry::new();
//! let traces = root.new_registry("otlp.grpc.traces").unwrap();
//! let counters = monitoring_map_for_registry(&traces, &ResultId::RECEIVER_KEYS).unwrap();
//! counters.inc(ResultId::RequestCount);
//!
//! assert_eq!(collect_flat(&root, Mode::Reported)["otlp.grpc.traces.request_count"], 1);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod consumer;
pub mod context;
pub mod models;
pub mod monitoring;
pub mod otlp;
pub mod processor;
pub mod request;
pub mod storage;

/// Re-export common dependencies for convenience.
pub use chrono;
pub use serde;
pub use serde_json;
pub use validator;
