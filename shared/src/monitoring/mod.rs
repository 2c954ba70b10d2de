//! Monitoring registry for the service's own counters.
//!
//! Components register counters and report functions in a tree of
//! [`Registry`] nodes. Exporters pull values on demand by walking the tree
//! with a [`Visitor`], or take a ready-made snapshot:
//!
//! ```
//! use shared::monitoring::{collect_flat, Mode, Registry};
//!
//! let root = Registry::new();
//! let grpc = root.new_registry("otlp.grpc.traces").unwrap();
//! grpc.new_int("request_count").unwrap().inc();
//!
//! let snapshot = collect_flat(&root, Mode::Reported);
//! assert_eq!(snapshot["otlp.grpc.traces.request_count"], 1);
//! ```

pub mod registry;
pub mod snapshot;
pub mod visitor;

pub use registry::{Int, MonitoringError, Registry};
pub use snapshot::{collect_flat, collect_structured};
pub use visitor::{report_int, report_namespace, Mode, Reporting, Visitor};
