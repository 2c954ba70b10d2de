//! Compiles the in-tree OTLP protobuf definitions.
//!
//! Generates prost messages, tonic servers (receivers) and clients (CLI),
//! plus pbjson serde impls so OTLP/JSON files deserialize into requests.

use std::path::PathBuf;

const PROTO_ROOT: &str = "proto";

/// Packages under `proto/opentelemetry/proto`, as `<dir>/v1/<file>.proto`.
const PACKAGES: &[(&str, &str)] = &[
    ("common", "common"),
    ("resource", "resource"),
    ("trace", "trace"),
    ("metrics", "metrics"),
    ("collector/trace", "trace_service"),
    ("collector/metrics", "metrics_service"),
];

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("cargo:rerun-if-changed={PROTO_ROOT}");

    let protos: Vec<String> = PACKAGES
        .iter()
        .map(|(dir, file)| format!("{PROTO_ROOT}/opentelemetry/proto/{dir}/v1/{file}.proto"))
        .collect();
    let descriptor_path = PathBuf::from(std::env::var("OUT_DIR")?).join("otlp_descriptor.bin");

    tonic_prost_build::configure()
        .build_server(true)
        .build_client(true)
        .emit_rerun_if_changed(false)
        .file_descriptor_set_path(&descriptor_path)
        .compile_protos(&protos, &[PROTO_ROOT.to_string()])?;

    pbjson_build::Builder::new()
        .register_descriptors(&std::fs::read(&descriptor_path)?)?
        .build(&[".opentelemetry"])?;

    Ok(())
}
