//! Build script for sentryflow-proto
//!
//! Compiles protobuf definitions using tonic-prost-build.

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let proto_root = "../../proto";

    let protos = [
        "sentryflow/v1/common.proto",
        "sentryflow/v1/collector.proto",
        "sentryflow/v1/exporter.proto",
    ];

    let proto_paths: Vec<_> = protos
        .iter()
        .map(|p| format!("{proto_root}/{p}"))
        .collect();

    for path in &proto_paths {
        println!("cargo:rerun-if-changed={path}");
    }

    // Fall back to the vendored protoc when the host has none configured.
    if std::env::var_os("PROTOC").is_none() {
        let protoc = protoc_bin_vendored::protoc_bin_path()
            .map_err(|e| format!("failed to locate vendored protoc: {e}"))?;
        // SAFETY: build scripts run single-threaded before codegen starts.
        #[allow(unsafe_code)]
        unsafe {
            std::env::set_var("PROTOC", protoc);
        }
    }

    tonic_prost_build::configure()
        .build_server(true)
        .build_client(true)
        .type_attribute(".sentryflow.v1", "#[derive(serde::Serialize)]")
        .compile_protos(&proto_paths, &[proto_root.to_string()])?;

    Ok(())
}
