use std::path::PathBuf;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // tonic-build resolves protoc through the PROTOC environment variable;
    // point it at the vendored binary so builds never depend on a system
    // install. Build scripts run single-threaded, so set_var is sound here.
    #[allow(unsafe_code)]
    unsafe {
        std::env::set_var("PROTOC", protoc_bin_vendored::protoc_bin_path()?);
    }

    // Get the manifest directory (where Cargo.toml is located)
    let manifest_dir = std::env::var("CARGO_MANIFEST_DIR")?;
    let manifest_path = PathBuf::from(manifest_dir);

    // Navigate to the proto directory from the crate root
    let proto_dir = manifest_path
        .parent() // crates/
        .and_then(|p| p.parent()) // workspace root
        .map(|p| p.join("proto"))
        .expect("Failed to find proto directory");

    println!("cargo:rerun-if-changed={}", proto_dir.display());

    let common_proto = proto_dir.join("optforge/common/v1/common.proto");
    let service_proto = proto_dir.join("optforge/service/v1/service.proto");

    // Compile common proto first since the service proto depends on it
    tonic_build::configure()
        .build_server(false)
        .build_client(false)
        .type_attribute(".", "#[allow(clippy::large_enum_variant)]")
        .compile_protos(
            &[common_proto.to_str().unwrap()],
            &[proto_dir.to_str().unwrap()],
        )?;

    tonic_build::configure()
        .build_server(true)
        .build_client(true)
        .type_attribute(".", "#[allow(clippy::large_enum_variant)]")
        .compile_protos(
            &[service_proto.to_str().unwrap()],
            &[proto_dir.to_str().unwrap()],
        )?;
    Ok(())
}
