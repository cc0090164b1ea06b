fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Vendored protoc binary; no system installation required
    let protoc_path = protoc_bin_vendored::protoc_bin_path()
        .expect("protoc-bin-vendored: no binary for this platform");
    std::env::set_var("PROTOC", protoc_path);

    // Record schema only: no gRPC client or server stubs
    tonic_prost_build::configure()
        .build_client(false)
        .build_server(false)
        .compile_protos(&["src/proto/ivault.proto"], &["src/proto"])?;

    println!("cargo:rerun-if-changed=src/proto/ivault.proto");
    Ok(())
}
