fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Use the vendored protoc so builds don't depend on a system install.
    std::env::set_var("PROTOC", protoc_bin_vendored::protoc_bin_path()?);

    tonic_build::configure()
        .build_client(false)
        .compile_protos(&["proto/tfplugin6.proto"], &["proto"])?;

    println!("cargo:rerun-if-changed=proto/tfplugin6.proto");
    Ok(())
}
