use std::path::PathBuf;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let out_dir = PathBuf::from(std::env::var("OUT_DIR")?);
    tonic_build::configure()
        .file_descriptor_set_path(out_dir.join("kaflook_service_descriptor.bin"))
        .build_client(false)
        .compile_protos(&["./src/protos/kaflook_service.proto"], &["./src/protos"])?;

    Ok(())
}
