use std::env;
use std::path::PathBuf;
use tama::TamaProvider;
use tfplug::ServerConfig;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // stdout carries the plugin handshake
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(log_filter())
        .init();

    let (cert_path, key_path) = cert_paths()?;
    tracing::debug!(cert = %cert_path.display(), key = %key_path.display(), "using server certificate");

    let config = ServerConfig::new()
        .with_cert_path(cert_path)
        .with_key_path(key_path);

    tfplug::serve(TamaProvider::new(), config).await?;

    Ok(())
}

fn log_filter() -> EnvFilter {
    env::var("TF_LOG_PROVIDER")
        .or_else(|_| env::var("RUST_LOG"))
        .ok()
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new("info"))
}

fn cert_paths() -> std::io::Result<(PathBuf, PathBuf)> {
    let exe = env::current_exe()?;
    let exe_dir = exe
        .parent()
        .map(|dir| dir.to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."));

    let cert_path = env::var_os("TAMA_PROVIDER_CERT")
        .map(PathBuf::from)
        .unwrap_or_else(|| exe_dir.join("certs/localhost.pem"));
    let key_path = env::var_os("TAMA_PROVIDER_KEY")
        .map(PathBuf::from)
        .unwrap_or_else(|| exe_dir.join("certs/localhost-key.pem"));

    Ok((cert_path, key_path))
}
