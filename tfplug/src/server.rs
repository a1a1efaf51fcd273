//! Server module for running Terraform providers
//!
//! This module starts the gRPC server with TLS and performs the go-plugin
//! handshake Terraform expects on stdout.

use crate::error::{Result, TfplugError};
use crate::grpc::ProviderService;
use crate::proto::ProviderServer;
use crate::provider::Provider;
use base64::engine::general_purpose::STANDARD_NO_PAD;
use base64::Engine;
use std::io::Write;
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::net::TcpListener;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::transport::{Certificate, Identity, Server, ServerTlsConfig};
use tracing::{debug, info, warn};

/// Protocol version spoken by this framework
pub const PROTOCOL_VERSION: u32 = 6;

/// go-plugin handshake cookie shared with Terraform
pub const MAGIC_COOKIE_KEY: &str = "TF_PLUGIN_MAGIC_COOKIE";
pub const MAGIC_COOKIE_VALUE: &str =
    "d602bf8f470bc67ca7faa0386276bbdd4330efaf76d1a219cb4d6991ca9872b2";

/// Server configuration for running a Terraform provider
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Path to TLS certificate file (PEM)
    pub cert_path: PathBuf,
    /// Path to TLS key file (PEM)
    pub key_path: PathBuf,
    /// Maximum message size in bytes
    pub max_message_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            cert_path: PathBuf::from("./certs/localhost.pem"),
            key_path: PathBuf::from("./certs/localhost-key.pem"),
            max_message_size: 256 << 20, // 256MB
        }
    }
}

impl ServerConfig {
    /// Create a new server configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the certificate path
    pub fn with_cert_path(mut self, path: PathBuf) -> Self {
        self.cert_path = path;
        self
    }

    /// Set the key path
    pub fn with_key_path(mut self, path: PathBuf) -> Self {
        self.key_path = path;
        self
    }

    /// Set the maximum message size
    pub fn with_max_message_size(mut self, size: usize) -> Self {
        self.max_message_size = size;
        self
    }
}

/// Main entry point for running a provider
///
/// Returns once the server stops. Terraform normally ends the process after
/// StopProvider instead.
pub async fn serve<P: Provider + 'static>(provider: P, config: ServerConfig) -> Result<()> {
    check_magic_cookie(std::env::var(MAGIC_COOKIE_KEY).ok().as_deref())?;

    if let Ok(versions) = std::env::var("PLUGIN_PROTOCOL_VERSIONS") {
        if !versions
            .split(',')
            .any(|v| v.trim() == PROTOCOL_VERSION.to_string())
        {
            warn!(%versions, "Terraform did not offer protocol version {}", PROTOCOL_VERSION);
        }
    }

    // Another crate in the process may have installed one already
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();

    let cert = tokio::fs::read(&config.cert_path).await.map_err(|e| {
        TfplugError::TlsError(format!(
            "Failed to read certificate {}: {}",
            config.cert_path.display(),
            e
        ))
    })?;
    let key = tokio::fs::read(&config.key_path).await.map_err(|e| {
        TfplugError::TlsError(format!(
            "Failed to read key {}: {}",
            config.key_path.display(),
            e
        ))
    })?;

    let cert_der = cert_der_from_pem(&cert)?;
    let mut tls_config = ServerTlsConfig::new().identity(Identity::from_pem(cert, key));

    // Terraform's AutoMTLS: only its client certificate is accepted
    if let Ok(client_cert) = std::env::var("PLUGIN_CLIENT_CERT") {
        debug!("trusting PLUGIN_CLIENT_CERT as client CA");
        tls_config = tls_config.client_ca_root(Certificate::from_pem(client_cert));
    }

    let provider_service = ProviderServer::new(ProviderService::new(provider))
        .max_decoding_message_size(config.max_message_size)
        .max_encoding_message_size(config.max_message_size);

    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;

    // Terraform forwards Ctrl-C to the whole process group; the provider has
    // to stay up until StopProvider arrives
    tokio::spawn(async {
        while tokio::signal::ctrl_c().await.is_ok() {
            debug!("ignoring interrupt, waiting for Terraform to stop the provider");
        }
    });

    let mut stdout = std::io::stdout();
    writeln!(stdout, "{}", handshake_line(addr, &cert_der))?;
    stdout.flush()?;

    info!(%addr, "provider server listening");

    Server::builder()
        .tls_config(tls_config)?
        .add_service(provider_service)
        .serve_with_incoming(TcpListenerStream::new(listener))
        .await?;

    Ok(())
}

fn check_magic_cookie(value: Option<&str>) -> Result<()> {
    match value {
        Some(MAGIC_COOKIE_VALUE) => Ok(()),
        _ => Err(TfplugError::HandshakeError(
            "This binary is a plugin. These are not meant to be executed directly. \
             Please execute the program that consumes these plugins, which will \
             load any plugins automatically"
                .to_string(),
        )),
    }
}

/// DER bytes of the first certificate in a PEM bundle
fn cert_der_from_pem(pem: &[u8]) -> Result<Vec<u8>> {
    let mut reader = pem;
    let cert = rustls_pemfile::certs(&mut reader)
        .next()
        .ok_or_else(|| TfplugError::TlsError("No certificate found in PEM".to_string()))?
        .map_err(|e| TfplugError::TlsError(format!("Invalid certificate PEM: {}", e)))?;

    Ok(cert.as_ref().to_vec())
}

/// `CORE-VERSION|APP-VERSION|NETWORK-TYPE|NETWORK-ADDR|PROTOCOL|CERT`
fn handshake_line(addr: SocketAddr, cert_der: &[u8]) -> String {
    format!(
        "1|{}|tcp|{}|grpc|{}",
        PROTOCOL_VERSION,
        addr,
        STANDARD_NO_PAD.encode(cert_der)
    )
}
