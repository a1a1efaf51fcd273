//! Error types for tfplug

/// Error type for tfplug operations
#[derive(Debug, thiserror::Error)]
pub enum TfplugError {
    #[error("Resource type not found: {0}")]
    ResourceNotFound(String),

    #[error("Data source type not found: {0}")]
    DataSourceNotFound(String),

    #[error("Provider not configured")]
    ProviderNotConfigured,

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Encoding error: {0}")]
    EncodingError(String),

    #[error("Decoding error: {0}")]
    DecodingError(String),

    #[error("Type mismatch: expected {expected}, got {actual}")]
    TypeMismatch { expected: String, actual: String },

    #[error("Attribute not found: {0}")]
    AttributeNotFound(String),

    #[error("Invalid attribute path: {0}")]
    InvalidPath(String),

    #[error("Plugin handshake failed: {0}")]
    HandshakeError(String),

    #[error("TLS configuration error: {0}")]
    TlsError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Transport error: {0}")]
    TransportError(#[from] tonic::transport::Error),

    #[error("{0}")]
    Custom(String),
}

/// Result type alias for tfplug operations
pub type Result<T> = std::result::Result<T, TfplugError>;

impl From<String> for TfplugError {
    fn from(s: String) -> Self {
        TfplugError::Custom(s)
    }
}

impl From<&str> for TfplugError {
    fn from(s: &str) -> Self {
        TfplugError::Custom(s.to_string())
    }
}

impl From<TfplugError> for tonic::Status {
    fn from(err: TfplugError) -> Self {
        match err {
            TfplugError::ResourceNotFound(_) | TfplugError::DataSourceNotFound(_) => {
                tonic::Status::not_found(err.to_string())
            }
            TfplugError::DecodingError(_) | TfplugError::TypeMismatch { .. } => {
                tonic::Status::invalid_argument(err.to_string())
            }
            _ => tonic::Status::internal(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_map_to_grpc_status_codes() {
        let status: tonic::Status = TfplugError::ResourceNotFound("tama_space".into()).into();
        assert_eq!(status.code(), tonic::Code::NotFound);

        let status: tonic::Status = TfplugError::DecodingError("bad msgpack".into()).into();
        assert_eq!(status.code(), tonic::Code::InvalidArgument);

        let status: tonic::Status = TfplugError::ProviderNotConfigured.into();
        assert_eq!(status.code(), tonic::Code::Internal);
    }
}
