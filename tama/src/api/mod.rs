//! Typed HTTP client for the Tama provisioning API

pub mod client;
pub mod error;
pub mod memory;
pub mod neural;
pub mod ontology;
pub mod perception;
pub mod processor;
pub mod sensory;

pub use client::{Client, RetryConfig};
pub use error::ApiError;

/// Percent-encodes one path segment
pub(crate) fn segment(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

#[cfg(test)]
pub(crate) fn test_client(url: &str) -> Client {
    Client::with_config(
        url,
        "test-key",
        RetryConfig {
            max_retries: 0,
            initial_backoff_ms: 1,
            max_backoff_ms: 1,
            timeout_seconds: 5,
        },
    )
    .expect("mock server url is valid")
}
