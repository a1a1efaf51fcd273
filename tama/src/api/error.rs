use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("API returned error (HTTP {status}): {message}")]
    ApiError { status: u16, message: String },

    #[error("Resource not found")]
    NotFound,

    #[error("Validation failed: {}", format_field_errors(.0))]
    Unprocessable(BTreeMap<String, Vec<String>>),

    #[error("Failed to parse response: {0}")]
    ParseError(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Authentication failed")]
    AuthError,

    #[error("Request timeout after {0} seconds")]
    Timeout(u64),

    #[error("Too many requests, rate limited")]
    RateLimited,

    #[error("Service unavailable, retry later")]
    ServiceUnavailable,
}

impl ApiError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound)
    }
}

fn format_field_errors(errors: &BTreeMap<String, Vec<String>>) -> String {
    errors
        .iter()
        .map(|(field, messages)| format!("{} {}", field, messages.join(", ")))
        .collect::<Vec<_>>()
        .join("; ")
}
