use reqwest::header::AUTHORIZATION;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

use super::error::ApiError;

/// Tama API client
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    http_client: reqwest::Client,
    base_url: String,
    auth_header: String,
    retry_config: RetryConfig,
}

#[derive(Clone, Debug)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub timeout_seconds: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff_ms: 100,
            max_backoff_ms: 10000,
            timeout_seconds: 30,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    errors: BTreeMap<String, Vec<String>>,
}

impl Client {
    /// Create a new API client with default configuration
    pub fn new(base_url: &str, api_key: &str) -> Result<Self, ApiError> {
        Self::with_config(base_url, api_key, RetryConfig::default())
    }

    /// Create a new API client with custom retry configuration
    pub fn with_config(
        base_url: &str,
        api_key: &str,
        retry_config: RetryConfig,
    ) -> Result<Self, ApiError> {
        Url::parse(base_url).map_err(|e| ApiError::InvalidUrl(format!("{}: {}", base_url, e)))?;

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(retry_config.timeout_seconds))
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            inner: Arc::new(ClientInner {
                http_client,
                base_url: base_url.trim_end_matches('/').to_string(),
                auth_header: format!("Bearer {}", api_key),
                retry_config,
            }),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    /// Neural API: spaces, processors, listeners, queues, activations
    pub fn neural(&self) -> crate::api::neural::NeuralApi<'_> {
        crate::api::neural::NeuralApi::new(self)
    }

    /// Sensory API: sources, models, limits, specifications, identities, actions
    pub fn sensory(&self) -> crate::api::sensory::SensoryApi<'_> {
        crate::api::sensory::SensoryApi::new(self)
    }

    /// Ontology API: classes and corpora
    pub fn ontology(&self) -> crate::api::ontology::OntologyApi<'_> {
        crate::api::ontology::OntologyApi::new(self)
    }

    /// Memory API: prompts
    pub fn memory(&self) -> crate::api::memory::MemoryApi<'_> {
        crate::api::memory::MemoryApi::new(self)
    }

    /// Perception API: chains, thoughts and their contexts, tools, processors
    pub fn perception(&self) -> crate::api::perception::PerceptionApi<'_> {
        crate::api::perception::PerceptionApi::new(self)
    }

    /// Execute a GET request with retry logic
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let url = self.url(path);
        let response = self
            .execute_with_retry(
                || {
                    self.inner
                        .http_client
                        .get(&url)
                        .header(AUTHORIZATION, &self.inner.auth_header)
                        .send()
                },
                "GET",
                path,
            )
            .await?;

        parse_success_response(response).await
    }

    /// Execute a POST request, wrapping the body under `key`
    pub async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        key: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let url = self.url(path);
        let body = HashMap::from([(key, body)]);
        let response = self
            .execute_with_retry(
                || {
                    self.inner
                        .http_client
                        .post(&url)
                        .header(AUTHORIZATION, &self.inner.auth_header)
                        .json(&body)
                        .send()
                },
                "POST",
                path,
            )
            .await?;

        parse_success_response(response).await
    }

    /// Execute a PATCH request, wrapping the body under `key`
    pub async fn patch<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        key: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let url = self.url(path);
        let body = HashMap::from([(key, body)]);
        let response = self
            .execute_with_retry(
                || {
                    self.inner
                        .http_client
                        .patch(&url)
                        .header(AUTHORIZATION, &self.inner.auth_header)
                        .json(&body)
                        .send()
                },
                "PATCH",
                path,
            )
            .await?;

        parse_success_response(response).await
    }

    /// Execute a DELETE request with retry logic; the response body is ignored
    pub async fn delete(&self, path: &str) -> Result<(), ApiError> {
        let url = self.url(path);
        self.execute_with_retry(
            || {
                self.inner
                    .http_client
                    .delete(&url)
                    .header(AUTHORIZATION, &self.inner.auth_header)
                    .send()
            },
            "DELETE",
            path,
        )
        .await
        .map(|_| ())
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.inner.base_url, path)
    }

    /// Execute request with retry logic
    ///
    /// 429, 5xx, connect errors and timeouts are retried with exponential
    /// backoff. Everything else fails on the first attempt.
    async fn execute_with_retry<F, Fut>(
        &self,
        request_fn: F,
        method: &str,
        path: &str,
    ) -> Result<reqwest::Response, ApiError>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<reqwest::Response, reqwest::Error>>,
    {
        let retry = &self.inner.retry_config;
        let mut attempt = 0;
        let mut last_error = None;

        while attempt <= retry.max_retries {
            if attempt > 0 {
                let backoff = std::cmp::min(
                    retry.initial_backoff_ms * (2_u64.pow(attempt - 1)),
                    retry.max_backoff_ms,
                );
                tracing::debug!(
                    "Retrying {} {} after {}ms (attempt {})",
                    method,
                    path,
                    backoff,
                    attempt
                );
                tokio::time::sleep(Duration::from_millis(backoff)).await;
            }

            tracing::debug!("{} request to: {}", method, path);

            match request_fn().await {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        return Ok(response);
                    }

                    if status == StatusCode::TOO_MANY_REQUESTS {
                        last_error = Some(ApiError::RateLimited);
                    } else if status.is_server_error() {
                        tracing::warn!("{} {} returned {}", method, path, status);
                        last_error = Some(ApiError::ServiceUnavailable);
                    } else {
                        return Err(error_from_response(response).await);
                    }
                }
                Err(e) => {
                    if e.is_timeout() {
                        last_error = Some(ApiError::Timeout(retry.timeout_seconds));
                    } else if e.is_connect() {
                        last_error = Some(ApiError::ServiceUnavailable);
                    } else {
                        return Err(ApiError::RequestError(e));
                    }
                }
            }

            attempt += 1;
        }

        Err(last_error.unwrap_or(ApiError::ServiceUnavailable))
    }
}

/// Parse successful response, with or without the `data` envelope
async fn parse_success_response<T: DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, ApiError> {
    let text = response.text().await?;
    tracing::debug!("API response body: {}", text);

    match serde_json::from_str::<ApiResponse<T>>(&text) {
        Ok(wrapper) => Ok(wrapper.data),
        Err(_) => serde_json::from_str::<T>(&text).map_err(|e| {
            tracing::error!("Failed to deserialize response: {}, body: {}", e, text);
            ApiError::ParseError(format!("Failed to parse response: {}", e))
        }),
    }
}

async fn error_from_response(response: reqwest::Response) -> ApiError {
    let status = response.status();
    let text = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());

    match status {
        StatusCode::NOT_FOUND => ApiError::NotFound,
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ApiError::AuthError,
        StatusCode::UNPROCESSABLE_ENTITY => match serde_json::from_str::<ApiErrorResponse>(&text) {
            Ok(body) => ApiError::Unprocessable(body.errors),
            Err(_) => ApiError::ApiError {
                status: status.as_u16(),
                message: text,
            },
        },
        _ => {
            tracing::error!("API error response: {}", text);
            ApiError::ApiError {
                status: status.as_u16(),
                message: text,
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};
    use serde_json::{json, Value};

    fn fast_retries() -> RetryConfig {
        RetryConfig {
            max_retries: 2,
            initial_backoff_ms: 1,
            max_backoff_ms: 5,
            timeout_seconds: 5,
        }
    }

    #[test]
    fn retry_config_defaults() {
        let config = RetryConfig::default();
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.initial_backoff_ms, 100);
        assert_eq!(config.max_backoff_ms, 10000);
        assert_eq!(config.timeout_seconds, 30);
    }

    #[test]
    fn client_rejects_invalid_base_url() {
        let result = Client::new("not a url", "key");
        assert!(matches!(result, Err(ApiError::InvalidUrl(_))));
    }

    #[tokio::test]
    async fn client_sends_bearer_token_and_unwraps_data() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/provision/neural/spaces/space-1")
            .match_header("authorization", "Bearer secret")
            .with_body(r#"{"data":{"id":"space-1","name":"global"}}"#)
            .create_async()
            .await;

        let client = Client::new(&server.url(), "secret").unwrap();
        let body: Value = client.get("/provision/neural/spaces/space-1").await.unwrap();

        assert_eq!(body["id"], "space-1");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn client_accepts_unwrapped_bodies() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/plain")
            .with_body(r#"{"id":"x"}"#)
            .create_async()
            .await;

        #[derive(Deserialize)]
        struct Plain {
            id: String,
        }

        let client = Client::new(&server.url(), "secret").unwrap();
        let body: Plain = client.get("/plain").await.unwrap();
        assert_eq!(body.id, "x");
    }

    #[tokio::test]
    async fn client_wraps_post_body_in_singular_key() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/provision/neural/spaces")
            .match_body(Matcher::Json(json!({"space": {"name": "global"}})))
            .with_status(201)
            .with_body(r#"{"data":{"id":"space-1"}}"#)
            .create_async()
            .await;

        let client = Client::new(&server.url(), "secret").unwrap();
        let body: Value = client
            .post("/provision/neural/spaces", "space", &json!({"name": "global"}))
            .await
            .unwrap();

        assert_eq!(body["id"], "space-1");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn client_strips_trailing_slash_from_base_url() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("DELETE", "/provision/neural/queues/q-1")
            .with_status(204)
            .create_async()
            .await;

        let client = Client::new(&format!("{}/", server.url()), "secret").unwrap();
        client.delete("/provision/neural/queues/q-1").await.unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn client_maps_not_found_and_auth_errors() {
        let mut server = Server::new_async().await;
        let _missing = server
            .mock("GET", "/missing")
            .with_status(404)
            .with_body(r#"{"errors":{"detail":"Not Found"}}"#)
            .create_async()
            .await;
        let _forbidden = server
            .mock("GET", "/forbidden")
            .with_status(403)
            .create_async()
            .await;

        let client = Client::new(&server.url(), "secret").unwrap();

        let missing = client.get::<Value>("/missing").await;
        assert!(matches!(missing, Err(ApiError::NotFound)));

        let forbidden = client.get::<Value>("/forbidden").await;
        assert!(matches!(forbidden, Err(ApiError::AuthError)));
    }

    #[tokio::test]
    async fn client_parses_unprocessable_field_errors() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/provision/neural/spaces")
            .with_status(422)
            .with_body(r#"{"errors":{"name":["can't be blank"]}}"#)
            .create_async()
            .await;

        let client = Client::new(&server.url(), "secret").unwrap();
        let result = client
            .post::<Value, _>("/provision/neural/spaces", "space", &json!({}))
            .await;

        match result {
            Err(ApiError::Unprocessable(errors)) => {
                assert_eq!(errors["name"], vec!["can't be blank".to_string()]);
            }
            other => panic!("Expected Unprocessable, got {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn client_retries_server_errors() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/flaky")
            .with_status(503)
            .expect(3)
            .create_async()
            .await;

        let client = Client::with_config(&server.url(), "secret", fast_retries()).unwrap();
        let result = client.get::<Value>("/flaky").await;

        assert!(matches!(result, Err(ApiError::ServiceUnavailable)));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn client_retries_rate_limited_requests() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/busy")
            .with_status(429)
            .expect(3)
            .create_async()
            .await;

        let client = Client::with_config(&server.url(), "secret", fast_retries()).unwrap();
        let result = client.get::<Value>("/busy").await;

        assert!(matches!(result, Err(ApiError::RateLimited)));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn client_retries_connect_errors() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);

        let client = Client::with_config(&url, "secret", fast_retries()).unwrap();
        let result = client.get::<Value>("/provision/neural/spaces/space-1").await;

        assert!(matches!(result, Err(ApiError::ServiceUnavailable)));
    }

    #[tokio::test]
    async fn client_does_not_retry_client_errors() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/bad")
            .with_status(400)
            .with_body("bad request")
            .expect(1)
            .create_async()
            .await;

        let client = Client::with_config(&server.url(), "secret", fast_retries()).unwrap();
        let result = client.get::<Value>("/bad").await;

        match result {
            Err(ApiError::ApiError { status, message }) => {
                assert_eq!(status, 400);
                assert_eq!(message, "bad request");
            }
            other => panic!("Expected ApiError, got {:?}", other.map(|_| ())),
        }
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn client_reports_unparseable_bodies() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/garbage")
            .with_body("<html>")
            .create_async()
            .await;

        let client = Client::new(&server.url(), "secret").unwrap();
        let result = client.get::<Value>("/garbage").await;

        assert!(matches!(result, Err(ApiError::ParseError(_))));
    }
}
