pub mod api;
pub mod data_sources;
pub mod provider_data;
pub mod resources;

pub use provider_data::TamaProviderData;

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tfplug::context::Context;
use tfplug::data_source::DataSourceFactory;
use tfplug::provider::{
    ConfigureProviderRequest, ConfigureProviderResponse, Provider, ProviderSchemaRequest,
    ProviderSchemaResponse,
};
use tfplug::resource::ResourceFactory;
use tfplug::schema::{AttributeBuilder, AttributeType, SchemaBuilder};
use tfplug::types::{AttributePath, Diagnostic, DynamicValue};

pub const DEFAULT_BASE_URL: &str = "https://api.tama.io";
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 30;

#[derive(Default)]
pub struct TamaProvider;

impl TamaProvider {
    pub fn new() -> Self {
        Self
    }
}

/// Provider block values after environment fallbacks
#[derive(Debug, Clone, PartialEq)]
struct ProviderSettings {
    base_url: String,
    api_key: String,
    timeout: u64,
}

impl ProviderSettings {
    fn resolve(config: &DynamicValue) -> Result<Self, Diagnostic> {
        let base_url = config
            .get_string(&AttributePath::new("base_url"))
            .ok()
            .or_else(|| std::env::var("TAMA_BASE_URL").ok())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let api_key = config
            .get_string(&AttributePath::new("api_key"))
            .ok()
            .or_else(|| std::env::var("TAMA_API_KEY").ok())
            .filter(|key| !key.is_empty())
            .ok_or_else(|| {
                Diagnostic::error(
                    "api_key is required (set in provider config or TAMA_API_KEY env var)",
                    "The provider needs an API key to authenticate against the Tama API",
                )
                .with_attribute(AttributePath::new("api_key"))
            })?;

        let timeout = match config.get_number(&AttributePath::new("timeout")) {
            Ok(seconds) if seconds >= 1.0 => seconds as u64,
            Ok(seconds) => {
                return Err(Diagnostic::error(
                    "Invalid timeout",
                    format!("timeout must be at least 1 second, got {}", seconds),
                )
                .with_attribute(AttributePath::new("timeout")))
            }
            Err(_) => match std::env::var("TAMA_TIMEOUT") {
                Ok(value) => value.parse::<u64>().map_err(|_| {
                    Diagnostic::error(
                        "Invalid TAMA_TIMEOUT",
                        format!("TAMA_TIMEOUT must be a whole number of seconds, got {:?}", value),
                    )
                })?,
                Err(_) => DEFAULT_TIMEOUT_SECONDS,
            },
        };

        Ok(Self {
            base_url,
            api_key,
            timeout,
        })
    }
}

#[async_trait]
impl Provider for TamaProvider {
    fn type_name(&self) -> &str {
        "tama"
    }

    async fn schema(&self, _ctx: Context, _request: ProviderSchemaRequest) -> ProviderSchemaResponse {
        let schema = SchemaBuilder::new()
            .description("Manages spaces, sources, chains and the rest of a Tama deployment")
            .attribute(
                AttributeBuilder::new("base_url", AttributeType::String)
                    .description("Base URL of the Tama API. Defaults to TAMA_BASE_URL or https://api.tama.io")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("api_key", AttributeType::String)
                    .description("API key used as bearer token. Defaults to TAMA_API_KEY")
                    .optional()
                    .sensitive()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("timeout", AttributeType::Number)
                    .description("Request timeout in seconds. Defaults to TAMA_TIMEOUT or 30")
                    .optional()
                    .build(),
            )
            .build();

        ProviderSchemaResponse {
            schema,
            diagnostics: vec![],
        }
    }

    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureProviderRequest,
    ) -> ConfigureProviderResponse {
        let settings = match ProviderSettings::resolve(&request.config) {
            Ok(settings) => settings,
            Err(diag) => {
                return ConfigureProviderResponse {
                    diagnostics: vec![diag],
                    provider_data: None,
                }
            }
        };

        let retry_config = api::RetryConfig {
            timeout_seconds: settings.timeout,
            ..Default::default()
        };

        match api::Client::with_config(&settings.base_url, &settings.api_key, retry_config) {
            Ok(client) => {
                tracing::info!(base_url = %settings.base_url, "configured Tama API client");
                ConfigureProviderResponse {
                    diagnostics: vec![],
                    provider_data: Some(Arc::new(TamaProviderData::new(client))),
                }
            }
            Err(e) => ConfigureProviderResponse {
                diagnostics: vec![Diagnostic::error(
                    "Failed to create API client",
                    e.to_string(),
                )],
                provider_data: None,
            },
        }
    }

    fn resources(&self) -> HashMap<String, ResourceFactory> {
        resources::factories()
    }

    fn data_sources(&self) -> HashMap<String, DataSourceFactory> {
        data_sources::factories()
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tfplug::types::{ClientCapabilities, Dynamic};

    const ENV_VARS: [&str; 3] = ["TAMA_BASE_URL", "TAMA_API_KEY", "TAMA_TIMEOUT"];

    fn clear_env() {
        for var in ENV_VARS {
            std::env::remove_var(var);
        }
    }

    fn config(values: &[(&str, Dynamic)]) -> DynamicValue {
        let mut fields: HashMap<String, Dynamic> = ["base_url", "api_key", "timeout"]
            .iter()
            .map(|name| (name.to_string(), Dynamic::Null))
            .collect();
        for (name, value) in values {
            fields.insert(name.to_string(), value.clone());
        }
        DynamicValue::new(Dynamic::Map(fields))
    }

    fn configure_request(config: DynamicValue) -> ConfigureProviderRequest {
        ConfigureProviderRequest {
            terraform_version: "1.9.0".to_string(),
            config,
            client_capabilities: ClientCapabilities::default(),
        }
    }

    #[test]
    #[serial]
    fn settings_use_defaults_and_env_api_key() {
        clear_env();
        std::env::set_var("TAMA_API_KEY", "env-key");

        let settings = ProviderSettings::resolve(&config(&[])).unwrap();
        assert_eq!(
            settings,
            ProviderSettings {
                base_url: DEFAULT_BASE_URL.to_string(),
                api_key: "env-key".to_string(),
                timeout: DEFAULT_TIMEOUT_SECONDS,
            }
        );

        clear_env();
    }

    #[test]
    #[serial]
    fn settings_prefer_config_over_env() {
        clear_env();
        std::env::set_var("TAMA_BASE_URL", "https://env.example.com");
        std::env::set_var("TAMA_API_KEY", "env-key");
        std::env::set_var("TAMA_TIMEOUT", "90");

        let settings = ProviderSettings::resolve(&config(&[
            ("base_url", Dynamic::String("https://config.example.com".into())),
            ("api_key", Dynamic::String("config-key".into())),
            ("timeout", Dynamic::Number(5.0)),
        ]))
        .unwrap();

        assert_eq!(settings.base_url, "https://config.example.com");
        assert_eq!(settings.api_key, "config-key");
        assert_eq!(settings.timeout, 5);

        let from_env = ProviderSettings::resolve(&config(&[])).unwrap();
        assert_eq!(from_env.base_url, "https://env.example.com");
        assert_eq!(from_env.timeout, 90);

        clear_env();
    }

    #[test]
    #[serial]
    fn settings_reject_bad_timeout() {
        clear_env();
        std::env::set_var("TAMA_API_KEY", "env-key");
        std::env::set_var("TAMA_TIMEOUT", "soon");

        let diag = ProviderSettings::resolve(&config(&[])).unwrap_err();
        assert!(diag.summary.contains("TAMA_TIMEOUT"));

        let diag =
            ProviderSettings::resolve(&config(&[("timeout", Dynamic::Number(0.0))])).unwrap_err();
        assert_eq!(diag.summary, "Invalid timeout");

        clear_env();
    }

    #[tokio::test]
    #[serial]
    async fn provider_configure_requires_api_key() {
        clear_env();

        let mut provider = TamaProvider::new();
        let response = provider
            .configure(Context::new(), configure_request(config(&[])))
            .await;

        assert!(response.provider_data.is_none());
        assert_eq!(response.diagnostics.len(), 1);
        assert!(response.diagnostics[0]
            .summary
            .contains("api_key is required"));
    }

    #[tokio::test]
    #[serial]
    async fn provider_configure_returns_provider_data() {
        clear_env();

        let mut provider = TamaProvider::new();
        let response = provider
            .configure(
                Context::new(),
                configure_request(config(&[
                    ("base_url", Dynamic::String("https://tama.example.com/".into())),
                    ("api_key", Dynamic::String("secret".into())),
                ])),
            )
            .await;

        assert!(response.diagnostics.is_empty());
        let data = response.provider_data.unwrap();
        let data = data.downcast_ref::<TamaProviderData>().unwrap();
        assert_eq!(data.client.base_url(), "https://tama.example.com");
    }

    #[tokio::test]
    #[serial]
    async fn provider_configure_rejects_invalid_base_url() {
        clear_env();

        let mut provider = TamaProvider::new();
        let response = provider
            .configure(
                Context::new(),
                configure_request(config(&[
                    ("base_url", Dynamic::String("tama dot io".into())),
                    ("api_key", Dynamic::String("secret".into())),
                ])),
            )
            .await;

        assert!(response.provider_data.is_none());
        assert_eq!(response.diagnostics[0].summary, "Failed to create API client");
    }

    #[test]
    fn provider_lists_every_resource_and_data_source() {
        let provider = TamaProvider::new();

        let resources = provider.resources();
        for name in [
            "tama_space",
            "tama_space_processor",
            "tama_source",
            "tama_model",
            "tama_limit",
            "tama_specification",
            "tama_source_identity",
            "tama_class",
            "tama_class_corpus",
            "tama_prompt",
            "tama_chain",
            "tama_modular_thought",
            "tama_thought_context",
            "tama_thought_tool",
            "tama_thought_processor",
            "tama_listener",
            "tama_queue",
            "tama_activation",
        ] {
            assert!(resources.contains_key(name), "missing resource {}", name);
        }
        assert_eq!(resources.len(), 18);

        let data_sources = provider.data_sources();
        for name in ["tama_space", "tama_class", "tama_action"] {
            assert!(data_sources.contains_key(name), "missing data source {}", name);
        }
        assert_eq!(data_sources.len(), 3);
    }

    #[test]
    fn factories_produce_matching_type_names() {
        for (name, factory) in resources::factories() {
            assert_eq!(factory().type_name(), name);
        }
        for (name, factory) in data_sources::factories() {
            assert_eq!(factory().type_name(), name);
        }
    }
}
