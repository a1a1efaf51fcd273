//! Provider trait and related types
//!
//! A provider declares its own configuration schema, configures shared
//! state (typically an API client) and hands out factories for its
//! resources and data sources. The gRPC service creates a fresh instance
//! from a factory for every request and configures it with the data
//! returned from `configure`.

use crate::context::Context;
use crate::data_source::DataSourceFactory;
use crate::resource::ResourceFactory;
use crate::schema::Schema;
use crate::types::{ClientCapabilities, Diagnostic, DynamicValue, ServerCapabilities};
use async_trait::async_trait;
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

#[async_trait]
pub trait Provider: Send + Sync {
    /// Provider type name, the prefix of every resource type (e.g. "tama")
    fn type_name(&self) -> &str;

    async fn metadata(
        &self,
        _ctx: Context,
        _request: ProviderMetadataRequest,
    ) -> ProviderMetadataResponse {
        ProviderMetadataResponse {
            type_name: self.type_name().to_string(),
            server_capabilities: ServerCapabilities::default(),
        }
    }

    /// Schema of the provider block
    async fn schema(&self, ctx: Context, request: ProviderSchemaRequest) -> ProviderSchemaResponse;

    async fn validate(
        &self,
        _ctx: Context,
        _request: ValidateProviderConfigRequest,
    ) -> ValidateProviderConfigResponse {
        ValidateProviderConfigResponse {
            diagnostics: vec![],
        }
    }

    /// Called once per run with the provider block
    /// The returned provider_data is passed to every resource and data source
    async fn configure(
        &mut self,
        ctx: Context,
        request: ConfigureProviderRequest,
    ) -> ConfigureProviderResponse;

    /// Resource factories keyed by type name
    fn resources(&self) -> HashMap<String, ResourceFactory>;

    /// Data source factories keyed by type name
    fn data_sources(&self) -> HashMap<String, DataSourceFactory>;
}

pub struct ProviderMetadataRequest;

pub struct ProviderMetadataResponse {
    pub type_name: String,
    pub server_capabilities: ServerCapabilities,
}

pub struct ProviderSchemaRequest;

pub struct ProviderSchemaResponse {
    pub schema: Schema,
    pub diagnostics: Vec<Diagnostic>,
}

pub struct ValidateProviderConfigRequest {
    pub config: DynamicValue,
}

pub struct ValidateProviderConfigResponse {
    pub diagnostics: Vec<Diagnostic>,
}

pub struct ConfigureProviderRequest {
    pub terraform_version: String,
    pub config: DynamicValue,
    pub client_capabilities: ClientCapabilities,
}

pub struct ConfigureProviderResponse {
    pub diagnostics: Vec<Diagnostic>,
    /// Shared with resources and data sources through their configure calls
    pub provider_data: Option<Arc<dyn Any + Send + Sync>>,
}
