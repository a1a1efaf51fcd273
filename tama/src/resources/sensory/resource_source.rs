//! Source resource implementation
//!
//! A source is an external endpoint, such as a model provider, reachable
//! with an API key. The key is write-only on the API side.

use crate::api::sensory::{Source, SourceCredential, SourceRequest};
use crate::resources::{
    api_client, carry_over, create_failed, create_response, delete_failed, delete_response,
    import_failed, import_response, optional_string, parent_id, read_failed, read_gone,
    read_response, required_string, set_optional_string, set_string, store_provider_data,
    update_failed, update_response,
};
use crate::TamaProviderData;
use async_trait::async_trait;
use tfplug::context::Context;
use tfplug::plan_modifier::{RequiresReplace, UseStateForUnknown};
use tfplug::resource::{
    ConfigureResourceRequest, ConfigureResourceResponse, CreateResourceRequest,
    CreateResourceResponse, DeleteResourceRequest, DeleteResourceResponse,
    ImportResourceStateRequest, ImportResourceStateResponse, ReadResourceRequest,
    ReadResourceResponse, Resource, ResourceSchemaRequest, ResourceSchemaResponse,
    ResourceWithConfigure, ResourceWithImportState, UpdateResourceRequest,
    UpdateResourceResponse,
};
use tfplug::schema::{AttributeBuilder, AttributeType, SchemaBuilder};
use tfplug::types::{Diagnostic, DynamicValue};

#[derive(Default)]
pub struct SourceResource {
    provider_data: Option<TamaProviderData>,
}

impl SourceResource {
    pub fn new() -> Self {
        Self::default()
    }

    fn extract_source_request(value: &DynamicValue) -> Result<SourceRequest, Diagnostic> {
        Ok(SourceRequest {
            name: required_string(value, "name")?,
            source_type: required_string(value, "type")?,
            endpoint: required_string(value, "endpoint")?,
            credential: SourceCredential {
                api_key: required_string(value, "api_key")?,
            },
        })
    }
}

fn source_state(source: Source, prior: &DynamicValue) -> DynamicValue {
    let mut state = DynamicValue::object();
    set_string(&mut state, "id", source.id);
    set_optional_string(
        &mut state,
        "space_id",
        parent_id(prior, "space_id", source.space_id),
    );
    set_string(&mut state, "name", source.name);
    set_string(&mut state, "type", source.source_type);
    set_string(&mut state, "endpoint", source.endpoint);
    carry_over(&mut state, prior, "api_key");
    set_optional_string(&mut state, "slug", source.slug);
    set_optional_string(&mut state, "current_state", source.current_state);
    state
}

#[async_trait]
impl Resource for SourceResource {
    fn type_name(&self) -> &str {
        "tama_source"
    }

    async fn schema(&self, _ctx: Context, _request: ResourceSchemaRequest) -> ResourceSchemaResponse {
        let schema = SchemaBuilder::new()
            .version(0)
            .description("Manages an external source such as a model provider")
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .description("Source identifier")
                    .computed()
                    .plan_modifier(UseStateForUnknown::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("space_id", AttributeType::String)
                    .description("Space the source belongs to")
                    .required()
                    .plan_modifier(RequiresReplace::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .description("Source name")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("type", AttributeType::String)
                    .description("Source type, e.g. model")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("endpoint", AttributeType::String)
                    .description("Base URL of the source")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("api_key", AttributeType::String)
                    .description("API key used to reach the source")
                    .required()
                    .sensitive()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("slug", AttributeType::String)
                    .description("URL-friendly name assigned by Tama")
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("current_state", AttributeType::String)
                    .description("Current state reported by Tama")
                    .computed()
                    .build(),
            )
            .build();

        ResourceSchemaResponse {
            schema,
            diagnostics: vec![],
        }
    }

    async fn create(&self, _ctx: Context, request: CreateResourceRequest) -> CreateResourceResponse {
        let client = match api_client(&self.provider_data) {
            Ok(client) => client,
            Err(diag) => return create_failed(diag),
        };
        let space_id = match required_string(&request.planned_state, "space_id") {
            Ok(id) => id,
            Err(diag) => return create_failed(diag),
        };
        let body = match Self::extract_source_request(&request.planned_state) {
            Ok(body) => body,
            Err(diag) => return create_failed(diag),
        };

        tracing::debug!(space_id = %space_id, name = %body.name, "creating source");
        let result = client.sensory().sources().create(&space_id, &body).await;
        create_response(result, "source", |source| {
            source_state(source, &request.planned_state)
        })
    }

    async fn read(&self, _ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        let Some(id) = optional_string(&request.current_state, "id") else {
            return read_gone(request.private);
        };
        let client = match api_client(&self.provider_data) {
            Ok(client) => client,
            Err(diag) => return read_failed(request.current_state, request.private, diag),
        };

        let result = client.sensory().sources().get(&id).await;
        read_response(
            result,
            request.current_state,
            request.private,
            "source",
            source_state,
        )
    }

    async fn update(&self, _ctx: Context, request: UpdateResourceRequest) -> UpdateResourceResponse {
        let client = match api_client(&self.provider_data) {
            Ok(client) => client,
            Err(diag) => return update_failed(request.prior_state, diag),
        };
        let id = match required_string(&request.prior_state, "id") {
            Ok(id) => id,
            Err(diag) => return update_failed(request.prior_state, diag),
        };
        let body = match Self::extract_source_request(&request.planned_state) {
            Ok(body) => body,
            Err(diag) => return update_failed(request.prior_state, diag),
        };

        let result = client.sensory().sources().update(&id, &body).await;
        let planned = request.planned_state;
        update_response(result, request.prior_state, "source", |source| {
            source_state(source, &planned)
        })
    }

    async fn delete(&self, _ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse {
        let client = match api_client(&self.provider_data) {
            Ok(client) => client,
            Err(diag) => return delete_failed(diag),
        };
        let Some(id) = optional_string(&request.prior_state, "id") else {
            return delete_response(Ok(()), "source");
        };

        delete_response(client.sensory().sources().delete(&id).await, "source")
    }
}

#[async_trait]
impl ResourceWithConfigure for SourceResource {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureResourceRequest,
    ) -> ConfigureResourceResponse {
        ConfigureResourceResponse {
            diagnostics: store_provider_data(&mut self.provider_data, request.provider_data),
        }
    }
}

#[async_trait]
impl ResourceWithImportState for SourceResource {
    async fn import_state(
        &self,
        _ctx: Context,
        request: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse {
        let client = match api_client(&self.provider_data) {
            Ok(client) => client,
            Err(diag) => return import_failed(diag),
        };

        let result = client.sensory().sources().get(&request.id).await;
        import_response(&request, result, "source", |source| {
            source_state(source, &DynamicValue::object())
        })
    }
}
