//! Model resource implementation

use crate::api::sensory::{Model, ModelRequest};
use crate::resources::{
    api_client, create_failed, create_response, delete_failed, delete_response, import_failed,
    import_response, json_at, optional_json_string, optional_string, parent_id, read_failed,
    read_gone, read_response, required_string, set_optional_string, set_string,
    store_provider_data, update_failed, update_response,
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
use tfplug::types::{AttributePath, Diagnostic, DynamicValue};
use tfplug::validator::JsonString;

#[derive(Default)]
pub struct ModelResource {
    provider_data: Option<TamaProviderData>,
}

impl ModelResource {
    pub fn new() -> Self {
        Self::default()
    }

    fn extract_model_request(value: &DynamicValue) -> Result<ModelRequest, Diagnostic> {
        Ok(ModelRequest {
            identifier: required_string(value, "identifier")?,
            path: required_string(value, "path")?,
            parameters: json_at(value, &AttributePath::new("parameters"))?,
        })
    }
}

fn model_state(model: Model, prior: &DynamicValue) -> DynamicValue {
    let mut state = DynamicValue::object();
    set_string(&mut state, "id", model.id);
    set_optional_string(
        &mut state,
        "source_id",
        parent_id(prior, "source_id", model.source_id),
    );
    set_string(&mut state, "identifier", model.identifier);
    set_string(&mut state, "path", model.path);

    let parameters = optional_json_string(
        optional_string(prior, "parameters").as_deref(),
        model.parameters,
    );
    set_optional_string(&mut state, "parameters", parameters);

    set_optional_string(&mut state, "current_state", model.current_state);
    state
}

#[async_trait]
impl Resource for ModelResource {
    fn type_name(&self) -> &str {
        "tama_model"
    }

    async fn schema(&self, _ctx: Context, _request: ResourceSchemaRequest) -> ResourceSchemaResponse {
        let schema = SchemaBuilder::new()
            .version(0)
            .description("Manages a model offered by a source")
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .description("Model identifier")
                    .computed()
                    .plan_modifier(UseStateForUnknown::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("source_id", AttributeType::String)
                    .description("Source offering the model")
                    .required()
                    .plan_modifier(RequiresReplace::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("identifier", AttributeType::String)
                    .description("Model name as known by the source, e.g. mistral-small-latest")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("path", AttributeType::String)
                    .description("Request path on the source, e.g. /chat/completions")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("parameters", AttributeType::String)
                    .description("JSON-encoded default request parameters")
                    .optional()
                    .validator(JsonString::create())
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
        let source_id = match required_string(&request.planned_state, "source_id") {
            Ok(id) => id,
            Err(diag) => return create_failed(diag),
        };
        let body = match Self::extract_model_request(&request.planned_state) {
            Ok(body) => body,
            Err(diag) => return create_failed(diag),
        };

        let result = client.sensory().models().create(&source_id, &body).await;
        create_response(result, "model", |model| {
            model_state(model, &request.planned_state)
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

        let result = client.sensory().models().get(&id).await;
        read_response(
            result,
            request.current_state,
            request.private,
            "model",
            model_state,
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
        let body = match Self::extract_model_request(&request.planned_state) {
            Ok(body) => body,
            Err(diag) => return update_failed(request.prior_state, diag),
        };

        let result = client.sensory().models().update(&id, &body).await;
        let planned = request.planned_state;
        update_response(result, request.prior_state, "model", |model| {
            model_state(model, &planned)
        })
    }

    async fn delete(&self, _ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse {
        let client = match api_client(&self.provider_data) {
            Ok(client) => client,
            Err(diag) => return delete_failed(diag),
        };
        let Some(id) = optional_string(&request.prior_state, "id") else {
            return delete_response(Ok(()), "model");
        };

        delete_response(client.sensory().models().delete(&id).await, "model")
    }
}

#[async_trait]
impl ResourceWithConfigure for ModelResource {
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
impl ResourceWithImportState for ModelResource {
    async fn import_state(
        &self,
        _ctx: Context,
        request: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse {
        let client = match api_client(&self.provider_data) {
            Ok(client) => client,
            Err(diag) => return import_failed(diag),
        };

        let result = client.sensory().models().get(&request.id).await;
        import_response(&request, result, "model", |model| {
            model_state(model, &DynamicValue::object())
        })
    }
}
