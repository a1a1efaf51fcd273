//! Thought context resource implementation
//!
//! Attaches a prompt to a thought. Contexts with a lower layer come first.

use crate::api::perception::{ThoughtContext, ThoughtContextRequest};
use crate::resources::{
    api_client, create_failed, create_response, delete_failed, delete_response, import_failed,
    import_response, optional_i64, optional_string, parent_id, read_failed, read_gone,
    read_response, required_string, set_i64, set_optional_string, set_string,
    store_provider_data, update_failed, update_response,
};
use crate::TamaProviderData;
use async_trait::async_trait;
use tfplug::context::Context;
use tfplug::defaults::StaticDefault;
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
pub struct ThoughtContextResource {
    provider_data: Option<TamaProviderData>,
}

impl ThoughtContextResource {
    pub fn new() -> Self {
        Self::default()
    }

    fn extract_context_request(value: &DynamicValue) -> Result<ThoughtContextRequest, Diagnostic> {
        Ok(ThoughtContextRequest {
            prompt_id: required_string(value, "prompt_id")?,
            layer: optional_i64(value, "layer").unwrap_or(0),
        })
    }
}

fn context_state(context: ThoughtContext, prior: &DynamicValue) -> DynamicValue {
    let mut state = DynamicValue::object();
    set_string(&mut state, "id", context.id);
    set_optional_string(
        &mut state,
        "thought_id",
        parent_id(prior, "thought_id", context.thought_id),
    );
    set_string(&mut state, "prompt_id", context.prompt_id);
    set_i64(&mut state, "layer", context.layer);
    set_optional_string(&mut state, "provision_state", context.provision_state);
    state
}

#[async_trait]
impl Resource for ThoughtContextResource {
    fn type_name(&self) -> &str {
        "tama_thought_context"
    }

    async fn schema(&self, _ctx: Context, _request: ResourceSchemaRequest) -> ResourceSchemaResponse {
        let schema = SchemaBuilder::new()
            .version(0)
            .description("Manages a prompt given to a thought as context")
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .description("Context identifier")
                    .computed()
                    .plan_modifier(UseStateForUnknown::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("thought_id", AttributeType::String)
                    .description("Thought receiving the context")
                    .required()
                    .plan_modifier(RequiresReplace::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("prompt_id", AttributeType::String)
                    .description("Prompt used as context")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("layer", AttributeType::Number)
                    .description("Ordering layer, lower layers come first")
                    .optional()
                    .computed()
                    .default(StaticDefault::number(0.0))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("provision_state", AttributeType::String)
                    .description("Provisioning state reported by Tama")
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
        let thought_id = match required_string(&request.planned_state, "thought_id") {
            Ok(id) => id,
            Err(diag) => return create_failed(diag),
        };
        let body = match Self::extract_context_request(&request.planned_state) {
            Ok(body) => body,
            Err(diag) => return create_failed(diag),
        };

        let result = client.perception().contexts().create(&thought_id, &body).await;
        create_response(result, "context", |context| {
            context_state(context, &request.planned_state)
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

        let result = client.perception().contexts().get(&id).await;
        read_response(
            result,
            request.current_state,
            request.private,
            "context",
            context_state,
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
        let body = match Self::extract_context_request(&request.planned_state) {
            Ok(body) => body,
            Err(diag) => return update_failed(request.prior_state, diag),
        };

        let result = client.perception().contexts().update(&id, &body).await;
        let planned = request.planned_state;
        update_response(result, request.prior_state, "context", |context| {
            context_state(context, &planned)
        })
    }

    async fn delete(&self, _ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse {
        let client = match api_client(&self.provider_data) {
            Ok(client) => client,
            Err(diag) => return delete_failed(diag),
        };
        let Some(id) = optional_string(&request.prior_state, "id") else {
            return delete_response(Ok(()), "context");
        };

        delete_response(client.perception().contexts().delete(&id).await, "context")
    }
}

#[async_trait]
impl ResourceWithConfigure for ThoughtContextResource {
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
impl ResourceWithImportState for ThoughtContextResource {
    async fn import_state(
        &self,
        _ctx: Context,
        request: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse {
        let client = match api_client(&self.provider_data) {
            Ok(client) => client,
            Err(diag) => return import_failed(diag),
        };

        let result = client.perception().contexts().get(&request.id).await;
        import_response(&request, result, "context", |context| {
            context_state(context, &DynamicValue::object())
        })
    }
}
