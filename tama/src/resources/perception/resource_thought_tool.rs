//! Thought tool resource implementation
//!
//! Gives a thought access to an action. Both ends are fixed, so any change
//! replaces the tool and there is nothing to update in place.

use crate::api::perception::{ThoughtTool, ThoughtToolRequest};
use crate::resources::{
    api_client, carry_over, create_failed, create_response, delete_failed, delete_response,
    import_failed, import_response, optional_string, parent_id, read_failed, read_gone,
    read_response, required_string, set_optional_string, set_string, store_provider_data,
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
use tfplug::types::DynamicValue;

#[derive(Default)]
pub struct ThoughtToolResource {
    provider_data: Option<TamaProviderData>,
}

impl ThoughtToolResource {
    pub fn new() -> Self {
        Self::default()
    }
}

fn tool_state(tool: ThoughtTool, prior: &DynamicValue) -> DynamicValue {
    let mut state = DynamicValue::object();
    set_string(&mut state, "id", tool.id);
    set_optional_string(
        &mut state,
        "thought_id",
        parent_id(prior, "thought_id", tool.thought_id),
    );
    set_string(&mut state, "action_id", tool.action_id);
    set_optional_string(&mut state, "provision_state", tool.provision_state);
    state
}

#[async_trait]
impl Resource for ThoughtToolResource {
    fn type_name(&self) -> &str {
        "tama_thought_tool"
    }

    async fn schema(&self, _ctx: Context, _request: ResourceSchemaRequest) -> ResourceSchemaResponse {
        let schema = SchemaBuilder::new()
            .version(0)
            .description("Manages an action a thought may call as a tool")
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .description("Tool identifier")
                    .computed()
                    .plan_modifier(UseStateForUnknown::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("thought_id", AttributeType::String)
                    .description("Thought the tool is given to")
                    .required()
                    .plan_modifier(RequiresReplace::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("action_id", AttributeType::String)
                    .description("Action exposed as the tool")
                    .required()
                    .plan_modifier(RequiresReplace::create())
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
        let action_id = match required_string(&request.planned_state, "action_id") {
            Ok(id) => id,
            Err(diag) => return create_failed(diag),
        };

        let result = client
            .perception()
            .tools()
            .create(&thought_id, &ThoughtToolRequest { action_id })
            .await;
        create_response(result, "tool", |tool| {
            tool_state(tool, &request.planned_state)
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

        let result = client.perception().tools().get(&id).await;
        read_response(
            result,
            request.current_state,
            request.private,
            "tool",
            tool_state,
        )
    }

    async fn update(&self, _ctx: Context, request: UpdateResourceRequest) -> UpdateResourceResponse {
        let mut new_state = request.planned_state;
        carry_over(&mut new_state, &request.prior_state, "provision_state");

        UpdateResourceResponse {
            new_state,
            private: request.planned_private,
            diagnostics: vec![],
            new_identity: None,
        }
    }

    async fn delete(&self, _ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse {
        let client = match api_client(&self.provider_data) {
            Ok(client) => client,
            Err(diag) => return delete_failed(diag),
        };
        let Some(id) = optional_string(&request.prior_state, "id") else {
            return delete_response(Ok(()), "tool");
        };

        delete_response(client.perception().tools().delete(&id).await, "tool")
    }
}

#[async_trait]
impl ResourceWithConfigure for ThoughtToolResource {
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
impl ResourceWithImportState for ThoughtToolResource {
    async fn import_state(
        &self,
        _ctx: Context,
        request: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse {
        let client = match api_client(&self.provider_data) {
            Ok(client) => client,
            Err(diag) => return import_failed(diag),
        };

        let result = client.perception().tools().get(&request.id).await;
        import_response(&request, result, "tool", |tool| {
            tool_state(tool, &DynamicValue::object())
        })
    }
}
