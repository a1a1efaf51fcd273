//! Prompt resource implementation

use crate::api::memory::{Prompt, PromptRequest};
use crate::resources::{
    api_client, create_failed, create_response, delete_failed, delete_response, import_failed,
    import_response, optional_string, parent_id, read_failed, read_gone, read_response,
    required_string, set_optional_string, set_string, store_provider_data, update_failed,
    update_response,
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
use tfplug::validator::StringOneOf;

pub const PROMPT_ROLES: [&str; 2] = ["system", "user"];

#[derive(Default)]
pub struct PromptResource {
    provider_data: Option<TamaProviderData>,
}

impl PromptResource {
    pub fn new() -> Self {
        Self::default()
    }

    fn extract_prompt_request(value: &DynamicValue) -> Result<PromptRequest, Diagnostic> {
        Ok(PromptRequest {
            name: required_string(value, "name")?,
            content: required_string(value, "content")?,
            role: required_string(value, "role")?,
        })
    }
}

fn prompt_state(prompt: Prompt, prior: &DynamicValue) -> DynamicValue {
    let mut state = DynamicValue::object();
    set_string(&mut state, "id", prompt.id);
    set_optional_string(
        &mut state,
        "space_id",
        parent_id(prior, "space_id", prompt.space_id),
    );
    set_string(&mut state, "name", prompt.name);
    set_string(&mut state, "content", prompt.content);
    set_string(&mut state, "role", prompt.role);
    set_optional_string(&mut state, "slug", prompt.slug);
    set_optional_string(&mut state, "provision_state", prompt.provision_state);
    state
}

#[async_trait]
impl Resource for PromptResource {
    fn type_name(&self) -> &str {
        "tama_prompt"
    }

    async fn schema(&self, _ctx: Context, _request: ResourceSchemaRequest) -> ResourceSchemaResponse {
        let schema = SchemaBuilder::new()
            .version(0)
            .description("Manages a prompt stored in the memory of a space")
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .description("Prompt identifier")
                    .computed()
                    .plan_modifier(UseStateForUnknown::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("space_id", AttributeType::String)
                    .description("Space the prompt belongs to")
                    .required()
                    .plan_modifier(RequiresReplace::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .description("Prompt name")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("content", AttributeType::String)
                    .description("Prompt text")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("role", AttributeType::String)
                    .description("Message role the prompt is sent as: system or user")
                    .required()
                    .validator(StringOneOf::create(&PROMPT_ROLES))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("slug", AttributeType::String)
                    .description("URL-friendly name assigned by Tama")
                    .computed()
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
        let space_id = match required_string(&request.planned_state, "space_id") {
            Ok(id) => id,
            Err(diag) => return create_failed(diag),
        };
        let body = match Self::extract_prompt_request(&request.planned_state) {
            Ok(body) => body,
            Err(diag) => return create_failed(diag),
        };

        let result = client.memory().prompts().create(&space_id, &body).await;
        create_response(result, "prompt", |prompt| {
            prompt_state(prompt, &request.planned_state)
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

        let result = client.memory().prompts().get(&id).await;
        read_response(
            result,
            request.current_state,
            request.private,
            "prompt",
            prompt_state,
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
        let body = match Self::extract_prompt_request(&request.planned_state) {
            Ok(body) => body,
            Err(diag) => return update_failed(request.prior_state, diag),
        };

        let result = client.memory().prompts().update(&id, &body).await;
        let planned = request.planned_state;
        update_response(result, request.prior_state, "prompt", |prompt| {
            prompt_state(prompt, &planned)
        })
    }

    async fn delete(&self, _ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse {
        let client = match api_client(&self.provider_data) {
            Ok(client) => client,
            Err(diag) => return delete_failed(diag),
        };
        let Some(id) = optional_string(&request.prior_state, "id") else {
            return delete_response(Ok(()), "prompt");
        };

        delete_response(client.memory().prompts().delete(&id).await, "prompt")
    }
}

#[async_trait]
impl ResourceWithConfigure for PromptResource {
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
impl ResourceWithImportState for PromptResource {
    async fn import_state(
        &self,
        _ctx: Context,
        request: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse {
        let client = match api_client(&self.provider_data) {
            Ok(client) => client,
            Err(diag) => return import_failed(diag),
        };

        let result = client.memory().prompts().get(&request.id).await;
        import_response(&request, result, "prompt", |prompt| {
            prompt_state(prompt, &DynamicValue::object())
        })
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;
    use crate::resources::test_support::*;
    use mockito::{Matcher, Server};
    use serde_json::json;
    use tfplug::types::{AttributePath, Dynamic};

    fn stored(content: &str) -> DynamicValue {
        object(&[
            ("id", string("prompt-1")),
            ("space_id", string("space-1")),
            ("name", string("system")),
            ("content", string(content)),
            ("role", string("system")),
            ("slug", string("system")),
            ("provision_state", string("active")),
        ])
    }

    #[tokio::test]
    async fn update_patches_content() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("PATCH", "/provision/memory/prompts/prompt-1")
            .match_body(Matcher::Json(json!({
                "prompt": {"name": "system", "content": "Be brief.", "role": "system"}
            })))
            .with_body(
                r#"{"data":{"id":"prompt-1","name":"system","content":"Be brief.","role":"system","slug":"system","provision_state":"active"}}"#,
            )
            .create_async()
            .await;

        let resource: PromptResource = configured(&server.url()).await;
        let response = resource
            .update(
                Context::new(),
                update_request("tama_prompt", stored("Be helpful."), stored("Be brief.")),
            )
            .await;

        assert!(response.diagnostics.is_empty());
        let state = response.new_state;
        assert_eq!(state.get_string(&AttributePath::new("content")).unwrap(), "Be brief.");
        assert_eq!(
            state.get_string(&AttributePath::new("space_id")).unwrap(),
            "space-1"
        );
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn read_server_error_keeps_state() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/provision/memory/prompts/prompt-1")
            .with_status(400)
            .with_body(r#"{"error":"bad request"}"#)
            .create_async()
            .await;

        let resource: PromptResource = configured(&server.url()).await;
        let response = resource
            .read(Context::new(), read_request("tama_prompt", stored("Be helpful.")))
            .await;

        assert_eq!(response.diagnostics[0].summary, "Failed to read prompt");
        assert_eq!(response.new_state, Some(stored("Be helpful.")));
    }

    #[tokio::test]
    async fn delete_without_id_is_a_no_op() {
        let resource: PromptResource = configured("http://127.0.0.1:9").await;
        let response = resource
            .delete(
                Context::new(),
                delete_request("tama_prompt", object(&[("id", Dynamic::Null)])),
            )
            .await;

        assert!(response.diagnostics.is_empty());
    }
}
