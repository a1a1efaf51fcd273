//! Space processor resource implementation
//!
//! Binds a model to a space with completion, embedding or reranking
//! settings. The configuration blocks live in `processor_config`.

use crate::resources::processor_config::{self, processor_request, processor_state};
use crate::resources::{
    api_client, create_failed, create_response, delete_failed, delete_response, import_failed,
    import_response, optional_string, read_failed, read_gone, read_response, required_string,
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
    UpdateResourceResponse, ValidateResourceConfigRequest, ValidateResourceConfigResponse,
};
use tfplug::schema::{AttributeBuilder, AttributeType, SchemaBuilder};
use tfplug::types::DynamicValue;

#[derive(Default)]
pub struct SpaceProcessorResource {
    provider_data: Option<TamaProviderData>,
}

impl SpaceProcessorResource {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Resource for SpaceProcessorResource {
    fn type_name(&self) -> &str {
        "tama_space_processor"
    }

    async fn schema(&self, _ctx: Context, _request: ResourceSchemaRequest) -> ResourceSchemaResponse {
        let mut builder = SchemaBuilder::new()
            .version(0)
            .description("Manages a processor that makes a model available inside a space")
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .description("Processor identifier")
                    .computed()
                    .plan_modifier(UseStateForUnknown::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("space_id", AttributeType::String)
                    .description("Space the processor belongs to")
                    .required()
                    .plan_modifier(RequiresReplace::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("model_id", AttributeType::String)
                    .description("Model used by the processor")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("type", AttributeType::String)
                    .description("Processor type, taken from the configuration block that is set")
                    .computed()
                    .build(),
            );
        for block in processor_config::blocks() {
            builder = builder.block(block);
        }

        ResourceSchemaResponse {
            schema: builder.build(),
            diagnostics: vec![],
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        request: ValidateResourceConfigRequest,
    ) -> ValidateResourceConfigResponse {
        ValidateResourceConfigResponse {
            diagnostics: processor_config::validate_exactly_one(&request.config),
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
        let body = match processor_request(&request.planned_state) {
            Ok(body) => body,
            Err(diag) => return create_failed(diag),
        };

        tracing::debug!(space_id = %space_id, processor_type = body.config.type_name(), "creating space processor");
        let result = client
            .neural()
            .processors()
            .create(&space_id, &body)
            .await
            .and_then(|processor| processor_state(processor, "space_id", &request.planned_state));
        create_response(result, "processor", |state| state)
    }

    async fn read(&self, _ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        let Some(id) = optional_string(&request.current_state, "id") else {
            return read_gone(request.private);
        };
        let client = match api_client(&self.provider_data) {
            Ok(client) => client,
            Err(diag) => return read_failed(request.current_state, request.private, diag),
        };

        let result = client.neural().processors().get(&id).await;
        let result = result.and_then(|processor| processor_state(processor, "space_id", &request.current_state));
        read_response(
            result,
            request.current_state,
            request.private,
            "processor",
            |state, _| state,
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
        let body = match processor_request(&request.planned_state) {
            Ok(body) => body,
            Err(diag) => return update_failed(request.prior_state, diag),
        };

        let result = client
            .neural()
            .processors()
            .update(&id, &body)
            .await
            .and_then(|processor| processor_state(processor, "space_id", &request.planned_state));
        update_response(result, request.prior_state, "processor", |state| state)
    }

    async fn delete(&self, _ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse {
        let client = match api_client(&self.provider_data) {
            Ok(client) => client,
            Err(diag) => return delete_failed(diag),
        };
        let Some(id) = optional_string(&request.prior_state, "id") else {
            return delete_response(Ok(()), "processor");
        };

        delete_response(client.neural().processors().delete(&id).await, "processor")
    }
}

#[async_trait]
impl ResourceWithConfigure for SpaceProcessorResource {
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
impl ResourceWithImportState for SpaceProcessorResource {
    async fn import_state(
        &self,
        _ctx: Context,
        request: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse {
        let client = match api_client(&self.provider_data) {
            Ok(client) => client,
            Err(diag) => return import_failed(diag),
        };

        let result = client
            .neural()
            .processors()
            .get(&request.id)
            .await
            .and_then(|processor| processor_state(processor, "space_id", &DynamicValue::object()));
        import_response(&request, result, "processor", |state| state)
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;
    use crate::resources::test_support::*;
    use mockito::{Matcher, Server};
    use serde_json::json;
    use std::collections::HashMap;
    use tfplug::types::{AttributePath, Dynamic};

    fn completion(temperature: f64, parameters: &str) -> Dynamic {
        Dynamic::List(vec![Dynamic::Map(HashMap::from([
            ("temperature".to_string(), Dynamic::Number(temperature)),
            ("tool_choice".to_string(), Dynamic::Null),
            ("parameters".to_string(), string(parameters)),
        ]))])
    }

    fn planned() -> DynamicValue {
        object(&[
            ("id", Dynamic::Unknown),
            ("space_id", string("space-1")),
            ("model_id", string("model-1")),
            ("type", Dynamic::Unknown),
            ("completion", completion(0.5, "{ \"max_tokens\": 256 }")),
            ("embedding", Dynamic::List(vec![])),
            ("reranking", Dynamic::List(vec![])),
        ])
    }

    #[tokio::test]
    async fn validate_requires_exactly_one_block() {
        let resource = SpaceProcessorResource::new();

        let response = resource
            .validate(
                Context::new(),
                validate_request("tama_space_processor", planned()),
            )
            .await;
        assert!(response.diagnostics.is_empty());

        let mut neither = planned();
        neither
            .set_list(&AttributePath::new("completion"), vec![])
            .unwrap();
        let response = resource
            .validate(
                Context::new(),
                validate_request("tama_space_processor", neither),
            )
            .await;
        assert_eq!(response.diagnostics.len(), 1);
    }

    #[tokio::test]
    async fn create_sends_type_union_and_keeps_parameter_text() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/provision/neural/spaces/space-1/processors")
            .match_body(Matcher::Json(json!({
                "processor": {
                    "model_id": "model-1",
                    "type": "completion",
                    "configuration": {"temperature": 0.5, "parameters": {"max_tokens": 256}}
                }
            })))
            .with_status(201)
            .with_body(
                r#"{"data":{"id":"proc-1","space_id":"space-1","model_id":"model-1","type":"completion","configuration":{"temperature":0.5,"parameters":{"max_tokens":256}}}}"#,
            )
            .create_async()
            .await;

        let resource: SpaceProcessorResource = configured(&server.url()).await;
        let response = resource
            .create(
                Context::new(),
                create_request("tama_space_processor", planned()),
            )
            .await;

        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
        let state = response.new_state;
        assert_eq!(state.get_string(&AttributePath::new("id")).unwrap(), "proc-1");
        assert_eq!(
            state.get_string(&AttributePath::new("type")).unwrap(),
            "completion"
        );
        assert_eq!(
            state
                .get_string(
                    &AttributePath::new("completion")
                        .index(0)
                        .attribute("parameters")
                )
                .unwrap(),
            "{ \"max_tokens\": 256 }"
        );
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn read_switches_blocks_when_type_changes_remotely() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/provision/neural/processors/proc-1")
            .with_body(
                r#"{"data":{"id":"proc-1","space_id":"space-1","model_id":"model-1","type":"reranking","configuration":{"top_n":3}}}"#,
            )
            .create_async()
            .await;

        let mut current = planned();
        current
            .set_string(&AttributePath::new("id"), "proc-1".to_string())
            .unwrap();

        let resource: SpaceProcessorResource = configured(&server.url()).await;
        let response = resource
            .read(
                Context::new(),
                read_request("tama_space_processor", current),
            )
            .await;

        let state = response.new_state.unwrap();
        assert_eq!(state.get_string(&AttributePath::new("type")).unwrap(), "reranking");
        assert!(state
            .get_list(&AttributePath::new("completion"))
            .unwrap()
            .is_empty());
        assert_eq!(
            state
                .get_number(&AttributePath::new("reranking").index(0).attribute("top_n"))
                .unwrap(),
            3.0
        );
    }

    #[tokio::test]
    async fn read_reports_unreadable_configuration() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/provision/neural/processors/proc-1")
            .with_body(
                r#"{"data":{"id":"proc-1","model_id":"model-1","type":"speech","configuration":{}}}"#,
            )
            .create_async()
            .await;

        let mut current = planned();
        current
            .set_string(&AttributePath::new("id"), "proc-1".to_string())
            .unwrap();

        let resource: SpaceProcessorResource = configured(&server.url()).await;
        let response = resource
            .read(
                Context::new(),
                read_request("tama_space_processor", current),
            )
            .await;

        assert!(response.new_state.is_some());
        assert_eq!(response.diagnostics[0].summary, "Failed to read processor");
        assert!(response.diagnostics[0].detail.contains("unreadable speech configuration"));
    }

    #[tokio::test]
    async fn import_writes_space_id_from_response() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/provision/neural/processors/proc-1")
            .with_body(
                r#"{"data":{"id":"proc-1","space_id":"space-9","model_id":"model-1","type":"embedding","configuration":{"max_tokens":512}}}"#,
            )
            .create_async()
            .await;

        let resource: SpaceProcessorResource = configured(&server.url()).await;
        let response = resource
            .import_state(
                Context::new(),
                import_request("tama_space_processor", "proc-1"),
            )
            .await;

        let state = &response.imported_resources[0].state;
        assert_eq!(
            state.get_string(&AttributePath::new("space_id")).unwrap(),
            "space-9"
        );
        assert_eq!(state.get_string(&AttributePath::new("type")).unwrap(), "embedding");
    }
}
