//! Thought processor resource implementation
//!
//! Overrides the model a single thought uses, with the same configuration
//! blocks as a space processor.

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
pub struct ThoughtProcessorResource {
    provider_data: Option<TamaProviderData>,
}

impl ThoughtProcessorResource {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Resource for ThoughtProcessorResource {
    fn type_name(&self) -> &str {
        "tama_thought_processor"
    }

    async fn schema(&self, _ctx: Context, _request: ResourceSchemaRequest) -> ResourceSchemaResponse {
        let mut builder = SchemaBuilder::new()
            .version(0)
            .description("Manages a processor that sets the model used by one thought")
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .description("Processor identifier")
                    .computed()
                    .plan_modifier(UseStateForUnknown::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("thought_id", AttributeType::String)
                    .description("Thought the processor applies to")
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
        let thought_id = match required_string(&request.planned_state, "thought_id") {
            Ok(id) => id,
            Err(diag) => return create_failed(diag),
        };
        let body = match processor_request(&request.planned_state) {
            Ok(body) => body,
            Err(diag) => return create_failed(diag),
        };

        tracing::debug!(thought_id = %thought_id, processor_type = body.config.type_name(), "creating thought processor");
        let result = client
            .perception()
            .processors()
            .create(&thought_id, &body)
            .await
            .and_then(|processor| processor_state(processor, "thought_id", &request.planned_state));
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

        let result = client.perception().processors().get(&id).await;
        let result = result.and_then(|processor| processor_state(processor, "thought_id", &request.current_state));
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
            .perception()
            .processors()
            .update(&id, &body)
            .await
            .and_then(|processor| processor_state(processor, "thought_id", &request.planned_state));
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

        delete_response(client.perception().processors().delete(&id).await, "processor")
    }
}

#[async_trait]
impl ResourceWithConfigure for ThoughtProcessorResource {
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
impl ResourceWithImportState for ThoughtProcessorResource {
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
            .perception()
            .processors()
            .get(&request.id)
            .await
            .and_then(|processor| processor_state(processor, "thought_id", &DynamicValue::object()));
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

    fn embedding(max_tokens: f64) -> Dynamic {
        Dynamic::List(vec![Dynamic::Map(HashMap::from([
            ("max_tokens".to_string(), Dynamic::Number(max_tokens)),
            ("parameters".to_string(), Dynamic::Null),
        ]))])
    }

    fn planned(max_tokens: f64) -> DynamicValue {
        object(&[
            ("id", Dynamic::Unknown),
            ("thought_id", string("thought-1")),
            ("model_id", string("model-1")),
            ("type", Dynamic::Unknown),
            ("completion", Dynamic::List(vec![])),
            ("embedding", embedding(max_tokens)),
            ("reranking", Dynamic::List(vec![])),
        ])
    }

    #[tokio::test]
    async fn validate_rejects_two_blocks() {
        let mut config = planned(512.0);
        config
            .set_value(
                &AttributePath::new("reranking"),
                Dynamic::List(vec![Dynamic::Map(HashMap::from([(
                    "top_n".to_string(),
                    Dynamic::Number(3.0),
                )]))]),
            )
            .unwrap();

        let resource = ThoughtProcessorResource::new();
        let response = resource
            .validate(
                Context::new(),
                validate_request("tama_thought_processor", config),
            )
            .await;

        assert_eq!(response.diagnostics.len(), 1);
        assert!(response.diagnostics[0].detail.contains("embedding, reranking"));
    }

    #[tokio::test]
    async fn create_posts_under_thought() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/provision/perception/thoughts/thought-1/processors")
            .match_body(Matcher::Json(json!({
                "processor": {
                    "model_id": "model-1",
                    "type": "embedding",
                    "configuration": {"max_tokens": 512}
                }
            })))
            .with_status(201)
            .with_body(
                r#"{"data":{"id":"proc-7","thought_id":"thought-1","model_id":"model-1","type":"embedding","configuration":{"max_tokens":512}}}"#,
            )
            .create_async()
            .await;

        let resource: ThoughtProcessorResource = configured(&server.url()).await;
        let response = resource
            .create(
                Context::new(),
                create_request("tama_thought_processor", planned(512.0)),
            )
            .await;

        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
        let state = response.new_state;
        assert_eq!(
            state.get_string(&AttributePath::new("thought_id")).unwrap(),
            "thought-1"
        );
        assert_eq!(state.get_string(&AttributePath::new("type")).unwrap(), "embedding");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn update_patches_configuration() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("PATCH", "/provision/perception/processors/proc-7")
            .match_body(Matcher::PartialJson(json!({
                "processor": {"configuration": {"max_tokens": 1024}}
            })))
            .with_body(
                r#"{"data":{"id":"proc-7","model_id":"model-1","type":"embedding","configuration":{"max_tokens":1024}}}"#,
            )
            .create_async()
            .await;

        let mut prior = planned(512.0);
        prior
            .set_string(&AttributePath::new("id"), "proc-7".to_string())
            .unwrap();
        prior
            .set_string(&AttributePath::new("type"), "embedding".to_string())
            .unwrap();
        let mut next = prior.clone();
        next.set_value(&AttributePath::new("embedding"), embedding(1024.0))
            .unwrap();

        let resource: ThoughtProcessorResource = configured(&server.url()).await;
        let response = resource
            .update(
                Context::new(),
                update_request("tama_thought_processor", prior, next),
            )
            .await;

        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
        assert_eq!(
            response
                .new_state
                .get_number(&AttributePath::new("embedding").index(0).attribute("max_tokens"))
                .unwrap(),
            1024.0
        );
        mock.assert_async().await;
    }
}
