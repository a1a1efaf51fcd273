//! Modular thought resource implementation
//!
//! A modular thought runs a platform module, identified by `reference`,
//! as one step of a chain.

use crate::api::perception::{Thought, ThoughtModule, ThoughtRequest};
use crate::resources::{
    api_client, create_failed, create_response, delete_failed, delete_response, import_failed,
    import_response, json_at, optional_i64, optional_json_string, optional_string, parent_id,
    read_failed, read_gone, read_response, required_string, set_optional_i64,
    set_optional_string, set_string, store_provider_data, string_at, update_failed,
    update_response,
};
use crate::TamaProviderData;
use async_trait::async_trait;
use std::collections::HashMap;
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
use tfplug::schema::{AttributeBuilder, AttributeType, NestedBlockBuilder, NestingMode, SchemaBuilder};
use tfplug::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};
use tfplug::validator::JsonString;

#[derive(Default)]
pub struct ModularThoughtResource {
    provider_data: Option<TamaProviderData>,
}

impl ModularThoughtResource {
    pub fn new() -> Self {
        Self::default()
    }

    fn extract_thought_request(value: &DynamicValue) -> Result<ThoughtRequest, Diagnostic> {
        Ok(ThoughtRequest {
            relation: required_string(value, "relation")?,
            index: optional_i64(value, "index"),
            output_class_id: optional_string(value, "output_class_id"),
            module: module_from(value)?,
        })
    }
}

fn module_from(value: &DynamicValue) -> Result<ThoughtModule, Diagnostic> {
    let reference_path = AttributePath::new("module").attribute("reference");
    let reference = string_at(value, &reference_path).ok_or_else(|| {
        Diagnostic::error(
            "Missing required attribute",
            "'module.reference' must be set",
        )
        .with_attribute(reference_path.clone())
    })?;

    Ok(ThoughtModule {
        reference,
        parameters: json_at(value, &AttributePath::new("module").attribute("parameters"))?,
    })
}

fn thought_state(thought: Thought, prior: &DynamicValue) -> DynamicValue {
    let mut state = DynamicValue::object();
    set_string(&mut state, "id", thought.id);
    set_optional_string(
        &mut state,
        "chain_id",
        parent_id(prior, "chain_id", thought.chain_id),
    );
    set_string(&mut state, "relation", thought.relation);
    set_optional_i64(&mut state, "index", thought.index);
    set_optional_string(&mut state, "output_class_id", thought.output_class_id);
    set_optional_string(&mut state, "provision_state", thought.provision_state);

    let prior_parameters = string_at(prior, &AttributePath::new("module").attribute("parameters"));
    let parameters = optional_json_string(prior_parameters.as_deref(), thought.module.parameters)
        .map_or(Dynamic::Null, Dynamic::String);
    let module = Dynamic::Map(HashMap::from([
        ("reference".to_string(), Dynamic::String(thought.module.reference)),
        ("parameters".to_string(), parameters),
    ]));
    let _ = state.set_value(&AttributePath::new("module"), module);

    state
}

#[async_trait]
impl Resource for ModularThoughtResource {
    fn type_name(&self) -> &str {
        "tama_modular_thought"
    }

    async fn schema(&self, _ctx: Context, _request: ResourceSchemaRequest) -> ResourceSchemaResponse {
        let schema = SchemaBuilder::new()
            .version(0)
            .description("Manages a thought that runs a platform module within a chain")
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .description("Thought identifier")
                    .computed()
                    .plan_modifier(UseStateForUnknown::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("chain_id", AttributeType::String)
                    .description("Chain the thought belongs to")
                    .required()
                    .plan_modifier(RequiresReplace::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("relation", AttributeType::String)
                    .description("Name under which the thought's output is stored")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("index", AttributeType::Number)
                    .description("Position in the chain, assigned by Tama when unset")
                    .optional()
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("output_class_id", AttributeType::String)
                    .description("Class the output conforms to")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("provision_state", AttributeType::String)
                    .description("Provisioning state reported by Tama")
                    .computed()
                    .build(),
            )
            .block(
                NestedBlockBuilder::new("module", NestingMode::Single)
                    .description("Module the thought runs")
                    .attribute(
                        AttributeBuilder::new("reference", AttributeType::String)
                            .description("Module reference, e.g. tama/agentic/generate")
                            .required()
                            .build(),
                    )
                    .attribute(
                        AttributeBuilder::new("parameters", AttributeType::String)
                            .description("JSON-encoded module parameters")
                            .optional()
                            .validator(JsonString::create())
                            .build(),
                    )
                    .min_items(1)
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
        let chain_id = match required_string(&request.planned_state, "chain_id") {
            Ok(id) => id,
            Err(diag) => return create_failed(diag),
        };
        let body = match Self::extract_thought_request(&request.planned_state) {
            Ok(body) => body,
            Err(diag) => return create_failed(diag),
        };

        tracing::debug!(chain_id = %chain_id, module = %body.module.reference, "creating thought");
        let result = client.perception().thoughts().create(&chain_id, &body).await;
        create_response(result, "thought", |thought| {
            thought_state(thought, &request.planned_state)
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

        let result = client.perception().thoughts().get(&id).await;
        read_response(
            result,
            request.current_state,
            request.private,
            "thought",
            thought_state,
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
        let body = match Self::extract_thought_request(&request.planned_state) {
            Ok(body) => body,
            Err(diag) => return update_failed(request.prior_state, diag),
        };

        let result = client.perception().thoughts().update(&id, &body).await;
        let planned = request.planned_state;
        update_response(result, request.prior_state, "thought", |thought| {
            thought_state(thought, &planned)
        })
    }

    async fn delete(&self, _ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse {
        let client = match api_client(&self.provider_data) {
            Ok(client) => client,
            Err(diag) => return delete_failed(diag),
        };
        let Some(id) = optional_string(&request.prior_state, "id") else {
            return delete_response(Ok(()), "thought");
        };

        delete_response(client.perception().thoughts().delete(&id).await, "thought")
    }
}

#[async_trait]
impl ResourceWithConfigure for ModularThoughtResource {
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
impl ResourceWithImportState for ModularThoughtResource {
    async fn import_state(
        &self,
        _ctx: Context,
        request: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse {
        let client = match api_client(&self.provider_data) {
            Ok(client) => client,
            Err(diag) => return import_failed(diag),
        };

        let result = client.perception().thoughts().get(&request.id).await;
        import_response(&request, result, "thought", |thought| {
            thought_state(thought, &DynamicValue::object())
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

    fn module(reference: &str, parameters: Dynamic) -> Dynamic {
        Dynamic::Map(HashMap::from([
            ("reference".to_string(), string(reference)),
            ("parameters".to_string(), parameters),
        ]))
    }

    fn planned(module: Dynamic) -> DynamicValue {
        object(&[
            ("id", Dynamic::Unknown),
            ("chain_id", string("chain-1")),
            ("relation", string("description")),
            ("index", Dynamic::Null),
            ("output_class_id", Dynamic::Null),
            ("provision_state", Dynamic::Unknown),
            ("module", module),
        ])
    }

    #[test]
    fn module_reference_is_required() {
        let diag = module_from(&planned(Dynamic::Null)).unwrap_err();
        assert_eq!(
            diag.attribute,
            Some(AttributePath::new("module").attribute("reference"))
        );
    }

    #[tokio::test]
    async fn create_sends_module_and_records_index() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/provision/perception/chains/chain-1/thoughts")
            .match_body(Matcher::Json(json!({
                "thought": {
                    "relation": "description",
                    "module": {
                        "reference": "tama/agentic/generate",
                        "parameters": {"relation": "description"}
                    }
                }
            })))
            .with_status(201)
            .with_body(
                r#"{"data":{"id":"thought-1","chain_id":"chain-1","relation":"description","index":0,"module":{"reference":"tama/agentic/generate","parameters":{"relation":"description"}},"provision_state":"active"}}"#,
            )
            .create_async()
            .await;

        let text = r#"{ "relation": "description" }"#;
        let resource: ModularThoughtResource = configured(&server.url()).await;
        let response = resource
            .create(
                Context::new(),
                create_request(
                    "tama_modular_thought",
                    planned(module("tama/agentic/generate", string(text))),
                ),
            )
            .await;

        assert!(response.diagnostics.is_empty());
        let state = response.new_state;
        assert_eq!(state.get_number(&AttributePath::new("index")).unwrap(), 0.0);
        assert_eq!(
            state
                .get_string(&AttributePath::new("module").attribute("parameters"))
                .unwrap(),
            text
        );
        assert!(state
            .get(&AttributePath::new("output_class_id"))
            .unwrap()
            .is_null());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn import_fills_module_block() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/provision/perception/thoughts/thought-1")
            .with_body(
                r#"{"data":{"id":"thought-1","chain_id":"chain-1","relation":"splits","index":1,"output_class_id":"class-9","module":{"reference":"tama/functions/split"}}}"#,
            )
            .create_async()
            .await;

        let resource: ModularThoughtResource = configured(&server.url()).await;
        let response = resource
            .import_state(
                Context::new(),
                import_request("tama_modular_thought", "thought-1"),
            )
            .await;

        let state = &response.imported_resources[0].state;
        assert_eq!(
            state
                .get_string(&AttributePath::new("module").attribute("reference"))
                .unwrap(),
            "tama/functions/split"
        );
        assert!(state
            .get(&AttributePath::new("module").attribute("parameters"))
            .unwrap()
            .is_null());
        assert_eq!(
            state.get_string(&AttributePath::new("output_class_id")).unwrap(),
            "class-9"
        );
    }
}
