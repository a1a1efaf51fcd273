//! Activation resource implementation

use crate::api::neural::{Activation, CreateActivationRequest, UpdateActivationRequest};
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

pub const ACTIVATION_TYPES: [&str; 3] = ["explicit", "reactive", "scheduled"];

#[derive(Default)]
pub struct ActivationResource {
    provider_data: Option<TamaProviderData>,
}

impl ActivationResource {
    pub fn new() -> Self {
        Self::default()
    }

    fn extract_create_request(value: &DynamicValue) -> Result<CreateActivationRequest, Diagnostic> {
        Ok(CreateActivationRequest {
            class_id: required_string(value, "class_id")?,
            activation_type: required_string(value, "type")?,
            on: optional_string(value, "on"),
        })
    }
}

fn activation_state(activation: Activation, prior: &DynamicValue) -> DynamicValue {
    let mut state = DynamicValue::object();
    set_string(&mut state, "id", activation.id);
    set_optional_string(
        &mut state,
        "chain_id",
        parent_id(prior, "chain_id", activation.chain_id),
    );
    set_string(&mut state, "class_id", activation.class_id);
    set_string(&mut state, "type", activation.activation_type);
    set_optional_string(&mut state, "on", activation.on);
    set_optional_string(&mut state, "provision_state", activation.provision_state);
    state
}

#[async_trait]
impl Resource for ActivationResource {
    fn type_name(&self) -> &str {
        "tama_activation"
    }

    async fn schema(&self, _ctx: Context, _request: ResourceSchemaRequest) -> ResourceSchemaResponse {
        let schema = SchemaBuilder::new()
            .version(0)
            .description("Manages an activation that runs a chain for entities of a class")
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .description("Activation identifier")
                    .computed()
                    .plan_modifier(UseStateForUnknown::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("chain_id", AttributeType::String)
                    .description("Chain to activate")
                    .required()
                    .plan_modifier(RequiresReplace::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("class_id", AttributeType::String)
                    .description("Class whose entities trigger the chain")
                    .required()
                    .plan_modifier(RequiresReplace::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("type", AttributeType::String)
                    .description("How the chain is triggered: explicit, reactive or scheduled")
                    .required()
                    .validator(StringOneOf::create(&ACTIVATION_TYPES))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("on", AttributeType::String)
                    .description("Event that triggers a reactive activation")
                    .optional()
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
        let chain_id = match required_string(&request.planned_state, "chain_id") {
            Ok(id) => id,
            Err(diag) => return create_failed(diag),
        };
        let body = match Self::extract_create_request(&request.planned_state) {
            Ok(body) => body,
            Err(diag) => return create_failed(diag),
        };

        let result = client.neural().activations().create(&chain_id, &body).await;
        create_response(result, "activation", |activation| {
            activation_state(activation, &request.planned_state)
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

        let result = client.neural().activations().get(&id).await;
        read_response(
            result,
            request.current_state,
            request.private,
            "activation",
            activation_state,
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
        let activation_type = match required_string(&request.planned_state, "type") {
            Ok(activation_type) => activation_type,
            Err(diag) => return update_failed(request.prior_state, diag),
        };
        let body = UpdateActivationRequest {
            activation_type,
            on: optional_string(&request.planned_state, "on"),
        };

        let result = client.neural().activations().update(&id, &body).await;
        let planned = request.planned_state;
        update_response(result, request.prior_state, "activation", |activation| {
            activation_state(activation, &planned)
        })
    }

    async fn delete(&self, _ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse {
        let client = match api_client(&self.provider_data) {
            Ok(client) => client,
            Err(diag) => return delete_failed(diag),
        };
        let Some(id) = optional_string(&request.prior_state, "id") else {
            return delete_response(Ok(()), "activation");
        };

        delete_response(client.neural().activations().delete(&id).await, "activation")
    }
}

#[async_trait]
impl ResourceWithConfigure for ActivationResource {
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
impl ResourceWithImportState for ActivationResource {
    async fn import_state(
        &self,
        _ctx: Context,
        request: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse {
        let client = match api_client(&self.provider_data) {
            Ok(client) => client,
            Err(diag) => return import_failed(diag),
        };

        let result = client.neural().activations().get(&request.id).await;
        import_response(&request, result, "activation", |activation| {
            activation_state(activation, &DynamicValue::object())
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

    #[tokio::test]
    async fn create_omits_unset_trigger_event() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/provision/neural/chains/chain-1/activations")
            .match_body(Matcher::Json(json!({
                "activation": {"class_id": "class-1", "type": "explicit"}
            })))
            .with_status(201)
            .with_body(
                r#"{"data":{"id":"act-1","chain_id":"chain-1","class_id":"class-1","type":"explicit","provision_state":"active"}}"#,
            )
            .create_async()
            .await;

        let planned = object(&[
            ("id", Dynamic::Unknown),
            ("chain_id", string("chain-1")),
            ("class_id", string("class-1")),
            ("type", string("explicit")),
            ("on", Dynamic::Null),
            ("provision_state", Dynamic::Unknown),
        ]);

        let resource: ActivationResource = configured(&server.url()).await;
        let response = resource
            .create(Context::new(), create_request("tama_activation", planned))
            .await;

        assert!(response.diagnostics.is_empty());
        let state = response.new_state;
        assert!(state.get(&AttributePath::new("on")).unwrap().is_null());
        assert_eq!(state.get_string(&AttributePath::new("id")).unwrap(), "act-1");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn update_changes_type_and_event() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("PATCH", "/provision/neural/activations/act-1")
            .match_body(Matcher::Json(json!({
                "activation": {"type": "reactive", "on": "processed"}
            })))
            .with_body(
                r#"{"data":{"id":"act-1","class_id":"class-1","type":"reactive","on":"processed","provision_state":"active"}}"#,
            )
            .create_async()
            .await;

        let prior = object(&[
            ("id", string("act-1")),
            ("chain_id", string("chain-1")),
            ("class_id", string("class-1")),
            ("type", string("explicit")),
            ("on", Dynamic::Null),
            ("provision_state", string("active")),
        ]);
        let mut planned = prior.clone();
        planned
            .set_string(&AttributePath::new("type"), "reactive".to_string())
            .unwrap();
        planned
            .set_string(&AttributePath::new("on"), "processed".to_string())
            .unwrap();

        let resource: ActivationResource = configured(&server.url()).await;
        let response = resource
            .update(
                Context::new(),
                update_request("tama_activation", prior, planned),
            )
            .await;

        assert!(response.diagnostics.is_empty());
        let state = response.new_state;
        assert_eq!(state.get_string(&AttributePath::new("on")).unwrap(), "processed");
        assert_eq!(
            state.get_string(&AttributePath::new("chain_id")).unwrap(),
            "chain-1"
        );
        mock.assert_async().await;
    }
}
