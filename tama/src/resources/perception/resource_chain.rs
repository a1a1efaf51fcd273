//! Chain resource implementation

use crate::api::perception::{Chain, ChainRequest};
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
use tfplug::types::DynamicValue;

#[derive(Default)]
pub struct ChainResource {
    provider_data: Option<TamaProviderData>,
}

impl ChainResource {
    pub fn new() -> Self {
        Self::default()
    }
}

fn chain_state(chain: Chain, prior: &DynamicValue) -> DynamicValue {
    let mut state = DynamicValue::object();
    set_string(&mut state, "id", chain.id);
    set_optional_string(
        &mut state,
        "space_id",
        parent_id(prior, "space_id", chain.space_id),
    );
    set_string(&mut state, "name", chain.name);
    set_optional_string(&mut state, "slug", chain.slug);
    set_optional_string(&mut state, "provision_state", chain.provision_state);
    state
}

#[async_trait]
impl Resource for ChainResource {
    fn type_name(&self) -> &str {
        "tama_chain"
    }

    async fn schema(&self, _ctx: Context, _request: ResourceSchemaRequest) -> ResourceSchemaResponse {
        let schema = SchemaBuilder::new()
            .version(0)
            .description("Manages a chain, an ordered sequence of thoughts")
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .description("Chain identifier")
                    .computed()
                    .plan_modifier(UseStateForUnknown::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("space_id", AttributeType::String)
                    .description("Space the chain belongs to")
                    .required()
                    .plan_modifier(RequiresReplace::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .description("Chain name")
                    .required()
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
        let name = match required_string(&request.planned_state, "name") {
            Ok(name) => name,
            Err(diag) => return create_failed(diag),
        };

        let result = client
            .perception()
            .chains()
            .create(&space_id, &ChainRequest { name })
            .await;
        create_response(result, "chain", |chain| {
            chain_state(chain, &request.planned_state)
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

        let result = client.perception().chains().get(&id).await;
        read_response(
            result,
            request.current_state,
            request.private,
            "chain",
            chain_state,
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
        let name = match required_string(&request.planned_state, "name") {
            Ok(name) => name,
            Err(diag) => return update_failed(request.prior_state, diag),
        };

        let result = client
            .perception()
            .chains()
            .update(&id, &ChainRequest { name })
            .await;
        let planned = request.planned_state;
        update_response(result, request.prior_state, "chain", |chain| {
            chain_state(chain, &planned)
        })
    }

    async fn delete(&self, _ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse {
        let client = match api_client(&self.provider_data) {
            Ok(client) => client,
            Err(diag) => return delete_failed(diag),
        };
        let Some(id) = optional_string(&request.prior_state, "id") else {
            return delete_response(Ok(()), "chain");
        };

        delete_response(client.perception().chains().delete(&id).await, "chain")
    }
}

#[async_trait]
impl ResourceWithConfigure for ChainResource {
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
impl ResourceWithImportState for ChainResource {
    async fn import_state(
        &self,
        _ctx: Context,
        request: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse {
        let client = match api_client(&self.provider_data) {
            Ok(client) => client,
            Err(diag) => return import_failed(diag),
        };

        let result = client.perception().chains().get(&request.id).await;
        import_response(&request, result, "chain", |chain| {
            chain_state(chain, &DynamicValue::object())
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
    async fn create_posts_name_under_space() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/provision/perception/spaces/space-1/chains")
            .match_body(Matcher::Json(json!({"chain": {"name": "Extract Movie"}})))
            .with_status(201)
            .with_body(
                r#"{"data":{"id":"chain-1","space_id":"space-1","name":"Extract Movie","slug":"extract-movie","provision_state":"active"}}"#,
            )
            .create_async()
            .await;

        let planned = object(&[
            ("id", Dynamic::Unknown),
            ("space_id", string("space-1")),
            ("name", string("Extract Movie")),
            ("slug", Dynamic::Unknown),
            ("provision_state", Dynamic::Unknown),
        ]);

        let resource: ChainResource = configured(&server.url()).await;
        let response = resource
            .create(Context::new(), create_request("tama_chain", planned))
            .await;

        assert!(response.diagnostics.is_empty());
        assert_eq!(
            response
                .new_state
                .get_string(&AttributePath::new("slug"))
                .unwrap(),
            "extract-movie"
        );
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn delete_reports_server_errors() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("DELETE", "/provision/perception/chains/chain-1")
            .with_status(409)
            .with_body(r#"{"error":"chain has thoughts"}"#)
            .create_async()
            .await;

        let resource: ChainResource = configured(&server.url()).await;
        let response = resource
            .delete(
                Context::new(),
                delete_request("tama_chain", object(&[("id", string("chain-1"))])),
            )
            .await;

        assert_eq!(response.diagnostics[0].summary, "Failed to delete chain");
        assert!(response.diagnostics[0].detail.contains("409"));
    }
}
