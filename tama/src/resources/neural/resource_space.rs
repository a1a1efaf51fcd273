//! Space resource implementation

use crate::api::neural::{Space, SpaceRequest};
use crate::resources::{
    api_client, create_failed, create_response, delete_failed, delete_response, import_failed,
    import_response, optional_string, read_failed, read_gone, read_response, required_string,
    set_optional_string, set_string, store_provider_data, update_failed, update_response,
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

pub const SPACE_TYPES: [&str; 2] = ["root", "component"];

#[derive(Default)]
pub struct SpaceResource {
    provider_data: Option<TamaProviderData>,
}

impl SpaceResource {
    pub fn new() -> Self {
        Self::default()
    }

    fn extract_space_request(value: &DynamicValue) -> Result<SpaceRequest, Diagnostic> {
        Ok(SpaceRequest {
            name: required_string(value, "name")?,
            space_type: required_string(value, "type")?,
        })
    }
}

pub(crate) fn space_state(space: Space) -> DynamicValue {
    let mut state = DynamicValue::object();
    set_string(&mut state, "id", space.id);
    set_string(&mut state, "name", space.name);
    set_string(&mut state, "type", space.space_type);
    set_optional_string(&mut state, "slug", space.slug);
    set_optional_string(&mut state, "provision_state", space.provision_state);
    state
}

#[async_trait]
impl Resource for SpaceResource {
    fn type_name(&self) -> &str {
        "tama_space"
    }

    async fn schema(&self, _ctx: Context, _request: ResourceSchemaRequest) -> ResourceSchemaResponse {
        let schema = SchemaBuilder::new()
            .version(0)
            .description("Manages a Tama space, the top level container for everything else")
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .description("Space identifier")
                    .computed()
                    .plan_modifier(UseStateForUnknown::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .description("Name of the space")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("type", AttributeType::String)
                    .description("Space type, root or component")
                    .required()
                    .validator(StringOneOf::create(&SPACE_TYPES))
                    .plan_modifier(RequiresReplace::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("slug", AttributeType::String)
                    .description("URL friendly name derived from the space name")
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
        let body = match Self::extract_space_request(&request.planned_state) {
            Ok(body) => body,
            Err(diag) => return create_failed(diag),
        };

        tracing::debug!(name = %body.name, "creating space");
        let result = client.neural().spaces().create(&body).await;
        create_response(result, "space", space_state)
    }

    async fn read(&self, _ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        let Some(id) = optional_string(&request.current_state, "id") else {
            return read_gone(request.private);
        };
        let client = match api_client(&self.provider_data) {
            Ok(client) => client,
            Err(diag) => return read_failed(request.current_state, request.private, diag),
        };

        let result = client.neural().spaces().get(&id).await;
        read_response(
            result,
            request.current_state,
            request.private,
            "space",
            |space, _| space_state(space),
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
        let body = match Self::extract_space_request(&request.planned_state) {
            Ok(body) => body,
            Err(diag) => return update_failed(request.prior_state, diag),
        };

        let result = client.neural().spaces().update(&id, &body).await;
        update_response(result, request.prior_state, "space", space_state)
    }

    async fn delete(&self, _ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse {
        let client = match api_client(&self.provider_data) {
            Ok(client) => client,
            Err(diag) => return delete_failed(diag),
        };
        let Some(id) = optional_string(&request.prior_state, "id") else {
            return delete_response(Ok(()), "space");
        };

        delete_response(client.neural().spaces().delete(&id).await, "space")
    }
}

#[async_trait]
impl ResourceWithConfigure for SpaceResource {
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
impl ResourceWithImportState for SpaceResource {
    async fn import_state(
        &self,
        _ctx: Context,
        request: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse {
        let client = match api_client(&self.provider_data) {
            Ok(client) => client,
            Err(diag) => return import_failed(diag),
        };

        let result = client.neural().spaces().get(&request.id).await;
        import_response(&request, result, "space", space_state)
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

    const SPACE_BODY: &str = r#"{"data":{"id":"space-1","name":"Core","type":"root","slug":"core","provision_state":"active"}}"#;

    fn planned() -> DynamicValue {
        object(&[
            ("id", Dynamic::Unknown),
            ("name", string("Core")),
            ("type", string("root")),
            ("slug", Dynamic::Unknown),
            ("provision_state", Dynamic::Unknown),
        ])
    }

    fn stored() -> DynamicValue {
        object(&[
            ("id", string("space-1")),
            ("name", string("Core")),
            ("type", string("root")),
            ("slug", string("core")),
            ("provision_state", string("active")),
        ])
    }

    #[tokio::test]
    async fn schema_marks_type_as_replacing() {
        let resource = SpaceResource::new();
        let response = resource
            .schema(Context::new(), ResourceSchemaRequest)
            .await;

        let block = &response.schema.block;
        assert!(block.attribute("id").unwrap().computed);
        assert!(block.attribute("name").unwrap().required);
        let space_type = block.attribute("type").unwrap();
        assert!(space_type.required);
        assert_eq!(space_type.plan_modifiers.len(), 1);
        assert_eq!(space_type.validators.len(), 1);
    }

    #[tokio::test]
    async fn create_posts_space_and_writes_state() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/provision/neural/spaces")
            .match_header("authorization", "Bearer test-key")
            .match_body(Matcher::Json(json!({"space": {"name": "Core", "type": "root"}})))
            .with_status(201)
            .with_body(SPACE_BODY)
            .create_async()
            .await;

        let resource: SpaceResource = configured(&server.url()).await;
        let response = resource
            .create(Context::new(), create_request("tama_space", planned()))
            .await;

        assert!(response.diagnostics.is_empty());
        let state = response.new_state;
        assert_eq!(state.get_string(&AttributePath::new("id")).unwrap(), "space-1");
        assert_eq!(state.get_string(&AttributePath::new("slug")).unwrap(), "core");
        assert_eq!(
            state.get_string(&AttributePath::new("provision_state")).unwrap(),
            "active"
        );
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn create_failure_returns_null_state() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/provision/neural/spaces")
            .with_status(422)
            .with_body(r#"{"errors":{"name":["has already been taken"]}}"#)
            .create_async()
            .await;

        let resource: SpaceResource = configured(&server.url()).await;
        let response = resource
            .create(Context::new(), create_request("tama_space", planned()))
            .await;

        assert!(response.new_state.is_null());
        assert_eq!(response.diagnostics.len(), 1);
        assert_eq!(response.diagnostics[0].summary, "Failed to create space");
        assert!(response.diagnostics[0].detail.contains("has already been taken"));
    }

    #[tokio::test]
    async fn create_without_provider_data_fails() {
        let resource = SpaceResource::new();
        let response = resource
            .create(Context::new(), create_request("tama_space", planned()))
            .await;

        assert_eq!(response.diagnostics[0].summary, "Provider not configured");
    }

    #[tokio::test]
    async fn read_refreshes_drifted_name() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/provision/neural/spaces/space-1")
            .with_body(
                r#"{"data":{"id":"space-1","name":"Renamed","type":"root","slug":"renamed","provision_state":"active"}}"#,
            )
            .create_async()
            .await;

        let resource: SpaceResource = configured(&server.url()).await;
        let response = resource
            .read(Context::new(), read_request("tama_space", stored()))
            .await;

        assert!(response.diagnostics.is_empty());
        let state = response.new_state.unwrap();
        assert_eq!(state.get_string(&AttributePath::new("name")).unwrap(), "Renamed");
        assert_eq!(state.get_string(&AttributePath::new("slug")).unwrap(), "renamed");
    }

    #[tokio::test]
    async fn read_not_found_removes_from_state() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/provision/neural/spaces/space-1")
            .with_status(404)
            .create_async()
            .await;

        let resource: SpaceResource = configured(&server.url()).await;
        let response = resource
            .read(Context::new(), read_request("tama_space", stored()))
            .await;

        assert!(response.new_state.is_none());
        assert!(response.diagnostics.is_empty());
    }

    #[tokio::test]
    async fn read_error_keeps_state() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/provision/neural/spaces/space-1")
            .with_status(403)
            .create_async()
            .await;

        let resource: SpaceResource = configured(&server.url()).await;
        let response = resource
            .read(Context::new(), read_request("tama_space", stored()))
            .await;

        assert_eq!(response.diagnostics[0].summary, "Failed to read space");
        let state = response.new_state.unwrap();
        assert_eq!(state.get_string(&AttributePath::new("id")).unwrap(), "space-1");
    }

    #[tokio::test]
    async fn update_patches_by_id() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("PATCH", "/provision/neural/spaces/space-1")
            .match_body(Matcher::Json(json!({"space": {"name": "Renamed", "type": "root"}})))
            .with_body(
                r#"{"data":{"id":"space-1","name":"Renamed","type":"root","slug":"renamed","provision_state":"active"}}"#,
            )
            .create_async()
            .await;

        let mut plan = stored();
        plan.set_string(&AttributePath::new("name"), "Renamed".to_string())
            .unwrap();
        plan.set_value(&AttributePath::new("slug"), Dynamic::Unknown)
            .unwrap();

        let resource: SpaceResource = configured(&server.url()).await;
        let response = resource
            .update(Context::new(), update_request("tama_space", stored(), plan))
            .await;

        assert!(response.diagnostics.is_empty());
        assert_eq!(
            response
                .new_state
                .get_string(&AttributePath::new("slug"))
                .unwrap(),
            "renamed"
        );
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn delete_tolerates_missing_space() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("DELETE", "/provision/neural/spaces/space-1")
            .with_status(404)
            .create_async()
            .await;

        let resource: SpaceResource = configured(&server.url()).await;
        let response = resource
            .delete(Context::new(), delete_request("tama_space", stored()))
            .await;

        assert!(response.diagnostics.is_empty());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn import_fetches_by_id() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/provision/neural/spaces/space-1")
            .with_body(SPACE_BODY)
            .create_async()
            .await;

        let resource: SpaceResource = configured(&server.url()).await;
        let response = resource
            .import_state(Context::new(), import_request("tama_space", "space-1"))
            .await;

        assert!(response.diagnostics.is_empty());
        let imported = &response.imported_resources[0];
        assert_eq!(imported.type_name, "tama_space");
        assert_eq!(
            imported.state.get_string(&AttributePath::new("name")).unwrap(),
            "Core"
        );
    }

    #[tokio::test]
    async fn import_of_missing_space_fails() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/provision/neural/spaces/nope")
            .with_status(404)
            .create_async()
            .await;

        let resource: SpaceResource = configured(&server.url()).await;
        let response = resource
            .import_state(Context::new(), import_request("tama_space", "nope"))
            .await;

        assert!(response.imported_resources.is_empty());
        assert_eq!(
            response.diagnostics[0].summary,
            "Cannot import non-existent remote object"
        );
    }
}
