//! Listener resource implementation

use crate::api::neural::{Listener, ListenerRequest};
use crate::resources::{
    api_client, carry_over, create_failed, create_response, delete_failed, delete_response,
    import_failed, import_response, optional_string, parent_id, read_failed, read_gone,
    read_response, required_string, set_optional_string, set_string, store_provider_data,
    update_failed, update_response,
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

#[derive(Default)]
pub struct ListenerResource {
    provider_data: Option<TamaProviderData>,
}

impl ListenerResource {
    pub fn new() -> Self {
        Self::default()
    }

    fn extract_listener_request(value: &DynamicValue) -> Result<ListenerRequest, Diagnostic> {
        Ok(ListenerRequest {
            endpoint: required_string(value, "endpoint")?,
            secret: required_string(value, "secret")?,
        })
    }
}

/// The API never returns `secret`, it is kept from `prior`
fn listener_state(listener: Listener, prior: &DynamicValue) -> DynamicValue {
    let mut state = DynamicValue::object();
    set_string(&mut state, "id", listener.id);
    set_optional_string(
        &mut state,
        "space_id",
        parent_id(prior, "space_id", listener.space_id),
    );
    set_string(&mut state, "endpoint", listener.endpoint);
    carry_over(&mut state, prior, "secret");
    set_optional_string(&mut state, "provision_state", listener.provision_state);
    state
}

#[async_trait]
impl Resource for ListenerResource {
    fn type_name(&self) -> &str {
        "tama_listener"
    }

    async fn schema(&self, _ctx: Context, _request: ResourceSchemaRequest) -> ResourceSchemaResponse {
        let schema = SchemaBuilder::new()
            .version(0)
            .description("Manages a listener that forwards space events to a webhook endpoint")
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .description("Listener identifier")
                    .computed()
                    .plan_modifier(UseStateForUnknown::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("space_id", AttributeType::String)
                    .description("Space to listen on")
                    .required()
                    .plan_modifier(RequiresReplace::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("endpoint", AttributeType::String)
                    .description("URL that receives the events")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("secret", AttributeType::String)
                    .description("Secret used to sign delivered events")
                    .required()
                    .sensitive()
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
        let body = match Self::extract_listener_request(&request.planned_state) {
            Ok(body) => body,
            Err(diag) => return create_failed(diag),
        };

        let result = client.neural().listeners().create(&space_id, &body).await;
        create_response(result, "listener", |listener| {
            listener_state(listener, &request.planned_state)
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

        let result = client.neural().listeners().get(&id).await;
        read_response(
            result,
            request.current_state,
            request.private,
            "listener",
            listener_state,
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
        let body = match Self::extract_listener_request(&request.planned_state) {
            Ok(body) => body,
            Err(diag) => return update_failed(request.prior_state, diag),
        };

        let result = client.neural().listeners().update(&id, &body).await;
        let planned = request.planned_state;
        update_response(result, request.prior_state, "listener", |listener| {
            listener_state(listener, &planned)
        })
    }

    async fn delete(&self, _ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse {
        let client = match api_client(&self.provider_data) {
            Ok(client) => client,
            Err(diag) => return delete_failed(diag),
        };
        let Some(id) = optional_string(&request.prior_state, "id") else {
            return delete_response(Ok(()), "listener");
        };

        delete_response(client.neural().listeners().delete(&id).await, "listener")
    }
}

#[async_trait]
impl ResourceWithConfigure for ListenerResource {
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
impl ResourceWithImportState for ListenerResource {
    async fn import_state(
        &self,
        _ctx: Context,
        request: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse {
        let client = match api_client(&self.provider_data) {
            Ok(client) => client,
            Err(diag) => return import_failed(diag),
        };

        let result = client.neural().listeners().get(&request.id).await;
        import_response(&request, result, "listener", |listener| {
            listener_state(listener, &DynamicValue::object())
        })
    }
}
