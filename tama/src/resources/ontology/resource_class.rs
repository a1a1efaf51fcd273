//! Class resource implementation
//!
//! A class is defined by a JSON schema. Tama derives the class name and
//! description from the schema's `title` and `description`.

use crate::api::ontology::{Class, ClassRequest};
use crate::resources::{
    api_client, create_failed, create_response, delete_failed, delete_response, import_failed,
    import_response, json_string, optional_string, parent_id, read_failed, read_gone,
    read_response, required_json, required_string, set_optional_string, set_string,
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
    UpdateResourceResponse,
};
use tfplug::schema::{AttributeBuilder, AttributeType, SchemaBuilder};
use tfplug::types::{Diagnostic, DynamicValue};
use tfplug::validator::JsonString;

#[derive(Default)]
pub struct ClassResource {
    provider_data: Option<TamaProviderData>,
}

impl ClassResource {
    pub fn new() -> Self {
        Self::default()
    }

    fn extract_class_request(value: &DynamicValue) -> Result<ClassRequest, Diagnostic> {
        Ok(ClassRequest {
            schema: required_json(value, "schema_json")?,
        })
    }
}

/// Shared with the class data source, which looks classes up by name
pub(crate) fn class_state(class: Class, prior: &DynamicValue) -> DynamicValue {
    let mut state = DynamicValue::object();
    set_string(&mut state, "id", class.id);
    set_optional_string(
        &mut state,
        "space_id",
        parent_id(prior, "space_id", class.space_id),
    );
    set_string(&mut state, "name", class.name);
    set_optional_string(&mut state, "description", class.description);
    set_string(
        &mut state,
        "schema_json",
        json_string(optional_string(prior, "schema_json").as_deref(), &class.schema),
    );
    set_optional_string(&mut state, "provision_state", class.provision_state);
    state
}

#[async_trait]
impl Resource for ClassResource {
    fn type_name(&self) -> &str {
        "tama_class"
    }

    async fn schema(&self, _ctx: Context, _request: ResourceSchemaRequest) -> ResourceSchemaResponse {
        let schema = SchemaBuilder::new()
            .version(0)
            .description("Manages a class, the JSON schema entities of a space conform to")
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .description("Class identifier")
                    .computed()
                    .plan_modifier(UseStateForUnknown::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("space_id", AttributeType::String)
                    .description("Space the class belongs to")
                    .required()
                    .plan_modifier(RequiresReplace::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("schema_json", AttributeType::String)
                    .description("JSON schema of the class, with title and description")
                    .required()
                    .validator(JsonString::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .description("Class name taken from the schema title")
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("description", AttributeType::String)
                    .description("Class description taken from the schema")
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
        let body = match Self::extract_class_request(&request.planned_state) {
            Ok(body) => body,
            Err(diag) => return create_failed(diag),
        };

        tracing::debug!(space_id = %space_id, "creating class");
        let result = client.ontology().classes().create(&space_id, &body).await;
        create_response(result, "class", |class| {
            class_state(class, &request.planned_state)
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

        let result = client.ontology().classes().get(&id).await;
        read_response(
            result,
            request.current_state,
            request.private,
            "class",
            class_state,
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
        let body = match Self::extract_class_request(&request.planned_state) {
            Ok(body) => body,
            Err(diag) => return update_failed(request.prior_state, diag),
        };

        let result = client.ontology().classes().update(&id, &body).await;
        let planned = request.planned_state;
        update_response(result, request.prior_state, "class", |class| {
            class_state(class, &planned)
        })
    }

    async fn delete(&self, _ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse {
        let client = match api_client(&self.provider_data) {
            Ok(client) => client,
            Err(diag) => return delete_failed(diag),
        };
        let Some(id) = optional_string(&request.prior_state, "id") else {
            return delete_response(Ok(()), "class");
        };

        delete_response(client.ontology().classes().delete(&id).await, "class")
    }
}

#[async_trait]
impl ResourceWithConfigure for ClassResource {
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
impl ResourceWithImportState for ClassResource {
    async fn import_state(
        &self,
        _ctx: Context,
        request: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse {
        let client = match api_client(&self.provider_data) {
            Ok(client) => client,
            Err(diag) => return import_failed(diag),
        };

        let result = client.ontology().classes().get(&request.id).await;
        import_response(&request, result, "class", |class| {
            class_state(class, &DynamicValue::object())
        })
    }
}
