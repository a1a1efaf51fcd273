//! Specification resource implementation
//!
//! A specification is an OpenAPI document describing the actions of a
//! source. Tama processes it asynchronously, so creation can optionally wait
//! for the processing to finish through `wait_for`.

use crate::api::sensory::{Specification, SpecificationRequest, SpecificationsApi};
use crate::resources::wait_for::{self, settle};
use crate::resources::{
    api_client, api_error, carry_over, create_failed, delete_failed, delete_response,
    import_failed, import_response, json_string, optional_string, parent_id, read_failed,
    read_gone, read_response, required_json, required_string, set_optional_string, set_string,
    store_provider_data, update_failed,
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
pub struct SpecificationResource {
    provider_data: Option<TamaProviderData>,
}

impl SpecificationResource {
    pub fn new() -> Self {
        Self::default()
    }

    fn extract_specification_request(
        value: &DynamicValue,
    ) -> Result<SpecificationRequest, Diagnostic> {
        Ok(SpecificationRequest {
            schema: required_json(value, "schema")?,
            version: required_string(value, "version")?,
            endpoint: required_string(value, "endpoint")?,
        })
    }
}

fn specification_state(specification: Specification, prior: &DynamicValue) -> DynamicValue {
    let mut state = DynamicValue::object();
    set_string(&mut state, "id", specification.id);
    set_optional_string(
        &mut state,
        "space_id",
        parent_id(prior, "space_id", specification.space_id),
    );
    set_string(
        &mut state,
        "schema",
        json_string(
            optional_string(prior, "schema").as_deref(),
            &specification.schema,
        ),
    );
    set_string(&mut state, "version", specification.version);
    set_string(&mut state, "endpoint", specification.endpoint);
    set_optional_string(&mut state, "current_state", specification.current_state);
    carry_over(&mut state, prior, "wait_for");
    state
}

#[async_trait]
impl Resource for SpecificationResource {
    fn type_name(&self) -> &str {
        "tama_specification"
    }

    async fn schema(&self, _ctx: Context, _request: ResourceSchemaRequest) -> ResourceSchemaResponse {
        let schema = SchemaBuilder::new()
            .version(0)
            .description("Manages an OpenAPI specification describing the actions of a source")
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .description("Specification identifier")
                    .computed()
                    .plan_modifier(UseStateForUnknown::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("space_id", AttributeType::String)
                    .description("Space the specification belongs to")
                    .required()
                    .plan_modifier(RequiresReplace::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("schema", AttributeType::String)
                    .description("JSON-encoded OpenAPI document")
                    .required()
                    .validator(JsonString::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("version", AttributeType::String)
                    .description("Version of the specification")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("endpoint", AttributeType::String)
                    .description("Base URL the actions are sent to")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("current_state", AttributeType::String)
                    .description("Processing state reported by Tama")
                    .computed()
                    .build(),
            )
            .block(wait_for::block())
            .build();

        ResourceSchemaResponse {
            schema,
            diagnostics: vec![],
        }
    }

    async fn create(&self, ctx: Context, request: CreateResourceRequest) -> CreateResourceResponse {
        let client = match api_client(&self.provider_data) {
            Ok(client) => client,
            Err(diag) => return create_failed(diag),
        };
        let space_id = match required_string(&request.planned_state, "space_id") {
            Ok(id) => id,
            Err(diag) => return create_failed(diag),
        };
        let body = match Self::extract_specification_request(&request.planned_state) {
            Ok(body) => body,
            Err(diag) => return create_failed(diag),
        };

        let created = match client
            .sensory()
            .specifications()
            .create(&space_id, &body)
            .await
        {
            Ok(specification) => specification,
            Err(e) => {
                tracing::error!(error = %e, "failed to create specification");
                return create_failed(api_error("create specification", &e));
            }
        };

        let path = SpecificationsApi::path(&created.id);
        let (specification, waited) = settle(
            &ctx,
            client,
            &path,
            &request.planned_state,
            created,
            "specification",
        )
        .await;

        CreateResourceResponse {
            new_state: specification_state(specification, &request.planned_state),
            private: vec![],
            diagnostics: waited.into_iter().collect(),
        }
    }

    async fn read(&self, _ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        let Some(id) = optional_string(&request.current_state, "id") else {
            return read_gone(request.private);
        };
        let client = match api_client(&self.provider_data) {
            Ok(client) => client,
            Err(diag) => return read_failed(request.current_state, request.private, diag),
        };

        let result = client.sensory().specifications().get(&id).await;
        read_response(
            result,
            request.current_state,
            request.private,
            "specification",
            specification_state,
        )
    }

    async fn update(&self, ctx: Context, request: UpdateResourceRequest) -> UpdateResourceResponse {
        let client = match api_client(&self.provider_data) {
            Ok(client) => client,
            Err(diag) => return update_failed(request.prior_state, diag),
        };
        let id = match required_string(&request.prior_state, "id") {
            Ok(id) => id,
            Err(diag) => return update_failed(request.prior_state, diag),
        };
        let body = match Self::extract_specification_request(&request.planned_state) {
            Ok(body) => body,
            Err(diag) => return update_failed(request.prior_state, diag),
        };

        let updated = match client.sensory().specifications().update(&id, &body).await {
            Ok(specification) => specification,
            Err(e) => {
                tracing::error!(error = %e, "failed to update specification");
                return update_failed(
                    request.prior_state,
                    api_error("update specification", &e),
                );
            }
        };

        let path = SpecificationsApi::path(&id);
        let (specification, waited) = settle(
            &ctx,
            client,
            &path,
            &request.planned_state,
            updated,
            "specification",
        )
        .await;

        UpdateResourceResponse {
            new_state: specification_state(specification, &request.planned_state),
            private: vec![],
            diagnostics: waited.into_iter().collect(),
            new_identity: None,
        }
    }

    async fn delete(&self, _ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse {
        let client = match api_client(&self.provider_data) {
            Ok(client) => client,
            Err(diag) => return delete_failed(diag),
        };
        let Some(id) = optional_string(&request.prior_state, "id") else {
            return delete_response(Ok(()), "specification");
        };

        delete_response(
            client.sensory().specifications().delete(&id).await,
            "specification",
        )
    }
}

#[async_trait]
impl ResourceWithConfigure for SpecificationResource {
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
impl ResourceWithImportState for SpecificationResource {
    async fn import_state(
        &self,
        _ctx: Context,
        request: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse {
        let client = match api_client(&self.provider_data) {
            Ok(client) => client,
            Err(diag) => return import_failed(diag),
        };

        let result = client.sensory().specifications().get(&request.id).await;
        import_response(&request, result, "specification", |specification| {
            specification_state(specification, &DynamicValue::object())
        })
    }
}
