//! Limit resource implementation
//!
//! A limit caps how many requests Tama sends to a source per time window,
//! e.g. 32 requests every 1 minutes.

use crate::api::sensory::{Limit, LimitRequest};
use crate::resources::{
    api_client, create_failed, create_response, delete_failed, delete_response, import_failed,
    import_response, optional_string, parent_id, read_failed, read_gone, read_response,
    required_i64, required_string, set_i64, set_optional_string, set_string,
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
use tfplug::validator::StringOneOf;

pub const SCALE_UNITS: [&str; 3] = ["seconds", "minutes", "hours"];

#[derive(Default)]
pub struct LimitResource {
    provider_data: Option<TamaProviderData>,
}

impl LimitResource {
    pub fn new() -> Self {
        Self::default()
    }

    fn extract_limit_request(value: &DynamicValue) -> Result<LimitRequest, Diagnostic> {
        Ok(LimitRequest {
            scale_unit: required_string(value, "scale_unit")?,
            scale_count: required_i64(value, "scale_count")?,
            limit: required_i64(value, "limit")?,
        })
    }
}

fn limit_state(limit: Limit, prior: &DynamicValue) -> DynamicValue {
    let mut state = DynamicValue::object();
    set_string(&mut state, "id", limit.id);
    set_optional_string(
        &mut state,
        "source_id",
        parent_id(prior, "source_id", limit.source_id),
    );
    set_string(&mut state, "scale_unit", limit.scale_unit);
    set_i64(&mut state, "scale_count", limit.scale_count);
    set_i64(&mut state, "limit", limit.limit);
    set_optional_string(&mut state, "current_state", limit.current_state);
    state
}

#[async_trait]
impl Resource for LimitResource {
    fn type_name(&self) -> &str {
        "tama_limit"
    }

    async fn schema(&self, _ctx: Context, _request: ResourceSchemaRequest) -> ResourceSchemaResponse {
        let schema = SchemaBuilder::new()
            .version(0)
            .description("Manages a rate limit on a source")
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .description("Limit identifier")
                    .computed()
                    .plan_modifier(UseStateForUnknown::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("source_id", AttributeType::String)
                    .description("Source the limit applies to")
                    .required()
                    .plan_modifier(RequiresReplace::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("scale_unit", AttributeType::String)
                    .description("Unit of the time window: seconds, minutes or hours")
                    .required()
                    .validator(StringOneOf::create(&SCALE_UNITS))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("scale_count", AttributeType::Number)
                    .description("Length of the time window in scale units")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("limit", AttributeType::Number)
                    .description("Maximum number of requests per window")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("current_state", AttributeType::String)
                    .description("Current state reported by Tama")
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
        let source_id = match required_string(&request.planned_state, "source_id") {
            Ok(id) => id,
            Err(diag) => return create_failed(diag),
        };
        let body = match Self::extract_limit_request(&request.planned_state) {
            Ok(body) => body,
            Err(diag) => return create_failed(diag),
        };

        let result = client.sensory().limits().create(&source_id, &body).await;
        create_response(result, "limit", |limit| {
            limit_state(limit, &request.planned_state)
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

        let result = client.sensory().limits().get(&id).await;
        read_response(
            result,
            request.current_state,
            request.private,
            "limit",
            limit_state,
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
        let body = match Self::extract_limit_request(&request.planned_state) {
            Ok(body) => body,
            Err(diag) => return update_failed(request.prior_state, diag),
        };

        let result = client.sensory().limits().update(&id, &body).await;
        let planned = request.planned_state;
        update_response(result, request.prior_state, "limit", |limit| {
            limit_state(limit, &planned)
        })
    }

    async fn delete(&self, _ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse {
        let client = match api_client(&self.provider_data) {
            Ok(client) => client,
            Err(diag) => return delete_failed(diag),
        };
        let Some(id) = optional_string(&request.prior_state, "id") else {
            return delete_response(Ok(()), "limit");
        };

        delete_response(client.sensory().limits().delete(&id).await, "limit")
    }
}

#[async_trait]
impl ResourceWithConfigure for LimitResource {
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
impl ResourceWithImportState for LimitResource {
    async fn import_state(
        &self,
        _ctx: Context,
        request: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse {
        let client = match api_client(&self.provider_data) {
            Ok(client) => client,
            Err(diag) => return import_failed(diag),
        };

        let result = client.sensory().limits().get(&request.id).await;
        import_response(&request, result, "limit", |limit| {
            limit_state(limit, &DynamicValue::object())
        })
    }
}
