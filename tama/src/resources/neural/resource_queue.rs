//! Queue resource implementation
//!
//! Queues are addressed by role and name, only the concurrency can change
//! in place.

use crate::api::neural::{CreateQueueRequest, Queue, UpdateQueueRequest};
use crate::resources::{
    api_client, create_failed, create_response, delete_failed, delete_response, import_failed,
    import_response, optional_string, read_failed, read_gone, read_response, required_i64,
    required_string, set_i64, set_optional_string, set_string, store_provider_data,
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
use tfplug::validator::StringOneOf;

pub const QUEUE_ROLES: [&str; 2] = ["oracle", "dreamer"];

#[derive(Default)]
pub struct QueueResource {
    provider_data: Option<TamaProviderData>,
}

impl QueueResource {
    pub fn new() -> Self {
        Self::default()
    }

    fn extract_create_request(value: &DynamicValue) -> Result<CreateQueueRequest, Diagnostic> {
        Ok(CreateQueueRequest {
            role: required_string(value, "role")?,
            name: required_string(value, "name")?,
            concurrency: required_i64(value, "concurrency")?,
        })
    }
}

fn queue_state(queue: Queue) -> DynamicValue {
    let mut state = DynamicValue::object();
    set_string(&mut state, "id", queue.id);
    set_string(&mut state, "role", queue.role);
    set_string(&mut state, "name", queue.name);
    set_i64(&mut state, "concurrency", queue.concurrency);
    set_optional_string(&mut state, "provision_state", queue.provision_state);
    state
}

#[async_trait]
impl Resource for QueueResource {
    fn type_name(&self) -> &str {
        "tama_queue"
    }

    async fn schema(&self, _ctx: Context, _request: ResourceSchemaRequest) -> ResourceSchemaResponse {
        let schema = SchemaBuilder::new()
            .version(0)
            .description("Manages a work queue for oracle or dreamer workers")
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .description("Queue identifier")
                    .computed()
                    .plan_modifier(UseStateForUnknown::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("role", AttributeType::String)
                    .description("Worker role, oracle or dreamer")
                    .required()
                    .validator(StringOneOf::create(&QUEUE_ROLES))
                    .plan_modifier(RequiresReplace::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .description("Queue name")
                    .required()
                    .plan_modifier(RequiresReplace::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("concurrency", AttributeType::Number)
                    .description("Number of jobs processed at the same time")
                    .required()
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
        let body = match Self::extract_create_request(&request.planned_state) {
            Ok(body) => body,
            Err(diag) => return create_failed(diag),
        };

        tracing::debug!(role = %body.role, name = %body.name, "creating queue");
        let result = client.neural().queues().create(&body).await;
        create_response(result, "queue", queue_state)
    }

    async fn read(&self, _ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        let Some(id) = optional_string(&request.current_state, "id") else {
            return read_gone(request.private);
        };
        let client = match api_client(&self.provider_data) {
            Ok(client) => client,
            Err(diag) => return read_failed(request.current_state, request.private, diag),
        };

        let result = client.neural().queues().get(&id).await;
        read_response(
            result,
            request.current_state,
            request.private,
            "queue",
            |queue, _| queue_state(queue),
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
        let concurrency = match required_i64(&request.planned_state, "concurrency") {
            Ok(concurrency) => concurrency,
            Err(diag) => return update_failed(request.prior_state, diag),
        };

        let result = client
            .neural()
            .queues()
            .update(&id, &UpdateQueueRequest { concurrency })
            .await;
        update_response(result, request.prior_state, "queue", queue_state)
    }

    async fn delete(&self, _ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse {
        let client = match api_client(&self.provider_data) {
            Ok(client) => client,
            Err(diag) => return delete_failed(diag),
        };
        let Some(id) = optional_string(&request.prior_state, "id") else {
            return delete_response(Ok(()), "queue");
        };

        delete_response(client.neural().queues().delete(&id).await, "queue")
    }
}

#[async_trait]
impl ResourceWithConfigure for QueueResource {
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
impl ResourceWithImportState for QueueResource {
    async fn import_state(
        &self,
        _ctx: Context,
        request: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse {
        let client = match api_client(&self.provider_data) {
            Ok(client) => client,
            Err(diag) => return import_failed(diag),
        };

        let result = client.neural().queues().get(&request.id).await;
        import_response(&request, result, "queue", queue_state)
    }
}
