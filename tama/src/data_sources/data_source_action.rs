//! Action data source implementation
//!
//! Actions are derived from a specification's operations. They cannot be
//! managed directly, only looked up to wire them into thought tools.

use crate::api::sensory::Action;
use crate::data_sources::{read_failed, read_result};
use crate::resources::{
    api_client, parent_id, required_string, set_optional_string, set_string,
    store_provider_data,
};
use crate::TamaProviderData;
use async_trait::async_trait;
use tfplug::context::Context;
use tfplug::data_source::{
    ConfigureDataSourceRequest, ConfigureDataSourceResponse, DataSource, DataSourceSchemaRequest,
    DataSourceSchemaResponse, DataSourceWithConfigure, ReadDataSourceRequest,
    ReadDataSourceResponse,
};
use tfplug::schema::{AttributeBuilder, AttributeType, SchemaBuilder};
use tfplug::types::DynamicValue;

#[derive(Default)]
pub struct ActionDataSource {
    provider_data: Option<TamaProviderData>,
}

impl ActionDataSource {
    pub fn new() -> Self {
        Self::default()
    }
}

fn action_state(action: Action, config: &DynamicValue) -> DynamicValue {
    let mut state = DynamicValue::object();
    set_string(&mut state, "id", action.id);
    set_optional_string(
        &mut state,
        "specification_id",
        parent_id(config, "specification_id", action.specification_id),
    );
    set_string(&mut state, "identifier", action.identifier);
    set_string(&mut state, "path", action.path);
    set_string(&mut state, "method", action.method);
    state
}

#[async_trait]
impl DataSource for ActionDataSource {
    fn type_name(&self) -> &str {
        "tama_action"
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: DataSourceSchemaRequest,
    ) -> DataSourceSchemaResponse {
        let schema = SchemaBuilder::new()
            .version(0)
            .description("Looks up an action of a specification by its identifier")
            .attribute(
                AttributeBuilder::new("specification_id", AttributeType::String)
                    .description("Specification defining the action")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("identifier", AttributeType::String)
                    .description("Operation identifier of the action")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .description("Action identifier")
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("path", AttributeType::String)
                    .description("HTTP path the action calls")
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("method", AttributeType::String)
                    .description("HTTP method the action uses")
                    .computed()
                    .build(),
            )
            .build();

        DataSourceSchemaResponse {
            schema,
            diagnostics: vec![],
        }
    }

    async fn read(&self, _ctx: Context, request: ReadDataSourceRequest) -> ReadDataSourceResponse {
        let client = match api_client(&self.provider_data) {
            Ok(client) => client,
            Err(diag) => return read_failed(diag),
        };
        let specification_id = match required_string(&request.config, "specification_id") {
            Ok(id) => id,
            Err(diag) => return read_failed(diag),
        };
        let identifier = match required_string(&request.config, "identifier") {
            Ok(identifier) => identifier,
            Err(diag) => return read_failed(diag),
        };

        let result = client
            .sensory()
            .actions()
            .get(&specification_id, &identifier)
            .await;
        read_result(result, "action", |action| {
            action_state(action, &request.config)
        })
    }
}

#[async_trait]
impl DataSourceWithConfigure for ActionDataSource {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureDataSourceRequest,
    ) -> ConfigureDataSourceResponse {
        ConfigureDataSourceResponse {
            diagnostics: store_provider_data(&mut self.provider_data, request.provider_data),
        }
    }
}
