//! Class data source implementation
//!
//! Classes are looked up by name within a space, which lets configurations
//! refer to classes Tama creates on its own.

use crate::data_sources::{read_failed, read_result};
use crate::resources::ontology::resource_class::class_state;
use crate::resources::{api_client, required_string, store_provider_data};
use crate::TamaProviderData;
use async_trait::async_trait;
use tfplug::context::Context;
use tfplug::data_source::{
    ConfigureDataSourceRequest, ConfigureDataSourceResponse, DataSource, DataSourceSchemaRequest,
    DataSourceSchemaResponse, DataSourceWithConfigure, ReadDataSourceRequest,
    ReadDataSourceResponse,
};
use tfplug::schema::{AttributeBuilder, AttributeType, SchemaBuilder};

#[derive(Default)]
pub struct ClassDataSource {
    provider_data: Option<TamaProviderData>,
}

impl ClassDataSource {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DataSource for ClassDataSource {
    fn type_name(&self) -> &str {
        "tama_class"
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: DataSourceSchemaRequest,
    ) -> DataSourceSchemaResponse {
        let schema = SchemaBuilder::new()
            .version(0)
            .description("Looks up a class in a space by name")
            .attribute(
                AttributeBuilder::new("space_id", AttributeType::String)
                    .description("Space holding the class")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .description("Class name")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .description("Class identifier")
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
                AttributeBuilder::new("schema_json", AttributeType::String)
                    .description("JSON schema defining the class")
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
        let space_id = match required_string(&request.config, "space_id") {
            Ok(id) => id,
            Err(diag) => return read_failed(diag),
        };
        let name = match required_string(&request.config, "name") {
            Ok(name) => name,
            Err(diag) => return read_failed(diag),
        };

        tracing::debug!(space_id = %space_id, name = %name, "reading class data source");
        let result = client
            .ontology()
            .classes()
            .get_by_name(&space_id, &name)
            .await;
        read_result(result, "class", |class| class_state(class, &request.config))
    }
}

#[async_trait]
impl DataSourceWithConfigure for ClassDataSource {
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

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;
    use crate::data_sources::test_support::*;
    use crate::resources::test_support::{object, string};
    use mockito::Server;
    use tfplug::types::{AttributePath, Dynamic, DynamicValue};

    fn config(space_id: &str, name: &str) -> DynamicValue {
        object(&[
            ("space_id", string(space_id)),
            ("name", string(name)),
            ("id", Dynamic::Null),
            ("description", Dynamic::Null),
            ("schema_json", Dynamic::Null),
            ("provision_state", Dynamic::Null),
        ])
    }

    #[tokio::test]
    async fn read_looks_class_up_by_name() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/provision/ontology/spaces/space-1/classes/movie-details")
            .with_body(
                r#"{"data":{"id":"class-1","name":"movie-details","description":"A movie","schema":{"title":"movie-details","type":"object"},"provision_state":"active"}}"#,
            )
            .create_async()
            .await;

        let data_source: ClassDataSource = configured(&server.url()).await;
        let response = data_source
            .read(
                Context::new(),
                read_request("tama_class", config("space-1", "movie-details")),
            )
            .await;

        assert!(response.diagnostics.is_empty());
        assert_eq!(
            response.state.get_string(&AttributePath::new("id")).unwrap(),
            "class-1"
        );
        assert_eq!(
            response
                .state
                .get_string(&AttributePath::new("space_id"))
                .unwrap(),
            "space-1"
        );
        let schema: serde_json::Value = serde_json::from_str(
            &response
                .state
                .get_string(&AttributePath::new("schema_json"))
                .unwrap(),
        )
        .unwrap();
        assert_eq!(schema["type"], "object");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn read_escapes_name_in_path() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/provision/ontology/spaces/space-1/classes/movie%20details")
            .with_status(404)
            .with_body(r#"{"error":"not found"}"#)
            .create_async()
            .await;

        let data_source: ClassDataSource = configured(&server.url()).await;
        let response = data_source
            .read(
                Context::new(),
                read_request("tama_class", config("space-1", "movie details")),
            )
            .await;

        assert_eq!(response.diagnostics[0].summary, "Failed to read class");
        mock.assert_async().await;
    }
}
