//! Space data source implementation

use crate::data_sources::{read_failed, read_result};
use crate::resources::neural::resource_space::space_state;
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
pub struct SpaceDataSource {
    provider_data: Option<TamaProviderData>,
}

impl SpaceDataSource {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DataSource for SpaceDataSource {
    fn type_name(&self) -> &str {
        "tama_space"
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: DataSourceSchemaRequest,
    ) -> DataSourceSchemaResponse {
        let schema = SchemaBuilder::new()
            .version(0)
            .description("Looks up an existing Tama space by id")
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .description("Space identifier")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .description("Space name")
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("type", AttributeType::String)
                    .description("Space type, root or component")
                    .computed()
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
        let id = match required_string(&request.config, "id") {
            Ok(id) => id,
            Err(diag) => return read_failed(diag),
        };

        tracing::debug!(space_id = %id, "reading space data source");
        read_result(client.neural().spaces().get(&id).await, "space", space_state)
    }
}

#[async_trait]
impl DataSourceWithConfigure for SpaceDataSource {
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
    use tfplug::types::{AttributePath, Dynamic};

    fn config(id: &str) -> tfplug::types::DynamicValue {
        object(&[
            ("id", string(id)),
            ("name", Dynamic::Null),
            ("type", Dynamic::Null),
            ("slug", Dynamic::Null),
            ("provision_state", Dynamic::Null),
        ])
    }

    #[tokio::test]
    async fn read_fills_computed_attributes() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/provision/neural/spaces/space-1")
            .with_body(
                r#"{"data":{"id":"space-1","name":"Movie DB","type":"root","slug":"movie-db","provision_state":"active"}}"#,
            )
            .create_async()
            .await;

        let data_source: SpaceDataSource = configured(&server.url()).await;
        let response = data_source
            .read(Context::new(), read_request("tama_space", config("space-1")))
            .await;

        assert!(response.diagnostics.is_empty());
        assert_eq!(
            response.state.get_string(&AttributePath::new("type")).unwrap(),
            "root"
        );
        assert_eq!(
            response.state.get_string(&AttributePath::new("slug")).unwrap(),
            "movie-db"
        );
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn read_reports_missing_space() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/provision/neural/spaces/space-404")
            .with_status(404)
            .with_body(r#"{"error":"not found"}"#)
            .create_async()
            .await;

        let data_source: SpaceDataSource = configured(&server.url()).await;
        let response = data_source
            .read(Context::new(), read_request("tama_space", config("space-404")))
            .await;

        assert!(response.state.is_null());
        assert_eq!(response.diagnostics[0].summary, "Failed to read space");
    }

    #[tokio::test]
    async fn read_without_configure_fails() {
        let data_source = SpaceDataSource::new();
        let response = data_source
            .read(Context::new(), read_request("tama_space", config("space-1")))
            .await;

        assert_eq!(response.diagnostics[0].summary, "Provider not configured");
    }
}
