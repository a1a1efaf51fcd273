//! Source identity resource implementation
//!
//! An identity is a credential for a specification, checked by Tama with a
//! validation request before it is used.

use crate::api::sensory::{IdentitiesApi, Identity, IdentityRequest, IdentityValidation};
use crate::resources::wait_for::{self, settle};
use crate::resources::{
    api_client, api_error, carry_over, create_failed, delete_failed, delete_response,
    import_failed, import_response, optional_string, parent_id, read_failed, read_gone,
    read_response, required_string, set_optional_string, set_string, store_provider_data,
    string_at, update_failed,
};
use crate::TamaProviderData;
use async_trait::async_trait;
use std::collections::HashMap;
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
use tfplug::schema::{AttributeBuilder, AttributeType, NestedBlockBuilder, NestingMode, SchemaBuilder};
use tfplug::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};
use tfplug::validator::ListLength;

#[derive(Default)]
pub struct SourceIdentityResource {
    provider_data: Option<TamaProviderData>,
}

impl SourceIdentityResource {
    pub fn new() -> Self {
        Self::default()
    }

    fn extract_identity_request(value: &DynamicValue) -> Result<IdentityRequest, Diagnostic> {
        Ok(IdentityRequest {
            identifier: required_string(value, "identifier")?,
            api_key: required_string(value, "api_key")?,
            validation: validation_from(value)?,
        })
    }
}

fn validation_from(value: &DynamicValue) -> Result<IdentityValidation, Diagnostic> {
    let block = AttributePath::new("validation");
    let missing = |name: &str| {
        Diagnostic::error(
            "Missing required attribute",
            format!("'validation.{}' must be set", name),
        )
        .with_attribute(block.clone().attribute(name))
    };

    let path = string_at(value, &block.clone().attribute("path")).ok_or_else(|| missing("path"))?;
    let method =
        string_at(value, &block.clone().attribute("method")).ok_or_else(|| missing("method"))?;
    let codes: Vec<i64> = value
        .get_list(&block.clone().attribute("codes"))
        .map_err(|_| missing("codes"))?
        .iter()
        .filter_map(Dynamic::as_number)
        .map(|code| code as i64)
        .collect();

    if codes.is_empty() {
        return Err(Diagnostic::error(
            "Invalid validation codes",
            "'validation.codes' must contain at least one status code",
        )
        .with_attribute(block.attribute("codes")));
    }

    Ok(IdentityValidation {
        path,
        method,
        codes,
    })
}

fn validation_value(validation: IdentityValidation) -> Dynamic {
    Dynamic::Map(HashMap::from([
        ("path".to_string(), Dynamic::String(validation.path)),
        ("method".to_string(), Dynamic::String(validation.method)),
        (
            "codes".to_string(),
            Dynamic::List(
                validation
                    .codes
                    .into_iter()
                    .map(|code| Dynamic::Number(code as f64))
                    .collect(),
            ),
        ),
    ]))
}

/// `api_key` and `wait_for` are never returned and come from `prior`
fn identity_state(identity: Identity, prior: &DynamicValue) -> DynamicValue {
    let mut state = DynamicValue::object();
    set_string(&mut state, "id", identity.id);
    set_optional_string(
        &mut state,
        "specification_id",
        parent_id(prior, "specification_id", identity.specification_id),
    );
    set_string(&mut state, "identifier", identity.identifier);
    carry_over(&mut state, prior, "api_key");
    match identity.validation {
        Some(validation) => {
            let _ = state.set_value(&AttributePath::new("validation"), validation_value(validation));
        }
        None => carry_over(&mut state, prior, "validation"),
    }
    set_optional_string(&mut state, "current_state", identity.current_state);
    carry_over(&mut state, prior, "wait_for");
    state
}

#[async_trait]
impl Resource for SourceIdentityResource {
    fn type_name(&self) -> &str {
        "tama_source_identity"
    }

    async fn schema(&self, _ctx: Context, _request: ResourceSchemaRequest) -> ResourceSchemaResponse {
        let schema = SchemaBuilder::new()
            .version(0)
            .description("Manages a credential used to call the actions of a specification")
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .description("Identity identifier")
                    .computed()
                    .plan_modifier(UseStateForUnknown::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("specification_id", AttributeType::String)
                    .description("Specification the identity authenticates against")
                    .required()
                    .plan_modifier(RequiresReplace::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("identifier", AttributeType::String)
                    .description("Security scheme name from the specification, e.g. ApiKey")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("api_key", AttributeType::String)
                    .description("Credential value")
                    .required()
                    .sensitive()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("current_state", AttributeType::String)
                    .description("Validation state reported by Tama")
                    .computed()
                    .build(),
            )
            .block(
                NestedBlockBuilder::new("validation", NestingMode::Single)
                    .description("Request Tama sends to check the credential")
                    .attribute(
                        AttributeBuilder::new("path", AttributeType::String)
                            .description("Request path")
                            .required()
                            .build(),
                    )
                    .attribute(
                        AttributeBuilder::new("method", AttributeType::String)
                            .description("HTTP method")
                            .required()
                            .build(),
                    )
                    .attribute(
                        AttributeBuilder::new(
                            "codes",
                            AttributeType::List(Box::new(AttributeType::Number)),
                        )
                        .description("HTTP status codes that mean the credential is valid")
                        .required()
                        .validator(ListLength::at_least(1))
                        .build(),
                    )
                    .min_items(1)
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
        let specification_id = match required_string(&request.planned_state, "specification_id") {
            Ok(id) => id,
            Err(diag) => return create_failed(diag),
        };
        let body = match Self::extract_identity_request(&request.planned_state) {
            Ok(body) => body,
            Err(diag) => return create_failed(diag),
        };

        let created = match client
            .sensory()
            .identities()
            .create(&specification_id, &body)
            .await
        {
            Ok(identity) => identity,
            Err(e) => {
                tracing::error!(error = %e, "failed to create identity");
                return create_failed(api_error("create identity", &e));
            }
        };

        let path = IdentitiesApi::path(&created.id);
        let (identity, waited) = settle(
            &ctx,
            client,
            &path,
            &request.planned_state,
            created,
            "identity",
        )
        .await;

        CreateResourceResponse {
            new_state: identity_state(identity, &request.planned_state),
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

        let result = client.sensory().identities().get(&id).await;
        read_response(
            result,
            request.current_state,
            request.private,
            "identity",
            identity_state,
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
        let body = match Self::extract_identity_request(&request.planned_state) {
            Ok(body) => body,
            Err(diag) => return update_failed(request.prior_state, diag),
        };

        let updated = match client.sensory().identities().update(&id, &body).await {
            Ok(identity) => identity,
            Err(e) => {
                tracing::error!(error = %e, "failed to update identity");
                return update_failed(request.prior_state, api_error("update identity", &e));
            }
        };

        let path = IdentitiesApi::path(&id);
        let (identity, waited) = settle(
            &ctx,
            client,
            &path,
            &request.planned_state,
            updated,
            "identity",
        )
        .await;

        UpdateResourceResponse {
            new_state: identity_state(identity, &request.planned_state),
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
            return delete_response(Ok(()), "identity");
        };

        delete_response(client.sensory().identities().delete(&id).await, "identity")
    }
}

#[async_trait]
impl ResourceWithConfigure for SourceIdentityResource {
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
impl ResourceWithImportState for SourceIdentityResource {
    async fn import_state(
        &self,
        _ctx: Context,
        request: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse {
        let client = match api_client(&self.provider_data) {
            Ok(client) => client,
            Err(diag) => return import_failed(diag),
        };

        let result = client.sensory().identities().get(&request.id).await;
        import_response(&request, result, "identity", |identity| {
            identity_state(identity, &DynamicValue::object())
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

    fn validation(codes: &[f64]) -> Dynamic {
        Dynamic::Map(HashMap::from([
            ("path".to_string(), string("/health")),
            ("method".to_string(), string("GET")),
            (
                "codes".to_string(),
                Dynamic::List(codes.iter().map(|c| Dynamic::Number(*c)).collect()),
            ),
        ]))
    }

    fn planned(codes: &[f64]) -> DynamicValue {
        object(&[
            ("id", Dynamic::Unknown),
            ("specification_id", string("spec-1")),
            ("identifier", string("ApiKey")),
            ("api_key", string("secret")),
            ("current_state", Dynamic::Unknown),
            ("validation", validation(codes)),
            ("wait_for", Dynamic::List(vec![])),
        ])
    }

    fn waiting_for_active(mut value: DynamicValue) -> DynamicValue {
        let condition = Dynamic::Map(HashMap::from([
            ("name".to_string(), string("current_state")),
            ("in".to_string(), Dynamic::List(vec![string("active")])),
        ]));
        value
            .set_value(
                &AttributePath::new("wait_for"),
                Dynamic::List(vec![Dynamic::Map(HashMap::from([(
                    "field".to_string(),
                    Dynamic::List(vec![condition]),
                )]))]),
            )
            .unwrap();
        value
    }

    fn identity(state: &str) -> String {
        format!(
            r#"{{"data":{{"id":"ident-1","specification_id":"spec-1","identifier":"ApiKey","validation":{{"path":"/health","method":"GET","codes":[200]}},"current_state":"{}"}}}}"#,
            state
        )
    }

    #[test]
    fn validation_requires_codes() {
        let diag = validation_from(&planned(&[])).unwrap_err();
        assert_eq!(diag.summary, "Invalid validation codes");
        assert_eq!(
            diag.attribute,
            Some(AttributePath::new("validation").attribute("codes"))
        );

        let parsed = validation_from(&planned(&[200.0, 204.0])).unwrap();
        assert_eq!(parsed.codes, vec![200, 204]);
        assert_eq!(parsed.method, "GET");
    }

    #[tokio::test]
    async fn schema_declares_single_validation_block() {
        let resource = SourceIdentityResource::new();
        let response = resource
            .schema(Context::new(), ResourceSchemaRequest)
            .await;

        let block = response.schema.block.block_type("validation").unwrap();
        assert_eq!(block.min_items, 1);
        assert!(response.schema.block.block_type("wait_for").is_some());
        assert!(response.schema.block.attribute("api_key").unwrap().sensitive);
    }

    #[tokio::test]
    async fn create_sends_validation_and_keeps_api_key() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/provision/sensory/specifications/spec-1/identities")
            .match_body(Matcher::Json(json!({
                "identity": {
                    "identifier": "ApiKey",
                    "api_key": "secret",
                    "validation": {"path": "/health", "method": "GET", "codes": [200]}
                }
            })))
            .with_status(201)
            .with_body(
                r#"{"data":{"id":"ident-1","specification_id":"spec-1","identifier":"ApiKey","validation":{"path":"/health","method":"GET","codes":[200]},"current_state":"pending"}}"#,
            )
            .create_async()
            .await;

        let resource: SourceIdentityResource = configured(&server.url()).await;
        let response = resource
            .create(
                Context::new(),
                create_request("tama_source_identity", planned(&[200.0])),
            )
            .await;

        assert!(response.diagnostics.is_empty());
        let state = response.new_state;
        assert_eq!(state.get_string(&AttributePath::new("api_key")).unwrap(), "secret");
        assert_eq!(
            state
                .get_list(&AttributePath::new("validation").attribute("codes"))
                .unwrap(),
            vec![Dynamic::Number(200.0)]
        );
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn read_keeps_validation_when_not_returned() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/provision/sensory/identities/ident-1")
            .with_body(r#"{"data":{"id":"ident-1","identifier":"ApiKey","current_state":"active"}}"#)
            .create_async()
            .await;

        let mut current = planned(&[200.0]);
        current
            .set_string(&AttributePath::new("id"), "ident-1".to_string())
            .unwrap();

        let resource: SourceIdentityResource = configured(&server.url()).await;
        let response = resource
            .read(Context::new(), read_request("tama_source_identity", current))
            .await;

        let state = response.new_state.unwrap();
        assert_eq!(
            state
                .get_string(&AttributePath::new("validation").attribute("method"))
                .unwrap(),
            "GET"
        );
        assert_eq!(
            state.get_string(&AttributePath::new("specification_id")).unwrap(),
            "spec-1"
        );
        assert_eq!(
            state.get_string(&AttributePath::new("current_state")).unwrap(),
            "active"
        );
    }

    #[tokio::test]
    async fn create_polls_until_identity_is_active() {
        let mut server = Server::new_async().await;
        let _create = server
            .mock("POST", "/provision/sensory/specifications/spec-1/identities")
            .with_status(201)
            .with_body(identity("pending"))
            .create_async()
            .await;
        let poll = server
            .mock("GET", "/provision/sensory/identities/ident-1")
            .with_body(identity("active"))
            .create_async()
            .await;

        let resource: SourceIdentityResource = configured(&server.url()).await;
        let response = resource
            .create(
                Context::new(),
                create_request(
                    "tama_source_identity",
                    waiting_for_active(planned(&[200.0])),
                ),
            )
            .await;

        assert!(response.diagnostics.is_empty());
        let state = response.new_state;
        assert_eq!(
            state.get_string(&AttributePath::new("current_state")).unwrap(),
            "active"
        );
        assert_eq!(state.get_string(&AttributePath::new("api_key")).unwrap(), "secret");
        poll.assert_async().await;
    }

    #[tokio::test]
    async fn update_polls_until_identity_is_active() {
        let mut server = Server::new_async().await;
        let patch = server
            .mock("PATCH", "/provision/sensory/identities/ident-1")
            .match_body(Matcher::PartialJson(json!({
                "identity": {"api_key": "rotated"}
            })))
            .with_body(identity("pending"))
            .create_async()
            .await;
        let poll = server
            .mock("GET", "/provision/sensory/identities/ident-1")
            .with_body(identity("active"))
            .create_async()
            .await;

        let mut prior = planned(&[200.0]);
        prior
            .set_string(&AttributePath::new("id"), "ident-1".to_string())
            .unwrap();
        prior
            .set_string(&AttributePath::new("current_state"), "active".to_string())
            .unwrap();
        let mut planned_update = waiting_for_active(prior.clone());
        planned_update
            .set_string(&AttributePath::new("api_key"), "rotated".to_string())
            .unwrap();
        planned_update
            .mark_unknown(&AttributePath::new("current_state"))
            .unwrap();

        let resource: SourceIdentityResource = configured(&server.url()).await;
        let response = resource
            .update(
                Context::new(),
                update_request("tama_source_identity", prior, planned_update),
            )
            .await;

        assert!(response.diagnostics.is_empty());
        let state = response.new_state;
        assert_eq!(
            state.get_string(&AttributePath::new("current_state")).unwrap(),
            "active"
        );
        assert_eq!(state.get_string(&AttributePath::new("api_key")).unwrap(), "rotated");
        patch.assert_async().await;
        poll.assert_async().await;
    }
}
