//! Sensory API: sources, models, limits, specifications, identities and actions

use super::{segment, ApiError, Client};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Deserialize)]
pub struct Source {
    pub id: String,
    #[serde(default)]
    pub space_id: Option<String>,
    pub name: String,
    #[serde(rename = "type")]
    pub source_type: String,
    pub endpoint: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub current_state: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SourceRequest {
    pub name: String,
    #[serde(rename = "type")]
    pub source_type: String,
    pub endpoint: String,
    pub credential: SourceCredential,
}

#[derive(Debug, Clone, Serialize)]
pub struct SourceCredential {
    pub api_key: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Model {
    pub id: String,
    #[serde(default)]
    pub source_id: Option<String>,
    pub identifier: String,
    pub path: String,
    #[serde(default)]
    pub parameters: Option<Value>,
    #[serde(default)]
    pub current_state: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ModelRequest {
    pub identifier: String,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Limit {
    pub id: String,
    #[serde(default)]
    pub source_id: Option<String>,
    pub scale_unit: String,
    pub scale_count: i64,
    pub limit: i64,
    #[serde(default)]
    pub current_state: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LimitRequest {
    pub scale_unit: String,
    pub scale_count: i64,
    pub limit: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Specification {
    pub id: String,
    #[serde(default)]
    pub space_id: Option<String>,
    pub schema: Value,
    pub version: String,
    pub endpoint: String,
    #[serde(default)]
    pub current_state: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SpecificationRequest {
    pub schema: Value,
    pub version: String,
    pub endpoint: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentityValidation {
    pub path: String,
    pub method: String,
    pub codes: Vec<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Identity {
    pub id: String,
    #[serde(default)]
    pub specification_id: Option<String>,
    pub identifier: String,
    #[serde(default)]
    pub validation: Option<IdentityValidation>,
    #[serde(default)]
    pub current_state: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct IdentityRequest {
    pub identifier: String,
    pub api_key: String,
    pub validation: IdentityValidation,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Action {
    pub id: String,
    #[serde(default)]
    pub specification_id: Option<String>,
    pub identifier: String,
    pub path: String,
    pub method: String,
}

/// Sensory API providing source-level operations
pub struct SensoryApi<'a> {
    client: &'a Client,
}

impl<'a> SensoryApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    pub fn sources(&self) -> SourcesApi<'a> {
        SourcesApi {
            client: self.client,
        }
    }

    pub fn models(&self) -> ModelsApi<'a> {
        ModelsApi {
            client: self.client,
        }
    }

    pub fn limits(&self) -> LimitsApi<'a> {
        LimitsApi {
            client: self.client,
        }
    }

    pub fn specifications(&self) -> SpecificationsApi<'a> {
        SpecificationsApi {
            client: self.client,
        }
    }

    pub fn identities(&self) -> IdentitiesApi<'a> {
        IdentitiesApi {
            client: self.client,
        }
    }

    pub fn actions(&self) -> ActionsApi<'a> {
        ActionsApi {
            client: self.client,
        }
    }
}

pub struct SourcesApi<'a> {
    client: &'a Client,
}

impl SourcesApi<'_> {
    /// GET /provision/sensory/sources/{id}
    pub async fn get(&self, id: &str) -> Result<Source, ApiError> {
        self.client.get(&Self::path(id)).await
    }

    /// POST /provision/sensory/spaces/{space_id}/sources
    pub async fn create(&self, space_id: &str, request: &SourceRequest) -> Result<Source, ApiError> {
        let path = format!("/provision/sensory/spaces/{}/sources", segment(space_id));
        self.client.post(&path, "source", request).await
    }

    /// PATCH /provision/sensory/sources/{id}
    pub async fn update(&self, id: &str, request: &SourceRequest) -> Result<Source, ApiError> {
        self.client.patch(&Self::path(id), "source", request).await
    }

    /// DELETE /provision/sensory/sources/{id}
    pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
        self.client.delete(&Self::path(id)).await
    }

    fn path(id: &str) -> String {
        format!("/provision/sensory/sources/{}", segment(id))
    }
}

pub struct ModelsApi<'a> {
    client: &'a Client,
}

impl ModelsApi<'_> {
    /// GET /provision/sensory/models/{id}
    pub async fn get(&self, id: &str) -> Result<Model, ApiError> {
        self.client.get(&Self::path(id)).await
    }

    /// POST /provision/sensory/sources/{source_id}/models
    pub async fn create(&self, source_id: &str, request: &ModelRequest) -> Result<Model, ApiError> {
        let path = format!("/provision/sensory/sources/{}/models", segment(source_id));
        self.client.post(&path, "model", request).await
    }

    /// PATCH /provision/sensory/models/{id}
    pub async fn update(&self, id: &str, request: &ModelRequest) -> Result<Model, ApiError> {
        self.client.patch(&Self::path(id), "model", request).await
    }

    /// DELETE /provision/sensory/models/{id}
    pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
        self.client.delete(&Self::path(id)).await
    }

    fn path(id: &str) -> String {
        format!("/provision/sensory/models/{}", segment(id))
    }
}

pub struct LimitsApi<'a> {
    client: &'a Client,
}

impl LimitsApi<'_> {
    /// GET /provision/sensory/limits/{id}
    pub async fn get(&self, id: &str) -> Result<Limit, ApiError> {
        self.client.get(&Self::path(id)).await
    }

    /// POST /provision/sensory/sources/{source_id}/limits
    pub async fn create(&self, source_id: &str, request: &LimitRequest) -> Result<Limit, ApiError> {
        let path = format!("/provision/sensory/sources/{}/limits", segment(source_id));
        self.client.post(&path, "limit", request).await
    }

    /// PATCH /provision/sensory/limits/{id}
    pub async fn update(&self, id: &str, request: &LimitRequest) -> Result<Limit, ApiError> {
        self.client.patch(&Self::path(id), "limit", request).await
    }

    /// DELETE /provision/sensory/limits/{id}
    pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
        self.client.delete(&Self::path(id)).await
    }

    fn path(id: &str) -> String {
        format!("/provision/sensory/limits/{}", segment(id))
    }
}

pub struct SpecificationsApi<'a> {
    client: &'a Client,
}

impl SpecificationsApi<'_> {
    /// GET /provision/sensory/specifications/{id}
    pub async fn get(&self, id: &str) -> Result<Specification, ApiError> {
        self.client.get(&Self::path(id)).await
    }

    /// POST /provision/sensory/spaces/{space_id}/specifications
    pub async fn create(
        &self,
        space_id: &str,
        request: &SpecificationRequest,
    ) -> Result<Specification, ApiError> {
        let path = format!(
            "/provision/sensory/spaces/{}/specifications",
            segment(space_id)
        );
        self.client.post(&path, "specification", request).await
    }

    /// PATCH /provision/sensory/specifications/{id}
    pub async fn update(
        &self,
        id: &str,
        request: &SpecificationRequest,
    ) -> Result<Specification, ApiError> {
        self.client
            .patch(&Self::path(id), "specification", request)
            .await
    }

    /// DELETE /provision/sensory/specifications/{id}
    pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
        self.client.delete(&Self::path(id)).await
    }

    pub fn path(id: &str) -> String {
        format!("/provision/sensory/specifications/{}", segment(id))
    }
}

pub struct IdentitiesApi<'a> {
    client: &'a Client,
}

impl IdentitiesApi<'_> {
    /// GET /provision/sensory/identities/{id}
    pub async fn get(&self, id: &str) -> Result<Identity, ApiError> {
        self.client.get(&Self::path(id)).await
    }

    /// POST /provision/sensory/specifications/{specification_id}/identities
    pub async fn create(
        &self,
        specification_id: &str,
        request: &IdentityRequest,
    ) -> Result<Identity, ApiError> {
        let path = format!(
            "/provision/sensory/specifications/{}/identities",
            segment(specification_id)
        );
        self.client.post(&path, "identity", request).await
    }

    /// PATCH /provision/sensory/identities/{id}
    pub async fn update(&self, id: &str, request: &IdentityRequest) -> Result<Identity, ApiError> {
        self.client.patch(&Self::path(id), "identity", request).await
    }

    /// DELETE /provision/sensory/identities/{id}
    pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
        self.client.delete(&Self::path(id)).await
    }

    pub fn path(id: &str) -> String {
        format!("/provision/sensory/identities/{}", segment(id))
    }
}

pub struct ActionsApi<'a> {
    client: &'a Client,
}

impl ActionsApi<'_> {
    /// GET /provision/sensory/specifications/{specification_id}/actions/{identifier}
    pub async fn get(&self, specification_id: &str, identifier: &str) -> Result<Action, ApiError> {
        let path = format!(
            "/provision/sensory/specifications/{}/actions/{}",
            segment(specification_id),
            segment(identifier)
        );
        self.client.get(&path).await
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;
    use crate::api::test_client;
    use mockito::{Matcher, Server};
    use serde_json::json;

    #[tokio::test]
    async fn sources_create_nests_credential() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/provision/sensory/spaces/space-1/sources")
            .match_body(Matcher::Json(json!({
                "source": {
                    "name": "mistral",
                    "type": "model",
                    "endpoint": "https://api.mistral.ai/v1",
                    "credential": {"api_key": "sk-1"}
                }
            })))
            .with_status(201)
            .with_body(
                r#"{"data":{"id":"src-1","space_id":"space-1","name":"mistral","type":"model","endpoint":"https://api.mistral.ai/v1","slug":"mistral","current_state":"active"}}"#,
            )
            .create_async()
            .await;

        let client = test_client(&server.url());
        let source = client
            .sensory()
            .sources()
            .create(
                "space-1",
                &SourceRequest {
                    name: "mistral".to_string(),
                    source_type: "model".to_string(),
                    endpoint: "https://api.mistral.ai/v1".to_string(),
                    credential: SourceCredential {
                        api_key: "sk-1".to_string(),
                    },
                },
            )
            .await
            .unwrap();

        assert_eq!(source.id, "src-1");
        assert_eq!(source.current_state.as_deref(), Some("active"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn models_keep_parameters_as_json() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/provision/sensory/models/model-1")
            .with_body(
                r#"{"data":{"id":"model-1","identifier":"mistral-small","path":"/chat/completions","parameters":{"reasoning_effort":"low"}}}"#,
            )
            .create_async()
            .await;

        let client = test_client(&server.url());
        let model = client.sensory().models().get("model-1").await.unwrap();

        assert_eq!(model.parameters, Some(json!({"reasoning_effort": "low"})));
    }

    #[tokio::test]
    async fn identities_roundtrip_validation() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/provision/sensory/specifications/spec-1/identities")
            .match_body(Matcher::PartialJson(json!({
                "identity": {"validation": {"path": "/health", "method": "GET", "codes": [200, 204]}}
            })))
            .with_status(201)
            .with_body(
                r#"{"data":{"id":"ident-1","identifier":"ApiKey","validation":{"path":"/health","method":"GET","codes":[200,204]},"current_state":"pending"}}"#,
            )
            .create_async()
            .await;

        let client = test_client(&server.url());
        let identity = client
            .sensory()
            .identities()
            .create(
                "spec-1",
                &IdentityRequest {
                    identifier: "ApiKey".to_string(),
                    api_key: "secret".to_string(),
                    validation: IdentityValidation {
                        path: "/health".to_string(),
                        method: "GET".to_string(),
                        codes: vec![200, 204],
                    },
                },
            )
            .await
            .unwrap();

        assert_eq!(identity.validation.unwrap().codes, vec![200, 204]);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn actions_are_looked_up_by_identifier() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/provision/sensory/specifications/spec-1/actions/search-index")
            .with_body(
                r#"{"data":{"id":"act-1","identifier":"search-index","path":"/{index}/_search","method":"POST"}}"#,
            )
            .create_async()
            .await;

        let client = test_client(&server.url());
        let action = client
            .sensory()
            .actions()
            .get("spec-1", "search-index")
            .await
            .unwrap();

        assert_eq!(action.method, "POST");
        assert_eq!(action.path, "/{index}/_search");
        mock.assert_async().await;
    }
}
