//! Perception API: chains, thoughts and what hangs off a thought

use super::processor::{Processor, ProcessorRequest};
use super::{segment, ApiError, Client};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Deserialize)]
pub struct Chain {
    pub id: String,
    #[serde(default)]
    pub space_id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub provision_state: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChainRequest {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThoughtModule {
    pub reference: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Thought {
    pub id: String,
    #[serde(default)]
    pub chain_id: Option<String>,
    pub relation: String,
    #[serde(default)]
    pub index: Option<i64>,
    #[serde(default)]
    pub output_class_id: Option<String>,
    pub module: ThoughtModule,
    #[serde(default)]
    pub provision_state: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ThoughtRequest {
    pub relation: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_class_id: Option<String>,
    pub module: ThoughtModule,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ThoughtContext {
    pub id: String,
    #[serde(default)]
    pub thought_id: Option<String>,
    pub prompt_id: String,
    #[serde(default)]
    pub layer: i64,
    #[serde(default)]
    pub provision_state: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ThoughtContextRequest {
    pub prompt_id: String,
    pub layer: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ThoughtTool {
    pub id: String,
    #[serde(default)]
    pub thought_id: Option<String>,
    pub action_id: String,
    #[serde(default)]
    pub provision_state: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ThoughtToolRequest {
    pub action_id: String,
}

pub struct PerceptionApi<'a> {
    client: &'a Client,
}

impl<'a> PerceptionApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    pub fn chains(&self) -> ChainsApi<'a> {
        ChainsApi {
            client: self.client,
        }
    }

    pub fn thoughts(&self) -> ThoughtsApi<'a> {
        ThoughtsApi {
            client: self.client,
        }
    }

    pub fn contexts(&self) -> ContextsApi<'a> {
        ContextsApi {
            client: self.client,
        }
    }

    pub fn tools(&self) -> ToolsApi<'a> {
        ToolsApi {
            client: self.client,
        }
    }

    pub fn processors(&self) -> ThoughtProcessorsApi<'a> {
        ThoughtProcessorsApi {
            client: self.client,
        }
    }
}

pub struct ChainsApi<'a> {
    client: &'a Client,
}

impl ChainsApi<'_> {
    /// GET /provision/perception/chains/{id}
    pub async fn get(&self, id: &str) -> Result<Chain, ApiError> {
        self.client.get(&Self::path(id)).await
    }

    /// POST /provision/perception/spaces/{space_id}/chains
    pub async fn create(&self, space_id: &str, request: &ChainRequest) -> Result<Chain, ApiError> {
        let path = format!("/provision/perception/spaces/{}/chains", segment(space_id));
        self.client.post(&path, "chain", request).await
    }

    /// PATCH /provision/perception/chains/{id}
    pub async fn update(&self, id: &str, request: &ChainRequest) -> Result<Chain, ApiError> {
        self.client.patch(&Self::path(id), "chain", request).await
    }

    /// DELETE /provision/perception/chains/{id}
    pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
        self.client.delete(&Self::path(id)).await
    }

    fn path(id: &str) -> String {
        format!("/provision/perception/chains/{}", segment(id))
    }
}

pub struct ThoughtsApi<'a> {
    client: &'a Client,
}

impl ThoughtsApi<'_> {
    /// GET /provision/perception/thoughts/{id}
    pub async fn get(&self, id: &str) -> Result<Thought, ApiError> {
        self.client.get(&Self::path(id)).await
    }

    /// POST /provision/perception/chains/{chain_id}/thoughts
    pub async fn create(&self, chain_id: &str, request: &ThoughtRequest) -> Result<Thought, ApiError> {
        let path = format!("/provision/perception/chains/{}/thoughts", segment(chain_id));
        self.client.post(&path, "thought", request).await
    }

    /// PATCH /provision/perception/thoughts/{id}
    pub async fn update(&self, id: &str, request: &ThoughtRequest) -> Result<Thought, ApiError> {
        self.client.patch(&Self::path(id), "thought", request).await
    }

    /// DELETE /provision/perception/thoughts/{id}
    pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
        self.client.delete(&Self::path(id)).await
    }

    fn path(id: &str) -> String {
        format!("/provision/perception/thoughts/{}", segment(id))
    }
}

pub struct ContextsApi<'a> {
    client: &'a Client,
}

impl ContextsApi<'_> {
    /// GET /provision/perception/contexts/{id}
    pub async fn get(&self, id: &str) -> Result<ThoughtContext, ApiError> {
        self.client.get(&Self::path(id)).await
    }

    /// POST /provision/perception/thoughts/{thought_id}/contexts
    pub async fn create(
        &self,
        thought_id: &str,
        request: &ThoughtContextRequest,
    ) -> Result<ThoughtContext, ApiError> {
        let path = format!(
            "/provision/perception/thoughts/{}/contexts",
            segment(thought_id)
        );
        self.client.post(&path, "context", request).await
    }

    /// PATCH /provision/perception/contexts/{id}
    pub async fn update(
        &self,
        id: &str,
        request: &ThoughtContextRequest,
    ) -> Result<ThoughtContext, ApiError> {
        self.client.patch(&Self::path(id), "context", request).await
    }

    /// DELETE /provision/perception/contexts/{id}
    pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
        self.client.delete(&Self::path(id)).await
    }

    fn path(id: &str) -> String {
        format!("/provision/perception/contexts/{}", segment(id))
    }
}

pub struct ToolsApi<'a> {
    client: &'a Client,
}

impl ToolsApi<'_> {
    /// GET /provision/perception/tools/{id}
    pub async fn get(&self, id: &str) -> Result<ThoughtTool, ApiError> {
        self.client.get(&Self::path(id)).await
    }

    /// POST /provision/perception/thoughts/{thought_id}/tools
    pub async fn create(
        &self,
        thought_id: &str,
        request: &ThoughtToolRequest,
    ) -> Result<ThoughtTool, ApiError> {
        let path = format!("/provision/perception/thoughts/{}/tools", segment(thought_id));
        self.client.post(&path, "tool", request).await
    }

    /// DELETE /provision/perception/tools/{id}
    pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
        self.client.delete(&Self::path(id)).await
    }

    fn path(id: &str) -> String {
        format!("/provision/perception/tools/{}", segment(id))
    }
}

pub struct ThoughtProcessorsApi<'a> {
    client: &'a Client,
}

impl ThoughtProcessorsApi<'_> {
    /// GET /provision/perception/processors/{id}
    pub async fn get(&self, id: &str) -> Result<Processor, ApiError> {
        self.client.get(&Self::path(id)).await
    }

    /// POST /provision/perception/thoughts/{thought_id}/processors
    pub async fn create(
        &self,
        thought_id: &str,
        request: &ProcessorRequest,
    ) -> Result<Processor, ApiError> {
        let path = format!(
            "/provision/perception/thoughts/{}/processors",
            segment(thought_id)
        );
        self.client.post(&path, "processor", request).await
    }

    /// PATCH /provision/perception/processors/{id}
    pub async fn update(&self, id: &str, request: &ProcessorRequest) -> Result<Processor, ApiError> {
        self.client
            .patch(&Self::path(id), "processor", request)
            .await
    }

    /// DELETE /provision/perception/processors/{id}
    pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
        self.client.delete(&Self::path(id)).await
    }

    fn path(id: &str) -> String {
        format!("/provision/perception/processors/{}", segment(id))
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
    async fn thoughts_create_sends_module() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/provision/perception/chains/chain-1/thoughts")
            .match_body(Matcher::Json(json!({
                "thought": {
                    "relation": "description",
                    "module": {"reference": "tama/agentic/generate", "parameters": {"relation": "description"}}
                }
            })))
            .with_status(201)
            .with_body(
                r#"{"data":{"id":"thought-1","chain_id":"chain-1","relation":"description","index":0,"module":{"reference":"tama/agentic/generate","parameters":{"relation":"description"}},"provision_state":"active"}}"#,
            )
            .create_async()
            .await;

        let client = test_client(&server.url());
        let thought = client
            .perception()
            .thoughts()
            .create(
                "chain-1",
                &ThoughtRequest {
                    relation: "description".to_string(),
                    index: None,
                    output_class_id: None,
                    module: ThoughtModule {
                        reference: "tama/agentic/generate".to_string(),
                        parameters: Some(json!({"relation": "description"})),
                    },
                },
            )
            .await
            .unwrap();

        assert_eq!(thought.index, Some(0));
        assert!(thought.output_class_id.is_none());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn contexts_default_layer_to_zero() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/provision/perception/contexts/ctx-1")
            .with_body(r#"{"data":{"id":"ctx-1","thought_id":"thought-1","prompt_id":"prompt-1"}}"#)
            .create_async()
            .await;

        let client = test_client(&server.url());
        let context = client.perception().contexts().get("ctx-1").await.unwrap();

        assert_eq!(context.layer, 0);
        assert_eq!(context.prompt_id, "prompt-1");
    }

    #[tokio::test]
    async fn tools_create_posts_action_id() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/provision/perception/thoughts/thought-1/tools")
            .match_body(Matcher::Json(json!({"tool": {"action_id": "act-1"}})))
            .with_status(201)
            .with_body(r#"{"data":{"id":"tool-1","thought_id":"thought-1","action_id":"act-1"}}"#)
            .create_async()
            .await;

        let client = test_client(&server.url());
        let tool = client
            .perception()
            .tools()
            .create(
                "thought-1",
                &ThoughtToolRequest {
                    action_id: "act-1".to_string(),
                },
            )
            .await
            .unwrap();

        assert_eq!(tool.id, "tool-1");
        mock.assert_async().await;
    }
}
