//! Memory API: prompts

use super::{segment, ApiError, Client};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
pub struct Prompt {
    pub id: String,
    #[serde(default)]
    pub space_id: Option<String>,
    pub name: String,
    pub content: String,
    pub role: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub provision_state: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PromptRequest {
    pub name: String,
    pub content: String,
    pub role: String,
}

pub struct MemoryApi<'a> {
    client: &'a Client,
}

impl<'a> MemoryApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    pub fn prompts(&self) -> PromptsApi<'a> {
        PromptsApi {
            client: self.client,
        }
    }
}

pub struct PromptsApi<'a> {
    client: &'a Client,
}

impl PromptsApi<'_> {
    /// GET /provision/memory/prompts/{id}
    pub async fn get(&self, id: &str) -> Result<Prompt, ApiError> {
        self.client.get(&Self::path(id)).await
    }

    /// POST /provision/memory/spaces/{space_id}/prompts
    pub async fn create(&self, space_id: &str, request: &PromptRequest) -> Result<Prompt, ApiError> {
        let path = format!("/provision/memory/spaces/{}/prompts", segment(space_id));
        self.client.post(&path, "prompt", request).await
    }

    /// PATCH /provision/memory/prompts/{id}
    pub async fn update(&self, id: &str, request: &PromptRequest) -> Result<Prompt, ApiError> {
        self.client.patch(&Self::path(id), "prompt", request).await
    }

    /// DELETE /provision/memory/prompts/{id}
    pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
        self.client.delete(&Self::path(id)).await
    }

    fn path(id: &str) -> String {
        format!("/provision/memory/prompts/{}", segment(id))
    }
}
