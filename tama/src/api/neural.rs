//! Neural API: spaces, space processors, listeners, queues and activations

use super::processor::{Processor, ProcessorRequest};
use super::{segment, ApiError, Client};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
pub struct Space {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub space_type: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub provision_state: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SpaceRequest {
    pub name: String,
    #[serde(rename = "type")]
    pub space_type: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Listener {
    pub id: String,
    #[serde(default)]
    pub space_id: Option<String>,
    pub endpoint: String,
    #[serde(default)]
    pub provision_state: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ListenerRequest {
    pub endpoint: String,
    pub secret: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Queue {
    pub id: String,
    pub role: String,
    pub name: String,
    pub concurrency: i64,
    #[serde(default)]
    pub provision_state: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateQueueRequest {
    pub role: String,
    pub name: String,
    pub concurrency: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct UpdateQueueRequest {
    pub concurrency: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Activation {
    pub id: String,
    #[serde(default)]
    pub chain_id: Option<String>,
    pub class_id: String,
    #[serde(rename = "type")]
    pub activation_type: String,
    #[serde(default)]
    pub on: Option<String>,
    #[serde(default)]
    pub provision_state: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateActivationRequest {
    pub class_id: String,
    #[serde(rename = "type")]
    pub activation_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub on: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UpdateActivationRequest {
    #[serde(rename = "type")]
    pub activation_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub on: Option<String>,
}

/// Neural API providing space-level operations
pub struct NeuralApi<'a> {
    client: &'a Client,
}

impl<'a> NeuralApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    pub fn spaces(&self) -> SpacesApi<'a> {
        SpacesApi {
            client: self.client,
        }
    }

    pub fn processors(&self) -> SpaceProcessorsApi<'a> {
        SpaceProcessorsApi {
            client: self.client,
        }
    }

    pub fn listeners(&self) -> ListenersApi<'a> {
        ListenersApi {
            client: self.client,
        }
    }

    pub fn queues(&self) -> QueuesApi<'a> {
        QueuesApi {
            client: self.client,
        }
    }

    pub fn activations(&self) -> ActivationsApi<'a> {
        ActivationsApi {
            client: self.client,
        }
    }
}

pub struct SpacesApi<'a> {
    client: &'a Client,
}

impl SpacesApi<'_> {
    /// GET /provision/neural/spaces/{id}
    pub async fn get(&self, id: &str) -> Result<Space, ApiError> {
        self.client.get(&Self::path(id)).await
    }

    /// POST /provision/neural/spaces
    pub async fn create(&self, request: &SpaceRequest) -> Result<Space, ApiError> {
        self.client
            .post("/provision/neural/spaces", "space", request)
            .await
    }

    /// PATCH /provision/neural/spaces/{id}
    pub async fn update(&self, id: &str, request: &SpaceRequest) -> Result<Space, ApiError> {
        self.client.patch(&Self::path(id), "space", request).await
    }

    /// DELETE /provision/neural/spaces/{id}
    pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
        self.client.delete(&Self::path(id)).await
    }

    fn path(id: &str) -> String {
        format!("/provision/neural/spaces/{}", segment(id))
    }
}

pub struct SpaceProcessorsApi<'a> {
    client: &'a Client,
}

impl SpaceProcessorsApi<'_> {
    /// GET /provision/neural/processors/{id}
    pub async fn get(&self, id: &str) -> Result<Processor, ApiError> {
        self.client.get(&Self::path(id)).await
    }

    /// POST /provision/neural/spaces/{space_id}/processors
    pub async fn create(
        &self,
        space_id: &str,
        request: &ProcessorRequest,
    ) -> Result<Processor, ApiError> {
        let path = format!("/provision/neural/spaces/{}/processors", segment(space_id));
        self.client.post(&path, "processor", request).await
    }

    /// PATCH /provision/neural/processors/{id}
    pub async fn update(&self, id: &str, request: &ProcessorRequest) -> Result<Processor, ApiError> {
        self.client
            .patch(&Self::path(id), "processor", request)
            .await
    }

    /// DELETE /provision/neural/processors/{id}
    pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
        self.client.delete(&Self::path(id)).await
    }

    fn path(id: &str) -> String {
        format!("/provision/neural/processors/{}", segment(id))
    }
}

pub struct ListenersApi<'a> {
    client: &'a Client,
}

impl ListenersApi<'_> {
    /// GET /provision/neural/listeners/{id}
    pub async fn get(&self, id: &str) -> Result<Listener, ApiError> {
        self.client.get(&Self::path(id)).await
    }

    /// POST /provision/neural/spaces/{space_id}/listeners
    pub async fn create(
        &self,
        space_id: &str,
        request: &ListenerRequest,
    ) -> Result<Listener, ApiError> {
        let path = format!("/provision/neural/spaces/{}/listeners", segment(space_id));
        self.client.post(&path, "listener", request).await
    }

    /// PATCH /provision/neural/listeners/{id}
    pub async fn update(&self, id: &str, request: &ListenerRequest) -> Result<Listener, ApiError> {
        self.client.patch(&Self::path(id), "listener", request).await
    }

    /// DELETE /provision/neural/listeners/{id}
    pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
        self.client.delete(&Self::path(id)).await
    }

    fn path(id: &str) -> String {
        format!("/provision/neural/listeners/{}", segment(id))
    }
}

pub struct QueuesApi<'a> {
    client: &'a Client,
}

impl QueuesApi<'_> {
    /// GET /provision/neural/queues/{id}
    pub async fn get(&self, id: &str) -> Result<Queue, ApiError> {
        self.client.get(&Self::path(id)).await
    }

    /// POST /provision/neural/queues
    pub async fn create(&self, request: &CreateQueueRequest) -> Result<Queue, ApiError> {
        self.client
            .post("/provision/neural/queues", "queue", request)
            .await
    }

    /// PATCH /provision/neural/queues/{id}
    pub async fn update(&self, id: &str, request: &UpdateQueueRequest) -> Result<Queue, ApiError> {
        self.client.patch(&Self::path(id), "queue", request).await
    }

    /// DELETE /provision/neural/queues/{id}
    pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
        self.client.delete(&Self::path(id)).await
    }

    fn path(id: &str) -> String {
        format!("/provision/neural/queues/{}", segment(id))
    }
}

pub struct ActivationsApi<'a> {
    client: &'a Client,
}

impl ActivationsApi<'_> {
    /// GET /provision/neural/activations/{id}
    pub async fn get(&self, id: &str) -> Result<Activation, ApiError> {
        self.client.get(&Self::path(id)).await
    }

    /// POST /provision/neural/chains/{chain_id}/activations
    pub async fn create(
        &self,
        chain_id: &str,
        request: &CreateActivationRequest,
    ) -> Result<Activation, ApiError> {
        let path = format!("/provision/neural/chains/{}/activations", segment(chain_id));
        self.client.post(&path, "activation", request).await
    }

    /// PATCH /provision/neural/activations/{id}
    pub async fn update(
        &self,
        id: &str,
        request: &UpdateActivationRequest,
    ) -> Result<Activation, ApiError> {
        self.client
            .patch(&Self::path(id), "activation", request)
            .await
    }

    /// DELETE /provision/neural/activations/{id}
    pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
        self.client.delete(&Self::path(id)).await
    }

    fn path(id: &str) -> String {
        format!("/provision/neural/activations/{}", segment(id))
    }
}
