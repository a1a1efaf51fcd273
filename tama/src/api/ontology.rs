//! Ontology API: classes and corpora

use super::{segment, ApiError, Client};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Deserialize)]
pub struct Class {
    pub id: String,
    #[serde(default)]
    pub space_id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub schema: Value,
    #[serde(default)]
    pub provision_state: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClassRequest {
    pub schema: Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Corpus {
    pub id: String,
    #[serde(default)]
    pub class_id: Option<String>,
    pub name: String,
    pub template: String,
    #[serde(default)]
    pub main: bool,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub provision_state: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CorpusRequest {
    pub name: String,
    pub template: String,
    pub main: bool,
}

pub struct OntologyApi<'a> {
    client: &'a Client,
}

impl<'a> OntologyApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    pub fn classes(&self) -> ClassesApi<'a> {
        ClassesApi {
            client: self.client,
        }
    }

    pub fn corpora(&self) -> CorporaApi<'a> {
        CorporaApi {
            client: self.client,
        }
    }
}

pub struct ClassesApi<'a> {
    client: &'a Client,
}

impl ClassesApi<'_> {
    /// GET /provision/ontology/classes/{id}
    pub async fn get(&self, id: &str) -> Result<Class, ApiError> {
        self.client.get(&Self::path(id)).await
    }

    /// GET /provision/ontology/spaces/{space_id}/classes/{name}
    pub async fn get_by_name(&self, space_id: &str, name: &str) -> Result<Class, ApiError> {
        let path = format!(
            "/provision/ontology/spaces/{}/classes/{}",
            segment(space_id),
            segment(name)
        );
        self.client.get(&path).await
    }

    /// POST /provision/ontology/spaces/{space_id}/classes
    pub async fn create(&self, space_id: &str, request: &ClassRequest) -> Result<Class, ApiError> {
        let path = format!("/provision/ontology/spaces/{}/classes", segment(space_id));
        self.client.post(&path, "class", request).await
    }

    /// PATCH /provision/ontology/classes/{id}
    pub async fn update(&self, id: &str, request: &ClassRequest) -> Result<Class, ApiError> {
        self.client.patch(&Self::path(id), "class", request).await
    }

    /// DELETE /provision/ontology/classes/{id}
    pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
        self.client.delete(&Self::path(id)).await
    }

    fn path(id: &str) -> String {
        format!("/provision/ontology/classes/{}", segment(id))
    }
}

pub struct CorporaApi<'a> {
    client: &'a Client,
}

impl CorporaApi<'_> {
    /// GET /provision/ontology/corpora/{id}
    pub async fn get(&self, id: &str) -> Result<Corpus, ApiError> {
        self.client.get(&Self::path(id)).await
    }

    /// POST /provision/ontology/classes/{class_id}/corpora
    pub async fn create(&self, class_id: &str, request: &CorpusRequest) -> Result<Corpus, ApiError> {
        let path = format!("/provision/ontology/classes/{}/corpora", segment(class_id));
        self.client.post(&path, "corpus", request).await
    }

    /// PATCH /provision/ontology/corpora/{id}
    pub async fn update(&self, id: &str, request: &CorpusRequest) -> Result<Corpus, ApiError> {
        self.client.patch(&Self::path(id), "corpus", request).await
    }

    /// DELETE /provision/ontology/corpora/{id}
    pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
        self.client.delete(&Self::path(id)).await
    }

    fn path(id: &str) -> String {
        format!("/provision/ontology/corpora/{}", segment(id))
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
    async fn classes_create_sends_schema_object() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/provision/ontology/spaces/space-1/classes")
            .match_body(Matcher::Json(json!({
                "class": {"schema": {"title": "movie", "type": "object"}}
            })))
            .with_status(201)
            .with_body(
                r#"{"data":{"id":"class-1","name":"movie","schema":{"title":"movie","type":"object"},"provision_state":"active"}}"#,
            )
            .create_async()
            .await;

        let client = test_client(&server.url());
        let class = client
            .ontology()
            .classes()
            .create(
                "space-1",
                &ClassRequest {
                    schema: json!({"title": "movie", "type": "object"}),
                },
            )
            .await
            .unwrap();

        assert_eq!(class.name, "movie");
        assert!(class.description.is_none());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn corpora_default_main_to_false() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/provision/ontology/corpora/corpus-1")
            .with_body(
                r#"{"data":{"id":"corpus-1","name":"default","template":"{{ data }}","slug":"default"}}"#,
            )
            .create_async()
            .await;

        let client = test_client(&server.url());
        let corpus = client.ontology().corpora().get("corpus-1").await.unwrap();

        assert!(!corpus.main);
        assert_eq!(corpus.template, "{{ data }}");
    }
}
