//! Processor entities and their type-dependent configuration
//!
//! A processor carries a `type` and a `configuration` object whose shape
//! depends on that type. On the wire:
//!
//! ```json
//! {"model_id": "...", "type": "completion", "configuration": {"temperature": 0.8}}
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompletionConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RerankingConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_n: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Value>,
}

/// Processor configuration keyed by processor type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "configuration", rename_all = "lowercase")]
pub enum ProcessorConfig {
    Completion(CompletionConfig),
    Embedding(EmbeddingConfig),
    Reranking(RerankingConfig),
}

impl ProcessorConfig {
    pub const TYPES: [&'static str; 3] = ["completion", "embedding", "reranking"];

    pub fn type_name(&self) -> &'static str {
        match self {
            ProcessorConfig::Completion(_) => "completion",
            ProcessorConfig::Embedding(_) => "embedding",
            ProcessorConfig::Reranking(_) => "reranking",
        }
    }
}

/// Processor as returned by the API
#[derive(Debug, Clone, Deserialize)]
pub struct Processor {
    pub id: String,
    #[serde(default)]
    pub space_id: Option<String>,
    #[serde(default)]
    pub thought_id: Option<String>,
    pub model_id: String,
    #[serde(rename = "type")]
    pub processor_type: String,
    #[serde(default)]
    pub configuration: Value,
}

impl Processor {
    /// Interprets `configuration` according to `type`
    pub fn config(&self) -> Result<ProcessorConfig, serde_json::Error> {
        let configuration = match &self.configuration {
            Value::Null => Value::Object(Default::default()),
            other => other.clone(),
        };

        serde_json::from_value(serde_json::json!({
            "type": self.processor_type,
            "configuration": configuration,
        }))
    }
}

/// Request body for creating and updating processors
#[derive(Debug, Clone, Serialize)]
pub struct ProcessorRequest {
    pub model_id: String,
    #[serde(flatten)]
    pub config: ProcessorConfig,
}
