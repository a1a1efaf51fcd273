//! Configuration blocks shared by space and thought processors
//!
//! A processor carries exactly one of the `completion`, `embedding` and
//! `reranking` blocks. The block that is set decides the processor type.

use super::{json_at, optional_json_string, parent_id, required_string, set_optional_string, set_string, string_at};
use crate::api::processor::{
    CompletionConfig, EmbeddingConfig, Processor, ProcessorConfig, ProcessorRequest,
    RerankingConfig,
};
use crate::api::ApiError;
use std::collections::HashMap;
use tfplug::schema::{AttributeBuilder, AttributeType, NestedBlock, NestedBlockBuilder, NestingMode};
use tfplug::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};
use tfplug::validator::JsonString;

pub fn blocks() -> Vec<NestedBlock> {
    vec![
        NestedBlockBuilder::new("completion", NestingMode::List)
            .description("Completion processor settings")
            .attribute(
                AttributeBuilder::new("temperature", AttributeType::Number)
                    .description("Sampling temperature")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("tool_choice", AttributeType::String)
                    .description("Tool choice strategy, e.g. auto, required or none")
                    .optional()
                    .build(),
            )
            .attribute(parameters_attribute())
            .max_items(1)
            .build(),
        NestedBlockBuilder::new("embedding", NestingMode::List)
            .description("Embedding processor settings")
            .attribute(
                AttributeBuilder::new("max_tokens", AttributeType::Number)
                    .description("Maximum number of input tokens")
                    .optional()
                    .build(),
            )
            .attribute(parameters_attribute())
            .max_items(1)
            .build(),
        NestedBlockBuilder::new("reranking", NestingMode::List)
            .description("Reranking processor settings")
            .attribute(
                AttributeBuilder::new("top_n", AttributeType::Number)
                    .description("Number of results to keep")
                    .optional()
                    .build(),
            )
            .attribute(parameters_attribute())
            .max_items(1)
            .build(),
    ]
}

fn parameters_attribute() -> tfplug::schema::Attribute {
    AttributeBuilder::new("parameters", AttributeType::String)
        .description("Extra model parameters as a JSON object")
        .optional()
        .validator(JsonString::create())
        .build()
}

/// Checks that exactly one configuration block is present
///
/// Unknown blocks are skipped, they are checked again once known.
pub fn validate_exactly_one(config: &DynamicValue) -> Vec<Diagnostic> {
    let mut present = Vec::new();
    for name in ProcessorConfig::TYPES {
        match config.get(&AttributePath::new(name)) {
            Ok(Dynamic::Unknown) => return vec![],
            Ok(Dynamic::List(items)) if items.iter().any(Dynamic::is_unknown) => return vec![],
            Ok(Dynamic::List(items)) if !items.is_empty() => present.push(name),
            _ => {}
        }
    }

    if present.len() == 1 {
        return vec![];
    }

    let detail = if present.is_empty() {
        "One of completion, embedding or reranking must be configured".to_string()
    } else {
        format!(
            "Only one of completion, embedding or reranking may be configured, found: {}",
            present.join(", ")
        )
    };
    vec![Diagnostic::error("Invalid processor configuration", detail)]
}

/// Builds the create/update body from a planned value
pub fn processor_request(value: &DynamicValue) -> Result<ProcessorRequest, Diagnostic> {
    Ok(ProcessorRequest {
        model_id: required_string(value, "model_id")?,
        config: config_from(value)?,
    })
}

/// Maps a processor onto state, `parent` naming the owning id attribute
///
/// A configuration that does not match its `type` is reported as a parse
/// error of the response.
pub fn processor_state(
    processor: Processor,
    parent: &str,
    prior: &DynamicValue,
) -> Result<DynamicValue, ApiError> {
    let config = processor.config().map_err(|e| {
        ApiError::ParseError(format!(
            "processor {} has an unreadable {} configuration: {}",
            processor.id, processor.processor_type, e
        ))
    })?;

    let from_entity = match parent {
        "space_id" => processor.space_id,
        _ => processor.thought_id,
    };

    let mut state = DynamicValue::object();
    set_string(&mut state, "id", processor.id);
    set_optional_string(&mut state, parent, parent_id(prior, parent, from_entity));
    set_string(&mut state, "model_id", processor.model_id);
    write_config(&mut state, &config, prior);
    Ok(state)
}

/// Builds the typed configuration from the block that is set
pub fn config_from(value: &DynamicValue) -> Result<ProcessorConfig, Diagnostic> {
    if block_present(value, "completion") {
        let item = item_path("completion");
        return Ok(ProcessorConfig::Completion(CompletionConfig {
            temperature: value.get_number(&item.clone().attribute("temperature")).ok(),
            tool_choice: string_at(value, &item.clone().attribute("tool_choice")),
            parameters: json_at(value, &item.attribute("parameters"))?,
        }));
    }

    if block_present(value, "embedding") {
        let item = item_path("embedding");
        return Ok(ProcessorConfig::Embedding(EmbeddingConfig {
            max_tokens: integer(value, &item.clone().attribute("max_tokens")),
            parameters: json_at(value, &item.attribute("parameters"))?,
        }));
    }

    if block_present(value, "reranking") {
        let item = item_path("reranking");
        return Ok(ProcessorConfig::Reranking(RerankingConfig {
            top_n: integer(value, &item.clone().attribute("top_n")),
            parameters: json_at(value, &item.attribute("parameters"))?,
        }));
    }

    Err(Diagnostic::error(
        "Invalid processor configuration",
        "One of completion, embedding or reranking must be configured",
    ))
}

/// Writes `type` and the three configuration blocks into `state`
///
/// `parameters` keeps the text from `prior` when it is the same JSON.
pub fn write_config(state: &mut DynamicValue, config: &ProcessorConfig, prior: &DynamicValue) {
    let mut item = HashMap::new();
    let parameters = match config {
        ProcessorConfig::Completion(c) => {
            item.insert("temperature".to_string(), number(c.temperature));
            item.insert(
                "tool_choice".to_string(),
                c.tool_choice.clone().map_or(Dynamic::Null, Dynamic::String),
            );
            &c.parameters
        }
        ProcessorConfig::Embedding(c) => {
            item.insert("max_tokens".to_string(), number(c.max_tokens.map(|n| n as f64)));
            &c.parameters
        }
        ProcessorConfig::Reranking(c) => {
            item.insert("top_n".to_string(), number(c.top_n.map(|n| n as f64)));
            &c.parameters
        }
    };

    let name = config.type_name();
    let prior_parameters = string_at(prior, &item_path(name).attribute("parameters"));
    item.insert(
        "parameters".to_string(),
        optional_json_string(prior_parameters.as_deref(), parameters.clone())
            .map_or(Dynamic::Null, Dynamic::String),
    );

    for block in ProcessorConfig::TYPES {
        let value = if block == name {
            Dynamic::List(vec![Dynamic::Map(item.clone())])
        } else {
            Dynamic::List(vec![])
        };
        let _ = state.set_value(&AttributePath::new(block), value);
    }
    let _ = state.set_string(&AttributePath::new("type"), name.to_string());
}

fn block_present(value: &DynamicValue, name: &str) -> bool {
    matches!(value.get(&AttributePath::new(name)), Ok(Dynamic::List(items)) if !items.is_empty())
}

fn item_path(name: &str) -> AttributePath {
    AttributePath::new(name).index(0)
}

fn integer(value: &DynamicValue, path: &AttributePath) -> Option<i64> {
    value.get_number(path).ok().map(|n| n as i64)
}

fn number(value: Option<f64>) -> Dynamic {
    value.map_or(Dynamic::Null, Dynamic::Number)
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;
    use serde_json::json;

    fn with_block(name: &str, fields: &[(&str, Dynamic)]) -> DynamicValue {
        let item: HashMap<String, Dynamic> = fields
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        let mut value = DynamicValue::object();
        for block in ProcessorConfig::TYPES {
            let list = if block == name {
                vec![Dynamic::Map(item.clone())]
            } else {
                vec![]
            };
            value.set_list(&AttributePath::new(block), list).unwrap();
        }
        value
    }

    #[test]
    fn validate_accepts_a_single_block() {
        let value = with_block("embedding", &[("max_tokens", Dynamic::Number(512.0))]);
        assert!(validate_exactly_one(&value).is_empty());
    }

    #[test]
    fn validate_rejects_zero_or_several_blocks() {
        let none = DynamicValue::object();
        let diags = validate_exactly_one(&none);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].summary, "Invalid processor configuration");

        let mut both = with_block("completion", &[]);
        both.set_list(
            &AttributePath::new("reranking"),
            vec![Dynamic::Map(HashMap::new())],
        )
        .unwrap();
        let diags = validate_exactly_one(&both);
        assert_eq!(diags.len(), 1);
        assert!(diags[0].detail.contains("completion, reranking"));
    }

    #[test]
    fn validate_skips_unknown_blocks() {
        let mut value = DynamicValue::object();
        value
            .set_value(&AttributePath::new("completion"), Dynamic::Unknown)
            .unwrap();
        assert!(validate_exactly_one(&value).is_empty());
    }

    #[test]
    fn config_from_reads_completion_block() {
        let value = with_block(
            "completion",
            &[
                ("temperature", Dynamic::Number(0.7)),
                ("tool_choice", Dynamic::String("auto".into())),
                ("parameters", Dynamic::String(r#"{"stop": ["\n"]}"#.into())),
            ],
        );

        assert_eq!(
            config_from(&value).unwrap(),
            ProcessorConfig::Completion(CompletionConfig {
                temperature: Some(0.7),
                tool_choice: Some("auto".to_string()),
                parameters: Some(json!({"stop": ["\n"]})),
            })
        );
    }

    #[test]
    fn config_from_rejects_bad_parameters() {
        let value = with_block("reranking", &[("parameters", Dynamic::String("[".into()))]);
        let diag = config_from(&value).unwrap_err();
        assert_eq!(diag.summary, "Invalid JSON");
    }

    #[test]
    fn processor_state_rejects_mismatched_configuration() {
        let processor: Processor = serde_json::from_value(json!({
            "id": "proc-1",
            "thought_id": "thought-1",
            "model_id": "model-1",
            "type": "speech"
        }))
        .unwrap();

        let err = processor_state(processor, "thought_id", &DynamicValue::object()).unwrap_err();
        assert!(matches!(err, ApiError::ParseError(_)));
    }

    #[test]
    fn processor_state_prefers_prior_parent_id() {
        let processor: Processor = serde_json::from_value(json!({
            "id": "proc-1",
            "thought_id": "thought-remote",
            "model_id": "model-1",
            "type": "reranking",
            "configuration": {"top_n": 5}
        }))
        .unwrap();
        let mut prior = DynamicValue::object();
        prior
            .set_string(&AttributePath::new("thought_id"), "thought-1".to_string())
            .unwrap();

        let state = processor_state(processor, "thought_id", &prior).unwrap();
        assert_eq!(
            state.get_string(&AttributePath::new("thought_id")).unwrap(),
            "thought-1"
        );
        assert_eq!(
            state
                .get_number(&item_path("reranking").attribute("top_n"))
                .unwrap(),
            5.0
        );
    }

    #[test]
    fn write_config_sets_type_and_clears_other_blocks() {
        let prior = with_block(
            "embedding",
            &[("parameters", Dynamic::String("{ \"dimensions\": 256 }".into()))],
        );
        let mut state = DynamicValue::object();

        write_config(
            &mut state,
            &ProcessorConfig::Embedding(EmbeddingConfig {
                max_tokens: Some(512),
                parameters: Some(json!({"dimensions": 256})),
            }),
            &prior,
        );

        assert_eq!(
            state.get_string(&AttributePath::new("type")).unwrap(),
            "embedding"
        );
        assert_eq!(
            state
                .get_number(&item_path("embedding").attribute("max_tokens"))
                .unwrap(),
            512.0
        );
        assert_eq!(
            state
                .get_string(&item_path("embedding").attribute("parameters"))
                .unwrap(),
            "{ \"dimensions\": 256 }"
        );
        assert!(state
            .get_list(&AttributePath::new("completion"))
            .unwrap()
            .is_empty());
        assert!(state
            .get_list(&AttributePath::new("reranking"))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn write_config_keeps_unset_parameters_null() {
        let prior = with_block(
            "completion",
            &[
                ("temperature", Dynamic::Number(0.2)),
                ("tool_choice", Dynamic::Null),
                ("parameters", Dynamic::Null),
            ],
        );
        let mut state = DynamicValue::object();

        write_config(
            &mut state,
            &ProcessorConfig::Completion(CompletionConfig {
                temperature: Some(0.2),
                tool_choice: None,
                parameters: Some(json!({})),
            }),
            &prior,
        );

        let parameters = state
            .get(&item_path("completion").attribute("parameters"))
            .unwrap();
        assert_eq!(*parameters, Dynamic::Null);
    }
}
