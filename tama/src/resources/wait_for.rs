//! Polling until an entity reaches an accepted state
//!
//! A `wait_for` block lists fields together with the values they may take.
//! After create and update the resource fetches the entity every few
//! seconds until all fields match, the timeout passes or Terraform stops
//! the provider.

use crate::api::{ApiError, Client};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::{Duration, Instant};
use thiserror::Error;
use tfplug::context::Context;
use tfplug::schema::{AttributeBuilder, AttributeType, NestedBlock, NestedBlockBuilder, NestingMode};
use tfplug::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};

pub const POLL_INTERVAL: Duration = Duration::from_secs(2);
pub const POLL_TIMEOUT: Duration = Duration::from_secs(10 * 60);

pub fn block() -> NestedBlock {
    NestedBlockBuilder::new("wait_for", NestingMode::List)
        .description("Wait after create and update until the listed fields reach one of the given values")
        .block(
            NestedBlockBuilder::new("field", NestingMode::List)
                .description("A field of the entity and the values it may take")
                .attribute(
                    AttributeBuilder::new("name", AttributeType::String)
                        .description("Name of the field, e.g. current_state")
                        .required()
                        .build(),
                )
                .attribute(
                    AttributeBuilder::new("in", AttributeType::List(Box::new(AttributeType::String)))
                        .description("Accepted values")
                        .required()
                        .build(),
                )
                .min_items(1)
                .build(),
        )
        .build()
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldCondition {
    pub name: String,
    pub accepted: Vec<String>,
}

impl FieldCondition {
    fn satisfied_by(&self, entity: &Value) -> bool {
        let actual = match entity.get(&self.name) {
            None | Some(Value::Null) => return false,
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        };
        self.accepted.iter().any(|accepted| *accepted == actual)
    }
}

/// Collects every `field` of every `wait_for` block in `value`
pub fn conditions(value: &DynamicValue) -> Vec<FieldCondition> {
    let Ok(blocks) = value.get_list(&AttributePath::new("wait_for")) else {
        return vec![];
    };

    blocks
        .iter()
        .filter_map(|block| block.as_map()?.get("field")?.as_list())
        .flatten()
        .filter_map(|field| {
            let field = field.as_map()?;
            let name = field.get("name")?.as_str()?.to_string();
            let accepted = field
                .get("in")?
                .as_list()?
                .iter()
                .filter_map(Dynamic::as_str)
                .map(str::to_string)
                .collect();
            Some(FieldCondition { name, accepted })
        })
        .collect()
}

#[derive(Debug, Error)]
pub enum WaitError {
    #[error("timed out after {}s waiting for {pending}", .elapsed.as_secs())]
    Timeout { elapsed: Duration, pending: String },

    #[error("provider was stopped while waiting")]
    Cancelled,

    #[error(transparent)]
    Api(#[from] ApiError),
}

impl WaitError {
    pub fn to_diagnostic(&self, what: &str) -> Diagnostic {
        Diagnostic::error(
            format!("Failed waiting for {}", what),
            self.to_string(),
        )
        .with_attribute(AttributePath::new("wait_for"))
    }
}

/// Polls `path` until every condition holds and returns the final entity
pub async fn wait_for<T: DeserializeOwned>(
    ctx: &Context,
    client: &Client,
    path: &str,
    conditions: &[FieldCondition],
    interval: Duration,
    timeout: Duration,
) -> Result<T, WaitError> {
    let started = Instant::now();
    let deadline = ctx.with_timeout(timeout);

    loop {
        let entity: Value = client.get(path).await?;

        let pending: Vec<String> = conditions
            .iter()
            .filter(|condition| !condition.satisfied_by(&entity))
            .map(|condition| format!("{} in {:?}", condition.name, condition.accepted))
            .collect();

        if pending.is_empty() {
            return serde_json::from_value(entity)
                .map_err(|e| WaitError::Api(ApiError::ParseError(e.to_string())));
        }

        tracing::debug!(path, pending = ?pending, "waiting for entity");

        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = deadline.done() => {
                if ctx.is_cancelled() {
                    return Err(WaitError::Cancelled);
                }
                return Err(WaitError::Timeout {
                    elapsed: started.elapsed(),
                    pending: pending.join(", "),
                });
            }
        }
    }
}

/// Runs the `wait_for` conditions of `config` against `path`
///
/// Returns the settled entity, or `entity` together with a diagnostic when
/// waiting failed, so the caller can still record what was created.
pub async fn settle<T: DeserializeOwned>(
    ctx: &Context,
    client: &Client,
    path: &str,
    config: &DynamicValue,
    entity: T,
    what: &str,
) -> (T, Option<Diagnostic>) {
    let conditions = conditions(config);
    if conditions.is_empty() {
        return (entity, None);
    }

    match wait_for(ctx, client, path, &conditions, POLL_INTERVAL, POLL_TIMEOUT).await {
        Ok(settled) => (settled, None),
        Err(e) => {
            tracing::warn!(error = %e, path, "{} did not reach the expected state", what);
            (entity, Some(e.to_diagnostic(what)))
        }
    }
}
