//! Resource implementations
//!
//! Every resource keeps the provider data it was configured with and maps
//! between Terraform values and the typed API models. The helpers below
//! cover the parts that are identical across resources: reading plan
//! attributes, writing state and turning API results into responses.

pub mod memory;
pub mod neural;
pub mod ontology;
pub mod perception;
pub mod processor_config;
pub mod sensory;
pub mod wait_for;

pub use memory::PromptResource;
pub use neural::{
    ActivationResource, ListenerResource, QueueResource, SpaceProcessorResource, SpaceResource,
};
pub use ontology::{ClassCorpusResource, ClassResource};
pub use perception::{
    ChainResource, ModularThoughtResource, ThoughtContextResource, ThoughtProcessorResource,
    ThoughtToolResource,
};
pub use sensory::{
    LimitResource, ModelResource, SourceIdentityResource, SourceResource, SpecificationResource,
};

use crate::api::{ApiError, Client};
use crate::TamaProviderData;
use serde_json::Value;
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use tfplug::resource::{
    CreateResourceResponse, DeleteResourceResponse, ImportResourceStateRequest,
    ImportResourceStateResponse, ReadResourceResponse, ResourceFactory, UpdateResourceResponse,
};
use tfplug::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};

pub fn factories() -> HashMap<String, ResourceFactory> {
    let mut resources: HashMap<String, ResourceFactory> = HashMap::new();
    resources.insert("tama_space".to_string(), || Box::new(SpaceResource::new()));
    resources.insert("tama_space_processor".to_string(), || {
        Box::new(SpaceProcessorResource::new())
    });
    resources.insert("tama_listener".to_string(), || Box::new(ListenerResource::new()));
    resources.insert("tama_queue".to_string(), || Box::new(QueueResource::new()));
    resources.insert("tama_activation".to_string(), || {
        Box::new(ActivationResource::new())
    });
    resources.insert("tama_source".to_string(), || Box::new(SourceResource::new()));
    resources.insert("tama_model".to_string(), || Box::new(ModelResource::new()));
    resources.insert("tama_limit".to_string(), || Box::new(LimitResource::new()));
    resources.insert("tama_specification".to_string(), || {
        Box::new(SpecificationResource::new())
    });
    resources.insert("tama_source_identity".to_string(), || {
        Box::new(SourceIdentityResource::new())
    });
    resources.insert("tama_class".to_string(), || Box::new(ClassResource::new()));
    resources.insert("tama_class_corpus".to_string(), || {
        Box::new(ClassCorpusResource::new())
    });
    resources.insert("tama_prompt".to_string(), || Box::new(PromptResource::new()));
    resources.insert("tama_chain".to_string(), || Box::new(ChainResource::new()));
    resources.insert("tama_modular_thought".to_string(), || {
        Box::new(ModularThoughtResource::new())
    });
    resources.insert("tama_thought_context".to_string(), || {
        Box::new(ThoughtContextResource::new())
    });
    resources.insert("tama_thought_tool".to_string(), || {
        Box::new(ThoughtToolResource::new())
    });
    resources.insert("tama_thought_processor".to_string(), || {
        Box::new(ThoughtProcessorResource::new())
    });
    resources
}

/// Extracts the provider data handed over in configure
///
/// Validation runs before the provider is configured, so a missing value is
/// not an error here. Operations that need the client report it instead.
pub(crate) fn provider_data_from(
    provider_data: Option<Arc<dyn Any + Send + Sync>>,
) -> Result<Option<TamaProviderData>, Diagnostic> {
    match provider_data {
        None => Ok(None),
        Some(data) => data
            .downcast_ref::<TamaProviderData>()
            .cloned()
            .map(Some)
            .ok_or_else(|| {
                Diagnostic::error(
                    "Invalid provider data",
                    "Expected TamaProviderData from the tama provider",
                )
            }),
    }
}

/// Stores the provider data in `slot`, returning configure diagnostics
pub(crate) fn store_provider_data(
    slot: &mut Option<TamaProviderData>,
    provider_data: Option<Arc<dyn Any + Send + Sync>>,
) -> Vec<Diagnostic> {
    match provider_data_from(provider_data) {
        Ok(data) => {
            *slot = data;
            vec![]
        }
        Err(diag) => vec![diag],
    }
}

pub(crate) fn api_client(provider_data: &Option<TamaProviderData>) -> Result<&Client, Diagnostic> {
    provider_data
        .as_ref()
        .map(|data| data.client.as_ref())
        .ok_or_else(|| {
            Diagnostic::error(
                "Provider not configured",
                "Provider data was not properly configured",
            )
        })
}

pub(crate) fn api_error(action: &str, error: &ApiError) -> Diagnostic {
    Diagnostic::error(format!("Failed to {}", action), format!("API error: {}", error))
}

// Attribute access

pub(crate) fn string_at(value: &DynamicValue, path: &AttributePath) -> Option<String> {
    value.get_string(path).ok()
}

pub(crate) fn optional_string(value: &DynamicValue, name: &str) -> Option<String> {
    string_at(value, &AttributePath::new(name))
}

pub(crate) fn required_string(value: &DynamicValue, name: &str) -> Result<String, Diagnostic> {
    optional_string(value, name).ok_or_else(|| missing(name))
}

pub(crate) fn optional_i64(value: &DynamicValue, name: &str) -> Option<i64> {
    value
        .get_number(&AttributePath::new(name))
        .ok()
        .map(|n| n as i64)
}

pub(crate) fn required_i64(value: &DynamicValue, name: &str) -> Result<i64, Diagnostic> {
    optional_i64(value, name).ok_or_else(|| missing(name))
}

pub(crate) fn optional_bool(value: &DynamicValue, name: &str) -> Option<bool> {
    value.get_bool(&AttributePath::new(name)).ok()
}

fn missing(name: &str) -> Diagnostic {
    Diagnostic::error(
        "Missing required attribute",
        format!("'{}' must be set", name),
    )
    .with_attribute(AttributePath::new(name))
}

/// Parses a JSON-encoded string attribute, null when unset
pub(crate) fn json_at(value: &DynamicValue, path: &AttributePath) -> Result<Option<Value>, Diagnostic> {
    match string_at(value, path) {
        None => Ok(None),
        Some(raw) => serde_json::from_str(&raw).map(Some).map_err(|e| {
            Diagnostic::error("Invalid JSON", format!("{} is not valid JSON: {}", path, e))
                .with_attribute(path.clone())
        }),
    }
}

pub(crate) fn required_json(value: &DynamicValue, name: &str) -> Result<Value, Diagnostic> {
    json_at(value, &AttributePath::new(name))?.ok_or_else(|| missing(name))
}

/// Encodes `value`, keeping `prior` when it already describes the same JSON
pub(crate) fn json_string(prior: Option<&str>, value: &Value) -> String {
    if let Some(prior) = prior {
        if serde_json::from_str::<Value>(prior).is_ok_and(|parsed| &parsed == value) {
            return prior.to_string();
        }
    }
    value.to_string()
}

/// Like [`json_string`] for optional JSON, where the API answers an unset
/// value with null or `{}`
pub(crate) fn optional_json_string(prior: Option<&str>, value: Option<Value>) -> Option<String> {
    match value {
        None | Some(Value::Null) => None,
        Some(Value::Object(fields)) if fields.is_empty() && prior.is_none() => None,
        Some(value) => Some(json_string(prior, &value)),
    }
}

// State writing

pub(crate) fn set_string(state: &mut DynamicValue, name: &str, value: impl Into<String>) {
    let _ = state.set_string(&AttributePath::new(name), value.into());
}

pub(crate) fn set_optional_string(state: &mut DynamicValue, name: &str, value: Option<String>) {
    match value {
        Some(value) => set_string(state, name, value),
        None => {
            let _ = state.set_null(&AttributePath::new(name));
        }
    }
}

pub(crate) fn set_i64(state: &mut DynamicValue, name: &str, value: i64) {
    let _ = state.set_number(&AttributePath::new(name), value as f64);
}

pub(crate) fn set_optional_i64(state: &mut DynamicValue, name: &str, value: Option<i64>) {
    let value = value.map_or(Dynamic::Null, |n| Dynamic::Number(n as f64));
    let _ = state.set_value(&AttributePath::new(name), value);
}

pub(crate) fn set_bool(state: &mut DynamicValue, name: &str, value: bool) {
    let _ = state.set_bool(&AttributePath::new(name), value);
}

/// Copies an attribute the API never returns from a previous value
pub(crate) fn carry_over(state: &mut DynamicValue, prior: &DynamicValue, name: &str) {
    let path = AttributePath::new(name);
    let value = match prior.get(&path) {
        Ok(value) if !value.is_unknown() => value.clone(),
        _ => Dynamic::Null,
    };
    let _ = state.set_value(&path, value);
}

/// Parent identifier from the prior value, falling back to the entity
pub(crate) fn parent_id(prior: &DynamicValue, name: &str, from_entity: Option<String>) -> Option<String> {
    optional_string(prior, name).or(from_entity)
}

// Responses

pub(crate) fn create_failed(diagnostic: Diagnostic) -> CreateResourceResponse {
    CreateResourceResponse {
        new_state: DynamicValue::null(),
        private: vec![],
        diagnostics: vec![diagnostic],
    }
}

pub(crate) fn create_response<T>(
    result: Result<T, ApiError>,
    what: &str,
    to_state: impl FnOnce(T) -> DynamicValue,
) -> CreateResourceResponse {
    match result {
        Ok(entity) => CreateResourceResponse {
            new_state: to_state(entity),
            private: vec![],
            diagnostics: vec![],
        },
        Err(e) => {
            tracing::error!(error = %e, "failed to create {}", what);
            create_failed(api_error(&format!("create {}", what), &e))
        }
    }
}

pub(crate) fn read_response<T>(
    result: Result<T, ApiError>,
    current_state: DynamicValue,
    private: Vec<u8>,
    what: &str,
    to_state: impl FnOnce(T, &DynamicValue) -> DynamicValue,
) -> ReadResourceResponse {
    let (new_state, diagnostics) = match result {
        Ok(entity) => (Some(to_state(entity, &current_state)), vec![]),
        Err(e) if e.is_not_found() => {
            tracing::warn!("{} no longer exists, removing from state", what);
            (None, vec![])
        }
        Err(e) => (
            Some(current_state),
            vec![api_error(&format!("read {}", what), &e)],
        ),
    };

    ReadResourceResponse {
        new_state,
        diagnostics,
        private,
        deferred: None,
        new_identity: None,
    }
}

pub(crate) fn read_failed(
    current_state: DynamicValue,
    private: Vec<u8>,
    diagnostic: Diagnostic,
) -> ReadResourceResponse {
    ReadResourceResponse {
        new_state: Some(current_state),
        diagnostics: vec![diagnostic],
        private,
        deferred: None,
        new_identity: None,
    }
}

/// Response for a state without an id, which has nothing to refresh
pub(crate) fn read_gone(private: Vec<u8>) -> ReadResourceResponse {
    ReadResourceResponse {
        new_state: None,
        diagnostics: vec![],
        private,
        deferred: None,
        new_identity: None,
    }
}

pub(crate) fn update_failed(prior_state: DynamicValue, diagnostic: Diagnostic) -> UpdateResourceResponse {
    UpdateResourceResponse {
        new_state: prior_state,
        private: vec![],
        diagnostics: vec![diagnostic],
        new_identity: None,
    }
}

pub(crate) fn update_response<T>(
    result: Result<T, ApiError>,
    prior_state: DynamicValue,
    what: &str,
    to_state: impl FnOnce(T) -> DynamicValue,
) -> UpdateResourceResponse {
    match result {
        Ok(entity) => UpdateResourceResponse {
            new_state: to_state(entity),
            private: vec![],
            diagnostics: vec![],
            new_identity: None,
        },
        Err(e) => {
            tracing::error!(error = %e, "failed to update {}", what);
            update_failed(prior_state, api_error(&format!("update {}", what), &e))
        }
    }
}

pub(crate) fn delete_response(result: Result<(), ApiError>, what: &str) -> DeleteResourceResponse {
    let diagnostics = match result {
        Ok(()) => vec![],
        Err(e) if e.is_not_found() => {
            tracing::debug!("{} already deleted", what);
            vec![]
        }
        Err(e) => vec![api_error(&format!("delete {}", what), &e)],
    };
    DeleteResourceResponse { diagnostics }
}

pub(crate) fn delete_failed(diagnostic: Diagnostic) -> DeleteResourceResponse {
    DeleteResourceResponse {
        diagnostics: vec![diagnostic],
    }
}

pub(crate) fn import_response<T>(
    request: &ImportResourceStateRequest,
    result: Result<T, ApiError>,
    what: &str,
    to_state: impl FnOnce(T) -> DynamicValue,
) -> ImportResourceStateResponse {
    let mut response = ImportResourceStateResponse::default();
    match result {
        Ok(entity) => tfplug::import_state_with(request, &mut response, to_state(entity)),
        Err(e) if e.is_not_found() => response.diagnostics.push(Diagnostic::error(
            "Cannot import non-existent remote object",
            format!("No {} with id {:?} exists", what, request.id),
        )),
        Err(e) => response
            .diagnostics
            .push(api_error(&format!("import {}", what), &e)),
    }
    response
}

pub(crate) fn import_failed(diagnostic: Diagnostic) -> ImportResourceStateResponse {
    ImportResourceStateResponse {
        diagnostics: vec![diagnostic],
        ..Default::default()
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
pub(crate) mod test_support {
    use crate::api::{Client, RetryConfig};
    use crate::TamaProviderData;
    use std::any::Any;
    use std::collections::HashMap;
    use std::sync::Arc;
    use tfplug::context::Context;
    use tfplug::resource::{
        ConfigureResourceRequest, CreateResourceRequest, DeleteResourceRequest,
        ImportResourceStateRequest, ReadResourceRequest, ResourceWithConfigure,
        UpdateResourceRequest, ValidateResourceConfigRequest,
    };
    use tfplug::types::{ClientCapabilities, Dynamic, DynamicValue};

    pub fn provider_data(url: &str) -> Arc<dyn Any + Send + Sync> {
        let client = Client::with_config(
            url,
            "test-key",
            RetryConfig {
                max_retries: 0,
                initial_backoff_ms: 1,
                max_backoff_ms: 1,
                timeout_seconds: 5,
            },
        )
        .unwrap();
        Arc::new(TamaProviderData::new(client))
    }

    pub async fn configured<R: ResourceWithConfigure + Default>(url: &str) -> R {
        let mut resource = R::default();
        let response = resource
            .configure(
                Context::new(),
                ConfigureResourceRequest {
                    provider_data: Some(provider_data(url)),
                },
            )
            .await;
        assert!(response.diagnostics.is_empty());
        resource
    }

    pub fn object(fields: &[(&str, Dynamic)]) -> DynamicValue {
        DynamicValue::new(Dynamic::Map(
            fields
                .iter()
                .map(|(name, value)| (name.to_string(), value.clone()))
                .collect::<HashMap<_, _>>(),
        ))
    }

    pub fn string(value: &str) -> Dynamic {
        Dynamic::String(value.to_string())
    }

    pub fn validate_request(type_name: &str, config: DynamicValue) -> ValidateResourceConfigRequest {
        ValidateResourceConfigRequest {
            type_name: type_name.to_string(),
            config,
            client_capabilities: ClientCapabilities::default(),
        }
    }

    pub fn create_request(type_name: &str, planned_state: DynamicValue) -> CreateResourceRequest {
        CreateResourceRequest {
            type_name: type_name.to_string(),
            config: planned_state.clone(),
            planned_state,
            planned_private: vec![],
            provider_meta: None,
        }
    }

    pub fn read_request(type_name: &str, current_state: DynamicValue) -> ReadResourceRequest {
        ReadResourceRequest {
            type_name: type_name.to_string(),
            current_state,
            private: vec![],
            provider_meta: None,
            client_capabilities: ClientCapabilities::default(),
            current_identity: None,
        }
    }

    pub fn update_request(
        type_name: &str,
        prior_state: DynamicValue,
        planned_state: DynamicValue,
    ) -> UpdateResourceRequest {
        UpdateResourceRequest {
            type_name: type_name.to_string(),
            prior_state,
            config: planned_state.clone(),
            planned_state,
            planned_private: vec![],
            provider_meta: None,
            planned_identity: None,
        }
    }

    pub fn delete_request(type_name: &str, prior_state: DynamicValue) -> DeleteResourceRequest {
        DeleteResourceRequest {
            type_name: type_name.to_string(),
            prior_state,
            planned_private: vec![],
            provider_meta: None,
        }
    }

    pub fn import_request(type_name: &str, id: &str) -> ImportResourceStateRequest {
        ImportResourceStateRequest {
            type_name: type_name.to_string(),
            id: id.to_string(),
            client_capabilities: ClientCapabilities::default(),
            identity: None,
        }
    }
}
