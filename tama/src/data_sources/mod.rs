pub mod data_source_action;
pub mod data_source_class;
pub mod data_source_space;

pub use data_source_action::ActionDataSource;
pub use data_source_class::ClassDataSource;
pub use data_source_space::SpaceDataSource;

use crate::api::ApiError;
use crate::resources::api_error;
use std::collections::HashMap;
use tfplug::data_source::{DataSourceFactory, ReadDataSourceResponse};
use tfplug::types::{Diagnostic, DynamicValue};

pub fn factories() -> HashMap<String, DataSourceFactory> {
    let mut data_sources: HashMap<String, DataSourceFactory> = HashMap::new();
    data_sources.insert("tama_space".to_string(), || Box::new(SpaceDataSource::new()));
    data_sources.insert("tama_class".to_string(), || Box::new(ClassDataSource::new()));
    data_sources.insert("tama_action".to_string(), || {
        Box::new(ActionDataSource::new())
    });
    data_sources
}

pub(crate) fn read_failed(diagnostic: Diagnostic) -> ReadDataSourceResponse {
    ReadDataSourceResponse {
        state: DynamicValue::null(),
        diagnostics: vec![diagnostic],
        deferred: None,
    }
}

/// Lookups have no prior state to keep, so every error is reported
pub(crate) fn read_result<T>(
    result: Result<T, ApiError>,
    what: &str,
    to_state: impl FnOnce(T) -> DynamicValue,
) -> ReadDataSourceResponse {
    match result {
        Ok(entity) => ReadDataSourceResponse {
            state: to_state(entity),
            diagnostics: vec![],
            deferred: None,
        },
        Err(e) => {
            tracing::error!(error = %e, "failed to read {}", what);
            read_failed(api_error(&format!("read {}", what), &e))
        }
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
pub(crate) mod test_support {
    use crate::resources::test_support::provider_data;
    use tfplug::context::Context;
    use tfplug::data_source::{
        ConfigureDataSourceRequest, DataSourceWithConfigure, ReadDataSourceRequest,
    };
    use tfplug::types::{ClientCapabilities, DynamicValue};

    pub async fn configured<D: DataSourceWithConfigure + Default>(url: &str) -> D {
        let mut data_source = D::default();
        let response = data_source
            .configure(
                Context::new(),
                ConfigureDataSourceRequest {
                    provider_data: Some(provider_data(url)),
                },
            )
            .await;
        assert!(response.diagnostics.is_empty());
        data_source
    }

    pub fn read_request(type_name: &str, config: DynamicValue) -> ReadDataSourceRequest {
        ReadDataSourceRequest {
            type_name: type_name.to_string(),
            config,
            provider_meta: None,
            client_capabilities: ClientCapabilities::default(),
        }
    }
}
