//! Import helpers for simplifying resource import implementations

use crate::resource::{ImportResourceStateRequest, ImportResourceStateResponse, ImportedResource};
use crate::types::DynamicValue;

/// Records a fully populated state as the single imported resource
pub fn import_state_with(
    request: &ImportResourceStateRequest,
    response: &mut ImportResourceStateResponse,
    state: DynamicValue,
) {
    response.imported_resources.push(ImportedResource {
        type_name: request.type_name.clone(),
        state,
        private: Vec::new(),
        identity: request.identity.clone(),
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ClientCapabilities;

    fn request(id: &str) -> ImportResourceStateRequest {
        ImportResourceStateRequest {
            type_name: "tama_space".to_string(),
            id: id.to_string(),
            client_capabilities: ClientCapabilities::default(),
            identity: None,
        }
    }

    #[test]
    fn import_state_with_keeps_type_name() {
        let request = request("space-123");
        let mut response = ImportResourceStateResponse::default();

        import_state_with(&request, &mut response, DynamicValue::object());

        assert_eq!(response.imported_resources[0].type_name, "tama_space");
    }
}
