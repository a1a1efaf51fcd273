//! Protocol buffer types for Terraform Plugin Protocol v6
//!
//! Generated at build time by tonic-build from `proto/tfplugin6.proto`.
//! Several generated names collide with framework types (`DynamicValue`,
//! `Diagnostic`, `Schema`), so always refer to them through `proto::`.
//!
//! RPC messages are nested per call, e.g. `proto::read_resource::Request`.

include!(concat!(env!("OUT_DIR"), "/tfplugin6.rs"));

pub use provider_server::{Provider as ProviderService, ProviderServer};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_types_are_generated() {
        let _ = diagnostic::Severity::Error;
        let _ = attribute_path::step::Selector::AttributeName("name".to_string());
        let _ = schema::nested_block::NestingMode::List;
        let _ = get_provider_schema::Response::default();
        let _ = apply_resource_change::Request::default();
        let _ = import_resource_state::ImportedResource::default();
    }
}
