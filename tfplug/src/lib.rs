//! tfplug - Terraform Plugin Framework for Rust
//!
//! A framework for building Terraform providers in Rust, implementing the
//! Terraform Plugin Protocol v6.

// Core modules
pub mod context;
pub mod error;
pub mod schema;
pub mod types;

// Provider API modules
pub mod data_source;
pub mod provider;
pub mod resource;

// Helper modules
pub mod defaults;
pub mod import;
pub mod plan_modifier;
pub mod validator;

// Framework implementation modules
pub mod grpc;
pub mod proto;
pub mod server;

// Re-exports for convenience
pub use context::Context;
pub use data_source::{DataSource, DataSourceFactory, DataSourceWithConfigure};
pub use error::{Result, TfplugError};
pub use import::import_state_with;
pub use provider::{Provider, ProviderMetadataRequest, ProviderMetadataResponse};
pub use resource::{
    ManagedResource, Resource, ResourceFactory, ResourceWithConfigure, ResourceWithImportState,
};
pub use schema::{AttributeBuilder, AttributeType, NestedBlockBuilder, Schema, SchemaBuilder};
pub use server::{serve, ServerConfig};
pub use types::{AttributePath, Diagnostic, Dynamic, DynamicValue};
