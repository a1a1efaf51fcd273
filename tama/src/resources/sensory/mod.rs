//! Sensory resources: sources, their models and limits, specifications and identities

pub mod resource_limit;
pub mod resource_model;
pub mod resource_source;
pub mod resource_source_identity;
pub mod resource_specification;

pub use resource_limit::LimitResource;
pub use resource_model::ModelResource;
pub use resource_source::SourceResource;
pub use resource_source_identity::SourceIdentityResource;
pub use resource_specification::SpecificationResource;
