//! Perception resources: chains, their thoughts and what each thought uses

pub mod resource_chain;
pub mod resource_modular_thought;
pub mod resource_thought_context;
pub mod resource_thought_processor;
pub mod resource_thought_tool;

pub use resource_chain::ChainResource;
pub use resource_modular_thought::ModularThoughtResource;
pub use resource_thought_context::ThoughtContextResource;
pub use resource_thought_processor::ThoughtProcessorResource;
pub use resource_thought_tool::ThoughtToolResource;
