//! Memory resources

pub mod resource_prompt;

pub use resource_prompt::PromptResource;
