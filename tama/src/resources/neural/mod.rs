//! Neural resources: spaces, their processors, listeners, queues and activations

pub mod resource_activation;
pub mod resource_listener;
pub mod resource_queue;
pub mod resource_space;
pub mod resource_space_processor;

pub use resource_activation::ActivationResource;
pub use resource_listener::ListenerResource;
pub use resource_queue::QueueResource;
pub use resource_space::SpaceResource;
pub use resource_space_processor::SpaceProcessorResource;
