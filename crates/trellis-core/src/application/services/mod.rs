//! Application services orchestrating domain logic through ports.

pub mod generation_service;
pub mod resolver;

pub use generation_service::{GeneratedFile, GeneratedProject, GenerationService};
pub use resolver::DependencyResolver;
