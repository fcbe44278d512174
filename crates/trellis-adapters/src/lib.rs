//! Infrastructure adapters for Trellis.
//!
//! This crate implements the ports defined in
//! `trellis-core::application::ports`. It contains all external dependencies
//! and I/O operations: the in-memory catalog, the filesystem manifest
//! loader, and JSON context conversion.

pub mod catalog;
pub mod context;
pub mod manifest_loader;

// Re-export commonly used adapters
pub use catalog::InMemoryCatalog;
pub use context::context_from_json;
pub use manifest_loader::ManifestCatalogLoader;
