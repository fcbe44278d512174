//! Catalog adapters implementing the `TemplateCatalog` port.

pub mod memory;

pub use memory::InMemoryCatalog;
