//! Trellis Core - Hexagonal Architecture Implementation
//!
//! This crate provides the domain and application layers for the Trellis
//! template composition engine, following hexagonal (ports and adapters)
//! architecture.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │        Embedding application            │
//! │     (CLI, service, build tooling)       │
//! └──────────────────┬──────────────────────┘
//!                    │ calls
//!                    ▼
//! ┌─────────────────────────────────────────┐
//! │         Application Services            │
//! │ (GenerationService, DependencyResolver) │
//! │         Orchestrates Use Cases          │
//! └──────────────────┬──────────────────────┘
//!                    │ uses
//!                    ▼
//! ┌─────────────────────────────────────────┐
//! │      Application Ports (Traits)         │
//! │         (TemplateCatalog)               │
//! └──────────────────┬──────────────────────┘
//!                    │ implemented by
//!                    ▼
//! ┌─────────────────────────────────────────┐
//! │    trellis-adapters (Infrastructure)    │
//! │ (InMemoryCatalog, ManifestLoader, etc)  │
//! └─────────────────────────────────────────┘
//!                    │
//!                    ▼
//! ┌─────────────────────────────────────────┐
//! │        Domain Layer (Pure Logic)        │
//! │  (TemplateDefinition, InheritanceChain, │
//! │   Composer, ConditionalRenderer)        │
//! │         No External Dependencies        │
//! └─────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use trellis_core::{
//!     application::GenerationService,
//!     domain::RenderContext,
//! };
//!
//! // 1. Build a catalog adapter and inject it
//! let service = GenerationService::new(catalog);
//!
//! // 2. Generate a project from a root template
//! let ctx = RenderContext::new().with_value("name", "my-project");
//! let project = service.generate(&"rust-web".into(), &ctx).unwrap();
//! ```

// Re-export domain layer (stable, well-defined API)
pub mod domain;

// Re-export application layer (orchestration logic)
pub mod application;

// Re-export error types
pub mod error;

// Public API - what external crates should use
pub mod prelude {
    pub use crate::application::{
        DependencyResolver, GeneratedFile, GeneratedProject, GenerationService,
        ports::TemplateCatalog,
    };
    pub use crate::domain::{
        Composer, ConditionEvaluator, ConditionalRenderer, ContentUnit, ContextValue, Dependency,
        EffectiveTemplate, Framework, InheritanceChain, InheritanceValidator, MergeStrategy,
        Parameter, ParameterKind, ParameterValue, Platform, RelativePath, RenderContext,
        RenderResult, TemplateDefinition, TemplateId, TemplateMetadata, ValidatorConfig,
    };
    pub use crate::error::{TrellisError, TrellisResult};
}

// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
