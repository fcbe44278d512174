// ============================================================================
//  CLEAN MODULE BOUNDARIES
// ============================================================================

//! Core domain layer for Trellis.
//!
//! This module contains pure business logic with no I/O: template
//! definitions, inheritance chains, the composition fold, the conditional
//! language, and chain validation. Catalog access lives behind a port in the
//! application layer.
//!
//! ## Layer rules
//!
//! - **No async**: domain logic is synchronous
//! - **No I/O**: no filesystem, network, or external calls
//! - **Immutable entities**: all domain objects are `Clone + PartialEq`
//! - **Rich domain model**: behavior lives in entities, not services

pub mod compose;
pub mod condition;
pub mod entities;
pub mod error;
pub mod render;
pub mod validation;
pub mod value_objects;

// Re-exports for convenience
pub use entities::{
    chain::{InheritanceChain, InheritanceNode},
    common::RelativePath,
    effective::{EffectiveTemplate, MergedContent, MergedParameter, ResolvedDependency},
    template::{
        ContentUnit, Dependency, Finality, MergeStrategy, Parameter, ParameterKind,
        ParameterValue, TemplateDefinition, TemplateDefinitionBuilder, TemplateId,
        TemplateMetadata,
    },
};

pub use compose::Composer;
pub use condition::{ConditionEvaluator, ConditionExpr, ExpressionCache};
pub use error::{DomainError, ErrorCategory};
pub use render::{ConditionalRenderer, ContextValue, RenderContext, RenderDiagnostic, RenderResult};
pub use validation::{
    InheritanceValidator, IssueCode, Severity, ValidationIssue, ValidationResult, ValidatorConfig,
};
pub use value_objects::{Framework, Platform};
