//! Domain entities: template definitions, inheritance chains, and the
//! effective template a chain folds into.

pub mod chain;
pub mod common;
pub mod effective;
pub mod template;

pub use chain::{InheritanceChain, InheritanceNode};
pub use common::RelativePath;
pub use effective::{EffectiveTemplate, MergedContent, MergedParameter, ResolvedDependency};
pub use template::{
    ContentUnit, Dependency, Finality, MergeStrategy, Parameter, ParameterKind, ParameterValue,
    TemplateDefinition, TemplateDefinitionBuilder, TemplateId, TemplateMetadata,
};
