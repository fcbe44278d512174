// ============================================================================
// domain/error.rs - COMPREHENSIVE ERROR DOMAIN
// ============================================================================

use thiserror::Error;

use crate::domain::entities::template::{ParameterKind, TemplateId};

/// Root domain error type.
///
/// All errors are:
/// - Cloneable (for retry logic)
/// - Categorizable (for CLI display)
/// - Actionable (provides suggestions)
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DomainError {
    // ========================================================================
    // Definition Validity Errors (400-level equivalent)
    // ========================================================================
    #[error("Invalid template definition: {0}")]
    InvalidDefinition(String),

    #[error("Duplicate content path in template '{template}': {path}")]
    DuplicatePath { template: String, path: String },

    #[error("Absolute paths not allowed: {path}")]
    AbsolutePathNotAllowed { path: String },

    #[error("Required field missing: {field}")]
    MissingRequiredField { field: &'static str },

    #[error("Invalid inheritance chain: {0}")]
    InvalidChain(String),

    // ========================================================================
    // Resolution Errors
    // ========================================================================
    #[error("Cyclic dependency: {}", cycle.iter().map(ToString::to_string).collect::<Vec<_>>().join(" -> "))]
    CyclicDependency { cycle: Vec<TemplateId> },

    #[error("Unresolved dependency '{id}' required by '{required_by}'")]
    UnresolvedDependency {
        id: TemplateId,
        required_by: TemplateId,
    },

    #[error("No version of '{id}' satisfies [{}]", requirements.join(", "))]
    VersionConflict {
        id: TemplateId,
        requirements: Vec<String>,
    },

    // ========================================================================
    // Composition Errors (409-level equivalent)
    // ========================================================================
    #[error("Parameter '{name}' is final in '{locked_by}' and cannot be redeclared by '{redeclared_by}'")]
    ParameterLocked {
        name: String,
        locked_by: TemplateId,
        redeclared_by: TemplateId,
    },

    #[error("Parameter '{name}' declared as {expected} by '{declared_by}' but as {found} by '{redeclared_by}'")]
    ParameterTypeConflict {
        name: String,
        expected: ParameterKind,
        found: ParameterKind,
        declared_by: TemplateId,
        redeclared_by: TemplateId,
    },

    // ========================================================================
    // Conditional Language Errors
    // ========================================================================
    #[error("Malformed expression at byte {position}: {reason} in '{expression}'")]
    MalformedExpression {
        expression: String,
        position: usize,
        reason: String,
    },

    #[error("Unbalanced conditional marker '{marker}' at byte {offset}")]
    UnbalancedConditional { marker: String, offset: usize },

    // ========================================================================
    // Chain Validity Errors
    // ========================================================================
    #[error("Inheritance depth {depth} exceeds maximum {max}")]
    DepthExceeded { depth: usize, max: usize },

    #[error("'{first}' and '{second}' are incompatible: {reason}")]
    PlatformIncompatible {
        first: TemplateId,
        second: TemplateId,
        reason: String,
    },
}

impl DomainError {
    /// Get user-actionable suggestions for fixing this error.
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            Self::InvalidDefinition(msg) => vec![
                "Check the template definition".into(),
                format!("Details: {}", msg),
            ],
            Self::CyclicDependency { cycle } => vec![
                "Templates cannot depend on themselves, directly or transitively".into(),
                format!(
                    "Break the cycle: {}",
                    cycle
                        .iter()
                        .map(ToString::to_string)
                        .collect::<Vec<_>>()
                        .join(" -> ")
                ),
            ],
            Self::UnresolvedDependency { id, required_by } => vec![
                format!("Template '{}' requires '{}', which the catalog does not provide", required_by, id),
                "Check the dependency id for typos".into(),
                "Register the missing template before resolving".into(),
            ],
            Self::VersionConflict { id, requirements } => vec![
                format!("The constraints on '{}' cannot all be satisfied at once", id),
                format!("Seen requirements: {}", requirements.join(", ")),
                "Relax one of the conflicting version ranges".into(),
            ],
            Self::ParameterLocked { name, locked_by, .. } => vec![
                format!("'{}' marked parameter '{}' as final", locked_by, name),
                "Remove the redeclaration, or unmark the base parameter".into(),
            ],
            Self::MalformedExpression { expression, .. } => vec![
                format!("Could not parse condition: {}", expression),
                "Supported syntax: paths, literals, ==, !=, &&, ||, !, parentheses".into(),
            ],
            Self::DepthExceeded { max, .. } => vec![
                format!("Inheritance chains are limited to {} levels", max),
                "Flatten intermediate templates or raise the validator limit".into(),
            ],
            _ => vec!["See documentation for more details".into()],
        }
    }

    /// Error category for CLI display styling.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidDefinition(_)
            | Self::DuplicatePath { .. }
            | Self::AbsolutePathNotAllowed { .. }
            | Self::MissingRequiredField { .. }
            | Self::InvalidChain(_) => ErrorCategory::Validation,
            Self::CyclicDependency { .. }
            | Self::UnresolvedDependency { .. }
            | Self::VersionConflict { .. } => ErrorCategory::Resolution,
            Self::ParameterLocked { .. } | Self::ParameterTypeConflict { .. } => {
                ErrorCategory::Composition
            }
            Self::MalformedExpression { .. } | Self::UnbalancedConditional { .. } => {
                ErrorCategory::Rendering
            }
            Self::DepthExceeded { .. } | Self::PlatformIncompatible { .. } => {
                ErrorCategory::Validation
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    Resolution,
    Composition,
    Rendering,
}
