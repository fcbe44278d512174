//! Application layer errors.
//!
//! These errors represent failures in orchestration, not business logic.
//! Business logic errors are `DomainError` from `crate::domain`.

use thiserror::Error;

use crate::domain::DomainError;

/// Errors that occur during application orchestration.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ApplicationError {
    /// Catalog access failed (lock poisoned, backing store unavailable).
    #[error("Template catalog error: {reason}")]
    CatalogAccess { reason: String },

    /// Generation was asked for with nothing to resolve.
    #[error("Generation requires a non-empty chain")]
    EmptyChain,

    /// The validator found fatal issues; generation was aborted.
    ///
    /// `causes` holds the structured form of every fatal finding that maps
    /// onto a `DomainError`, so callers can match on variants instead of
    /// parsing the summary.
    #[error("Validation rejected the chain: {summary}")]
    ValidationRejected {
        summary: String,
        causes: Vec<DomainError>,
    },
}

impl ApplicationError {
    /// Get user-actionable suggestions.
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            Self::CatalogAccess { reason } => vec![
                format!("Catalog access failed: {}", reason),
                "Try again in a moment".into(),
            ],
            Self::EmptyChain => vec![
                "Resolution produced no templates".into(),
                "Check the root template id".into(),
            ],
            Self::ValidationRejected { summary, .. } => vec![
                "The inheritance chain has fatal issues".into(),
                format!("Details: {}", summary),
            ],
        }
    }
}
