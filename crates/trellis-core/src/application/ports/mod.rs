//! Application ports (traits) for external dependencies.
//!
//! In hexagonal architecture, ports define interfaces that the application
//! needs from the outside world. Adapters in `trellis-adapters` implement
//! these.

use semver::Version;

use crate::domain::{TemplateDefinition, TemplateId};
use crate::error::TrellisResult;

/// Port for template lookup.
///
/// Implemented by:
/// - `trellis_adapters::catalog::InMemoryCatalog` (built-in and tests)
/// - a remote registry client (future)
///
/// ## Design Notes
///
/// - Lookups are treated as pure and memoizable: for a fixed catalog state,
///   the same id always yields the same definition. The resolver depends on
///   this for deterministic chains.
/// - Absence is `Ok(None)`, not an error; only infrastructure failures
///   (lock poisoning, backing store down) surface as `Err`.
/// - `versions` exists because dependency arbitration needs to pick the
///   highest *available* version satisfying every constraint; a bare
///   get-by-id cannot answer that.
#[cfg_attr(test, mockall::automock)]
pub trait TemplateCatalog: Send + Sync {
    /// Get the highest available version of a template.
    fn get(&self, id: &TemplateId) -> TrellisResult<Option<TemplateDefinition>>;

    /// Get one specific version of a template.
    fn get_version(
        &self,
        id: &TemplateId,
        version: &Version,
    ) -> TrellisResult<Option<TemplateDefinition>>;

    /// All available versions of a template, ascending. Empty for unknown
    /// ids.
    fn versions(&self, id: &TemplateId) -> TrellisResult<Vec<Version>>;
}
