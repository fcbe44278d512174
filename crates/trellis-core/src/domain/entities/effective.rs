//! Effective template: the single folded result of composing a chain.
//!
//! Transient and owned by the caller; nothing here points back into the
//! chain it came from. Maps are `BTreeMap` so that iteration (and therefore
//! generated-file ordering) is deterministic.

use std::collections::BTreeMap;

use semver::{Version, VersionReq};

use crate::domain::entities::template::{ContentUnit, Parameter, TemplateId};

/// A parameter as it survives the fold, with provenance.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedParameter {
    pub parameter: Parameter,
    /// The template whose declaration won the merge.
    pub defined_by: TemplateId,
    pub depth: usize,
}

/// A content unit as it survives the fold.
///
/// For `Append` units the body is the concatenation in chain order and
/// `contributors` lists every template that added a segment; for `Override`
/// units there is exactly one contributor.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedContent {
    pub unit: ContentUnit,
    pub contributors: Vec<TemplateId>,
}

/// A dependency after de-duplication and version arbitration.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedDependency {
    pub id: TemplateId,
    /// The concrete version present in the chain.
    pub version: Version,
    /// Every requirement seen for this id across the chain.
    pub requirements: Vec<VersionReq>,
}

/// The folded result of composing an inheritance chain.
#[derive(Debug, Clone, PartialEq)]
pub struct EffectiveTemplate {
    /// Id of the most-derived template (the one generation was asked for).
    pub root: TemplateId,
    pub version: Version,
    /// Parameter name → winning declaration.
    pub parameters: BTreeMap<String, MergedParameter>,
    /// Output path → merged content.
    pub content: BTreeMap<String, MergedContent>,
    /// De-duplicated dependency closure, chain order.
    pub dependencies: Vec<ResolvedDependency>,
}

impl EffectiveTemplate {
    pub fn parameter(&self, name: &str) -> Option<&MergedParameter> {
        self.parameters.get(name)
    }

    pub fn content_unit(&self, path: &str) -> Option<&MergedContent> {
        self.content.get(path)
    }

    pub fn file_count(&self) -> usize {
        self.content.len()
    }

    /// Parameters that carry a default value, for seeding a render context.
    pub fn parameter_defaults(
        &self,
    ) -> impl Iterator<Item = (&str, &crate::domain::entities::template::ParameterValue)> {
        self.parameters.values().filter_map(|merged| {
            merged
                .parameter
                .default
                .as_ref()
                .map(|value| (merged.parameter.name.as_str(), value))
        })
    }
}
