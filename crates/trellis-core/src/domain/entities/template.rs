//! Template definition aggregate.
//!
//! A [`TemplateDefinition`] is the immutable unit of generation input: an id,
//! a version, declared dependencies on other templates, typed parameters, and
//! content units whose bodies may contain conditional regions and
//! placeholders.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  TemplateDefinition (Aggregate Root)                         │
//! │  ├── TemplateId (Entity)                                     │
//! │  ├── semver::Version                                         │
//! │  ├── Vec<Dependency>   - id + version requirement            │
//! │  ├── Vec<Parameter>    - name, kind, default, finality       │
//! │  ├── Vec<ContentUnit>  - path, body, merge strategy          │
//! │  ├── Platform / Framework constraints (optional)             │
//! │  └── TemplateMetadata  - human-readable info                 │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Decisions
//!
//! ### Why `semver::Version` instead of an opaque string?
//!
//! Dependency arbitration ("highest version satisfying every seen
//! constraint") needs real version ordering and `VersionReq` matching. An
//! opaque string would force every comparison site to re-parse.
//!
//! ### Why `Finality` as an enum, not a bool?
//!
//! `Parameter { finality: Finality::Final }` reads at the call site;
//! `Parameter { true }` does not. The enum also keeps the two merge policies
//! exhaustively matchable in the composition fold.
//!
//! ### Why strategy-on-the-unit rather than strategy-on-the-override?
//!
//! The *base* template decides whether a path accumulates (`Append`) or is
//! replaceable (`Override`). A derived template cannot retroactively turn a
//! replaceable file into an accumulating one; that would let a leaf change
//! the contract its ancestors were written against.

use std::collections::HashSet;
use std::fmt;

use semver::{Version, VersionReq};
use serde::{Deserialize, Serialize};

use crate::domain::{
    entities::common::RelativePath,
    error::DomainError,
    value_objects::{Framework, Platform},
};

// ============================================================================
// Template Identity
// ============================================================================

/// Unique identifier for a template.
///
/// ## Constraints
///
/// - Non-empty
/// - Cannot contain `@` (reserved for the `name@version` display form)
/// - Case-sensitive
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TemplateId(String);

impl TemplateId {
    /// Create a new template id.
    ///
    /// # Panics
    ///
    /// Panics if the name is empty or contains `@`. This is a programming
    /// error (invalid template name), not a runtime error; use `try_new`
    /// for data from the outside world.
    pub fn new(name: impl Into<String>) -> Self {
        Self::try_new(name).expect("invalid template id")
    }

    /// Fallible constructor for runtime-supplied names.
    pub fn try_new(name: impl Into<String>) -> Result<Self, DomainError> {
        let name = name.into();
        if name.is_empty() {
            return Err(DomainError::InvalidDefinition(
                "template id cannot be empty".into(),
            ));
        }
        if name.contains('@') {
            return Err(DomainError::InvalidDefinition(format!(
                "template id cannot contain '@': {name}"
            )));
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TemplateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TemplateId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

// ============================================================================
// Dependencies
// ============================================================================

/// A declared dependency on another template.
///
/// Descriptive only: the referenced definition is owned by the catalog, not
/// by the declaring template. The requirement is a standard semver range
/// (`">=1.0.0, <2.0.0"`).
#[derive(Debug, Clone, PartialEq)]
pub struct Dependency {
    pub id: TemplateId,
    pub requirement: VersionReq,
}

impl Dependency {
    pub fn new(id: impl Into<TemplateId>, requirement: VersionReq) -> Self {
        Self {
            id: id.into(),
            requirement,
        }
    }

    /// Parse the requirement from its string form.
    pub fn parse(id: impl Into<TemplateId>, requirement: &str) -> Result<Self, DomainError> {
        let requirement = VersionReq::parse(requirement).map_err(|e| {
            DomainError::InvalidDefinition(format!("invalid version requirement '{requirement}': {e}"))
        })?;
        Ok(Self::new(id, requirement))
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.id, self.requirement)
    }
}

// ============================================================================
// Parameters
// ============================================================================

/// The type of a template parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterKind {
    String,
    Number,
    Bool,
}

impl ParameterKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Bool => "bool",
        }
    }
}

impl fmt::Display for ParameterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A concrete parameter value, kind-tagged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParameterValue {
    String(String),
    Number(f64),
    Bool(bool),
}

impl ParameterValue {
    pub const fn kind(&self) -> ParameterKind {
        match self {
            Self::String(_) => ParameterKind::String,
            Self::Number(_) => ParameterKind::Number,
            Self::Bool(_) => ParameterKind::Bool,
        }
    }
}

impl From<&str> for ParameterValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for ParameterValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<f64> for ParameterValue {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<bool> for ParameterValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

/// Whether a parameter may be redeclared by a derived template.
///
/// `Final` at a base level makes any redeclaration at a deeper level a
/// composition error (`ParameterLocked`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Finality {
    Open,
    Final,
}

impl Finality {
    pub const fn is_final(self) -> bool {
        matches!(self, Self::Final)
    }
}

/// A typed, named parameter of a template.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub kind: ParameterKind,
    pub required: bool,
    pub default: Option<ParameterValue>,
    pub finality: Finality,
}

impl Parameter {
    /// Create an optional, open parameter with no default.
    pub fn new(name: impl Into<String>, kind: ParameterKind) -> Self {
        Self {
            name: name.into(),
            kind,
            required: false,
            default: None,
            finality: Finality::Open,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Set the default value. The value's kind must match the parameter's.
    pub fn with_default(mut self, value: impl Into<ParameterValue>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Forbid redeclaration in derived templates.
    pub fn finalized(mut self) -> Self {
        self.finality = Finality::Final;
        self
    }

    /// Check internal consistency (default kind matches declared kind).
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.name.is_empty() {
            return Err(DomainError::InvalidDefinition(
                "parameter name cannot be empty".into(),
            ));
        }
        if let Some(default) = &self.default {
            if default.kind() != self.kind {
                return Err(DomainError::InvalidDefinition(format!(
                    "parameter '{}' declared as {} but default is {}",
                    self.name,
                    self.kind,
                    default.kind()
                )));
            }
        }
        Ok(())
    }
}

// ============================================================================
// Content Units
// ============================================================================

/// How a content unit combines with a same-path unit from a derived level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergeStrategy {
    /// Derived content replaces this unit entirely (the default).
    #[default]
    Override,
    /// Derived content is concatenated after this unit, one newline between.
    Append,
}

impl MergeStrategy {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Override => "override",
            Self::Append => "append",
        }
    }
}

impl fmt::Display for MergeStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One output file of a template: a relative path and raw body text.
///
/// The body may contain `{{name}}` placeholders and `{{#if}}` conditional
/// regions; it is raw here and only interpreted by the conditional renderer.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentUnit {
    pub path: RelativePath,
    pub body: String,
    pub merge: MergeStrategy,
}

impl ContentUnit {
    pub fn new(path: impl Into<RelativePath>, body: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            body: body.into(),
            merge: MergeStrategy::Override,
        }
    }

    /// Mark this unit as accumulating: derived same-path content is appended
    /// rather than replacing it.
    pub fn appendable(mut self) -> Self {
        self.merge = MergeStrategy::Append;
        self
    }
}

// ============================================================================
// Template Metadata
// ============================================================================

/// Human-readable information about a template.
///
/// - `name`: short display name (e.g., "Rust CLI base")
/// - `description`: longer explanation for listings
/// - `tags`: search keywords for discovery
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateMetadata {
    pub name: String,
    pub description: String,
    pub author: String,
    pub tags: Vec<String>,
}

impl TemplateMetadata {
    /// Create new metadata with required display name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            author: "Trellis".to_string(),
            tags: Vec::new(),
        }
    }

    pub fn description(mut self, desc: impl Into<String>) -> Self {
        self.description = desc.into();
        self
    }

    pub fn author(mut self, author: impl Into<String>) -> Self {
        self.author = author.into();
        self
    }

    pub fn tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }
}

// ============================================================================
// Core Template Aggregate
// ============================================================================

/// The central domain aggregate: one named, versioned unit of generation
/// input.
///
/// ## Invariants (enforced by `validate()`)
///
/// 1. `id` is non-empty (enforced by [`TemplateId`])
/// 2. All content paths are unique and relative
/// 3. All parameter names are unique, defaults match declared kinds
/// 4. No self-dependency, no duplicate dependency ids
///
/// ## Lifecycle
///
/// 1. **Definition:** created via [`TemplateDefinitionBuilder`] or loaded
///    from a manifest
/// 2. **Resolution:** the dependency resolver walks `dependencies` into an
///    inheritance chain
/// 3. **Composition:** the chain folds into an effective template
/// 4. **Rendering:** content bodies pass through the conditional renderer
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateDefinition {
    pub id: TemplateId,
    pub version: Version,
    pub dependencies: Vec<Dependency>,
    pub parameters: Vec<Parameter>,
    pub content: Vec<ContentUnit>,
    pub platform: Option<Platform>,
    pub framework: Option<Framework>,
    pub metadata: TemplateMetadata,
}

impl TemplateDefinition {
    /// Start the builder pattern for fluent construction.
    pub fn builder() -> TemplateDefinitionBuilder {
        TemplateDefinitionBuilder::default()
    }

    /// Display form `name@version`.
    pub fn display_id(&self) -> String {
        format!("{}@{}", self.id, self.version)
    }

    /// Look up a declared parameter by name.
    pub fn parameter(&self, name: &str) -> Option<&Parameter> {
        self.parameters.iter().find(|p| p.name == name)
    }

    /// Look up a content unit by path.
    pub fn content_unit(&self, path: &str) -> Option<&ContentUnit> {
        self.content.iter().find(|u| u.path.as_str() == path)
    }

    /// Validate all invariants.
    ///
    /// Catalog implementations should validate definitions at insert time so
    /// the resolver only ever sees well-formed input.
    pub fn validate(&self) -> Result<(), DomainError> {
        // Invariant 2: no duplicate content paths
        let mut seen_paths = HashSet::new();
        for unit in &self.content {
            if !seen_paths.insert(unit.path.as_str().to_string()) {
                return Err(DomainError::DuplicatePath {
                    template: self.id.to_string(),
                    path: unit.path.to_string(),
                });
            }
        }

        // Invariant 3: parameter names unique, defaults well-typed
        let mut seen_params = HashSet::new();
        for param in &self.parameters {
            param.validate()?;
            if !seen_params.insert(param.name.clone()) {
                return Err(DomainError::InvalidDefinition(format!(
                    "duplicate parameter '{}' in template '{}'",
                    param.name, self.id
                )));
            }
        }

        // Invariant 4: no self-dependency, no duplicate dependency ids
        let mut seen_deps = HashSet::new();
        for dep in &self.dependencies {
            if dep.id == self.id {
                return Err(DomainError::InvalidDefinition(format!(
                    "template '{}' depends on itself",
                    self.id
                )));
            }
            if !seen_deps.insert(dep.id.clone()) {
                return Err(DomainError::InvalidDefinition(format!(
                    "duplicate dependency '{}' in template '{}'",
                    dep.id, self.id
                )));
            }
        }

        Ok(())
    }
}

/// Builder for constructing template definitions with validation.
///
/// All fields are optional during construction, but `build()` enforces:
/// - `id` (must be set)
/// - `version` (must be set and parse as semver)
/// plus every invariant of [`TemplateDefinition::validate`].
#[derive(Default)]
pub struct TemplateDefinitionBuilder {
    id: Option<TemplateId>,
    version: Option<Version>,
    dependencies: Vec<Dependency>,
    parameters: Vec<Parameter>,
    content: Vec<ContentUnit>,
    platform: Option<Platform>,
    framework: Option<Framework>,
    metadata: Option<TemplateMetadata>,
}

impl TemplateDefinitionBuilder {
    pub fn id(mut self, id: impl Into<TemplateId>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn version(mut self, version: Version) -> Self {
        self.version = Some(version);
        self
    }

    /// Parse and set the version from its string form.
    pub fn version_str(mut self, version: &str) -> Result<Self, DomainError> {
        let version = Version::parse(version).map_err(|e| {
            DomainError::InvalidDefinition(format!("invalid version '{version}': {e}"))
        })?;
        self.version = Some(version);
        Ok(self)
    }

    pub fn dependency(mut self, dependency: Dependency) -> Self {
        self.dependencies.push(dependency);
        self
    }

    /// Shorthand: declare a dependency from id and requirement string.
    pub fn depends_on(self, id: impl Into<TemplateId>, requirement: &str) -> Result<Self, DomainError> {
        let dep = Dependency::parse(id, requirement)?;
        Ok(self.dependency(dep))
    }

    pub fn parameter(mut self, parameter: Parameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    pub fn content(mut self, unit: ContentUnit) -> Self {
        self.content.push(unit);
        self
    }

    /// Shorthand: add an override-merged file.
    pub fn file(self, path: impl Into<RelativePath>, body: impl Into<String>) -> Self {
        self.content(ContentUnit::new(path, body))
    }

    pub fn platform(mut self, platform: Platform) -> Self {
        self.platform = Some(platform);
        self
    }

    pub fn framework(mut self, framework: Framework) -> Self {
        self.framework = Some(framework);
        self
    }

    pub fn metadata(mut self, metadata: TemplateMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Consume builder and construct a validated `TemplateDefinition`.
    ///
    /// # Errors
    ///
    /// - `MissingRequiredField` if id/version not set
    /// - Any invariant violation from `TemplateDefinition::validate`
    pub fn build(self) -> Result<TemplateDefinition, DomainError> {
        let id = self
            .id
            .ok_or(DomainError::MissingRequiredField { field: "id" })?;
        let version = self
            .version
            .ok_or(DomainError::MissingRequiredField { field: "version" })?;

        // Metadata defaults to the id as display name.
        let metadata = self
            .metadata
            .unwrap_or_else(|| TemplateMetadata::new(id.as_str()));

        let definition = TemplateDefinition {
            id,
            version,
            dependencies: self.dependencies,
            parameters: self.parameters,
            content: self.content,
            platform: self.platform,
            framework: self.framework,
            metadata,
        };
        definition.validate()?;
        Ok(definition)
    }
}
