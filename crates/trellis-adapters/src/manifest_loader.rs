//! Filesystem-based template manifest loader.
//!
//! Discovers and parses `template.toml` manifests from a directory tree,
//! converting them into domain [`TemplateDefinition`] objects ready for
//! insertion into a catalog.
//!
//! # Directory layout expected
//!
//! ```text
//! templates/
//! ├── rust-base/
//! │   ├── template.toml        ← manifest (required)
//! │   ├── .gitignore           ← file content
//! │   └── Cargo.toml
//! └── rust-web/
//!     ├── template.toml
//!     └── src/
//!         └── main.rs
//! ```
//!
//! # `template.toml` format
//!
//! ```toml
//! [template]
//! id        = "rust-web"       # unique identifier (no '@')
//! version   = "1.2.0"          # SemVer
//! platform  = "linux"          # optional; linux | macos | windows | wasm
//! framework = "axum"           # optional; axum | actix | react | ...
//!
//! [metadata]
//! name        = "Rust Web Service"
//! description = "Axum service skeleton."       # optional
//! author      = "Trellis"                      # optional
//! tags        = ["rust", "web"]                # optional
//!
//! [[dependencies]]
//! id          = "rust-base"
//! requirement = ">=1.0.0, <2.0.0"
//!
//! [[parameters]]
//! name     = "license"
//! kind     = "string"          # string | number | bool
//! required = false             # default false
//! default  = "MIT"             # optional, must match kind
//! final    = false             # default false; final forbids redeclaration
//!
//! # Optional per-file overrides. Files on disk not listed here are added
//! # with the default override merge strategy; `body` supplies content
//! # inline for files with no disk representation.
//! [[files]]
//! path  = ".gitignore"
//! merge = "append"             # override | append
//! body  = "target/\n"          # optional inline content
//! ```

use std::{
    collections::HashSet,
    fs,
    path::{Path, PathBuf},
};

use serde::Deserialize;
use tracing::{debug, instrument, warn};
use walkdir::WalkDir;

use trellis_core::{
    domain::{
        ContentUnit, Dependency, DomainError, Framework, MergeStrategy, Parameter, ParameterKind,
        ParameterValue, Platform, RelativePath, TemplateDefinition, TemplateMetadata,
    },
    error::TrellisResult,
};

use crate::catalog::InMemoryCatalog;

// ── Manifest types ───────────────────────────────────────────────────────

/// Deserialised representation of a `template.toml` file.
///
/// All fields map 1-to-1 to TOML sections; see the module-level docs for
/// the full format.
#[derive(Debug, Deserialize, Clone)]
pub struct TemplateManifest {
    pub template: TemplateSection,
    pub metadata: MetadataSection,
    #[serde(default)]
    pub dependencies: Vec<DependencyEntry>,
    #[serde(default)]
    pub parameters: Vec<ParameterEntry>,
    /// Per-file overrides and inline bodies. Files not listed here are
    /// picked up from disk with the default merge strategy.
    #[serde(default)]
    pub files: Vec<FileEntry>,
}

/// `[template]` section, the identity of the template.
#[derive(Debug, Deserialize, Clone)]
pub struct TemplateSection {
    /// Unique slug, e.g. `"rust-web"`.
    pub id: String,
    /// SemVer string, e.g. `"1.2.0"`.
    pub version: String,
    /// Target platform constraint; omitted means any.
    pub platform: Option<Platform>,
    /// Framework constraint; omitted means any.
    pub framework: Option<Framework>,
}

/// `[metadata]` section, human-facing information about the template.
#[derive(Debug, Deserialize, Clone)]
pub struct MetadataSection {
    pub name: String,
    pub description: Option<String>,
    pub author: Option<String>,
    pub tags: Option<Vec<String>>,
}

/// One entry under `[[dependencies]]`.
#[derive(Debug, Deserialize, Clone)]
pub struct DependencyEntry {
    pub id: String,
    /// SemVer requirement, e.g. `">=1.0.0, <2.0.0"`.
    pub requirement: String,
}

/// One entry under `[[parameters]]`.
#[derive(Debug, Deserialize, Clone)]
pub struct ParameterEntry {
    pub name: String,
    pub kind: ParameterKind,
    #[serde(default)]
    pub required: bool,
    pub default: Option<ParameterValue>,
    /// `final = true` forbids redeclaration in derived templates.
    #[serde(default, rename = "final")]
    pub finality: bool,
}

/// One entry under `[[files]]`.
#[derive(Debug, Deserialize, Clone)]
pub struct FileEntry {
    /// Relative path from the template root (e.g. `"src/main.rs"`).
    pub path: String,
    #[serde(default)]
    pub merge: MergeStrategy,
    /// Inline content. When absent the file must exist on disk.
    pub body: Option<String>,
}

// ── Loader ───────────────────────────────────────────────────────────────

/// Loads [`TemplateDefinition`] objects from a directory tree of
/// `template.toml` manifests.
///
/// Each immediate subdirectory of `templates_dir` that contains a valid
/// `template.toml` is treated as one template. Subdirectories missing the
/// manifest, or whose manifest is invalid, emit a `WARN` log and are
/// skipped; they do not prevent other templates from loading.
pub struct ManifestCatalogLoader {
    templates_dir: PathBuf,
}

impl ManifestCatalogLoader {
    /// Create a loader pointed at `templates_dir`.
    ///
    /// The directory does not need to exist yet; [`load_all`](Self::load_all)
    /// will return an error if it is missing when called.
    pub fn new(templates_dir: impl Into<PathBuf>) -> Self {
        Self {
            templates_dir: templates_dir.into(),
        }
    }

    /// Load every valid template and insert it into a fresh catalog.
    pub fn load_catalog(&self) -> TrellisResult<InMemoryCatalog> {
        InMemoryCatalog::with_definitions(self.load_all()?)
    }

    /// Load every valid template found under the templates directory.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::InvalidDefinition`] if the directory does not
    /// exist or cannot be read. Individual template directories whose
    /// manifest is missing or malformed are skipped with a `WARN` log
    /// rather than failing the whole batch.
    #[instrument(skip(self), fields(dir = %self.templates_dir.display()))]
    pub fn load_all(&self) -> TrellisResult<Vec<TemplateDefinition>> {
        if !self.templates_dir.exists() {
            return Err(DomainError::InvalidDefinition(format!(
                "templates directory not found: {}",
                self.templates_dir.display()
            ))
            .into());
        }

        let read_dir = fs::read_dir(&self.templates_dir).map_err(|e| {
            DomainError::InvalidDefinition(format!(
                "failed to read templates directory '{}': {e}",
                self.templates_dir.display()
            ))
        })?;

        let mut definitions = Vec::new();

        for entry_result in read_dir {
            let entry = entry_result.map_err(|e| {
                DomainError::InvalidDefinition(format!("failed to read directory entry: {e}"))
            })?;

            let path = entry.path();
            if !path.is_dir() {
                continue; // Only process subdirectories.
            }

            match self.load_definition_from_dir(&path) {
                Ok(definition) => {
                    debug!(
                        id = %definition.id,
                        version = %definition.version,
                        "loaded template"
                    );
                    definitions.push(definition);
                }
                Err(e) => {
                    // One bad template must not block all others.
                    warn!(
                        dir = %path.display(),
                        error = %e,
                        "skipping template directory due to load error"
                    );
                }
            }
        }

        // A stable order keeps catalog construction deterministic across
        // platforms with different read_dir ordering.
        definitions.sort_by(|a, b| (&a.id, &a.version).cmp(&(&b.id, &b.version)));

        debug!(count = definitions.len(), "finished loading templates");
        Ok(definitions)
    }

    /// Load a single template definition from one subdirectory.
    #[instrument(skip(self), fields(dir = %dir.display()))]
    fn load_definition_from_dir(&self, dir: &Path) -> Result<TemplateDefinition, DomainError> {
        let manifest_path = dir.join("template.toml");
        if !manifest_path.exists() {
            return Err(DomainError::InvalidDefinition(format!(
                "missing template.toml in '{}'",
                dir.display()
            )));
        }

        let raw = fs::read_to_string(&manifest_path).map_err(|e| {
            DomainError::InvalidDefinition(format!(
                "failed to read '{}': {e}",
                manifest_path.display()
            ))
        })?;

        let manifest: TemplateManifest = toml::from_str(&raw).map_err(|e| {
            DomainError::InvalidDefinition(format!(
                "failed to parse '{}': {e}",
                manifest_path.display()
            ))
        })?;

        let mut builder = TemplateDefinition::builder()
            .id(manifest.template.id.as_str())
            .version_str(&manifest.template.version)?
            .metadata(build_metadata(&manifest));

        if let Some(platform) = manifest.template.platform {
            builder = builder.platform(platform);
        }
        if let Some(framework) = manifest.template.framework {
            builder = builder.framework(framework);
        }

        for dep in &manifest.dependencies {
            builder = builder.dependency(Dependency::parse(dep.id.as_str(), &dep.requirement)?);
        }
        for param in &manifest.parameters {
            builder = builder.parameter(build_parameter(param)?);
        }
        for unit in self.collect_content(dir, &manifest)? {
            builder = builder.content(unit);
        }

        builder.build()
    }

    /// Gather content units from the manifest `[[files]]` entries and the
    /// directory tree.
    ///
    /// Resolution order:
    /// 1. Manifest entries, using their inline `body` or the file on disk.
    /// 2. Every remaining file found by walking the tree, with the default
    ///    merge strategy.
    fn collect_content(
        &self,
        dir: &Path,
        manifest: &TemplateManifest,
    ) -> Result<Vec<ContentUnit>, DomainError> {
        let mut units = Vec::new();
        // Paths already committed, so the walk never pushes duplicates.
        let mut seen: HashSet<String> = HashSet::new();

        for entry in &manifest.files {
            let path = normalize_path(&entry.path);
            // Manifest data is untrusted; reject absolute paths instead of
            // panicking in the newtype constructor.
            let rel = RelativePath::try_new(path.as_str())?;
            let body = match &entry.body {
                Some(body) => body.clone(),
                None => read_template_file(dir, &path)?,
            };
            let mut unit = ContentUnit::new(rel, body);
            if entry.merge == MergeStrategy::Append {
                unit = unit.appendable();
            }
            seen.insert(path);
            units.push(unit);
        }

        for walk_entry in WalkDir::new(dir).min_depth(1) {
            let walk_entry = walk_entry.map_err(|e| {
                DomainError::InvalidDefinition(format!("directory walk error: {e}"))
            })?;
            if !walk_entry.file_type().is_file() {
                continue; // Directories are implied by file paths.
            }

            let abs_path = walk_entry.path();
            let rel_raw = abs_path.strip_prefix(dir).map_err(|_| {
                DomainError::InvalidDefinition(format!(
                    "failed to relativise '{}' against '{}'",
                    abs_path.display(),
                    dir.display()
                ))
            })?;

            // template.toml is a loader artefact, not a project file.
            if rel_raw.file_name() == Some(std::ffi::OsStr::new("template.toml")) {
                continue;
            }

            let path_str = normalize_path(&rel_raw.to_string_lossy());
            if seen.contains(&path_str) {
                continue;
            }

            let body = fs::read_to_string(abs_path).map_err(|e| {
                DomainError::InvalidDefinition(format!("failed to read file '{path_str}': {e}"))
            })?;

            seen.insert(path_str.clone());
            units.push(ContentUnit::new(path_str.as_str(), body));
        }

        Ok(units)
    }
}

fn build_metadata(manifest: &TemplateManifest) -> TemplateMetadata {
    TemplateMetadata::new(manifest.metadata.name.clone())
        .description(manifest.metadata.description.clone().unwrap_or_default())
        .author(
            manifest
                .metadata
                .author
                .clone()
                .unwrap_or_else(|| "Trellis".into()),
        )
        .tags(manifest.metadata.tags.clone().unwrap_or_default())
}

fn build_parameter(entry: &ParameterEntry) -> Result<Parameter, DomainError> {
    let mut parameter = Parameter::new(entry.name.as_str(), entry.kind);
    if entry.required {
        parameter = parameter.required();
    }
    if let Some(default) = &entry.default {
        parameter = parameter.with_default(default.clone());
    }
    if entry.finality {
        parameter = parameter.finalized();
    }
    // Catches defaults whose value does not match the declared kind.
    parameter.validate()?;
    Ok(parameter)
}

fn read_template_file(dir: &Path, rel: &str) -> Result<String, DomainError> {
    fs::read_to_string(dir.join(rel)).map_err(|e| {
        DomainError::InvalidDefinition(format!("failed to read file '{rel}': {e}"))
    })
}

/// Normalize to forward slashes so Windows and Unix paths compare
/// correctly.
fn normalize_path(raw: &str) -> String {
    raw.replace('\\', "/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_file(root: &Path, rel: &str, contents: &str) {
        let path = root.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        let mut file = fs::File::create(path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
    }

    #[test]
    fn loads_manifest_with_disk_files() {
        let tmp = TempDir::new().unwrap();
        write_file(
            tmp.path(),
            "rust-base/template.toml",
            r#"
[template]
id = "rust-base"
version = "1.0.0"

[metadata]
name = "Rust Base"
"#,
        );
        write_file(tmp.path(), "rust-base/.gitignore", "target/\n");
        write_file(tmp.path(), "rust-base/src/main.rs", "fn main() {}\n");

        let loader = ManifestCatalogLoader::new(tmp.path());
        let definitions = loader.load_all().unwrap();

        assert_eq!(definitions.len(), 1);
        let def = &definitions[0];
        assert_eq!(def.id, "rust-base".into());
        assert_eq!(def.content.len(), 2);
        assert_eq!(def.content_unit(".gitignore").unwrap().body, "target/\n");
        assert_eq!(
            def.content_unit("src/main.rs").unwrap().body,
            "fn main() {}\n"
        );
    }

    #[test]
    fn manifest_entries_override_merge_strategy_and_body() {
        let tmp = TempDir::new().unwrap();
        write_file(
            tmp.path(),
            "extras/template.toml",
            r#"
[template]
id = "extras"
version = "1.0.0"

[metadata]
name = "Extras"

[[files]]
path = ".gitignore"
merge = "append"
body = "*.log\n"
"#,
        );

        let definitions = ManifestCatalogLoader::new(tmp.path()).load_all().unwrap();
        let unit = definitions[0].content_unit(".gitignore").unwrap();
        assert_eq!(unit.merge, MergeStrategy::Append);
        assert_eq!(unit.body, "*.log\n");
    }

    #[test]
    fn parses_dependencies_and_parameters() {
        let tmp = TempDir::new().unwrap();
        write_file(
            tmp.path(),
            "rust-web/template.toml",
            r#"
[template]
id = "rust-web"
version = "1.2.0"
platform = "linux"
framework = "axum"

[metadata]
name = "Rust Web"
tags = ["rust", "web"]

[[dependencies]]
id = "rust-base"
requirement = ">=1.0.0, <2.0.0"

[[parameters]]
name = "license"
kind = "string"
default = "MIT"
final = true

[[parameters]]
name = "workers"
kind = "number"
required = true
"#,
        );

        let definitions = ManifestCatalogLoader::new(tmp.path()).load_all().unwrap();
        let def = &definitions[0];

        assert_eq!(def.platform, Some(Platform::Linux));
        assert_eq!(def.framework, Some(Framework::Axum));
        assert_eq!(def.dependencies.len(), 1);
        assert_eq!(def.dependencies[0].id, "rust-base".into());

        let license = def.parameter("license").unwrap();
        assert_eq!(license.default, Some("MIT".into()));
        assert!(license.finality.is_final());

        let workers = def.parameter("workers").unwrap();
        assert!(workers.required);
        assert_eq!(workers.kind, ParameterKind::Number);
    }

    #[test]
    fn malformed_manifests_are_skipped_not_fatal() {
        let tmp = TempDir::new().unwrap();
        write_file(tmp.path(), "broken/template.toml", "not toml [[");
        write_file(
            tmp.path(),
            "fine/template.toml",
            r#"
[template]
id = "fine"
version = "1.0.0"

[metadata]
name = "Fine"
"#,
        );

        let definitions = ManifestCatalogLoader::new(tmp.path()).load_all().unwrap();
        assert_eq!(definitions.len(), 1);
        assert_eq!(definitions[0].id, "fine".into());
    }

    #[test]
    fn missing_directory_is_an_error() {
        let loader = ManifestCatalogLoader::new("/nonexistent/templates");
        assert!(loader.load_all().is_err());
    }
}
