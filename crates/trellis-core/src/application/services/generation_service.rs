//! Project generation service.
//!
//! Orchestrates the full pipeline: resolve the inheritance chain from the
//! catalog, validate it, fold it into an effective template, then render
//! every content unit against the caller's context. Rendering is
//! soft-failing, so a generated project can carry files that are marked
//! unclean alongside their diagnostics; validation fatals abort before any
//! rendering happens.

use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::application::{error::ApplicationError, ports::TemplateCatalog};
use crate::domain::{
    Composer, ConditionalRenderer, EffectiveTemplate, InheritanceChain, InheritanceValidator,
    RelativePath, RenderContext, RenderDiagnostic, TemplateId, ValidationResult, ValidatorConfig,
};
use crate::error::TrellisResult;

use super::resolver::DependencyResolver;

/// One rendered file of a generated project.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedFile {
    pub path: RelativePath,
    pub text: String,
    /// False when rendering this file produced diagnostics; `text` is then
    /// the best-effort partial output.
    pub clean: bool,
    pub diagnostics: Vec<RenderDiagnostic>,
}

/// Output of [`GenerationService::generate`].
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedProject {
    pub root: TemplateId,
    /// Files in path order.
    pub files: Vec<GeneratedFile>,
}

impl GeneratedProject {
    /// True when every file rendered without diagnostics.
    pub fn is_clean(&self) -> bool {
        self.files.iter().all(|f| f.clean)
    }

    pub fn file(&self, path: &str) -> Option<&GeneratedFile> {
        self.files.iter().find(|f| f.path.as_str() == path)
    }
}

/// Application service tying the catalog port to the domain pipeline.
pub struct GenerationService {
    catalog: Box<dyn TemplateCatalog>,
    validator: InheritanceValidator,
    renderer: ConditionalRenderer,
}

impl GenerationService {
    pub fn new(catalog: Box<dyn TemplateCatalog>) -> Self {
        Self::with_config(catalog, ValidatorConfig::default())
    }

    pub fn with_config(catalog: Box<dyn TemplateCatalog>, config: ValidatorConfig) -> Self {
        Self {
            catalog,
            validator: InheritanceValidator::new(config),
            renderer: ConditionalRenderer::new(),
        }
    }

    /// Resolve the inheritance chain for a root template.
    pub fn resolve(&self, root_id: &TemplateId) -> TrellisResult<InheritanceChain> {
        DependencyResolver::new(self.catalog.as_ref()).resolve(root_id)
    }

    /// Validate a resolved chain without generating anything.
    pub fn validate_chain(&self, chain: &InheritanceChain) -> ValidationResult {
        self.validator.validate(chain)
    }

    /// Resolve and fold, skipping rendering. Useful for inspecting what a
    /// template would produce.
    pub fn compose_for(&self, root_id: &TemplateId) -> TrellisResult<EffectiveTemplate> {
        let chain = self.resolve(root_id)?;
        Ok(Composer::compose(&chain)?)
    }

    /// Run the full pipeline for `root_id` against `ctx`.
    ///
    /// Validation warnings are logged and do not block generation; fatal
    /// issues abort with [`ApplicationError::ValidationRejected`]. Render
    /// diagnostics never abort: affected files are returned unclean with
    /// their partial text.
    #[instrument(skip(self, ctx), fields(root = %root_id, request_id = %Uuid::new_v4()))]
    pub fn generate(
        &self,
        root_id: &TemplateId,
        ctx: &RenderContext,
    ) -> TrellisResult<GeneratedProject> {
        let chain = self.resolve(root_id)?;
        if chain.is_empty() {
            return Err(ApplicationError::EmptyChain.into());
        }
        debug!(levels = chain.len(), "chain resolved");

        let report = self.validator.validate_with_context(&chain, ctx);
        for issue in report.warnings() {
            warn!(code = ?issue.code, template = ?issue.template, "{}", issue.message);
        }
        if !report.is_valid() {
            let summary = report
                .fatal_issues()
                .map(|issue| issue.message.clone())
                .collect::<Vec<_>>()
                .join("; ");
            let causes = report
                .fatal_issues()
                .filter_map(|issue| issue.error.clone())
                .collect();
            return Err(ApplicationError::ValidationRejected { summary, causes }.into());
        }

        let effective = Composer::compose(&chain)?;

        // Parameter defaults seed the context; caller-provided values win.
        let mut render_ctx = RenderContext::new();
        for (name, default) in effective.parameter_defaults() {
            render_ctx.insert(name, default.clone());
        }
        for (name, value) in ctx.values() {
            render_ctx.insert(name.clone(), value.clone());
        }

        let mut files = Vec::with_capacity(effective.file_count());
        for merged in effective.content.values() {
            let outcome = self.renderer.render(&merged.unit.body, &render_ctx);
            if !outcome.success {
                warn!(
                    path = %merged.unit.path,
                    diagnostics = outcome.diagnostics.len(),
                    "file rendered with diagnostics"
                );
            }
            files.push(GeneratedFile {
                path: merged.unit.path.clone(),
                text: outcome.text,
                clean: outcome.success,
                diagnostics: outcome.diagnostics,
            });
        }

        info!(files = files.len(), "project generated");
        Ok(GeneratedProject {
            root: root_id.clone(),
            files,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::MockTemplateCatalog;
    use crate::domain::{ContentUnit, Parameter, ParameterKind, TemplateDefinition};

    fn single_template_catalog(def: TemplateDefinition) -> MockTemplateCatalog {
        let mut catalog = MockTemplateCatalog::new();
        let id = def.id.clone();
        {
            let def = def.clone();
            catalog
                .expect_get()
                .returning(move |wanted| Ok((*wanted == def.id).then(|| def.clone())));
        }
        {
            let def = def.clone();
            catalog.expect_get_version().returning(move |wanted, version| {
                Ok((*wanted == def.id && *version == def.version).then(|| def.clone()))
            });
        }
        catalog.expect_versions().returning(move |wanted| {
            Ok(if *wanted == id {
                vec![def.version.clone()]
            } else {
                Vec::new()
            })
        });
        catalog
    }

    #[test]
    fn generates_single_template_project() {
        let def = TemplateDefinition::builder()
            .id("app")
            .version_str("1.0.0")
            .unwrap()
            .file("README.md", "# {{name}}\n")
            .build()
            .unwrap();

        let service = GenerationService::new(Box::new(single_template_catalog(def)));
        let ctx = RenderContext::new().with_value("name", "demo");
        let project = service.generate(&"app".into(), &ctx).unwrap();

        assert!(project.is_clean());
        assert_eq!(project.files.len(), 1);
        assert_eq!(project.file("README.md").unwrap().text, "# demo\n");
    }

    #[test]
    fn parameter_defaults_seed_the_context() {
        let def = TemplateDefinition::builder()
            .id("app")
            .version_str("1.0.0")
            .unwrap()
            .parameter(Parameter::new("license", ParameterKind::String).with_default("MIT"))
            .file("LICENSE", "{{license}}")
            .build()
            .unwrap();

        let service = GenerationService::new(Box::new(single_template_catalog(def)));
        let project = service
            .generate(&"app".into(), &RenderContext::new())
            .unwrap();

        assert_eq!(project.file("LICENSE").unwrap().text, "MIT");
    }

    #[test]
    fn caller_values_override_defaults() {
        let def = TemplateDefinition::builder()
            .id("app")
            .version_str("1.0.0")
            .unwrap()
            .parameter(Parameter::new("license", ParameterKind::String).with_default("MIT"))
            .file("LICENSE", "{{license}}")
            .build()
            .unwrap();

        let service = GenerationService::new(Box::new(single_template_catalog(def)));
        let ctx = RenderContext::new().with_value("license", "Apache-2.0");
        let project = service.generate(&"app".into(), &ctx).unwrap();

        assert_eq!(project.file("LICENSE").unwrap().text, "Apache-2.0");
    }

    #[test]
    fn malformed_conditions_mark_file_unclean_but_do_not_abort() {
        let def = TemplateDefinition::builder()
            .id("app")
            .version_str("1.0.0")
            .unwrap()
            .content(ContentUnit::new(
                "main.rs",
                "before\n{{#if ==}}never{{#end}}after\n",
            ))
            .build()
            .unwrap();

        let service = GenerationService::new(Box::new(single_template_catalog(def)));
        let project = service
            .generate(&"app".into(), &RenderContext::new())
            .unwrap();

        let file = project.file("main.rs").unwrap();
        assert!(!file.clean);
        assert!(!file.diagnostics.is_empty());
        assert_eq!(file.text, "before\nafter\n");
        assert!(!project.is_clean());
    }

    #[test]
    fn validation_rejection_carries_structured_causes() {
        let base = TemplateDefinition::builder()
            .id("base")
            .version_str("1.0.0")
            .unwrap()
            .parameter(
                Parameter::new("edition", ParameterKind::String)
                    .with_default("2024")
                    .finalized(),
            )
            .build()
            .unwrap();
        let derived = TemplateDefinition::builder()
            .id("derived")
            .version_str("1.0.0")
            .unwrap()
            .depends_on("base", ">=1.0.0")
            .unwrap()
            .parameter(Parameter::new("edition", ParameterKind::String).with_default("2015"))
            .build()
            .unwrap();

        let mut by_id = std::collections::HashMap::new();
        by_id.insert(base.id.clone(), base);
        by_id.insert(derived.id.clone(), derived);

        let mut catalog = MockTemplateCatalog::new();
        {
            let by_id = by_id.clone();
            catalog
                .expect_get()
                .returning(move |id| Ok(by_id.get(id).cloned()));
        }
        {
            let by_id = by_id.clone();
            catalog.expect_get_version().returning(move |id, version| {
                Ok(by_id.get(id).filter(|d| d.version == *version).cloned())
            });
        }
        catalog.expect_versions().returning(move |id| {
            Ok(by_id
                .get(id)
                .map(|d| vec![d.version.clone()])
                .unwrap_or_default())
        });

        let service = GenerationService::new(Box::new(catalog));
        let err = service
            .generate(&"derived".into(), &RenderContext::new())
            .unwrap_err();

        match err {
            crate::error::TrellisError::Application(ApplicationError::ValidationRejected {
                summary,
                causes,
            }) => {
                assert!(summary.contains("edition"));
                assert_eq!(
                    causes,
                    vec![crate::domain::DomainError::ParameterLocked {
                        name: "edition".into(),
                        locked_by: "base".into(),
                        redeclared_by: "derived".into(),
                    }]
                );
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn unknown_root_is_unresolved() {
        let mut catalog = MockTemplateCatalog::new();
        catalog.expect_get().returning(|_| Ok(None));
        catalog.expect_versions().returning(|_| Ok(Vec::new()));

        let service = GenerationService::new(Box::new(catalog));
        let err = service
            .generate(&"missing".into(), &RenderContext::new())
            .unwrap_err();

        assert!(matches!(
            err,
            crate::error::TrellisError::Domain(
                crate::domain::DomainError::UnresolvedDependency { .. }
            )
        ));
    }
}
