//! Integration tests for trellis-core.
//!
//! These exercise the whole pipeline through the public API with a small
//! stub catalog, without pulling in trellis-adapters. End-to-end scenarios
//! over the real adapters live in that crate's own tests.

use std::collections::HashMap;

use semver::Version;
use trellis_core::{
    application::{ApplicationError, GenerationService, ports::TemplateCatalog},
    domain::{
        Composer, ContentUnit, DomainError, MergeStrategy, Parameter, ParameterKind,
        RenderContext, TemplateDefinition, TemplateId,
    },
    error::{TrellisError, TrellisResult},
};

/// Fixed in-memory catalog for tests. The production equivalent lives in
/// trellis-adapters; this one skips locking and validation on purpose.
struct StubCatalog {
    by_id: HashMap<TemplateId, Vec<TemplateDefinition>>,
}

impl StubCatalog {
    fn new(defs: Vec<TemplateDefinition>) -> Self {
        let mut by_id: HashMap<TemplateId, Vec<TemplateDefinition>> = HashMap::new();
        for def in defs {
            by_id.entry(def.id.clone()).or_default().push(def);
        }
        for versions in by_id.values_mut() {
            versions.sort_by(|a, b| a.version.cmp(&b.version));
        }
        Self { by_id }
    }
}

impl TemplateCatalog for StubCatalog {
    fn get(&self, id: &TemplateId) -> TrellisResult<Option<TemplateDefinition>> {
        Ok(self.by_id.get(id).and_then(|v| v.last()).cloned())
    }

    fn get_version(
        &self,
        id: &TemplateId,
        version: &Version,
    ) -> TrellisResult<Option<TemplateDefinition>> {
        Ok(self
            .by_id
            .get(id)
            .and_then(|v| v.iter().find(|d| d.version == *version))
            .cloned())
    }

    fn versions(&self, id: &TemplateId) -> TrellisResult<Vec<Version>> {
        Ok(self
            .by_id
            .get(id)
            .map(|v| v.iter().map(|d| d.version.clone()).collect())
            .unwrap_or_default())
    }
}

fn service(defs: Vec<TemplateDefinition>) -> GenerationService {
    GenerationService::new(Box::new(StubCatalog::new(defs)))
}

fn builder(id: &str, version: &str) -> trellis_core::domain::TemplateDefinitionBuilder {
    TemplateDefinition::builder()
        .id(id)
        .version_str(version)
        .unwrap()
}

#[test]
fn derived_template_overrides_base_content() {
    let base = builder("base", "1.0.0")
        .file("config.toml", "theme = \"dark\"\n")
        .file("README.md", "base readme\n")
        .build()
        .unwrap();
    let derived = builder("derived", "1.0.0")
        .depends_on("base", ">=1.0.0")
        .unwrap()
        .file("config.toml", "theme = \"light\"\n")
        .build()
        .unwrap();

    let project = service(vec![base, derived])
        .generate(&"derived".into(), &RenderContext::new())
        .unwrap();

    assert_eq!(project.files.len(), 2);
    assert_eq!(
        project.file("config.toml").unwrap().text,
        "theme = \"light\"\n"
    );
    assert_eq!(project.file("README.md").unwrap().text, "base readme\n");
}

#[test]
fn append_strategy_concatenates_in_chain_order() {
    let base = builder("base", "1.0.0")
        .content(ContentUnit::new(".gitignore", "line1").appendable())
        .build()
        .unwrap();
    let derived = builder("derived", "1.0.0")
        .depends_on("base", ">=1.0.0")
        .unwrap()
        .content(ContentUnit::new(".gitignore", "line2").appendable())
        .build()
        .unwrap();

    let project = service(vec![base, derived])
        .generate(&"derived".into(), &RenderContext::new())
        .unwrap();

    assert_eq!(project.file(".gitignore").unwrap().text, "line1\nline2");
}

#[test]
fn conditional_rendering_follows_context() {
    let template = builder("app", "1.0.0")
        .file(
            "main.rs",
            "{{#if features.auth}}mod auth;\n{{#else}}// no auth\n{{#end}}fn main() {}\n",
        )
        .build()
        .unwrap();

    let svc = service(vec![template]);

    let with_auth = RenderContext::new().with_value(
        "features",
        trellis_core::domain::ContextValue::Map(
            [("auth".to_string(), true.into())].into_iter().collect(),
        ),
    );
    let project = svc.generate(&"app".into(), &with_auth).unwrap();
    assert_eq!(
        project.file("main.rs").unwrap().text,
        "mod auth;\nfn main() {}\n"
    );

    let without = svc.generate(&"app".into(), &RenderContext::new()).unwrap();
    assert!(project.file("main.rs").unwrap().clean);
    assert_eq!(
        without.file("main.rs").unwrap().text,
        "// no auth\nfn main() {}\n"
    );
}

#[test]
fn version_arbitration_picks_highest_compatible() {
    let shared_15 = builder("shared", "1.5.0")
        .file("shared.txt", "v1.5.0")
        .build()
        .unwrap();
    let shared_20 = builder("shared", "2.0.0")
        .file("shared.txt", "v2.0.0")
        .build()
        .unwrap();
    let left = builder("left", "1.0.0")
        .depends_on("shared", ">=1.0.0, <2.0.0")
        .unwrap()
        .build()
        .unwrap();
    let right = builder("right", "1.0.0")
        .depends_on("shared", ">=1.5.0")
        .unwrap()
        .build()
        .unwrap();
    let top = builder("top", "1.0.0")
        .depends_on("left", ">=1.0.0")
        .unwrap()
        .depends_on("right", ">=1.0.0")
        .unwrap()
        .build()
        .unwrap();

    let project = service(vec![shared_15, shared_20, left, right, top])
        .generate(&"top".into(), &RenderContext::new())
        .unwrap();

    assert_eq!(project.file("shared.txt").unwrap().text, "v1.5.0");
}

#[test]
fn disjoint_version_requirements_fail_resolution() {
    let shared = builder("shared", "1.5.0").build().unwrap();
    let left = builder("left", "1.0.0")
        .depends_on("shared", ">=2.0.0")
        .unwrap()
        .build()
        .unwrap();
    let right = builder("right", "1.0.0")
        .depends_on("shared", "<2.0.0")
        .unwrap()
        .build()
        .unwrap();
    let top = builder("top", "1.0.0")
        .depends_on("left", ">=1.0.0")
        .unwrap()
        .depends_on("right", ">=1.0.0")
        .unwrap()
        .build()
        .unwrap();

    let err = service(vec![shared, left, right, top])
        .generate(&"top".into(), &RenderContext::new())
        .unwrap_err();

    assert!(matches!(
        err,
        TrellisError::Domain(DomainError::VersionConflict { .. })
    ));
}

#[test]
fn dependency_cycles_are_rejected() {
    let a = builder("a", "1.0.0")
        .depends_on("b", ">=1.0.0")
        .unwrap()
        .build()
        .unwrap();
    let b = builder("b", "1.0.0")
        .depends_on("a", ">=1.0.0")
        .unwrap()
        .build()
        .unwrap();

    let err = service(vec![a, b])
        .generate(&"a".into(), &RenderContext::new())
        .unwrap_err();

    assert!(matches!(
        err,
        TrellisError::Domain(DomainError::CyclicDependency { .. })
    ));
}

#[test]
fn final_parameter_blocks_redeclaration() {
    let base = builder("base", "1.0.0")
        .parameter(
            Parameter::new("edition", ParameterKind::String)
                .with_default("2024")
                .finalized(),
        )
        .build()
        .unwrap();
    let derived = builder("derived", "1.0.0")
        .depends_on("base", ">=1.0.0")
        .unwrap()
        .parameter(Parameter::new("edition", ParameterKind::String).with_default("2015"))
        .build()
        .unwrap();

    let err = service(vec![base, derived])
        .generate(&"derived".into(), &RenderContext::new())
        .unwrap_err();

    match err {
        TrellisError::Application(ApplicationError::ValidationRejected { summary, causes }) => {
            assert!(summary.contains("edition"));
            assert_eq!(
                causes,
                vec![DomainError::ParameterLocked {
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
fn composition_is_deterministic() {
    let base = builder("base", "1.0.0")
        .file("a.txt", "a")
        .parameter(Parameter::new("color", ParameterKind::String).with_default("red"))
        .build()
        .unwrap();
    let derived = builder("derived", "1.0.0")
        .depends_on("base", ">=1.0.0")
        .unwrap()
        .file("b.txt", "b")
        .parameter(Parameter::new("color", ParameterKind::String).with_default("green"))
        .build()
        .unwrap();

    let svc = service(vec![base, derived]);
    let first = svc.compose_for(&"derived".into()).unwrap();
    let second = svc.compose_for(&"derived".into()).unwrap();

    assert_eq!(first, second);
    assert_eq!(
        first.parameter("color").unwrap().parameter.default,
        Some("green".into())
    );
}

#[test]
fn malformed_conditions_soft_fail_per_file() {
    let template = builder("app", "1.0.0")
        .file("good.txt", "fine\n")
        .file("bad.txt", "x{{#if and and}}y{{#end}}z")
        .build()
        .unwrap();

    let project = service(vec![template])
        .generate(&"app".into(), &RenderContext::new())
        .unwrap();

    assert!(project.file("good.txt").unwrap().clean);
    let bad = project.file("bad.txt").unwrap();
    assert!(!bad.clean);
    assert_eq!(bad.text, "xz");
}

#[test]
fn compose_directly_over_a_hand_built_chain() {
    // Composer is usable without the service for callers that already hold
    // a chain.
    let base = builder("base", "1.0.0")
        .content(ContentUnit::new("notes.md", "base").appendable())
        .build()
        .unwrap();
    let derived = builder("derived", "1.0.0")
        .depends_on("base", ">=1.0.0")
        .unwrap()
        .content(ContentUnit::new("notes.md", "derived").appendable())
        .build()
        .unwrap();

    let mut chain = trellis_core::domain::InheritanceChain::new();
    chain.push(base);
    chain.push(derived);

    let effective = Composer::compose(&chain).unwrap();
    let merged = effective.content_unit("notes.md").unwrap();
    assert_eq!(merged.unit.body, "base\nderived");
    assert_eq!(merged.unit.merge, MergeStrategy::Append);
    assert_eq!(merged.contributors.len(), 2);
    assert!(effective.parameter("missing").is_none());
}
