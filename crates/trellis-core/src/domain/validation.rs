//! Inheritance validation: static checks over a resolved chain.
//!
//! The validator never mutates anything and never aborts on the first
//! finding; it collects every issue so a template author sees the whole
//! picture at once. Each issue carries a severity:
//!
//! - `Warning`: a resolution strategy exists (e.g. a derived template
//!   shadowing a base file; override semantics will apply)
//! - `Fatal`: composition would fail or produce nonsense (locked parameter
//!   redeclared, incompatible platforms, depth blown)
//!
//! `ValidationResult::is_valid` is true iff no fatal issue was found.

use std::collections::{BTreeMap, HashSet};

use crate::domain::{
    entities::{
        chain::InheritanceChain,
        template::{Finality, MergeStrategy, ParameterKind, TemplateId},
    },
    error::DomainError,
    render::RenderContext,
};

/// How bad a validation finding is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Fatal,
}

/// Stable machine-readable discriminant for a finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueCode {
    DepthExceeded,
    PlatformIncompatible,
    FrameworkIncompatible,
    DuplicateId,
    BrokenChain,
    ContentShadowed,
    ParameterShadowed,
    ParameterLocked,
    ParameterTypeConflict,
    MissingParameterValue,
}

/// One validation finding.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationIssue {
    pub severity: Severity,
    pub code: IssueCode,
    /// The template the finding points at, when there is a single culprit.
    pub template: Option<TemplateId>,
    pub message: String,
    /// Structured form of the finding, for findings that map onto a
    /// [`DomainError`] variant. Callers that abort on fatal issues surface
    /// this instead of re-parsing the message.
    pub error: Option<DomainError>,
}

impl ValidationIssue {
    fn fatal(code: IssueCode, template: Option<TemplateId>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Fatal,
            code,
            template,
            message: message.into(),
            error: None,
        }
    }

    /// A fatal issue whose message and structured form come from one
    /// `DomainError`.
    fn fatal_because(code: IssueCode, template: Option<TemplateId>, error: DomainError) -> Self {
        Self {
            severity: Severity::Fatal,
            code,
            template,
            message: error.to_string(),
            error: Some(error),
        }
    }

    fn warning(code: IssueCode, template: Option<TemplateId>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            code,
            template,
            message: message.into(),
            error: None,
        }
    }
}

/// Outcome of validating a chain.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ValidationResult {
    pub issues: Vec<ValidationIssue>,
}

impl ValidationResult {
    /// True iff no fatal issue was found. Warnings do not invalidate.
    pub fn is_valid(&self) -> bool {
        !self.issues.iter().any(|i| i.severity == Severity::Fatal)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter().filter(|i| i.severity == Severity::Warning)
    }

    pub fn fatal_issues(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter().filter(|i| i.severity == Severity::Fatal)
    }
}

/// Validator configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidatorConfig {
    /// Maximum chain length. Deep chains are almost always an authoring
    /// accident, and every level multiplies merge surface.
    pub max_depth: usize,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self { max_depth: 8 }
    }
}

/// Static checker for resolved inheritance chains.
#[derive(Debug, Clone, Default)]
pub struct InheritanceValidator {
    config: ValidatorConfig,
}

impl InheritanceValidator {
    pub fn new(config: ValidatorConfig) -> Self {
        Self { config }
    }

    /// Validate a chain's structure and composition prospects.
    pub fn validate(&self, chain: &InheritanceChain) -> ValidationResult {
        let mut issues = Vec::new();

        self.check_structure(chain, &mut issues);
        self.check_compatibility(chain, &mut issues);
        self.check_composition(chain, &mut issues);

        ValidationResult { issues }
    }

    /// Like [`validate`](Self::validate), additionally checking that every
    /// required parameter without a default has a context value.
    pub fn validate_with_context(
        &self,
        chain: &InheritanceChain,
        ctx: &RenderContext,
    ) -> ValidationResult {
        let mut result = self.validate(chain);

        for node in chain.iter() {
            for param in &node.definition.parameters {
                if param.required && param.default.is_none() && ctx.get(&param.name).is_none() {
                    result.issues.push(ValidationIssue::warning(
                        IssueCode::MissingParameterValue,
                        Some(node.definition.id.clone()),
                        format!(
                            "required parameter '{}' has no default and no context value; placeholders will render empty",
                            param.name
                        ),
                    ));
                }
            }
        }

        result
    }

    // -------------------------------------------------------------------------
    // Internal Checks
    // -------------------------------------------------------------------------

    fn check_structure(&self, chain: &InheritanceChain, issues: &mut Vec<ValidationIssue>) {
        if chain.is_empty() {
            issues.push(ValidationIssue::fatal(
                IssueCode::BrokenChain,
                None,
                "chain is empty",
            ));
            return;
        }

        if chain.len() > self.config.max_depth {
            issues.push(ValidationIssue::fatal_because(
                IssueCode::DepthExceeded,
                chain.leaf().map(|n| n.definition.id.clone()),
                DomainError::DepthExceeded {
                    depth: chain.len(),
                    max: self.config.max_depth,
                },
            ));
        }

        // Defensive re-check: the resolver cannot produce duplicates, but
        // chains can also arrive hand-built.
        let mut seen = HashSet::new();
        for node in chain.iter() {
            if !seen.insert(node.definition.id.clone()) {
                issues.push(ValidationIssue::fatal(
                    IssueCode::DuplicateId,
                    Some(node.definition.id.clone()),
                    format!("template '{}' appears twice in the chain", node.definition.id),
                ));
            }
        }

        if let Err(e) = chain.verify() {
            issues.push(ValidationIssue::fatal_because(IssueCode::BrokenChain, None, e));
        }
    }

    fn check_compatibility(&self, chain: &InheritanceChain, issues: &mut Vec<ValidationIssue>) {
        // First concrete constraint wins; every later one must agree with it.
        let mut platform_owner = None;
        let mut framework_owner = None;

        for node in chain.iter() {
            if let Some(platform) = node.definition.platform {
                match platform_owner {
                    None => platform_owner = Some((node.definition.id.clone(), platform)),
                    Some((ref owner, first)) if !first.compatible_with(platform) => {
                        issues.push(ValidationIssue::fatal_because(
                            IssueCode::PlatformIncompatible,
                            Some(node.definition.id.clone()),
                            DomainError::PlatformIncompatible {
                                first: owner.clone(),
                                second: node.definition.id.clone(),
                                reason: format!("targets {first} vs {platform}"),
                            },
                        ));
                    }
                    Some(_) => {}
                }
            }
            if let Some(framework) = node.definition.framework {
                match framework_owner {
                    None => framework_owner = Some((node.definition.id.clone(), framework)),
                    Some((ref owner, first)) if !first.compatible_with(framework) => {
                        issues.push(ValidationIssue::fatal(
                            IssueCode::FrameworkIncompatible,
                            Some(node.definition.id.clone()),
                            format!(
                                "'{}' generates for {} but '{}' generates for {}",
                                owner, first, node.definition.id, framework
                            ),
                        ));
                    }
                    Some(_) => {}
                }
            }
        }
    }

    /// Dry-run of the composition fold, reporting conflicts instead of
    /// failing on the first one.
    fn check_composition(&self, chain: &InheritanceChain, issues: &mut Vec<ValidationIssue>) {
        let mut params: BTreeMap<&str, (&TemplateId, Finality, ParameterKind)> = BTreeMap::new();
        let mut content: BTreeMap<&str, (&TemplateId, MergeStrategy)> = BTreeMap::new();

        for node in chain.iter() {
            let id = &node.definition.id;

            for param in &node.definition.parameters {
                match params.get(param.name.as_str()) {
                    None => {
                        params.insert(
                            param.name.as_str(),
                            (id, param.finality, param.kind),
                        );
                    }
                    Some(&(owner, finality, kind)) => {
                        if finality.is_final() {
                            issues.push(ValidationIssue::fatal_because(
                                IssueCode::ParameterLocked,
                                Some(id.clone()),
                                DomainError::ParameterLocked {
                                    name: param.name.clone(),
                                    locked_by: owner.clone(),
                                    redeclared_by: id.clone(),
                                },
                            ));
                        } else if kind != param.kind {
                            issues.push(ValidationIssue::fatal_because(
                                IssueCode::ParameterTypeConflict,
                                Some(id.clone()),
                                DomainError::ParameterTypeConflict {
                                    name: param.name.clone(),
                                    expected: kind,
                                    found: param.kind,
                                    declared_by: owner.clone(),
                                    redeclared_by: id.clone(),
                                },
                            ));
                        } else {
                            // Override semantics resolve this; just flag it.
                            issues.push(ValidationIssue::warning(
                                IssueCode::ParameterShadowed,
                                Some(id.clone()),
                                format!(
                                    "parameter '{}' from '{}' is overridden by '{}'",
                                    param.name, owner, id
                                ),
                            ));
                            params.insert(param.name.as_str(), (id, param.finality, param.kind));
                        }
                    }
                }
            }

            for unit in &node.definition.content {
                match content.get(unit.path.as_str()) {
                    None => {
                        content.insert(unit.path.as_str(), (id, unit.merge));
                    }
                    Some(&(_, MergeStrategy::Append)) => {
                        // Declared accumulation point: appending is the plan,
                        // not a conflict.
                    }
                    Some(&(owner, MergeStrategy::Override)) => {
                        issues.push(ValidationIssue::warning(
                            IssueCode::ContentShadowed,
                            Some(id.clone()),
                            format!(
                                "'{}' from '{}' is overridden by '{}'",
                                unit.path, owner, id
                            ),
                        ));
                        content.insert(unit.path.as_str(), (id, unit.merge));
                    }
                }
            }
        }
    }
}
