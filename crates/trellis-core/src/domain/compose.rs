//! Composition engine: folds an inheritance chain into one effective
//! template.
//!
//! A pure, side-effect-free fold, base → most-derived. The same chain always
//! composes into a structurally equal [`EffectiveTemplate`]; nothing here
//! touches the catalog or any other collaborator.
//!
//! ## Merge rules
//!
//! - **Parameters:** the derived declaration wins, unless the accumulated
//!   entry is `Final` (→ `ParameterLocked`). Kind mismatches across levels
//!   are always an error (→ `ParameterTypeConflict`).
//! - **Content:** same path is overridden by the more-derived node, unless
//!   the accumulated unit is `Append`; then the derived body is
//!   concatenated after it with one separating newline, in chain order, and
//!   the entry stays `Append` so deeper levels keep accumulating.
//! - **Dependencies:** de-duplicated by id. Every requirement seen for an id
//!   across the chain must hold against the version the chain actually
//!   carries (→ `VersionConflict` otherwise). The arbitration over available
//!   versions happened in the resolver; this fold re-verifies its result.

use std::collections::BTreeMap;

use tracing::debug;

use crate::domain::{
    entities::{
        chain::InheritanceChain,
        effective::{EffectiveTemplate, MergedContent, MergedParameter, ResolvedDependency},
        template::{MergeStrategy, TemplateId},
    },
    error::DomainError,
};

/// The composition fold. Stateless; all inputs arrive per call.
pub struct Composer;

impl Composer {
    /// Fold a chain into its effective template.
    ///
    /// # Errors
    ///
    /// - `InvalidChain` if the chain is empty or violates its ordering
    ///   invariants
    /// - `ParameterLocked` / `ParameterTypeConflict` on parameter merge
    ///   conflicts
    /// - `VersionConflict` if a chain version fails an accumulated
    ///   requirement
    pub fn compose(chain: &InheritanceChain) -> Result<EffectiveTemplate, DomainError> {
        chain.verify()?;

        let mut parameters: BTreeMap<String, MergedParameter> = BTreeMap::new();
        let mut content: BTreeMap<String, MergedContent> = BTreeMap::new();
        let mut requirements: BTreeMap<TemplateId, Vec<semver::VersionReq>> = BTreeMap::new();
        let mut dependency_order: Vec<TemplateId> = Vec::new();

        for node in chain.iter() {
            let id = &node.definition.id;

            // ── Parameter merge ──────────────────────────────────────────
            for param in &node.definition.parameters {
                match parameters.get(&param.name) {
                    None => {
                        parameters.insert(
                            param.name.clone(),
                            MergedParameter {
                                parameter: param.clone(),
                                defined_by: id.clone(),
                                depth: node.depth,
                            },
                        );
                    }
                    Some(existing) => {
                        if existing.parameter.finality.is_final() {
                            return Err(DomainError::ParameterLocked {
                                name: param.name.clone(),
                                locked_by: existing.defined_by.clone(),
                                redeclared_by: id.clone(),
                            });
                        }
                        if existing.parameter.kind != param.kind {
                            return Err(DomainError::ParameterTypeConflict {
                                name: param.name.clone(),
                                expected: existing.parameter.kind,
                                found: param.kind,
                                declared_by: existing.defined_by.clone(),
                                redeclared_by: id.clone(),
                            });
                        }
                        let previous = existing.defined_by.clone();
                        debug!(
                            parameter = %param.name,
                            overridden = %previous,
                            by = %id,
                            "parameter override"
                        );
                        parameters.insert(
                            param.name.clone(),
                            MergedParameter {
                                parameter: param.clone(),
                                defined_by: id.clone(),
                                depth: node.depth,
                            },
                        );
                    }
                }
            }

            // ── Content merge ────────────────────────────────────────────
            for unit in &node.definition.content {
                let key = unit.path.as_str().to_string();
                match content.get_mut(&key) {
                    None => {
                        content.insert(
                            key,
                            MergedContent {
                                unit: unit.clone(),
                                contributors: vec![id.clone()],
                            },
                        );
                    }
                    Some(existing) if existing.unit.merge == MergeStrategy::Append => {
                        existing.unit.body.push('\n');
                        existing.unit.body.push_str(&unit.body);
                        existing.contributors.push(id.clone());
                    }
                    Some(existing) => {
                        debug!(path = %key, overridden = %existing.contributors[0], by = %id, "content override");
                        *existing = MergedContent {
                            unit: unit.clone(),
                            contributors: vec![id.clone()],
                        };
                    }
                }
            }

            // ── Dependency accumulation ──────────────────────────────────
            for dep in &node.definition.dependencies {
                let entry = requirements.entry(dep.id.clone()).or_default();
                if entry.is_empty() {
                    dependency_order.push(dep.id.clone());
                }
                entry.push(dep.requirement.clone());
            }
        }

        // ── Dependency verification ──────────────────────────────────────
        let mut dependencies = Vec::with_capacity(dependency_order.len());
        for dep_id in dependency_order {
            let reqs = requirements.remove(&dep_id).unwrap_or_default();
            let node = chain.get(&dep_id).ok_or_else(|| {
                DomainError::InvalidChain(format!("dependency '{dep_id}' missing from chain"))
            })?;
            let version = &node.definition.version;
            if let Some(unsatisfied) = reqs.iter().find(|req| !req.matches(version)) {
                debug!(id = %dep_id, %version, requirement = %unsatisfied, "version conflict");
                return Err(DomainError::VersionConflict {
                    id: dep_id,
                    requirements: reqs.iter().map(ToString::to_string).collect(),
                });
            }
            dependencies.push(ResolvedDependency {
                id: dep_id,
                version: version.clone(),
                requirements: reqs,
            });
        }

        // verify() guarantees a non-empty chain, so the leaf exists.
        let leaf = chain
            .leaf()
            .ok_or_else(|| DomainError::InvalidChain("chain is empty".into()))?;

        Ok(EffectiveTemplate {
            root: leaf.definition.id.clone(),
            version: leaf.definition.version.clone(),
            parameters,
            content,
            dependencies,
        })
    }
}
