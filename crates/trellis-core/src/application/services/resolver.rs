//! Dependency resolver: builds an inheritance chain from a root template id.
//!
//! Depth-first walk through declared dependencies, fetching definitions from
//! the [`TemplateCatalog`] port. Three concerns are interleaved:
//!
//! 1. **Cycle detection**: a visiting set (the current DFS stack) catches
//!    direct and transitive self-reference; the error carries the full cycle
//!    path for the author.
//! 2. **Topological ordering**: post-order DFS emits dependencies before
//!    dependents, ties broken by declaration order inside each template.
//!    Depth then falls out as the chain index.
//! 3. **Version arbitration**: every requirement seen for an id across all
//!    paths is accumulated; the highest catalog version satisfying all of
//!    them wins. No such version is a `VersionConflict`.
//!
//! The walk uses the catalog's highest version of each template for
//! discovering dependencies, then re-fetches a specific version when
//! arbitration settles on an older one. The closing `verify()` guards the
//! rare case where the settled version declares different dependencies than
//! the walked one.
//!
//! Deterministic: the same catalog state always yields the same chain.

use std::collections::HashMap;

use semver::VersionReq;
use tracing::{debug, instrument};

use crate::application::{error::ApplicationError, ports::TemplateCatalog};
use crate::domain::{DomainError, InheritanceChain, TemplateDefinition, TemplateId};
use crate::error::TrellisResult;

/// Resolves a root template id into an ordered inheritance chain.
pub struct DependencyResolver<'a> {
    catalog: &'a dyn TemplateCatalog,
}

impl<'a> DependencyResolver<'a> {
    pub fn new(catalog: &'a dyn TemplateCatalog) -> Self {
        Self { catalog }
    }

    /// Resolve the full dependency closure of `root_id`.
    ///
    /// # Errors
    ///
    /// - `CyclicDependency` on direct or transitive self-reference
    /// - `UnresolvedDependency` when the catalog lacks a referenced id
    /// - `VersionConflict` when no available version satisfies all
    ///   accumulated requirements for an id
    #[instrument(skip(self), fields(root = %root_id))]
    pub fn resolve(&self, root_id: &TemplateId) -> TrellisResult<InheritanceChain> {
        let mut walk = Walk {
            catalog: self.catalog,
            visiting: Vec::new(),
            order: Vec::new(),
            constraints: HashMap::new(),
            definitions: HashMap::new(),
        };
        walk.visit(root_id, None)?;

        let mut chain = InheritanceChain::new();
        let order = std::mem::take(&mut walk.order);
        for id in &order {
            let definition = self.arbitrate(id, &mut walk)?;
            debug!(template = %definition.display_id(), depth = chain.len(), "chain level");
            chain.push(definition);
        }

        // Re-fetched versions may declare a different dependency set than
        // the one the walk saw; verify catches that before composition does.
        chain.verify()?;
        Ok(chain)
    }

    /// Pick the version of `id` that enters the chain.
    fn arbitrate(&self, id: &TemplateId, walk: &mut Walk<'_>) -> TrellisResult<TemplateDefinition> {
        let walked = walk.definitions.remove(id).ok_or_else(|| {
            ApplicationError::CatalogAccess {
                reason: format!("walked template '{id}' vanished during resolution"),
            }
        })?;

        let Some(requirements) = walk.constraints.get(id).filter(|r| !r.is_empty()) else {
            // The root: nothing constrains it, the highest version stands.
            return Ok(walked);
        };

        let available = self.catalog.versions(id)?;
        let chosen = available
            .iter()
            .rev()
            .find(|v| requirements.iter().all(|req| req.matches(v)));

        let Some(chosen) = chosen else {
            return Err(DomainError::VersionConflict {
                id: id.clone(),
                requirements: requirements.iter().map(ToString::to_string).collect(),
            }
            .into());
        };

        if *chosen == walked.version {
            return Ok(walked);
        }

        debug!(template = %id, version = %chosen, "arbitration settled below latest");
        self.catalog.get_version(id, chosen)?.ok_or_else(|| {
            ApplicationError::CatalogAccess {
                reason: format!("version {chosen} of '{id}' is listed but not retrievable"),
            }
            .into()
        })
    }
}

/// Mutable state of one DFS walk.
struct Walk<'a> {
    catalog: &'a dyn TemplateCatalog,
    /// Current DFS stack, for cycle detection and cycle-path reporting.
    visiting: Vec<TemplateId>,
    /// Post-order: dependencies before dependents.
    order: Vec<TemplateId>,
    /// Every requirement seen per id, across all paths.
    constraints: HashMap<TemplateId, Vec<VersionReq>>,
    /// Walked definitions (highest version per id).
    definitions: HashMap<TemplateId, TemplateDefinition>,
}

impl Walk<'_> {
    fn visit(&mut self, id: &TemplateId, required_by: Option<&TemplateId>) -> TrellisResult<()> {
        if self.definitions.contains_key(id) {
            // Already resolved via another path; the caller recorded its
            // constraint before descending.
            return Ok(());
        }

        if let Some(position) = self.visiting.iter().position(|v| v == id) {
            let mut cycle = self.visiting[position..].to_vec();
            cycle.push(id.clone());
            return Err(DomainError::CyclicDependency { cycle }.into());
        }

        let definition = self.catalog.get(id)?.ok_or_else(|| {
            DomainError::UnresolvedDependency {
                id: id.clone(),
                required_by: required_by.cloned().unwrap_or_else(|| id.clone()),
            }
        })?;

        self.visiting.push(id.clone());
        for dep in &definition.dependencies {
            self.constraints
                .entry(dep.id.clone())
                .or_default()
                .push(dep.requirement.clone());
            self.visit(&dep.id, Some(id))?;
        }
        self.visiting.pop();

        self.order.push(id.clone());
        self.definitions.insert(id.clone(), definition);
        Ok(())
    }
}
