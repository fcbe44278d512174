//! Inheritance chain: the resolved, ordered dependency closure of a root
//! template.
//!
//! ## Why an arena, not parent links
//!
//! A parent *reference* on each node would model a structure that can go
//! cyclic and fights the borrow checker. Instead the chain is a flat,
//! append-only sequence where a node stores only its integer depth and its
//! parent's array index. The structural invariants become trivial array
//! checks:
//!
//! - no duplicate template id
//! - `node[i].depth == i` (depth increases by exactly 1 along the sequence)
//! - `node[i].parent == Some(i - 1)` for `i > 0`, `None` at the base
//! - every node's dependencies appear at lower indices
//!
//! Nodes are created by the resolver, consumed by composition and
//! validation, and discarded after generation.

use std::collections::HashSet;

use crate::domain::{
    entities::template::{TemplateDefinition, TemplateId},
    error::DomainError,
};

/// One level of an inheritance chain.
#[derive(Debug, Clone, PartialEq)]
pub struct InheritanceNode {
    pub definition: TemplateDefinition,
    /// Distance from the base of the chain. 0 = base.
    pub depth: usize,
    /// Index of the previous node in the chain, `None` at the base.
    pub parent: Option<usize>,
}

/// Ordered sequence of inheritance nodes, base first, most-derived last.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct InheritanceChain {
    nodes: Vec<InheritanceNode>,
}

impl InheritanceChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a definition as the next (most-derived) level.
    ///
    /// Depth and parent index are assigned from the current length, so the
    /// chain can only ever grow in valid shape. Returns the new node's index.
    pub fn push(&mut self, definition: TemplateDefinition) -> usize {
        let index = self.nodes.len();
        self.nodes.push(InheritanceNode {
            definition,
            depth: index,
            parent: index.checked_sub(1),
        });
        index
    }

    pub fn nodes(&self) -> &[InheritanceNode] {
        &self.nodes
    }

    pub fn iter(&self) -> impl Iterator<Item = &InheritanceNode> {
        self.nodes.iter()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The base (depth 0) node.
    pub fn base(&self) -> Option<&InheritanceNode> {
        self.nodes.first()
    }

    /// The most-derived node; the root template the caller asked for.
    pub fn leaf(&self) -> Option<&InheritanceNode> {
        self.nodes.last()
    }

    /// Find a node by template id.
    pub fn get(&self, id: &TemplateId) -> Option<&InheritanceNode> {
        self.nodes.iter().find(|n| n.definition.id == *id)
    }

    pub fn contains(&self, id: &TemplateId) -> bool {
        self.get(id).is_some()
    }

    /// Check every structural invariant.
    ///
    /// The resolver produces chains that satisfy these by construction; this
    /// re-check exists so hand-built chains (tests, manifests replayed from
    /// disk) cannot smuggle a malformed sequence into composition.
    pub fn verify(&self) -> Result<(), DomainError> {
        if self.nodes.is_empty() {
            return Err(DomainError::InvalidChain("chain is empty".into()));
        }

        let mut seen = HashSet::new();
        for (index, node) in self.nodes.iter().enumerate() {
            if !seen.insert(node.definition.id.clone()) {
                return Err(DomainError::InvalidChain(format!(
                    "duplicate template '{}' at depth {}",
                    node.definition.id, index
                )));
            }
            if node.depth != index {
                return Err(DomainError::InvalidChain(format!(
                    "node '{}' has depth {} at index {}",
                    node.definition.id, node.depth, index
                )));
            }
            if node.parent != index.checked_sub(1) {
                return Err(DomainError::InvalidChain(format!(
                    "node '{}' has a broken parent link",
                    node.definition.id
                )));
            }
            // Dependencies must have been flattened in before this node.
            for dep in &node.definition.dependencies {
                let earlier = self.nodes[..index]
                    .iter()
                    .any(|n| n.definition.id == dep.id);
                if !earlier {
                    return Err(DomainError::InvalidChain(format!(
                        "'{}' depends on '{}', which does not precede it",
                        node.definition.id, dep.id
                    )));
                }
            }
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a InheritanceChain {
    type Item = &'a InheritanceNode;
    type IntoIter = std::slice::Iter<'a, InheritanceNode>;

    fn into_iter(self) -> Self::IntoIter {
        self.nodes.iter()
    }
}
