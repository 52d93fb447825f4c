//! Parent -> children index over the concept taxonomy
//!
//! Built once per graph by scanning concepts and grouping them by
//! `parent_id`. Front ends expand the taxonomy lazily by asking for the
//! children of one concept at a time instead of rescanning every concept.

use std::collections::{BTreeMap, HashSet};

use super::entity::ConceptId;
use super::graph::KnowledgeGraph;

/// Children of every parent concept, in graph order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HierarchyIndex {
    children: BTreeMap<ConceptId, Vec<ConceptId>>,
    roots: Vec<ConceptId>,
}

/// A concept visited by [`HierarchyIndex::walk`], with its distance from the start
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HierarchyEntry {
    pub concept_id: ConceptId,
    pub level: u32,
}

impl HierarchyIndex {
    /// Build the index for a graph
    ///
    /// Grouping follows each concept's `parent_id`, so a child whose parent
    /// row is missing still appears under that parent id.
    pub fn build(graph: &KnowledgeGraph) -> Self {
        let mut index = Self::default();
        for node in graph.concepts() {
            let concept = &node.concept;
            if concept.parent_id > 0 {
                let siblings = index.children.entry(concept.parent_id).or_default();
                if !siblings.contains(&concept.id) {
                    siblings.push(concept.id);
                }
            } else {
                index.roots.push(concept.id);
            }
        }
        index
    }

    /// Concepts without a parent, in graph order
    pub fn roots(&self) -> &[ConceptId] {
        &self.roots
    }

    /// Direct children of a concept, in graph order
    pub fn children_of(&self, parent: ConceptId) -> &[ConceptId] {
        self.children.get(&parent).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Whether expanding this concept would show anything
    pub fn has_children(&self, parent: ConceptId) -> bool {
        !self.children_of(parent).is_empty()
    }

    /// The whole `parent -> children` map
    pub fn as_map(&self) -> &BTreeMap<ConceptId, Vec<ConceptId>> {
        &self.children
    }

    /// Pre-order walk below `start` (or below every root when `None`)
    ///
    /// Levels deeper than `max_depth` are not expanded. Each concept is
    /// emitted at most once even if parent links loop.
    pub fn walk(&self, start: Option<ConceptId>, max_depth: Option<u32>) -> Vec<HierarchyEntry> {
        let mut out = Vec::new();
        let mut visited = HashSet::new();
        let mut stack: Vec<HierarchyEntry> = match start {
            Some(id) => vec![HierarchyEntry { concept_id: id, level: 0 }],
            None => self
                .roots
                .iter()
                .rev()
                .map(|&id| HierarchyEntry { concept_id: id, level: 0 })
                .collect(),
        };

        while let Some(entry) = stack.pop() {
            if !visited.insert(entry.concept_id) {
                continue;
            }
            out.push(entry);
            if max_depth.is_some_and(|max| entry.level >= max) {
                continue;
            }
            for &child in self.children_of(entry.concept_id).iter().rev() {
                if !visited.contains(&child) {
                    stack.push(HierarchyEntry {
                        concept_id: child,
                        level: entry.level + 1,
                    });
                }
            }
        }

        out
    }
}

/// Convenience wrapper: the `parent -> children` map of a graph
pub fn children_of(graph: &KnowledgeGraph) -> BTreeMap<ConceptId, Vec<ConceptId>> {
    HierarchyIndex::build(graph).children
}
