//! The in-memory knowledge graph container
//!
//! [`KnowledgeGraph`] wraps a petgraph `DiGraph` together with a key index so
//! nodes can be addressed as `conc_{id}` / `case_{id}` instead of raw
//! indices. Mutation is crate-private: a graph is filled once by the
//! builder (or the snapshot loader, or the subgraph extractor) and is
//! read-only afterwards.

use std::collections::HashMap;

use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;

use super::entity::{CaseId, ConceptCode, ConceptId, ConceptNode, GraphNode, NodeKey};
use super::relationship::{GraphEdge, Relation};

/// Directed graph of concept and case nodes joined by IS-A and CASE-OF edges
#[derive(Debug, Clone, Default)]
pub struct KnowledgeGraph {
    graph: DiGraph<GraphNode, Relation>,
    index: HashMap<NodeKey, NodeIndex>,
}

impl KnowledgeGraph {
    /// Create an empty graph
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    // ========== Mutation (crate-private) ==========

    /// Insert a node, or overwrite the weight of the node with the same key
    ///
    /// An overwritten node keeps its position, so iteration order stays the
    /// order in which keys were first seen.
    pub(crate) fn upsert_node(&mut self, node: GraphNode) -> NodeIndex {
        let key = node.key();
        match self.index.get(&key) {
            Some(&idx) => {
                self.graph[idx] = node;
                idx
            }
            None => {
                let idx = self.graph.add_node(node);
                self.index.insert(key, idx);
                idx
            }
        }
    }

    /// Add an edge between two existing nodes
    ///
    /// Returns `false` without touching the graph when either endpoint is
    /// missing. A second edge between the same pair replaces the first.
    pub(crate) fn add_edge(
        &mut self,
        source: NodeKey,
        target: NodeKey,
        relation: Relation,
    ) -> bool {
        match (self.index.get(&source), self.index.get(&target)) {
            (Some(&a), Some(&b)) => {
                self.graph.update_edge(a, b, relation);
                true
            }
            _ => false,
        }
    }

    pub(crate) fn concept_mut(&mut self, id: ConceptId) -> Option<&mut ConceptNode> {
        let idx = *self.index.get(&NodeKey::Concept(id))?;
        match &mut self.graph[idx] {
            GraphNode::Concept(node) => Some(node),
            GraphNode::Case(_) => None,
        }
    }

    // ========== Lookup ==========

    pub fn contains(&self, key: NodeKey) -> bool {
        self.index.contains_key(&key)
    }

    /// Get a node by key
    pub fn node(&self, key: NodeKey) -> Option<&GraphNode> {
        self.index.get(&key).map(|&idx| &self.graph[idx])
    }

    /// Get a concept node by concept id
    pub fn concept(&self, id: ConceptId) -> Option<&ConceptNode> {
        self.node(NodeKey::Concept(id)).and_then(GraphNode::as_concept)
    }

    /// Whether a case node exists for this case id
    pub fn has_case(&self, case_id: CaseId) -> bool {
        self.contains(NodeKey::Case(case_id))
    }

    /// First concept, in graph order, carrying the given code
    pub fn concept_by_code(&self, code: ConceptCode) -> Option<&ConceptNode> {
        self.concepts().find(|node| node.concept.code == code)
    }

    /// Relation of the edge `source -> target`, if there is one
    pub fn relation(&self, source: NodeKey, target: NodeKey) -> Option<Relation> {
        let a = *self.index.get(&source)?;
        let b = *self.index.get(&target)?;
        self.graph.find_edge(a, b).map(|e| self.graph[e])
    }

    // ========== Iteration ==========

    /// All nodes in insertion order
    pub fn nodes(&self) -> impl Iterator<Item = &GraphNode> {
        self.graph.node_indices().map(|idx| &self.graph[idx])
    }

    /// All concept nodes in insertion order
    pub fn concepts(&self) -> impl Iterator<Item = &ConceptNode> {
        self.nodes().filter_map(GraphNode::as_concept)
    }

    /// All case ids in insertion order
    pub fn cases(&self) -> impl Iterator<Item = CaseId> {
        self.nodes().filter_map(|node| match node {
            GraphNode::Case(case) => Some(case.case_id),
            GraphNode::Concept(_) => None,
        })
    }

    /// All edges, in edge insertion order
    pub fn edges(&self) -> impl Iterator<Item = GraphEdge> {
        self.graph.edge_references().map(|e| {
            GraphEdge::new(
                self.graph[e.source()].key(),
                self.graph[e.target()].key(),
                *e.weight(),
            )
        })
    }

    /// Targets of `relation` edges leaving `key`, in node insertion order
    pub fn successors(&self, key: NodeKey, relation: Relation) -> Vec<NodeKey> {
        self.neighbors(key, relation, Direction::Outgoing)
    }

    /// Sources of `relation` edges entering `key`, in node insertion order
    pub fn predecessors(&self, key: NodeKey, relation: Relation) -> Vec<NodeKey> {
        self.neighbors(key, relation, Direction::Incoming)
    }

    /// Concepts a case exhibits (its CASE-OF targets)
    pub fn concepts_of_case(&self, case_id: CaseId) -> Vec<&ConceptNode> {
        self.successors(NodeKey::Case(case_id), Relation::CaseOf)
            .into_iter()
            .filter_map(|key| self.node(key).and_then(GraphNode::as_concept))
            .collect()
    }

    fn neighbors(&self, key: NodeKey, relation: Relation, direction: Direction) -> Vec<NodeKey> {
        let Some(&idx) = self.index.get(&key) else {
            return Vec::new();
        };

        // petgraph walks adjacency lists newest-first; sort back to insertion order
        let mut found: Vec<NodeIndex> = self
            .graph
            .edges_directed(idx, direction)
            .filter(|e| *e.weight() == relation)
            .map(|e| match direction {
                Direction::Outgoing => e.target(),
                Direction::Incoming => e.source(),
            })
            .collect();
        found.sort();
        found.dedup();
        found.into_iter().map(|i| self.graph[i].key()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::knowledge::entity::{CaseNode, Concept};

    fn concept(id: ConceptId, code: ConceptCode, parent: ConceptId) -> GraphNode {
        GraphNode::Concept(ConceptNode::new(Concept::new(id, code, parent), 0))
    }

    #[test]
    fn test_upsert_keeps_position() {
        let mut graph = KnowledgeGraph::new();
        graph.upsert_node(concept(1, 10, 0));
        graph.upsert_node(concept(2, 20, 1));
        graph.upsert_node(concept(1, 11, 0));

        assert_eq!(graph.node_count(), 2);
        let ids: Vec<_> = graph.concepts().map(|c| c.id()).collect();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(graph.concept(1).unwrap().concept.code, 11);
    }

    #[test]
    fn test_add_edge_requires_endpoints() {
        let mut graph = KnowledgeGraph::new();
        graph.upsert_node(concept(1, 10, 0));
        graph.upsert_node(concept(2, 20, 1));

        assert!(graph.add_edge(NodeKey::Concept(1), NodeKey::Concept(2), Relation::IsA));
        assert!(!graph.add_edge(NodeKey::Concept(9), NodeKey::Concept(2), Relation::IsA));
        // Duplicate edge collapses
        assert!(graph.add_edge(NodeKey::Concept(1), NodeKey::Concept(2), Relation::IsA));
        assert_eq!(graph.edge_count(), 1);
        assert_eq!(
            graph.relation(NodeKey::Concept(1), NodeKey::Concept(2)),
            Some(Relation::IsA)
        );
    }

    #[test]
    fn test_neighbors_in_insertion_order() {
        let mut graph = KnowledgeGraph::new();
        graph.upsert_node(concept(1, 10, 0));
        graph.upsert_node(concept(2, 20, 0));
        graph.upsert_node(concept(3, 30, 0));
        graph.upsert_node(GraphNode::Case(CaseNode { case_id: 7 }));

        let case = NodeKey::Case(7);
        graph.add_edge(case, NodeKey::Concept(3), Relation::CaseOf);
        graph.add_edge(case, NodeKey::Concept(1), Relation::CaseOf);
        graph.add_edge(case, NodeKey::Concept(2), Relation::CaseOf);

        assert_eq!(
            graph.successors(case, Relation::CaseOf),
            vec![NodeKey::Concept(1), NodeKey::Concept(2), NodeKey::Concept(3)]
        );
        assert!(graph.successors(case, Relation::IsA).is_empty());
        assert_eq!(
            graph.predecessors(NodeKey::Concept(2), Relation::CaseOf),
            vec![case]
        );
        assert_eq!(graph.concepts_of_case(7).len(), 3);
        assert!(graph.successors(NodeKey::Case(99), Relation::CaseOf).is_empty());
    }

    #[test]
    fn test_concept_by_code_first_match() {
        let mut graph = KnowledgeGraph::new();
        graph.upsert_node(concept(4, 50, 0));
        graph.upsert_node(concept(5, 50, 0));

        assert_eq!(graph.concept_by_code(50).unwrap().id(), 4);
        assert!(graph.concept_by_code(51).is_none());
    }
}
