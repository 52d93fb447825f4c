//! Bounded ancestor-closure extraction for a single case
//!
//! Produces the subgraph needed to show what one case exhibits plus the
//! taxonomy context above it: the case node, its CASE-OF concepts (depth 0)
//! and their IS-A ancestors up to `max_depth` hops.

use std::collections::{BTreeMap, VecDeque};

use tracing::debug;

use super::entity::{CaseId, GraphNode, NodeKey};
use super::graph::KnowledgeGraph;
use super::relationship::Relation;

/// The ancestor closure of one case
#[derive(Debug, Clone)]
pub struct CaseSubgraph {
    /// The case the closure was seeded from
    pub case_id: CaseId,
    /// Ascent bound used for the extraction
    pub max_depth: u32,
    /// Copied nodes plus the edges the ascent walked
    pub graph: KnowledgeGraph,
    /// Ascent depth of each concept node (0 = directly exhibited)
    pub depths: BTreeMap<NodeKey, u32>,
}

impl CaseSubgraph {
    fn empty(case_id: CaseId, max_depth: u32) -> Self {
        Self {
            case_id,
            max_depth,
            graph: KnowledgeGraph::new(),
            depths: BTreeMap::new(),
        }
    }

    /// True when the case was not present in the source graph
    pub fn is_empty(&self) -> bool {
        self.graph.is_empty()
    }

    /// Concept keys grouped by ascent depth
    pub fn layers(&self) -> BTreeMap<u32, Vec<NodeKey>> {
        let mut layers: BTreeMap<u32, Vec<NodeKey>> = BTreeMap::new();
        for node in self.graph.nodes() {
            let key = node.key();
            if let Some(&depth) = self.depths.get(&key) {
                layers.entry(depth).or_default().push(key);
            }
        }
        layers
    }
}

/// Extract the case node, its concepts, and their ancestors up to `max_depth`
///
/// An unknown case yields an empty subgraph. A parent edge is copied only
/// when the ascent first reaches that parent; a node already copied is never
/// copied, linked or queued again, which keeps the walk finite even when the
/// parent links contain a cycle.
pub fn extract_case_subgraph(
    graph: &KnowledgeGraph,
    case_id: CaseId,
    max_depth: u32,
) -> CaseSubgraph {
    let case_key = NodeKey::Case(case_id);
    let mut result = CaseSubgraph::empty(case_id, max_depth);

    let Some(case_node) = graph.node(case_key) else {
        debug!(case_id, "Case not in graph, returning empty subgraph");
        return result;
    };
    result.graph.upsert_node(case_node.clone());

    let mut frontier: VecDeque<NodeKey> = VecDeque::new();
    for concept_key in graph.successors(case_key, Relation::CaseOf) {
        if let Some(node) = graph.node(concept_key) {
            copy_node(&mut result.graph, node);
            result.graph.add_edge(case_key, concept_key, Relation::CaseOf);
            result.depths.insert(concept_key, 0);
            frontier.push_back(concept_key);
        }
    }

    while let Some(current) = frontier.pop_front() {
        let depth = result.depths.get(&current).copied().unwrap_or(0);
        if depth >= max_depth {
            continue;
        }

        for parent in graph.predecessors(current, Relation::IsA) {
            if result.graph.contains(parent) {
                continue;
            }
            let Some(node) = graph.node(parent) else {
                continue;
            };
            copy_node(&mut result.graph, node);
            result.graph.add_edge(parent, current, Relation::IsA);
            result.depths.insert(parent, depth + 1);
            frontier.push_back(parent);
        }
    }

    debug!(
        case_id,
        max_depth,
        nodes = result.graph.node_count(),
        edges = result.graph.edge_count(),
        "Case subgraph extracted"
    );

    result
}

fn copy_node(target: &mut KnowledgeGraph, node: &GraphNode) {
    if !target.contains(node.key()) {
        target.upsert_node(node.clone());
    }
}
