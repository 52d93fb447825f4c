//! Aggregate counts over a built graph

use std::fmt;

use serde::Serialize;

use super::entity::GraphNode;
use super::graph::KnowledgeGraph;
use super::relationship::Relation;

/// Node and edge counts for one graph
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GraphStats {
    pub total_nodes: usize,
    pub total_edges: usize,
    pub concept_nodes: usize,
    pub case_nodes: usize,
    pub is_a_edges: usize,
    pub case_of_edges: usize,
}

/// Statistics report, or the sentinel used when no graph is loaded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StatsReport {
    NoGraph,
    Graph(GraphStats),
}

impl StatsReport {
    /// Counts, if a graph was present
    pub fn counts(&self) -> Option<&GraphStats> {
        match self {
            Self::NoGraph => None,
            Self::Graph(stats) => Some(stats),
        }
    }
}

/// Compute the statistics report for an optional graph
pub fn stats(graph: Option<&KnowledgeGraph>) -> StatsReport {
    match graph {
        None => StatsReport::NoGraph,
        Some(graph) => StatsReport::Graph(GraphStats::of(graph)),
    }
}

impl GraphStats {
    /// Count the nodes and edges of a graph
    pub fn of(graph: &KnowledgeGraph) -> Self {
        let mut stats = Self {
            total_nodes: graph.node_count(),
            total_edges: graph.edge_count(),
            ..Default::default()
        };

        for node in graph.nodes() {
            match node {
                GraphNode::Concept(_) => stats.concept_nodes += 1,
                GraphNode::Case(_) => stats.case_nodes += 1,
            }
        }
        for edge in graph.edges() {
            match edge.relation {
                Relation::IsA => stats.is_a_edges += 1,
                Relation::CaseOf => stats.case_of_edges += 1,
            }
        }

        stats
    }
}

impl fmt::Display for GraphStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Total nodes: {}", self.total_nodes)?;
        writeln!(f, "Total edges: {}", self.total_edges)?;
        writeln!(f, "Concept nodes: {}", self.concept_nodes)?;
        writeln!(f, "Case nodes: {}", self.case_nodes)?;
        writeln!(f, "IS-A edges: {}", self.is_a_edges)?;
        writeln!(f, "CASE-OF edges: {}", self.case_of_edges)
    }
}

impl fmt::Display for StatsReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoGraph => writeln!(f, "No graph loaded."),
            Self::Graph(stats) => write!(f, "{}", stats),
        }
    }
}
