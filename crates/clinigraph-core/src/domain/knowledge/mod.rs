//! Clinical knowledge graph
//!
//! Concepts of the diagnostic taxonomy and the cases (studies) that exhibit
//! them, held in one directed graph:
//!
//! ```text
//!   conc_1 ──IS-A──▶ conc_2 ──IS-A──▶ conc_4
//!                      ▲                 ▲
//!                   CASE-OF           CASE-OF
//!                      │                 │
//!                   case_100 ────────────┘
//! ```
//!
//! ## Components
//!
//! - **Builder**: two-phase construction from the concept and association
//!   tables
//! - **Statistics**: node and edge counts by kind
//! - **Extractor**: the ancestor closure of one case, bounded by depth
//! - **Miner**: concepts that co-occur with a target across its cases
//! - **Hierarchy index**: `parent -> children` for lazy tree expansion
//! - **Handle**: the current graph, swapped whole on rebuild or reload
//!
//! ## Usage
//!
//! ```rust,ignore
//! use clinigraph_core::domain::knowledge::{build, extract_case_subgraph, mine_associations};
//!
//! let graph = build(&concepts, &associations);
//! let subgraph = extract_case_subgraph(&graph, 100, 2);
//! let ranked = mine_associations(&graph, 42, Some(GROUP_MUSCLE));
//! ```

mod associations;
mod builder;
mod entity;
mod extract;
mod graph;
mod handle;
mod hierarchy;
mod relationship;
mod stats;

pub use associations::{CoOccurrence, mine_associations};
pub use builder::{BuildSummary, build, build_with_summary};
pub use entity::{
    Association, CaseId, CaseNode, Concept, ConceptCode, ConceptId, ConceptNode, GROUP_FINAL,
    GROUP_MUSCLE, GROUP_NERVE, GraphNode, NodeKey,
};
pub use extract::{CaseSubgraph, extract_case_subgraph};
pub use graph::KnowledgeGraph;
pub use handle::GraphHandle;
pub use hierarchy::{HierarchyEntry, HierarchyIndex, children_of};
pub use relationship::{GraphEdge, Relation};
pub use stats::{GraphStats, StatsReport, stats};
