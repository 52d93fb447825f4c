//! Edge types for the clinical knowledge graph

use serde::{Deserialize, Serialize};

use super::entity::NodeKey;

/// Kind of a directed edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Relation {
    /// Taxonomy containment, parent concept -> child concept
    #[serde(rename = "IS-A")]
    IsA,
    /// Case exhibits concept, case -> concept
    #[serde(rename = "CASE-OF")]
    CaseOf,
}

impl Relation {
    /// Get the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::IsA => "IS-A",
            Self::CaseOf => "CASE-OF",
        }
    }
}

impl std::fmt::Display for Relation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An edge addressed by the keys of its endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GraphEdge {
    pub source: NodeKey,
    pub target: NodeKey,
    pub relation: Relation,
}

impl GraphEdge {
    pub fn new(source: NodeKey, target: NodeKey, relation: Relation) -> Self {
        Self {
            source,
            target,
            relation,
        }
    }
}
