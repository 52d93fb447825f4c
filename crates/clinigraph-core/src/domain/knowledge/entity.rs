//! Node types for the clinical knowledge graph
//!
//! The graph holds two kinds of nodes: taxonomy concepts (one per row of the
//! concept table) and cases (one per distinct case identifier found in the
//! association table). Concepts carry the study set derived at build time.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a taxonomy concept
pub type ConceptId = i64;

/// Identifier of an external case (e.g. a patient study)
pub type CaseId = i64;

/// Classification code shared by concepts and associations
pub type ConceptCode = i64;

/// Group code for final conclusions
pub const GROUP_FINAL: i32 = 1;
/// Group code for muscle findings
pub const GROUP_MUSCLE: i32 = 2;
/// Group code for nerve findings
pub const GROUP_NERVE: i32 = 3;

/// A taxonomy concept as supplied by the record store
///
/// `parent_id == 0` marks a root. `depth` is trusted from the source and
/// never recomputed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Concept {
    pub id: ConceptId,
    #[serde(default)]
    pub code: ConceptCode,
    #[serde(default)]
    pub group_code: i32,
    #[serde(default)]
    pub parent_id: ConceptId,
    #[serde(default)]
    pub rank_abs: i64,
    #[serde(default)]
    pub rank: i64,
    #[serde(default)]
    pub depth: i32,
    #[serde(default)]
    pub has_side: bool,
    #[serde(default)]
    pub is_final: bool,
    #[serde(default)]
    pub show_in_reports: bool,
    #[serde(default)]
    pub reserved: bool,
    #[serde(default)]
    pub generalization: bool,
    #[serde(default)]
    pub set_parent_true: bool,
    #[serde(default)]
    pub warning: bool,
    #[serde(default)]
    pub degree_code: i32,
    #[serde(default)]
    pub label: String,
}

impl Concept {
    /// Create a concept with the given identity; every other field is zeroed
    pub fn new(id: ConceptId, code: ConceptCode, parent_id: ConceptId) -> Self {
        Self {
            id,
            code,
            group_code: 0,
            parent_id,
            rank_abs: 0,
            rank: 0,
            depth: 0,
            has_side: false,
            is_final: false,
            show_in_reports: false,
            reserved: false,
            generalization: false,
            set_parent_true: false,
            warning: false,
            degree_code: 0,
            label: String::new(),
        }
    }

    /// Set the display label
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Set the group code
    pub fn with_group(mut self, group_code: i32) -> Self {
        self.group_code = group_code;
        self
    }

    /// Set the absolute rank used as a secondary ordering key
    pub fn with_rank_abs(mut self, rank_abs: i64) -> Self {
        self.rank_abs = rank_abs;
        self
    }

    /// Whether this concept sits at the top of the taxonomy
    pub fn is_root(&self) -> bool {
        self.parent_id <= 0
    }
}

/// One row of the association table: a case exhibiting a coded concept
///
/// Only `case_id` and `code` shape the graph; the remaining columns are
/// carried through from the source table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Association {
    pub case_id: CaseId,
    #[serde(default)]
    pub code: Option<ConceptCode>,
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub group_code: i32,
    #[serde(default)]
    pub site_code: i32,
    #[serde(default)]
    pub side_code: i32,
}

impl Association {
    /// Create an association between a case and a concept code
    pub fn new(case_id: CaseId, code: ConceptCode) -> Self {
        Self {
            case_id,
            code: Some(code),
            id: 0,
            group_code: 0,
            site_code: 0,
            side_code: 0,
        }
    }
}

/// A concept node: the source record plus the cases associated with it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConceptNode {
    pub concept: Concept,
    /// Distinct cases with a CASE-OF edge into this concept
    pub study_set: BTreeSet<CaseId>,
    /// Always `study_set.len()` once the build has finished
    pub usage_count: usize,
}

impl ConceptNode {
    pub(crate) fn new(concept: Concept, usage_count: usize) -> Self {
        Self {
            concept,
            study_set: BTreeSet::new(),
            usage_count,
        }
    }

    pub fn id(&self) -> ConceptId {
        self.concept.id
    }
}

/// A case node; nothing beyond its identity is owned by the graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CaseNode {
    pub case_id: CaseId,
}

/// Either kind of graph node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GraphNode {
    Concept(ConceptNode),
    Case(CaseNode),
}

impl GraphNode {
    /// The key addressing this node
    pub fn key(&self) -> NodeKey {
        match self {
            Self::Concept(node) => NodeKey::Concept(node.concept.id),
            Self::Case(node) => NodeKey::Case(node.case_id),
        }
    }

    pub fn as_concept(&self) -> Option<&ConceptNode> {
        match self {
            Self::Concept(node) => Some(node),
            Self::Case(_) => None,
        }
    }

    pub fn is_case(&self) -> bool {
        matches!(self, Self::Case(_))
    }
}

/// Address of a node in the graph
///
/// Renders as `conc_{id}` or `case_{id}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum NodeKey {
    Concept(ConceptId),
    Case(CaseId),
}

impl NodeKey {
    /// Parse a rendered key such as `conc_12` or `case_7`
    pub fn parse(s: &str) -> Option<Self> {
        if let Some(rest) = s.strip_prefix("conc_") {
            rest.parse().ok().map(Self::Concept)
        } else if let Some(rest) = s.strip_prefix("case_") {
            rest.parse().ok().map(Self::Case)
        } else {
            None
        }
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Concept(id) => write!(f, "conc_{}", id),
            Self::Case(id) => write!(f, "case_{}", id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_concept_builder() {
        let concept = Concept::new(5, 500, 1)
            .with_label("Carpal tunnel syndrome")
            .with_group(GROUP_FINAL)
            .with_rank_abs(42);

        assert_eq!(concept.id, 5);
        assert_eq!(concept.code, 500);
        assert_eq!(concept.parent_id, 1);
        assert_eq!(concept.group_code, GROUP_FINAL);
        assert_eq!(concept.rank_abs, 42);
        assert!(!concept.is_root());
        assert!(Concept::new(1, 10, 0).is_root());
    }

    #[test]
    fn test_node_key_display_and_parse() {
        assert_eq!(NodeKey::Concept(12).to_string(), "conc_12");
        assert_eq!(NodeKey::Case(100).to_string(), "case_100");
        assert_eq!(NodeKey::parse("conc_12"), Some(NodeKey::Concept(12)));
        assert_eq!(NodeKey::parse("case_100"), Some(NodeKey::Case(100)));
        assert_eq!(NodeKey::parse("study_1"), None);
        assert_eq!(NodeKey::parse("case_x"), None);
    }

    #[test]
    fn test_concept_deserialize_defaults() {
        let concept: Concept = serde_json::from_str(r#"{"id": 3, "code": 30}"#).unwrap();
        assert_eq!(concept.parent_id, 0);
        assert!(!concept.show_in_reports);
        assert!(concept.label.is_empty());
    }

    #[test]
    fn test_association_without_code() {
        let assoc: Association = serde_json::from_str(r#"{"case_id": 100}"#).unwrap();
        assert_eq!(assoc.case_id, 100);
        assert_eq!(assoc.code, None);
        assert_eq!(Association::new(100, 20).code, Some(20));
    }

    #[test]
    fn test_graph_node_key() {
        let node = GraphNode::Concept(ConceptNode::new(Concept::new(2, 20, 1), 0));
        assert_eq!(node.key(), NodeKey::Concept(2));
        assert!(node.as_concept().is_some());

        let case = GraphNode::Case(CaseNode { case_id: 9 });
        assert_eq!(case.key(), NodeKey::Case(9));
        assert!(case.is_case());
    }
}
