//! Graph construction from the concept and association record sets
//!
//! The build runs in two phases:
//!
//! 1. Node records: one concept node per concept row, IS-A edges between
//!    existing endpoints, one case node per distinct case id.
//! 2. Study sets: every association row is resolved to a concept and
//!    accumulated into a `concept id -> set(case id)` map, which is merged
//!    into the concept nodes only once all CASE-OF edges are in place.
//!
//! The builder never fails. Rows that reference unknown concepts or unknown
//! parents are skipped and only counted in the [`BuildSummary`].

use std::collections::{BTreeSet, HashMap, HashSet};

use serde::Serialize;
use tracing::{debug, info};

use super::entity::{
    Association, CaseId, CaseNode, Concept, ConceptCode, ConceptId, ConceptNode, GraphNode,
    NodeKey,
};
use super::graph::KnowledgeGraph;
use super::relationship::Relation;

/// Counters describing one build
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BuildSummary {
    /// Concept rows received
    pub concept_records: usize,
    /// Association rows received
    pub association_records: usize,
    /// Concepts whose parent id names no concept
    pub dangling_parents: usize,
    /// Association rows whose code matched no concept
    pub unresolved_codes: usize,
    /// Association rows without a code
    pub missing_codes: usize,
    /// Codes carried by more than one concept (first concept wins)
    pub ambiguous_codes: usize,
}

/// Build the knowledge graph from the two record sets
///
/// Returns an empty graph when either input is empty.
pub fn build(concepts: &[Concept], associations: &[Association]) -> KnowledgeGraph {
    build_with_summary(concepts, associations).0
}

/// Build the knowledge graph and report what was skipped along the way
pub fn build_with_summary(
    concepts: &[Concept],
    associations: &[Association],
) -> (KnowledgeGraph, BuildSummary) {
    let mut summary = BuildSummary {
        concept_records: concepts.len(),
        association_records: associations.len(),
        ..Default::default()
    };

    if concepts.is_empty() || associations.is_empty() {
        debug!(
            concepts = concepts.len(),
            associations = associations.len(),
            "Empty record set, returning empty graph"
        );
        return (KnowledgeGraph::new(), summary);
    }

    let mut graph = KnowledgeGraph::new();

    // ========== Phase 1: node records ==========

    let usage_by_code = distinct_cases_by_code(associations);

    for concept in concepts {
        let usage = usage_by_code.get(&concept.code).copied().unwrap_or(0);
        graph.upsert_node(GraphNode::Concept(ConceptNode::new(concept.clone(), usage)));
    }

    for concept in concepts.iter().filter(|c| c.parent_id > 0) {
        let linked = graph.add_edge(
            NodeKey::Concept(concept.parent_id),
            NodeKey::Concept(concept.id),
            Relation::IsA,
        );
        if !linked {
            summary.dangling_parents += 1;
        }
    }

    let mut seen_cases = HashSet::new();
    for assoc in associations {
        if seen_cases.insert(assoc.case_id) {
            graph.upsert_node(GraphNode::Case(CaseNode {
                case_id: assoc.case_id,
            }));
        }
    }

    // ========== Phase 2: study sets ==========

    let (code_index, ambiguous) = first_concept_by_code(concepts);
    summary.ambiguous_codes = ambiguous;

    let mut study_sets: HashMap<ConceptId, BTreeSet<CaseId>> = HashMap::new();
    for assoc in associations {
        let Some(code) = assoc.code else {
            summary.missing_codes += 1;
            continue;
        };
        let Some(&concept_id) = code_index.get(&code) else {
            summary.unresolved_codes += 1;
            continue;
        };

        graph.add_edge(
            NodeKey::Case(assoc.case_id),
            NodeKey::Concept(concept_id),
            Relation::CaseOf,
        );
        study_sets.entry(concept_id).or_default().insert(assoc.case_id);
    }

    merge_study_sets(&mut graph, study_sets, &usage_by_code);

    info!(
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        cases = seen_cases.len(),
        "Knowledge graph built"
    );
    debug!(
        dangling_parents = summary.dangling_parents,
        unresolved_codes = summary.unresolved_codes,
        missing_codes = summary.missing_codes,
        ambiguous_codes = summary.ambiguous_codes,
        "Skipped references during build"
    );

    (graph, summary)
}

/// Count distinct case ids per code; repeated rows for one case count once
fn distinct_cases_by_code(associations: &[Association]) -> HashMap<ConceptCode, usize> {
    let mut cases: HashMap<ConceptCode, HashSet<CaseId>> = HashMap::new();
    for assoc in associations {
        if let Some(code) = assoc.code {
            cases.entry(code).or_default().insert(assoc.case_id);
        }
    }
    cases.into_iter().map(|(code, set)| (code, set.len())).collect()
}

/// Map each code to the first concept (in record order) carrying it
///
/// Duplicate codes are not rejected: the first concept wins and later ones
/// never receive CASE-OF edges. The second value counts such codes.
fn first_concept_by_code(concepts: &[Concept]) -> (HashMap<ConceptCode, ConceptId>, usize) {
    let mut index = HashMap::new();
    let mut duplicated = HashSet::new();
    for concept in concepts {
        match index.get(&concept.code) {
            None => {
                index.insert(concept.code, concept.id);
            }
            Some(&first) if first != concept.id => {
                duplicated.insert(concept.code);
            }
            Some(_) => {}
        }
    }
    (index, duplicated.len())
}

/// Install the accumulated study sets; `usage_count` becomes the set size
fn merge_study_sets(
    graph: &mut KnowledgeGraph,
    mut study_sets: HashMap<ConceptId, BTreeSet<CaseId>>,
    usage_by_code: &HashMap<ConceptCode, usize>,
) {
    let ids: Vec<ConceptId> = graph.concepts().map(ConceptNode::id).collect();
    for id in ids {
        let Some(node) = graph.concept_mut(id) else {
            continue;
        };
        node.study_set = study_sets.remove(&id).unwrap_or_default();
        node.usage_count = node.study_set.len();

        let by_code = usage_by_code.get(&node.concept.code).copied().unwrap_or(0);
        if by_code != node.usage_count {
            debug!(
                concept_id = id,
                code = node.concept.code,
                by_code,
                by_study_set = node.usage_count,
                "Code tally overridden by study set"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::knowledge::entity::GROUP_FINAL;

    fn scenario() -> (Vec<Concept>, Vec<Association>) {
        let concepts = vec![Concept::new(1, 10, 0), Concept::new(2, 20, 1)];
        let associations = vec![
            Association::new(100, 20),
            Association::new(100, 20),
            Association::new(101, 20),
        ];
        (concepts, associations)
    }

    #[test]
    fn test_duplicate_rows_are_deduplicated() {
        let (concepts, associations) = scenario();
        let graph = build(&concepts, &associations);

        let child = graph.concept(2).unwrap();
        assert_eq!(child.usage_count, 2);
        assert_eq!(child.study_set, BTreeSet::from([100, 101]));
        assert_eq!(graph.concept(1).unwrap().usage_count, 0);

        // 2 concepts + 2 cases; 1 IS-A + 2 CASE-OF
        assert_eq!(graph.node_count(), 4);
        assert_eq!(graph.edge_count(), 3);
    }

    #[test]
    fn test_empty_inputs_give_empty_graph() {
        let (concepts, associations) = scenario();

        let graph = build(&[], &associations);
        assert!(graph.is_empty());
        assert_eq!(graph.edge_count(), 0);

        let graph = build(&concepts, &[]);
        assert!(graph.is_empty());
    }

    #[test]
    fn test_roots_have_no_incoming_is_a() {
        let concepts = vec![
            Concept::new(1, 10, 0),
            Concept::new(2, 20, 1),
            Concept::new(3, 30, 2),
            Concept::new(4, 40, 0),
        ];
        let associations = vec![Association::new(1, 30)];
        let graph = build(&concepts, &associations);

        for concept in concepts.iter().filter(|c| c.parent_id == 0) {
            assert!(
                graph
                    .predecessors(NodeKey::Concept(concept.id), Relation::IsA)
                    .is_empty()
            );
        }
        assert_eq!(
            graph.predecessors(NodeKey::Concept(3), Relation::IsA),
            vec![NodeKey::Concept(2)]
        );
    }

    #[test]
    fn test_dangling_parent_and_unknown_code_skipped() {
        let concepts = vec![Concept::new(1, 10, 0), Concept::new(2, 20, 77)];
        let associations = vec![
            Association::new(5, 10),
            Association::new(6, 999),
            Association {
                code: None,
                ..Association::new(7, 0)
            },
        ];
        let (graph, summary) = build_with_summary(&concepts, &associations);

        assert_eq!(summary.dangling_parents, 1);
        assert_eq!(summary.unresolved_codes, 1);
        assert_eq!(summary.missing_codes, 1);
        // Cases 6 and 7 still exist, just without edges
        assert!(graph.has_case(6));
        assert!(graph.has_case(7));
        assert!(graph.concepts_of_case(6).is_empty());
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn test_duplicate_code_first_concept_wins() {
        let concepts = vec![
            Concept::new(1, 10, 0).with_group(GROUP_FINAL),
            Concept::new(2, 50, 1),
            Concept::new(3, 50, 1),
        ];
        let associations = vec![Association::new(100, 50), Association::new(101, 50)];
        let (graph, summary) = build_with_summary(&concepts, &associations);

        assert_eq!(summary.ambiguous_codes, 1);
        assert_eq!(graph.concept(2).unwrap().usage_count, 2);
        assert_eq!(graph.concept(3).unwrap().usage_count, 0);
        assert!(graph.concept(3).unwrap().study_set.is_empty());
    }

    #[test]
    fn test_study_set_matches_case_of_edges() {
        let concepts = vec![
            Concept::new(1, 10, 0),
            Concept::new(2, 20, 1),
            Concept::new(3, 30, 1),
        ];
        let associations = vec![
            Association::new(100, 20),
            Association::new(100, 30),
            Association::new(101, 30),
            Association::new(102, 10),
            Association::new(102, 30),
        ];
        let graph = build(&concepts, &associations);

        for node in graph.concepts() {
            let sources: BTreeSet<CaseId> = graph
                .predecessors(NodeKey::Concept(node.id()), Relation::CaseOf)
                .into_iter()
                .map(|key| match key {
                    NodeKey::Case(id) => id,
                    NodeKey::Concept(id) => panic!("concept {} as CASE-OF source", id),
                })
                .collect();
            assert_eq!(node.study_set, sources);
            assert_eq!(node.usage_count, node.study_set.len());
        }
        assert_eq!(graph.concept(3).unwrap().usage_count, 3);
    }

    #[test]
    fn test_cases_in_first_appearance_order() {
        let concepts = vec![Concept::new(1, 10, 0)];
        let associations = vec![
            Association::new(300, 10),
            Association::new(100, 10),
            Association::new(300, 10),
            Association::new(200, 10),
        ];
        let graph = build(&concepts, &associations);
        let cases: Vec<_> = graph.cases().collect();
        assert_eq!(cases, vec![300, 100, 200]);
    }
}
