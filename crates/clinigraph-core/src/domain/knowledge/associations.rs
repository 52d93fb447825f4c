//! Co-occurrence mining between concepts that share cases

use std::collections::HashMap;

use serde::Serialize;
use tracing::debug;

use super::entity::{ConceptId, NodeKey};
use super::graph::KnowledgeGraph;
use super::relationship::Relation;

/// One ranked co-occurrence: `other` appears on `count` of `total_cases`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CoOccurrence {
    pub other_concept_id: ConceptId,
    pub co_occurrence_count: usize,
    /// Size of the target's study set, independent of any group filter
    pub total_cases: usize,
}

impl CoOccurrence {
    /// Share of the target's cases that also exhibit the other concept
    pub fn ratio(&self) -> f64 {
        if self.total_cases == 0 {
            0.0
        } else {
            self.co_occurrence_count as f64 / self.total_cases as f64
        }
    }
}

/// Rank the concepts co-occurring with `concept_id` across its cases
///
/// Only neighbors whose `group_code` equals `filter_group` are counted when
/// a filter is given. Results are ordered by count descending, then by the
/// neighbor's `rank_abs` ascending, then by concept id. The target itself
/// never appears. A missing concept, a case key, or an empty study set all
/// give an empty list.
pub fn mine_associations(
    graph: &KnowledgeGraph,
    concept_id: ConceptId,
    filter_group: Option<i32>,
) -> Vec<CoOccurrence> {
    let Some(target) = graph.concept(concept_id) else {
        debug!(concept_id, "Association target is not a concept node");
        return Vec::new();
    };
    if target.study_set.is_empty() {
        return Vec::new();
    }

    let total_cases = target.study_set.len();
    let mut counts: HashMap<ConceptId, usize> = HashMap::new();

    for &case_id in &target.study_set {
        for key in graph.successors(NodeKey::Case(case_id), Relation::CaseOf) {
            let NodeKey::Concept(other_id) = key else {
                continue;
            };
            if other_id == concept_id {
                continue;
            }
            let Some(other) = graph.concept(other_id) else {
                continue;
            };
            if filter_group.is_some_and(|group| other.concept.group_code != group) {
                continue;
            }
            *counts.entry(other_id).or_insert(0) += 1;
        }
    }

    let mut ranked: Vec<(CoOccurrence, i64)> = counts
        .into_iter()
        .map(|(other_concept_id, co_occurrence_count)| {
            let rank_abs = graph
                .concept(other_concept_id)
                .map(|c| c.concept.rank_abs)
                .unwrap_or(i64::MAX);
            (
                CoOccurrence {
                    other_concept_id,
                    co_occurrence_count,
                    total_cases,
                },
                rank_abs,
            )
        })
        .collect();

    ranked.sort_by(|(a, a_rank), (b, b_rank)| {
        b.co_occurrence_count
            .cmp(&a.co_occurrence_count)
            .then(a_rank.cmp(b_rank))
            .then(a.other_concept_id.cmp(&b.other_concept_id))
    });

    debug!(
        concept_id,
        total_cases,
        associations = ranked.len(),
        "Associations mined"
    );

    ranked.into_iter().map(|(entry, _)| entry).collect()
}
