//! Knowledge graph commands
//!
//! Library-level operations behind the CLI (build, load, query) and the
//! text renderers for their results.

use std::path::Path;

use tracing::info;

use crate::domain::knowledge::{
    BuildSummary, CaseSubgraph, CoOccurrence, ConceptCode, ConceptNode, GraphNode,
    HierarchyEntry, HierarchyIndex, KnowledgeGraph, NodeKey, build_with_summary,
};
use crate::error::{Error, Result};
use crate::storage::{RecordSet, load_graph};

/// Load the record tables from `dir` and build a graph from them
pub fn build_from_records(
    dir: &Path,
    concepts_file: &str,
    associations_file: &str,
) -> Result<(KnowledgeGraph, BuildSummary)> {
    let records = RecordSet::from_dir(dir, concepts_file, associations_file)?;
    let (graph, summary) = build_with_summary(&records.concepts, &records.associations);
    info!(
        dir = %dir.display(),
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        "Graph built from records"
    );
    Ok((graph, summary))
}

/// Load a snapshot, treating a missing file as "no graph"
///
/// Corrupt or unreadable snapshots are still errors.
pub fn load_optional(path: &Path) -> Result<Option<KnowledgeGraph>> {
    match load_graph(path) {
        Ok(graph) => Ok(Some(graph)),
        Err(Error::SnapshotNotFound(_)) => Ok(None),
        Err(e) => Err(e),
    }
}

// ========== Labels ==========

/// Display label of a concept: `"{label} [{code}]{flags}{usage}"`
///
/// Flags in order: `[RES]` reserved, `[^]` set-parent-true, `[INT]` not shown
/// in reports, `[GEN]` generalization. Usage appears only when positive.
pub fn concept_label(node: &ConceptNode) -> String {
    let concept = &node.concept;
    let name = if concept.label.is_empty() {
        NodeKey::Concept(concept.id).to_string()
    } else {
        concept.label.clone()
    };
    let code = if concept.code == 0 {
        "?".to_string()
    } else {
        concept.code.to_string()
    };

    let mut flags = String::new();
    if concept.reserved {
        flags.push_str(" [RES]");
    }
    if concept.set_parent_true {
        flags.push_str(" [^]");
    }
    if !concept.show_in_reports {
        flags.push_str(" [INT]");
    }
    if concept.generalization {
        flags.push_str(" [GEN]");
    }

    let usage = if node.usage_count > 0 {
        format!(" (Studies: {})", node.usage_count)
    } else {
        String::new()
    };

    format!("{} [{}]{}{}", name, code, flags, usage)
}

/// Plain label of the first concept carrying `code`, or `ConclusionCode={code}`
pub fn conclusion_label(graph: &KnowledgeGraph, code: ConceptCode) -> String {
    match graph.concept_by_code(code) {
        Some(node) if !node.concept.label.is_empty() => node.concept.label.clone(),
        _ => format!("ConclusionCode={}", code),
    }
}

fn node_label(graph: &KnowledgeGraph, node: &GraphNode) -> String {
    match node {
        GraphNode::Concept(concept) => concept_label(concept),
        GraphNode::Case(case) => {
            let exhibited = graph.concepts_of_case(case.case_id).len();
            format!("Case {} ({} concepts)", case.case_id, exhibited)
        }
    }
}

// ========== Renderers ==========

/// First `limit` node keys of a freshly built graph
pub fn format_sample_nodes(graph: &KnowledgeGraph, limit: usize) -> String {
    let mut output = String::new();
    output.push_str("Sample nodes:\n");
    for node in graph.nodes().take(limit) {
        output.push_str(&format!("  {}\n", node.key()));
    }
    if graph.node_count() > limit {
        output.push_str("...(etc)\n");
    }
    output
}

/// Counters of a build, one per line
pub fn format_build_summary(summary: &BuildSummary) -> String {
    let mut output = String::new();
    output.push_str(&format!("Concept records:     {}\n", summary.concept_records));
    output.push_str(&format!("Association records: {}\n", summary.association_records));
    if summary.dangling_parents > 0 {
        output.push_str(&format!("Dangling parents:    {}\n", summary.dangling_parents));
    }
    if summary.unresolved_codes > 0 {
        output.push_str(&format!("Unresolved codes:    {}\n", summary.unresolved_codes));
    }
    if summary.missing_codes > 0 {
        output.push_str(&format!("Rows without code:   {}\n", summary.missing_codes));
    }
    if summary.ambiguous_codes > 0 {
        output.push_str(&format!("Ambiguous codes:     {}\n", summary.ambiguous_codes));
    }
    output
}

/// Case subgraph grouped by ascent depth, followed by its edges
pub fn format_subgraph(subgraph: &CaseSubgraph) -> String {
    if subgraph.is_empty() {
        return format!("No data for case {}\n", subgraph.case_id);
    }

    let graph = &subgraph.graph;
    let mut output = String::new();
    output.push_str(&format!(
        "Case {} (max depth {}): {} nodes, {} edges\n",
        subgraph.case_id,
        subgraph.max_depth,
        graph.node_count(),
        graph.edge_count()
    ));

    for (depth, keys) in subgraph.layers() {
        output.push_str(&format!("Depth {}:\n", depth));
        for key in keys {
            if let Some(node) = graph.node(key) {
                output.push_str(&format!("  {}\n", node_label(graph, node)));
            }
        }
    }

    output.push_str("Edges:\n");
    for edge in graph.edges() {
        output.push_str(&format!(
            "  {} -{}-> {}\n",
            edge.source, edge.relation, edge.target
        ));
    }
    output
}

/// Ranked co-occurrences as `{code} [{label}] => {count}/{total}` lines
pub fn format_associations(
    graph: &KnowledgeGraph,
    target: &ConceptNode,
    ranked: &[CoOccurrence],
) -> String {
    let mut output = String::new();
    output.push_str(&format!(
        "Associations for {} ({} studies):\n",
        concept_label(target),
        target.study_set.len()
    ));

    if ranked.is_empty() {
        output.push_str("  (none)\n");
        return output;
    }

    for entry in ranked {
        let Some(other) = graph.concept(entry.other_concept_id) else {
            continue;
        };
        let code = other.concept.code;
        output.push_str(&format!(
            "  {} [{}] => {}/{}\n",
            code,
            conclusion_label(graph, code),
            entry.co_occurrence_count,
            entry.total_cases
        ));
    }
    output
}

/// Study set of a concept, one case id per line
pub fn format_studies(target: &ConceptNode) -> String {
    let mut output = String::new();
    output.push_str(&format!(
        "Studies for {}: {}\n",
        concept_label(target),
        target.study_set.len()
    ));
    for case_id in &target.study_set {
        output.push_str(&format!("  {}\n", case_id));
    }
    output
}

/// Indented taxonomy walk; `+` marks concepts with children left unexpanded
pub fn format_tree(
    graph: &KnowledgeGraph,
    index: &HierarchyIndex,
    entries: &[HierarchyEntry],
) -> String {
    let mut output = String::new();
    for (pos, entry) in entries.iter().enumerate() {
        let indent = "  ".repeat(entry.level as usize);
        let label = match graph.concept(entry.concept_id) {
            Some(node) => concept_label(node),
            None => format!("conc_{} (missing)", entry.concept_id),
        };
        let expanded = entries
            .get(pos + 1)
            .is_some_and(|next| next.level > entry.level);
        let marker = if index.has_children(entry.concept_id) && !expanded {
            " +"
        } else {
            ""
        };
        output.push_str(&format!("{}{}{}\n", indent, label, marker));
    }
    output
}
