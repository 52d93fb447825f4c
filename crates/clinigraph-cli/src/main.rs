//! Clinigraph CLI - knowledge graph engine for a clinical knowledge base

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use clap::{Parser, Subcommand};
use clinigraph_core::commands::graph as graph_cmd;
use clinigraph_core::config::{self, Config};
use clinigraph_core::domain::knowledge::{
    CaseId, ConceptId, HierarchyIndex, KnowledgeGraph, extract_case_subgraph, mine_associations,
    stats,
};
use clinigraph_core::storage::{self, GraphSnapshot, save_graph};
use serde::Serialize;
use serde_json::json;
use tracing::{debug, info};

#[derive(Parser)]
#[command(name = "clinigraph")]
#[command(author, version, long_about = None)]
#[command(about = "Knowledge graph engine for a clinical knowledge base")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Snapshot file (defaults to the configured location)
    #[arg(long, global = true)]
    snapshot: Option<PathBuf>,

    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text")]
    format: OutputFormat,

    /// Quiet mode (minimal output)
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the graph from the JSONL record tables and save a snapshot
    Build {
        /// Directory holding the record files
        #[arg(long)]
        records_dir: Option<PathBuf>,
        /// Concept table file name
        #[arg(long)]
        concepts: Option<String>,
        /// Association table file name
        #[arg(long)]
        associations: Option<String>,
        /// Build without writing the snapshot
        #[arg(long)]
        no_save: bool,
    },

    /// Show node and edge counts of the saved graph
    Stats,

    /// Show a case with its concepts and their ancestors
    Case {
        /// Case ID
        case_id: CaseId,
        /// How many IS-A levels to ascend
        #[arg(short = 'd', long)]
        max_depth: Option<u32>,
    },

    /// Rank the concepts co-occurring with a concept
    Associations {
        /// Concept ID
        concept_id: ConceptId,
        /// Only count concepts of this group code (`none` counts every group)
        #[arg(short, long, value_parser = parse_group_filter)]
        group: Option<GroupFilter>,
    },

    /// List the cases associated with a concept
    Studies {
        /// Concept ID
        concept_id: ConceptId,
    },

    /// Walk the concept taxonomy
    Tree {
        /// Start below this concept instead of the roots
        #[arg(short, long)]
        root: Option<ConceptId>,
        /// Levels to expand
        #[arg(short, long)]
        depth: Option<u32>,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Get a configuration value
    Get { key: String },
    /// Set a configuration value
    Set { key: String, value: String },
    /// List all configuration values
    List,
    /// Reset configuration to defaults
    Reset,
    /// Show config file path
    Path,
}

/// Group filter given on the command line; `None` inside means every group
#[derive(Clone, Copy, Debug)]
struct GroupFilter(Option<i32>);

fn parse_group_filter(value: &str) -> Result<GroupFilter, String> {
    config::parse_group(value)
        .map(GroupFilter)
        .map_err(|e| e.to_string())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so JSON output stays parseable
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("clinigraph=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let out = Output {
        format: cli.format,
        quiet: cli.quiet,
    };

    match cli.command {
        Commands::Build {
            records_dir,
            concepts,
            associations,
            no_save,
        } => {
            let ctx = Session::load(cli.snapshot)?;
            let records_dir = match records_dir {
                Some(dir) => dir,
                None => ctx.config.records_dir()?,
            };
            let concepts = concepts.unwrap_or_else(|| ctx.config.records.concepts_file.clone());
            let associations =
                associations.unwrap_or_else(|| ctx.config.records.associations_file.clone());
            cmd_build(
                &ctx.config,
                &records_dir,
                &concepts,
                &associations,
                (!no_save).then_some(ctx.snapshot_path.as_path()),
                out,
            )
        }

        Commands::Stats => {
            let ctx = Session::load(cli.snapshot)?;
            cmd_stats(&ctx.snapshot_path, out)
        }

        Commands::Case { case_id, max_depth } => {
            let ctx = Session::load(cli.snapshot)?;
            let max_depth = max_depth.unwrap_or(ctx.config.graph.default_max_depth);
            cmd_case(&ctx.snapshot_path, case_id, max_depth, out)
        }

        Commands::Associations { concept_id, group } => {
            let ctx = Session::load(cli.snapshot)?;
            let group = match group {
                Some(GroupFilter(group)) => group,
                None => ctx.config.associations.default_group,
            };
            cmd_associations(&ctx.snapshot_path, concept_id, group, out)
        }

        Commands::Studies { concept_id } => {
            let ctx = Session::load(cli.snapshot)?;
            cmd_studies(&ctx.snapshot_path, concept_id, out)
        }

        Commands::Tree { root, depth } => {
            let ctx = Session::load(cli.snapshot)?;
            cmd_tree(&ctx.snapshot_path, root, depth, out)
        }

        Commands::Config { action } => cmd_config(action, out.quiet),
    }
}

/// Configuration plus the snapshot location it resolves to
struct Session {
    config: Config,
    snapshot_path: PathBuf,
}

impl Session {
    fn load(snapshot: Option<PathBuf>) -> anyhow::Result<Self> {
        let config = Config::load()?;
        let snapshot_path = match snapshot {
            Some(path) => path,
            None => config.snapshot_path()?,
        };
        debug!(snapshot = %snapshot_path.display(), "Resolved snapshot path");
        Ok(Self {
            config,
            snapshot_path,
        })
    }
}

#[derive(Clone, Copy)]
struct Output {
    format: OutputFormat,
    quiet: bool,
}

impl Output {
    fn json(&self) -> bool {
        self.format == OutputFormat::Json
    }

    fn print_json<T: Serialize>(&self, value: &T) -> anyhow::Result<()> {
        println!(
            "{}",
            serde_json::to_string_pretty(value).context("Failed to serialize output")?
        );
        Ok(())
    }
}

/// Turn a library error into a CLI error that carries its code and hint
fn core_error(err: clinigraph_core::Error) -> anyhow::Error {
    match err.suggestion() {
        Some(hint) => anyhow!("[{}] {}\n  Try: {}", err.code(), err, hint),
        None => anyhow!("[{}] {}", err.code(), err),
    }
}

/// Load the snapshot; a missing snapshot is an error here
fn load_graph(snapshot_path: &Path) -> anyhow::Result<KnowledgeGraph> {
    storage::load_graph(snapshot_path).map_err(core_error)
}

fn cmd_build(
    config: &Config,
    records_dir: &Path,
    concepts_file: &str,
    associations_file: &str,
    save_to: Option<&Path>,
    out: Output,
) -> anyhow::Result<()> {
    let (graph, summary) =
        graph_cmd::build_from_records(records_dir, concepts_file, associations_file)
            .map_err(core_error)?;

    let saved = match save_to {
        Some(path) => Some(save_graph(&graph, path).map_err(core_error)?),
        None => None,
    };
    info!(
        nodes = graph.node_count(),
        saved = saved.is_some(),
        "Build command finished"
    );

    if out.json() {
        return out.print_json(&json!({
            "stats": stats(Some(&graph)),
            "summary": summary,
            "snapshot": saved,
        }));
    }

    if out.quiet {
        return Ok(());
    }

    println!("Build Graph completed.");
    print!("{}", graph_cmd::format_build_summary(&summary));
    if !graph.is_empty() {
        print!(
            "{}",
            graph_cmd::format_sample_nodes(&graph, config.graph.sample_node_limit)
        );
    }
    match saved {
        Some(info) => println!("Graph saved to {}", info.path.display()),
        None => println!("Snapshot not written (--no-save)."),
    }
    Ok(())
}

fn cmd_stats(snapshot_path: &Path, out: Output) -> anyhow::Result<()> {
    let graph = graph_cmd::load_optional(snapshot_path).map_err(core_error)?;
    let report = stats(graph.as_ref());

    if out.json() {
        return out.print_json(&report);
    }
    print!("{}", report);
    Ok(())
}

fn cmd_case(
    snapshot_path: &Path,
    case_id: CaseId,
    max_depth: u32,
    out: Output,
) -> anyhow::Result<()> {
    let graph = load_graph(snapshot_path)?;
    let subgraph = extract_case_subgraph(&graph, case_id, max_depth);

    if out.json() {
        let depths: BTreeMap<String, u32> = subgraph
            .depths
            .iter()
            .map(|(key, depth)| (key.to_string(), *depth))
            .collect();
        let snapshot = GraphSnapshot::capture(&subgraph.graph);
        return out.print_json(&json!({
            "case_id": case_id,
            "max_depth": max_depth,
            "found": !subgraph.is_empty(),
            "nodes": snapshot.nodes,
            "edges": snapshot.edges,
            "depths": depths,
        }));
    }

    print!("{}", graph_cmd::format_subgraph(&subgraph));
    Ok(())
}

fn cmd_associations(
    snapshot_path: &Path,
    concept_id: ConceptId,
    group: Option<i32>,
    out: Output,
) -> anyhow::Result<()> {
    let graph = load_graph(snapshot_path)?;
    let ranked = mine_associations(&graph, concept_id, group);

    if out.json() {
        let entries: Vec<_> = ranked
            .iter()
            .map(|entry| {
                let code = graph
                    .concept(entry.other_concept_id)
                    .map(|c| c.concept.code)
                    .unwrap_or_default();
                json!({
                    "other_concept_id": entry.other_concept_id,
                    "code": code,
                    "label": graph_cmd::conclusion_label(&graph, code),
                    "co_occurrence_count": entry.co_occurrence_count,
                    "total_cases": entry.total_cases,
                })
            })
            .collect();
        return out.print_json(&json!({
            "concept_id": concept_id,
            "group": group,
            "associations": entries,
        }));
    }

    match graph.concept(concept_id) {
        Some(target) => print!("{}", graph_cmd::format_associations(&graph, target, &ranked)),
        None => println!("No data for concept {}", concept_id),
    }
    Ok(())
}

fn cmd_studies(snapshot_path: &Path, concept_id: ConceptId, out: Output) -> anyhow::Result<()> {
    let graph = load_graph(snapshot_path)?;
    let target = graph.concept(concept_id);

    if out.json() {
        let studies: Vec<CaseId> = target
            .map(|node| node.study_set.iter().copied().collect())
            .unwrap_or_default();
        return out.print_json(&json!({
            "concept_id": concept_id,
            "found": target.is_some(),
            "studies": studies,
        }));
    }

    match target {
        Some(node) => print!("{}", graph_cmd::format_studies(node)),
        None => println!("No data for concept {}", concept_id),
    }
    Ok(())
}

fn cmd_tree(
    snapshot_path: &Path,
    root: Option<ConceptId>,
    depth: Option<u32>,
    out: Output,
) -> anyhow::Result<()> {
    let graph = load_graph(snapshot_path)?;
    let index = HierarchyIndex::build(&graph);

    if let Some(id) = root {
        if graph.concept(id).is_none() {
            if out.json() {
                return out.print_json(&json!({ "root": id, "found": false, "entries": [] }));
            }
            println!("No data for concept {}", id);
            return Ok(());
        }
    }
    let entries = index.walk(root, depth);

    if out.json() {
        let rows: Vec<_> = entries
            .iter()
            .map(|entry| {
                json!({
                    "concept_id": entry.concept_id,
                    "level": entry.level,
                    "has_children": index.has_children(entry.concept_id),
                    "label": graph
                        .concept(entry.concept_id)
                        .map(graph_cmd::concept_label),
                })
            })
            .collect();
        return out.print_json(&json!({ "root": root, "found": true, "entries": rows }));
    }

    if entries.is_empty() {
        if !out.quiet {
            println!("No concepts.");
        }
        return Ok(());
    }
    print!("{}", graph_cmd::format_tree(&graph, &index, &entries));
    Ok(())
}

fn cmd_config(action: ConfigAction, quiet: bool) -> anyhow::Result<()> {
    match action {
        ConfigAction::Get { key } => {
            let config = Config::load()?;
            let value = config.get(&key)?;
            println!("{}", value);
        }
        ConfigAction::Set { key, value } => {
            let mut config = Config::load()?;
            config.set(&key, &value)?;
            config.save()?;
            if !quiet {
                println!("Set {} = {}", key, value);
            }
        }
        ConfigAction::List => {
            let config = Config::load()?;
            let items = config.list()?;
            for (key, value) in items {
                println!("{} = {}", key, value);
            }
        }
        ConfigAction::Reset => {
            Config::reset()?;
            if !quiet {
                println!("Configuration reset to defaults.");
            }
        }
        ConfigAction::Path => {
            let path = Config::config_path()?;
            println!("{}", path.display());
        }
    }
    Ok(())
}
