//! Storage layer - JSONL record store + graph snapshots
//!
//! # Architecture
//!
//! - `jsonl`: the concept and association tables as JSON Lines files
//! - `snapshot`: checksummed, versioned persistence of a built graph
//!
//! # Usage
//!
//! ```ignore
//! use clinigraph_core::storage::{RecordSet, save_graph, load_graph};
//! use clinigraph_core::domain::knowledge::build;
//!
//! let records = RecordSet::from_default_dir(dir)?;
//! let graph = build(&records.concepts, &records.associations);
//! save_graph(&graph, &snapshot_path)?;
//! let graph = load_graph(&snapshot_path)?;
//! ```

pub mod jsonl;
pub mod snapshot;

pub use jsonl::{ASSOCIATIONS_FILE, CONCEPTS_FILE, RecordSet, read_jsonl, write_jsonl};
pub use snapshot::{
    GraphSnapshot, SNAPSHOT_FILE, SNAPSHOT_FORMAT_VERSION, SnapshotInfo, compute_content_hash,
    load_graph, save_graph, snapshot_info,
};
