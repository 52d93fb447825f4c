//! Graph snapshot persistence
//!
//! A snapshot is a single JSON document:
//!
//! ```text
//! {
//!   "format_version": 1,
//!   "saved_at": "2026-01-01T00:00:00Z",
//!   "checksum": "<sha256 of the payload>",
//!   "payload": { "nodes": [...], "edges": [...] }
//! }
//! ```
//!
//! Nodes are stored in graph order and edges by endpoint key, so a loaded
//! graph iterates exactly like the saved one. The file is written to a
//! sibling temp file and renamed into place.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::Result;
use crate::domain::knowledge::{GraphEdge, GraphNode, KnowledgeGraph};
use crate::error::Error;

/// Current on-disk format version
pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

/// Default snapshot file name inside the data directory
pub const SNAPSHOT_FILE: &str = "graph.json";

/// Node and edge lists of one graph
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

impl GraphSnapshot {
    /// Capture a graph
    pub fn capture(graph: &KnowledgeGraph) -> Self {
        Self {
            nodes: graph.nodes().cloned().collect(),
            edges: graph.edges().collect(),
        }
    }

    /// Rebuild the graph; every edge must reference a stored node
    pub fn restore(self) -> Result<KnowledgeGraph> {
        let mut graph = KnowledgeGraph::new();
        for node in self.nodes {
            let key = node.key();
            if graph.contains(key) {
                return Err(Error::SnapshotCorrupt(format!("duplicate node {}", key)));
            }
            graph.upsert_node(node);
        }
        for edge in self.edges {
            if !graph.add_edge(edge.source, edge.target, edge.relation) {
                return Err(Error::SnapshotCorrupt(format!(
                    "edge {} -> {} references a missing node",
                    edge.source, edge.target
                )));
            }
        }
        Ok(graph)
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct SnapshotEnvelope {
    format_version: u32,
    saved_at: DateTime<Utc>,
    checksum: String,
    payload: serde_json::Value,
}

/// Summary of a snapshot file, without the graph
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SnapshotInfo {
    pub path: PathBuf,
    pub format_version: u32,
    pub saved_at: DateTime<Utc>,
    pub checksum: String,
}

/// Compute SHA-256 hash of content
pub fn compute_content_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}

/// Persist a graph to `path`
///
/// Parent directories are created. An existing snapshot is replaced only
/// once the new file is completely written.
pub fn save_graph(graph: &KnowledgeGraph, path: &Path) -> Result<SnapshotInfo> {
    let payload = serde_json::to_value(GraphSnapshot::capture(graph))?;
    let envelope = SnapshotEnvelope {
        format_version: SNAPSHOT_FORMAT_VERSION,
        saved_at: Utc::now(),
        checksum: compute_content_hash(&payload.to_string()),
        payload,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let tmp_path = temp_path(path);
    fs::write(&tmp_path, serde_json::to_vec(&envelope)?)?;
    if let Err(e) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(Error::Io(e));
    }

    info!(
        path = %path.display(),
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        "Graph snapshot saved"
    );

    Ok(SnapshotInfo {
        path: path.to_path_buf(),
        format_version: envelope.format_version,
        saved_at: envelope.saved_at,
        checksum: envelope.checksum,
    })
}

/// Load a graph saved by [`save_graph`]
pub fn load_graph(path: &Path) -> Result<KnowledgeGraph> {
    let envelope = read_envelope(path)?;
    verify(&envelope)?;

    let snapshot: GraphSnapshot = serde_json::from_value(envelope.payload)
        .map_err(|e| Error::SnapshotCorrupt(format!("invalid payload: {}", e)))?;
    let graph = snapshot.restore()?;

    debug!(
        path = %path.display(),
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        "Graph snapshot loaded"
    );
    Ok(graph)
}

/// Read and verify the snapshot header without rebuilding the graph
pub fn snapshot_info(path: &Path) -> Result<SnapshotInfo> {
    let envelope = read_envelope(path)?;
    verify(&envelope)?;
    Ok(SnapshotInfo {
        path: path.to_path_buf(),
        format_version: envelope.format_version,
        saved_at: envelope.saved_at,
        checksum: envelope.checksum,
    })
}

fn read_envelope(path: &Path) -> Result<SnapshotEnvelope> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(Error::SnapshotNotFound(path.to_path_buf()));
        }
        Err(e) => return Err(Error::Io(e)),
    };
    serde_json::from_slice(&bytes)
        .map_err(|e| Error::SnapshotCorrupt(format!("{}: {}", path.display(), e)))
}

fn verify(envelope: &SnapshotEnvelope) -> Result<()> {
    if envelope.format_version != SNAPSHOT_FORMAT_VERSION {
        return Err(Error::SnapshotVersion {
            found: envelope.format_version,
            expected: SNAPSHOT_FORMAT_VERSION,
        });
    }
    let actual = compute_content_hash(&envelope.payload.to_string());
    if actual != envelope.checksum {
        return Err(Error::SnapshotCorrupt(format!(
            "checksum mismatch (expected {}, found {})",
            envelope.checksum, actual
        )));
    }
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
