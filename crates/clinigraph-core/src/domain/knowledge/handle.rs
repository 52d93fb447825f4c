//! Shared ownership of the current graph
//!
//! Queries take an `Arc` to the graph installed at the time of the call and
//! keep working against it even if a rebuild or reload swaps in a new one.
//! Replacements always install a whole graph; there is no partial update.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{debug, info, warn};

use super::builder::build_with_summary;
use super::entity::{Association, Concept};
use super::graph::KnowledgeGraph;
use crate::Result;
use crate::error::Error;
use crate::storage::snapshot;

/// Holder of the current graph, swapped atomically
#[derive(Debug, Default)]
pub struct GraphHandle {
    graph: RwLock<Option<Arc<KnowledgeGraph>>>,
    generation: AtomicU64,
}

impl GraphHandle {
    /// Create a handle with no graph loaded
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a handle holding `graph`
    pub fn with_graph(graph: KnowledgeGraph) -> Self {
        let handle = Self::new();
        handle.replace(graph);
        handle
    }

    /// The graph currently installed, if any
    pub fn current(&self) -> Option<Arc<KnowledgeGraph>> {
        self.read().clone()
    }

    pub fn is_loaded(&self) -> bool {
        self.read().is_some()
    }

    /// Number of replacements installed so far
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Install a new graph, returning the previous one
    pub fn replace(&self, graph: KnowledgeGraph) -> Option<Arc<KnowledgeGraph>> {
        let mut slot = self.write();
        let previous = slot.replace(Arc::new(graph));
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(generation, "Graph replaced");
        previous
    }

    /// Drop the installed graph
    pub fn clear(&self) -> Option<Arc<KnowledgeGraph>> {
        let mut slot = self.write();
        self.generation.fetch_add(1, Ordering::SeqCst);
        slot.take()
    }

    /// Install `graph` only if nothing was installed since `generation`
    ///
    /// Returns `false` and drops the graph when it is stale.
    pub fn install_if_current(&self, generation: u64, graph: KnowledgeGraph) -> bool {
        let mut slot = self.write();
        if self.generation.load(Ordering::SeqCst) != generation {
            return false;
        }
        *slot = Some(Arc::new(graph));
        self.generation.fetch_add(1, Ordering::SeqCst);
        true
    }

    /// Build from records and install the result
    pub fn rebuild(
        &self,
        concepts: &[Concept],
        associations: &[Association],
    ) -> Arc<KnowledgeGraph> {
        let (graph, summary) = build_with_summary(concepts, associations);
        debug!(?summary, "Rebuild finished");
        let graph = Arc::new(graph);
        let mut slot = self.write();
        *slot = Some(Arc::clone(&graph));
        self.generation.fetch_add(1, Ordering::SeqCst);
        graph
    }

    /// Load a snapshot and install it
    ///
    /// On failure the previously installed graph stays in place.
    pub fn reload(&self, path: &Path) -> Result<Arc<KnowledgeGraph>> {
        let graph = match snapshot::load_graph(path) {
            Ok(graph) => Arc::new(graph),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Reload failed, keeping current graph");
                return Err(e);
            }
        };
        let mut slot = self.write();
        *slot = Some(Arc::clone(&graph));
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        drop(slot);
        info!(path = %path.display(), generation, "Graph reloaded from snapshot");
        Ok(graph)
    }

    /// Build on the blocking pool and install the result unless superseded
    ///
    /// Returns `Ok(false)` when another replacement happened while the build
    /// was running; the stale graph is discarded.
    pub async fn rebuild_in_background(
        &self,
        concepts: Vec<Concept>,
        associations: Vec<Association>,
    ) -> Result<bool> {
        let started_at = self.generation();
        let graph =
            tokio::task::spawn_blocking(move || build_with_summary(&concepts, &associations).0)
                .await
                .map_err(|e| Error::Other(format!("background rebuild failed: {}", e)))?;

        let installed = self.install_if_current(started_at, graph);
        if installed {
            info!(generation = self.generation(), "Background rebuild installed");
        } else {
            debug!(started_at, "Background rebuild discarded as stale");
        }
        Ok(installed)
    }

    fn read(&self) -> RwLockReadGuard<'_, Option<Arc<KnowledgeGraph>>> {
        self.graph.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Option<Arc<KnowledgeGraph>>> {
        self.graph.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
