//! Clinigraph Core Library
//!
//! This crate provides the knowledge graph engine behind Clinigraph:
//! - Graph construction from the concept and association tables
//! - Case subgraph extraction, co-occurrence mining, hierarchy expansion
//! - Snapshot persistence and the shared graph handle
//! - JSONL record store
//! - Configuration

pub mod commands;
pub mod config;
pub mod domain;
pub mod error;
pub mod storage;

pub use error::{Error, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::domain::knowledge::{
        Association, Concept, GraphHandle, KnowledgeGraph, NodeKey, Relation, build,
    };
    pub use crate::error::{Error, Result};
}
