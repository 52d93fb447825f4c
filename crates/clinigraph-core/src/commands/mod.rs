//! Commands module - graph operations as library functions
//!
//! These commands are used by the CLI.

pub mod graph;
