//! Domain layer
//!
//! Contains the core graph model and its queries.

pub mod knowledge;
