//! Core search engine module.
//!
//! This module hosts the `run_search` implementation and the query DSL
//! used by the CLI and daemon.

pub mod engine;
pub mod query;

pub use engine::{build_hit, run_search, DEFAULT_INDEX_DIR, DEFAULT_SQLITE_FILE};
