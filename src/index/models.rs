//! Shared logical index model used by index backends.
//!
//! These types represent the persisted search-data index stored by
//! the backend implementations (file, SQLite).

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::models::{ResultLink, SearchKey, Section};

/// Logical schema version written into `IndexMeta`.
pub const INDEX_SCHEMA_VERSION: &str = "1";

/// Metadata for the entire index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexMeta {
    /// Schema version for the index on disk.
    pub schema_version: String,
    /// Version of the doxsearch tool that wrote the index.
    pub tool_version: String,
    /// Canonical search-directory root for this index, stored as an
    /// absolute path.
    #[serde(default)]
    pub root_path: String,
    /// Unix timestamp (seconds since epoch) when the index was created.
    pub created_at: u64,
    /// Unix timestamp (seconds since epoch) when the index was last updated.
    pub updated_at: u64,
}

impl IndexMeta {
    pub fn fresh(now: u64) -> Self {
        Self {
            schema_version: INDEX_SCHEMA_VERSION.to_string(),
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
            root_path: String::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Logical record for a single imported `searchData` file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileRecord {
    /// Stable numeric identifier for this file within the index.
    pub id: u64,
    /// Path to the file, as stored by the index.
    pub path: PathBuf,
    /// Section derived from the partition file name, when it has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section: Option<Section>,
    /// Partition number (`13` hex for `functions_13.js`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partition: Option<u32>,
    /// Last modification time, in seconds since Unix epoch.
    pub mtime: i64,
    /// File size in bytes.
    pub size: u64,
}

/// Logical record for a single `searchData` entry in the index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryRecord {
    /// Stable numeric identifier for this entry within the index.
    pub id: u64,
    /// Foreign key reference to the owning file.
    pub file_id: u64,
    pub key: SearchKey,
    pub display_name: String,
    #[serde(default)]
    pub links: Vec<ResultLink>,
}

/// Non-persisted representation of an entry ready to be inserted.
#[derive(Debug, Clone)]
pub struct NewEntryRecord {
    pub key: SearchKey,
    pub display_name: String,
    pub links: Vec<ResultLink>,
}

/// Query parameters for retrieving entries from an index backend.
#[derive(Debug, Clone, Default)]
pub struct EntryQuery {
    /// Only entries whose key stem starts with this prefix.
    pub stem_prefix: Option<String>,
    /// Only entries from files of these sections (empty = any).
    pub sections: Vec<Section>,
    /// One or more filesystem roots to restrict matches to.
    pub paths: Vec<PathBuf>,
    /// Inclusion globs applied to candidate files.
    pub globs: Vec<String>,
    /// Exclusion globs applied to candidate files.
    pub exclude_globs: Vec<String>,
}

impl EntryQuery {
    pub fn accepts_section(&self, section: Option<Section>) -> bool {
        self.sections.is_empty() || section.is_some_and(|s| self.sections.contains(&s))
    }

    pub fn accepts_stem(&self, stem: &str) -> bool {
        self.stem_prefix
            .as_deref()
            .map_or(true, |prefix| stem.starts_with(prefix))
    }
}
