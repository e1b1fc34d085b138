//! Index backend abstraction and helpers.
//!
//! The `IndexBackend` trait provides a common interface that the
//! search engine and CLI can use without depending on concrete
//! implementations.

use std::path::Path;

use anyhow::Result;

use crate::index::models::{EntryQuery, EntryRecord, FileRecord, IndexMeta, NewEntryRecord};
use crate::models::{IndexBackendKind, IndexConfig, Section};

/// Pluggable index backend used by the core engine.
pub trait IndexBackend {
    /// Kind of backend implementation.
    fn kind(&self) -> IndexBackendKind;

    /// Load index metadata.
    fn load_meta(&self) -> Result<IndexMeta>;

    /// Persist index metadata.
    fn save_meta(&mut self, meta: &IndexMeta) -> Result<()>;

    /// List all known files.
    fn list_files(&self) -> Result<Vec<FileRecord>>;

    /// Create or update a file record.
    fn upsert_file(
        &mut self,
        path: &Path,
        partition: Option<(Section, u32)>,
        mtime: i64,
        size: u64,
    ) -> Result<FileRecord>;

    /// Remove a file and any associated entries.
    fn remove_file_by_path(&mut self, path: &Path) -> Result<()>;

    /// Replace all entries for a given file with new records.
    fn set_file_entries(&mut self, file_id: u64, entries: &[NewEntryRecord]) -> Result<()>;

    /// Query entries using basic filters, ordered by file then position.
    fn query_entries(&self, query: &EntryQuery) -> Result<Vec<EntryRecord>>;

    /// Number of stored entries.
    fn count_entries(&self) -> Result<u64> {
        Ok(self.query_entries(&EntryQuery::default())?.len() as u64)
    }
}

/// Helper to construct an appropriate backend from a generic config.
pub fn open_backend(config: &IndexConfig) -> Result<Box<dyn IndexBackend>> {
    match config.backend {
        IndexBackendKind::File => Ok(Box::new(crate::index::FileIndexBackend::open(
            &config.index_path,
        )?)),
        IndexBackendKind::Sqlite => Ok(Box::new(crate::index::SqliteIndexBackend::open(
            &config.index_path,
        )?)),
    }
}
