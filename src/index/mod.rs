//! Indexing backends and related types.
//!
//! This module defines the shared logical index model plus the
//! pluggable backend abstraction used by both the CLI `doxsearch
//! index` command and `--use-index` search integration.
//!
//! Two backends share the same logical model: a file backend that
//! stores JSON/JSONL files under `.doxsearch/`, and a SQLite backend.

mod backend;
mod file;
pub mod models;
mod sqlite;

pub use backend::{open_backend, IndexBackend};
pub use file::FileIndexBackend;
pub use models::{EntryQuery, EntryRecord, FileRecord, IndexMeta, NewEntryRecord};
pub use sqlite::SqliteIndexBackend;

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{bail, Result};
use globset::{Glob, GlobSet};

use crate::models::{IndexBackendKind, IndexConfig, IndexSummary};
use crate::searchdata;

/// Run indexing for the given configuration using the configured backend.
pub fn run_index(config: IndexConfig) -> Result<IndexSummary> {
    let mut backend = backend::open_backend(&config)?;
    build_index(backend.as_mut(), &config)
}

/// Read-only helper to inspect an existing index without modifying it.
///
/// This function opens the configured backend, reads its metadata, and
/// computes aggregate file and entry counts. It does not create or
/// update any on-disk index data.
pub fn get_index_info(config: &IndexConfig) -> Result<IndexSummary> {
    if !config.index_path.exists() {
        bail!("index not found at {}", config.index_path.display());
    }
    match config.backend {
        IndexBackendKind::File if !config.index_path.is_dir() => bail!(
            "file backend requires index_path to be a directory; got {}",
            config.index_path.display()
        ),
        IndexBackendKind::Sqlite if !config.index_path.is_file() => bail!(
            "sqlite backend requires index_path to be a file; got {}",
            config.index_path.display()
        ),
        _ => {}
    }

    let backend = backend::open_backend(config)?;

    let meta = backend
        .load_meta()
        .unwrap_or_else(|_| IndexMeta::fresh(current_epoch_seconds()));

    let files_indexed = backend.list_files()?.len() as u64;
    let entries_indexed = backend.count_entries()?;

    Ok(IndexSummary {
        backend: backend.kind(),
        index_path: config.index_path.clone(),
        files_indexed,
        entries_indexed,
        root_path: (!meta.root_path.is_empty()).then_some(meta.root_path),
        schema_version: Some(meta.schema_version),
        tool_version: Some(meta.tool_version),
        created_at: format_timestamp_iso8601(meta.created_at),
        updated_at: format_timestamp_iso8601(meta.updated_at),
    })
}

/// Core indexing routine shared between the CLI, tests, and the daemon.
///
/// A file is re-parsed only when its mtime or size changed since the
/// last run. Files that no longer exist under the indexed paths are
/// dropped together with their entries.
pub(crate) fn build_index(
    backend: &mut dyn backend::IndexBackend,
    config: &IndexConfig,
) -> Result<IndexSummary> {
    if config.paths.is_empty() {
        bail!("at least one index path is required");
    }

    for path in &config.paths {
        if !path.exists() {
            bail!("index path does not exist: {}", path.display());
        }
    }

    let canonical_root = config.paths[0]
        .canonicalize()
        .unwrap_or_else(|_| config.paths[0].clone());

    let mut meta = backend
        .load_meta()
        .unwrap_or_else(|_| IndexMeta::fresh(current_epoch_seconds()));

    if meta.root_path.is_empty() {
        meta.root_path = canonical_root.to_string_lossy().to_string();
    } else if let Ok(stored_root) = PathBuf::from(&meta.root_path).canonicalize() {
        if stored_root != canonical_root {
            bail!(
                "index root_path mismatch: index was created with root {}, but {} was requested",
                stored_root.display(),
                canonical_root.display()
            );
        }
    }

    let discovered = searchdata::discover(&config.paths, &config.globs, &config.exclude_globs)?;

    let existing_files = backend.list_files()?;
    let existing_by_path: HashMap<PathBuf, FileRecord> = existing_files
        .iter()
        .map(|f| (f.path.clone(), f.clone()))
        .collect();
    let mut seen_paths = HashSet::new();

    let mut files_indexed: u64 = 0;
    let mut entries_indexed: u64 = 0;

    for path in &discovered.partitions {
        let metadata = match std::fs::metadata(path) {
            Ok(m) => m,
            Err(err) => {
                tracing::debug!("skipping {}: {err}", path.display());
                continue;
            }
        };

        let mtime = metadata
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0);
        let size = metadata.len();

        seen_paths.insert(path.clone());

        let needs_reindex = match existing_by_path.get(path) {
            Some(file_record) => file_record.mtime != mtime || file_record.size != size,
            None => true,
        };

        if !needs_reindex {
            continue;
        }

        let parsed = match searchdata::load_file(path) {
            Ok(parsed) => parsed,
            Err(err) => {
                tracing::warn!("not indexing {}: {err:#}", path.display());
                if existing_by_path.contains_key(path) {
                    backend.remove_file_by_path(path)?;
                }
                continue;
            }
        };

        let partition = searchdata::partition_of(path).map(|p| (p.section, p.number));
        let file_record = backend.upsert_file(path, partition, mtime, size)?;

        let new_entries: Vec<NewEntryRecord> = parsed
            .entries
            .into_iter()
            .map(|e| NewEntryRecord {
                key: e.key,
                display_name: e.display_name,
                links: e.links,
            })
            .collect();

        backend.set_file_entries(file_record.id, &new_entries)?;

        files_indexed += 1;
        entries_indexed += new_entries.len() as u64;
    }

    for file in existing_files {
        if !seen_paths.contains(&file.path) && path_within_any(&file.path, &config.paths) {
            tracing::debug!("dropping stale index file {}", file.path.display());
            backend.remove_file_by_path(&file.path)?;
        }
    }

    meta.updated_at = current_epoch_seconds();
    backend.save_meta(&meta)?;

    tracing::info!(
        "indexed {files_indexed} file(s), {entries_indexed} entr(ies) into {}",
        config.index_path.display()
    );

    Ok(IndexSummary {
        backend: backend.kind(),
        index_path: config.index_path.clone(),
        files_indexed,
        entries_indexed,
        root_path: Some(meta.root_path),
        schema_version: Some(meta.schema_version),
        tool_version: Some(meta.tool_version),
        created_at: format_timestamp_iso8601(meta.created_at),
        updated_at: format_timestamp_iso8601(meta.updated_at),
    })
}

fn path_within_any(path: &Path, roots: &[PathBuf]) -> bool {
    roots.iter().any(|root| path.starts_with(root))
}

pub(crate) fn build_globset(patterns: &[String]) -> Result<Option<GlobSet>> {
    if patterns.is_empty() {
        return Ok(None);
    }

    let mut builder = globset::GlobSetBuilder::new();
    for pat in patterns {
        builder.add(Glob::new(pat)?);
    }
    Ok(Some(builder.build()?))
}

pub(crate) fn current_epoch_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

fn format_timestamp_iso8601(secs: u64) -> Option<String> {
    use time::{format_description::well_known::Rfc3339, OffsetDateTime};

    let dt = OffsetDateTime::from_unix_timestamp(secs as i64).ok()?;
    Some(dt.format(&Rfc3339).unwrap_or_else(|_| dt.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    const FUNCTIONS_13: &str = include_str!("../../tests/fixtures/doxygen_search/functions_13.js");

    fn config(root: &Path, backend: IndexBackendKind) -> IndexConfig {
        let index_path = match backend {
            IndexBackendKind::File => root.join("idx"),
            IndexBackendKind::Sqlite => root.join("idx.sqlite"),
        };
        IndexConfig {
            paths: vec![root.join("search")],
            globs: Vec::new(),
            exclude_globs: Vec::new(),
            backend,
            index_path,
        }
    }

    fn write_site(root: &Path) {
        let search = root.join("search");
        fs::create_dir_all(&search).expect("mkdir");
        fs::write(search.join("functions_13.js"), FUNCTIONS_13).expect("write");
        fs::write(search.join("search.js"), "function SearchBox() {}").expect("write");
    }

    #[test]
    fn indexing_is_incremental_for_both_backends() {
        for kind in [IndexBackendKind::File, IndexBackendKind::Sqlite] {
            let dir = tempdir().expect("tempdir");
            write_site(dir.path());
            let cfg = config(dir.path(), kind);

            let first = run_index(cfg.clone()).expect("first index");
            assert_eq!(first.files_indexed, 1);
            assert_eq!(first.entries_indexed, 25);
            assert!(first.root_path.is_some());

            let second = run_index(cfg.clone()).expect("second index");
            assert_eq!(second.files_indexed, 0);
            assert_eq!(second.entries_indexed, 0);

            let info = get_index_info(&cfg).expect("info");
            assert_eq!(info.backend, kind);
            assert_eq!(info.files_indexed, 1);
            assert_eq!(info.entries_indexed, 25);
            assert!(info.created_at.is_some());

            fs::remove_file(dir.path().join("search").join("functions_13.js")).expect("rm");
            run_index(cfg.clone()).expect("third index");
            let info = get_index_info(&cfg).expect("info");
            assert_eq!(info.files_indexed, 0);
            assert_eq!(info.entries_indexed, 0);
        }
    }

    #[test]
    fn unparsable_files_are_skipped() {
        let dir = tempdir().expect("tempdir");
        write_site(dir.path());
        fs::write(dir.path().join("search").join("classes_0.js"), "var searchData=[[").expect("write");

        let summary = run_index(config(dir.path(), IndexBackendKind::File)).expect("index");
        assert_eq!(summary.files_indexed, 1);
    }

    #[test]
    fn files_that_break_drop_their_entries() {
        for kind in [IndexBackendKind::File, IndexBackendKind::Sqlite] {
            let dir = tempdir().expect("tempdir");
            write_site(dir.path());
            let cfg = config(dir.path(), kind);
            run_index(cfg.clone()).expect("first index");

            fs::write(dir.path().join("search").join("functions_13.js"), "var searchData=[[")
                .expect("overwrite");
            let summary = run_index(cfg.clone()).expect("second index");
            assert_eq!(summary.files_indexed, 0);

            let info = get_index_info(&cfg).expect("info");
            assert_eq!(info.files_indexed, 0);
            assert_eq!(info.entries_indexed, 0);

            let search = crate::models::SearchConfig {
                pattern: "tagcells".to_string(),
                paths: cfg.paths.clone(),
                globs: Vec::new(),
                exclude_globs: Vec::new(),
                sections: Vec::new(),
                literal: false,
                limit: None,
                reindex_on_search: false,
                index: Some(cfg.clone()),
                query_expr: None,
            };
            let result = crate::search::engine::run_search(search).expect("search");
            assert!(result.hits.is_empty());
        }
    }

    #[test]
    fn index_refuses_a_different_root() {
        let dir = tempdir().expect("tempdir");
        write_site(dir.path());
        let cfg = config(dir.path(), IndexBackendKind::File);
        run_index(cfg.clone()).expect("index");

        let other = dir.path().join("other");
        fs::create_dir_all(&other).expect("mkdir");
        let mut moved = cfg;
        moved.paths = vec![other];

        let err = run_index(moved).expect_err("root mismatch");
        assert!(err.to_string().contains("root_path mismatch"));
    }

    #[test]
    fn index_info_reports_missing_index() {
        let dir = tempdir().expect("tempdir");
        let cfg = config(dir.path(), IndexBackendKind::Sqlite);
        let err = get_index_info(&cfg).expect_err("missing");
        assert!(err.to_string().contains("index not found"));
    }
}
