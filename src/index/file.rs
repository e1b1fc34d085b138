//! File-based index backend.
//!
//! This backend stores index data under a `.doxsearch/` directory:
//! - `meta.json`
//! - `files.jsonl`
//! - `entries.jsonl`
//!
//! It uses sequential scans and full rewrites of the JSONL files when
//! updating entries.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use crate::index::backend::IndexBackend;
use crate::index::build_globset;
use crate::index::models::{
    EntryQuery, EntryRecord, FileRecord, IndexMeta, NewEntryRecord, INDEX_SCHEMA_VERSION,
};
use crate::models::{IndexBackendKind, Section};

const META_FILE: &str = "meta.json";
const FILES_FILE: &str = "files.jsonl";
const ENTRIES_FILE: &str = "entries.jsonl";

type FileMaps = (
    Vec<FileRecord>,
    HashMap<PathBuf, FileRecord>,
    HashMap<u64, FileRecord>,
);

/// File-backed implementation of `IndexBackend`.
pub struct FileIndexBackend {
    root: PathBuf,
    meta: Option<IndexMeta>,
    files: Vec<FileRecord>,
    files_by_path: HashMap<PathBuf, FileRecord>,
    files_by_id: HashMap<u64, FileRecord>,
    next_file_id: u64,
    next_entry_id: u64,
}

impl FileIndexBackend {
    /// Open (or create) a file-based index at the given directory.
    pub fn open(index_path: &Path) -> Result<Self> {
        fs::create_dir_all(index_path)
            .with_context(|| format!("failed to create index directory {}", index_path.display()))?;

        let meta_path = index_path.join(META_FILE);
        let meta = if meta_path.exists() {
            let file = File::open(&meta_path)?;
            let meta: IndexMeta = serde_json::from_reader(file)
                .with_context(|| format!("failed to read {}", meta_path.display()))?;
            if meta.schema_version != INDEX_SCHEMA_VERSION {
                bail!(
                    "unsupported index schema version {}; expected {}",
                    meta.schema_version,
                    INDEX_SCHEMA_VERSION
                );
            }
            Some(meta)
        } else {
            None
        };

        let (files, files_by_path, files_by_id) = Self::load_files(index_path)?;
        let (next_file_id, next_entry_id) = Self::compute_next_ids(index_path, &files)?;

        Ok(Self {
            root: index_path.to_path_buf(),
            meta,
            files,
            files_by_path,
            files_by_id,
            next_file_id,
            next_entry_id,
        })
    }

    fn meta_path(&self) -> PathBuf {
        self.root.join(META_FILE)
    }

    fn files_path(&self) -> PathBuf {
        self.root.join(FILES_FILE)
    }

    fn entries_path(&self) -> PathBuf {
        self.root.join(ENTRIES_FILE)
    }

    fn load_files(root: &Path) -> Result<FileMaps> {
        let path = root.join(FILES_FILE);
        if !path.exists() {
            return Ok((Vec::new(), HashMap::new(), HashMap::new()));
        }

        let mut files = Vec::new();
        let mut by_path = HashMap::new();
        let mut by_id = HashMap::new();

        for record in read_jsonl::<FileRecord>(&path)? {
            by_path.insert(record.path.clone(), record.clone());
            by_id.insert(record.id, record.clone());
            files.push(record);
        }

        Ok((files, by_path, by_id))
    }

    fn compute_next_ids(root: &Path, files: &[FileRecord]) -> Result<(u64, u64)> {
        let mut max_file_id = files.iter().map(|f| f.id).max().unwrap_or(0);
        let mut max_entry_id: u64 = 0;

        let entries_path = root.join(ENTRIES_FILE);
        if entries_path.exists() {
            for record in read_jsonl::<EntryRecord>(&entries_path)? {
                max_entry_id = max_entry_id.max(record.id);
                max_file_id = max_file_id.max(record.file_id);
            }
        }

        Ok((max_file_id.saturating_add(1), max_entry_id.saturating_add(1)))
    }

    fn persist_files(&self) -> Result<()> {
        let path = self.files_path();
        let tmp_path = path.with_extension("jsonl.tmp");

        let file = File::create(&tmp_path)?;
        let mut writer = BufWriter::new(file);

        for record in &self.files {
            serde_json::to_writer(&mut writer, record)?;
            writer.write_all(b"\n")?;
        }

        writer.flush()?;
        fs::rename(tmp_path, path)?;
        Ok(())
    }

    fn persist_meta(&self, meta: &IndexMeta) -> Result<()> {
        let file = File::create(self.meta_path())?;
        serde_json::to_writer(file, meta)?;
        Ok(())
    }

    /// Rewrite `entries.jsonl` without `file_id`'s entries, appending
    /// `replacement` in their place.
    fn rewrite_entries(&mut self, file_id: u64, replacement: &[NewEntryRecord]) -> Result<()> {
        let path = self.entries_path();
        let tmp_path = path.with_extension("jsonl.tmp");

        let out_file = File::create(&tmp_path)?;
        let mut writer = BufWriter::new(out_file);

        if path.exists() {
            for record in read_jsonl::<EntryRecord>(&path)? {
                if record.file_id == file_id {
                    continue;
                }
                serde_json::to_writer(&mut writer, &record)?;
                writer.write_all(b"\n")?;
            }
        }

        let mut next_id = self.next_entry_id;
        for entry in replacement {
            let record = EntryRecord {
                id: next_id,
                file_id,
                key: entry.key.clone(),
                display_name: entry.display_name.clone(),
                links: entry.links.clone(),
            };
            next_id = next_id.saturating_add(1);

            serde_json::to_writer(&mut writer, &record)?;
            writer.write_all(b"\n")?;
        }

        writer.flush()?;
        fs::rename(tmp_path, path)?;

        self.next_entry_id = next_id;
        Ok(())
    }

    fn allocate_file_id(&mut self) -> u64 {
        let id = self.next_file_id;
        self.next_file_id = self.next_file_id.saturating_add(1);
        id
    }
}

fn read_jsonl<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);

    let mut records = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let record = serde_json::from_str(&line)
            .with_context(|| format!("{}:{}: invalid record", path.display(), idx + 1))?;
        records.push(record);
    }
    Ok(records)
}

impl IndexBackend for FileIndexBackend {
    fn kind(&self) -> IndexBackendKind {
        IndexBackendKind::File
    }

    fn load_meta(&self) -> Result<IndexMeta> {
        match &self.meta {
            Some(meta) => Ok(meta.clone()),
            None => Ok(IndexMeta::fresh(crate::index::current_epoch_seconds())),
        }
    }

    fn save_meta(&mut self, meta: &IndexMeta) -> Result<()> {
        self.meta = Some(meta.clone());
        self.persist_meta(meta)
    }

    fn list_files(&self) -> Result<Vec<FileRecord>> {
        Ok(self.files.clone())
    }

    fn upsert_file(
        &mut self,
        path: &Path,
        partition: Option<(Section, u32)>,
        mtime: i64,
        size: u64,
    ) -> Result<FileRecord> {
        let path_buf = path.to_path_buf();
        let existing = self.files_by_path.get(&path_buf).cloned();

        let record = FileRecord {
            id: match &existing {
                Some(record) => record.id,
                None => self.allocate_file_id(),
            },
            path: path_buf.clone(),
            section: partition.map(|(section, _)| section),
            partition: partition.map(|(_, number)| number),
            mtime,
            size,
        };

        match existing {
            Some(existing) => {
                if let Some(slot) = self.files.iter_mut().find(|f| f.id == existing.id) {
                    *slot = record.clone();
                }
            }
            None => self.files.push(record.clone()),
        }

        self.files_by_path.insert(path_buf, record.clone());
        self.files_by_id.insert(record.id, record.clone());

        self.persist_files()?;

        Ok(record)
    }

    fn remove_file_by_path(&mut self, path: &Path) -> Result<()> {
        if let Some(record) = self.files_by_path.remove(path) {
            self.files.retain(|f| f.id != record.id);
            self.files_by_id.remove(&record.id);
            self.persist_files()?;
            self.rewrite_entries(record.id, &[])?;
        }

        Ok(())
    }

    fn set_file_entries(&mut self, file_id: u64, entries: &[NewEntryRecord]) -> Result<()> {
        self.rewrite_entries(file_id, entries)
    }

    fn query_entries(&self, query: &EntryQuery) -> Result<Vec<EntryRecord>> {
        let path = self.entries_path();
        if !path.exists() {
            return Ok(Vec::new());
        }

        let include_globs = build_globset(&query.globs)?;
        let exclude_globs = build_globset(&query.exclude_globs)?;

        let mut results = Vec::new();

        for record in read_jsonl::<EntryRecord>(&path)? {
            if !query.accepts_stem(&record.key.stem) {
                continue;
            }

            let file_record = match self.files_by_id.get(&record.file_id) {
                Some(f) => f,
                None => continue,
            };

            if !query.accepts_section(file_record.section) {
                continue;
            }

            let file_path = &file_record.path;

            if !query.paths.is_empty()
                && !query.paths.iter().any(|root| file_path.starts_with(root))
            {
                continue;
            }

            if let Some(set) = &include_globs {
                if !set.is_match(file_path) {
                    continue;
                }
            }

            if let Some(set) = &exclude_globs {
                if set.is_match(file_path) {
                    continue;
                }
            }

            results.push(record);
        }

        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ResultLink, SearchKey};
    use tempfile::tempdir;

    fn entry(stem: &str, id: u64, name: &str) -> NewEntryRecord {
        NewEntryRecord {
            key: SearchKey::new(stem, id),
            display_name: name.to_string(),
            links: vec![ResultLink {
                url: format!("../classX.html#{stem}"),
                in_frame: true,
                scope: format!("X::{name}()"),
            }],
        }
    }

    #[test]
    fn file_backend_persists_files_and_entries() {
        let dir = tempdir().expect("tempdir");
        let index_root = dir.path().join(".doxsearch");

        let mut backend = FileIndexBackend::open(&index_root).expect("backend");

        let file = backend
            .upsert_file(
                Path::new("html/search/functions_0.js"),
                Some((Section::Functions, 0)),
                1_700_000_000,
                42,
            )
            .expect("file record");

        assert_eq!(file.id, 1);
        assert_eq!(file.section, Some(Section::Functions));

        backend
            .set_file_entries(
                file.id,
                &[entry("addebbc", 3631, "addEbBc"), entry("advance", 3641, "advance")],
            )
            .expect("set entries");

        let query = EntryQuery {
            stem_prefix: Some("add".to_string()),
            sections: vec![Section::Functions],
            paths: vec![PathBuf::from("html")],
            ..EntryQuery::default()
        };

        let results = backend.query_entries(&query).expect("query entries");
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].display_name, "addEbBc");

        let other_section = EntryQuery {
            sections: vec![Section::Classes],
            ..EntryQuery::default()
        };
        assert!(backend.query_entries(&other_section).expect("query").is_empty());

        // Reopening sees the same data and continues the id sequence.
        let mut reopened = FileIndexBackend::open(&index_root).expect("reopen");
        assert_eq!(reopened.count_entries().expect("count"), 2);
        reopened
            .set_file_entries(file.id, &[entry("axby", 3707, "axby")])
            .expect("replace entries");
        let all = reopened.query_entries(&EntryQuery::default()).expect("query");
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].id, 3);

        // Removing the file should also remove its entries.
        reopened
            .remove_file_by_path(Path::new("html/search/functions_0.js"))
            .expect("remove file");

        assert!(reopened.list_files().expect("list files").is_empty());
        assert_eq!(reopened.count_entries().expect("count"), 0);
    }
}
