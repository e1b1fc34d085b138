//! SQLite-based index backend.
//!
//! This backend stores the logical index model in a single SQLite
//! database file with the following schema:
//!
//! - `meta(key TEXT PRIMARY KEY, value TEXT NOT NULL)`
//! - `files(id INTEGER PRIMARY KEY, path TEXT UNIQUE, section TEXT, partition INTEGER,
//!          mtime INTEGER, size INTEGER)`
//! - `entries(id INTEGER PRIMARY KEY, file_id INTEGER, position INTEGER, stem TEXT,
//!            key_id INTEGER, display_name TEXT)`
//! - `links(id INTEGER PRIMARY KEY, entry_id INTEGER, position INTEGER, url TEXT,
//!          in_frame INTEGER, scope TEXT)`
//!
//! The backend uses write transactions for index updates and read-only
//! queries for search. The SQLite connection is configured with:
//!
//! - `journal_mode = WAL` for concurrent readers and a single writer.
//! - `synchronous = NORMAL` as a balance between safety and speed.
//! - `busy_timeout` to avoid transient `database is locked` errors.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use rusqlite::{params, Connection, OpenFlags, OptionalExtension, Row};

use crate::index::backend::IndexBackend;
use crate::index::build_globset;
use crate::index::models::{
    EntryQuery, EntryRecord, FileRecord, IndexMeta, NewEntryRecord, INDEX_SCHEMA_VERSION,
};
use crate::models::{IndexBackendKind, ResultLink, SearchKey, Section};

const FILE_COLUMNS: &str = "id, path, section, partition, mtime, size";

/// SQLite-backed implementation of `IndexBackend`.
pub struct SqliteIndexBackend {
    conn: Connection,
}

impl SqliteIndexBackend {
    /// Open (or create) a SQLite index at the given path.
    pub fn open(index_path: &Path) -> Result<Self> {
        if let Some(parent) = index_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE;
        let conn = Connection::open_with_flags(index_path, flags)?;

        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.busy_timeout(std::time::Duration::from_millis(5000))?;

        Self::initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    fn initialize_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS meta (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS files (
                id        INTEGER PRIMARY KEY,
                path      TEXT NOT NULL UNIQUE,
                section   TEXT,
                partition INTEGER,
                mtime     INTEGER NOT NULL,
                size      INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS entries (
                id           INTEGER PRIMARY KEY,
                file_id      INTEGER NOT NULL,
                position     INTEGER NOT NULL,
                stem         TEXT NOT NULL,
                key_id       INTEGER NOT NULL,
                display_name TEXT NOT NULL,
                FOREIGN KEY(file_id) REFERENCES files(id) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS links (
                id       INTEGER PRIMARY KEY,
                entry_id INTEGER NOT NULL,
                position INTEGER NOT NULL,
                url      TEXT NOT NULL,
                in_frame INTEGER NOT NULL,
                scope    TEXT NOT NULL,
                FOREIGN KEY(entry_id) REFERENCES entries(id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_entries_stem
                ON entries(stem);
            CREATE INDEX IF NOT EXISTS idx_entries_file_id
                ON entries(file_id);
            CREATE INDEX IF NOT EXISTS idx_links_entry_id
                ON links(entry_id);
        "#,
        )?;

        Ok(())
    }

    fn file_from_row(row: &Row<'_>) -> rusqlite::Result<(FileRecord, Option<String>)> {
        let id: i64 = row.get(0)?;
        let path: String = row.get(1)?;
        let section: Option<String> = row.get(2)?;
        let partition: Option<i64> = row.get(3)?;
        let mtime: i64 = row.get(4)?;
        let size: i64 = row.get(5)?;

        Ok((
            FileRecord {
                id: id as u64,
                path: PathBuf::from(path),
                section: None,
                partition: partition.map(|n| n as u32),
                mtime,
                size: size as u64,
            },
            section,
        ))
    }

    fn finish_file((mut record, section): (FileRecord, Option<String>)) -> Result<FileRecord> {
        record.section = match section {
            Some(name) => Some(name.parse::<Section>()?),
            None => None,
        };
        Ok(record)
    }

    fn load_files(&self) -> Result<Vec<FileRecord>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {FILE_COLUMNS} FROM files ORDER BY id ASC"))?;

        let rows = stmt.query_map([], Self::file_from_row)?;

        let mut files = Vec::new();
        for row in rows {
            files.push(Self::finish_file(row?)?);
        }

        Ok(files)
    }

    fn load_links(&self, entry_id: i64) -> Result<Vec<ResultLink>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT url, in_frame, scope FROM links WHERE entry_id = ?1 ORDER BY position ASC",
        )?;

        let rows = stmt.query_map(params![entry_id], |row| {
            let in_frame: i64 = row.get(1)?;
            Ok(ResultLink {
                url: row.get(0)?,
                in_frame: in_frame != 0,
                scope: row.get(2)?,
            })
        })?;

        let mut links = Vec::new();
        for row in rows {
            links.push(row?);
        }
        Ok(links)
    }
}

impl IndexBackend for SqliteIndexBackend {
    fn kind(&self) -> IndexBackendKind {
        IndexBackendKind::Sqlite
    }

    fn load_meta(&self) -> Result<IndexMeta> {
        let mut stmt = self.conn.prepare("SELECT key, value FROM meta")?;
        let rows = stmt.query_map([], |row| {
            let key: String = row.get(0)?;
            let value: String = row.get(1)?;
            Ok((key, value))
        })?;

        let mut map = HashMap::new();
        for row in rows {
            let (key, value) = row?;
            map.insert(key, value);
        }

        if map.is_empty() {
            return Ok(IndexMeta::fresh(crate::index::current_epoch_seconds()));
        }

        let schema_version = map
            .get("schema_version")
            .cloned()
            .unwrap_or_else(|| INDEX_SCHEMA_VERSION.to_string());

        if schema_version != INDEX_SCHEMA_VERSION {
            bail!(
                "unsupported index schema version {}; expected {}",
                schema_version,
                INDEX_SCHEMA_VERSION
            );
        }

        let tool_version = map
            .get("tool_version")
            .cloned()
            .unwrap_or_else(|| "unknown".to_string());

        let root_path = map.get("root_path").cloned().unwrap_or_default();

        let created_at = map
            .get("created_at")
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(0);
        let updated_at = map
            .get("updated_at")
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(created_at);

        Ok(IndexMeta {
            schema_version,
            tool_version,
            root_path,
            created_at,
            updated_at,
        })
    }

    fn save_meta(&mut self, meta: &IndexMeta) -> Result<()> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM meta", [])?;

        {
            let mut stmt = tx.prepare("INSERT INTO meta (key, value) VALUES (?1, ?2)")?;

            let rows = [
                ("schema_version", meta.schema_version.as_str()),
                ("tool_version", meta.tool_version.as_str()),
                ("root_path", meta.root_path.as_str()),
                ("created_at", &meta.created_at.to_string()),
                ("updated_at", &meta.updated_at.to_string()),
            ];

            for (key, value) in rows {
                stmt.execute(params![key, value])?;
            }
        }

        tx.commit()?;
        Ok(())
    }

    fn list_files(&self) -> Result<Vec<FileRecord>> {
        self.load_files()
    }

    fn upsert_file(
        &mut self,
        path: &Path,
        partition: Option<(Section, u32)>,
        mtime: i64,
        size: u64,
    ) -> Result<FileRecord> {
        let path_str = path.to_string_lossy().to_string();
        let section = partition.map(|(section, _)| section);
        let section_name = section.map(|s| s.prefix());
        let number = partition.map(|(_, n)| n as i64);

        let tx = self.conn.transaction()?;

        let existing: Option<i64> = tx
            .query_row(
                "SELECT id FROM files WHERE path = ?1",
                params![path_str],
                |row| row.get(0),
            )
            .optional()?;

        let id = match existing {
            Some(id) => {
                tx.execute(
                    "UPDATE files SET section = ?1, partition = ?2, mtime = ?3, size = ?4 WHERE id = ?5",
                    params![section_name, number, mtime, size as i64, id],
                )?;
                id
            }
            None => {
                tx.execute(
                    "INSERT INTO files (path, section, partition, mtime, size) VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![path_str, section_name, number, mtime, size as i64],
                )?;
                tx.last_insert_rowid()
            }
        };

        tx.commit()?;

        Ok(FileRecord {
            id: id as u64,
            path: PathBuf::from(path_str),
            section,
            partition: partition.map(|(_, n)| n),
            mtime,
            size,
        })
    }

    fn remove_file_by_path(&mut self, path: &Path) -> Result<()> {
        let path_str = path.to_string_lossy().to_string();
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM files WHERE path = ?1", params![path_str])?;
        tx.commit()?;
        Ok(())
    }

    fn set_file_entries(&mut self, file_id: u64, entries: &[NewEntryRecord]) -> Result<()> {
        let tx = self.conn.transaction()?;

        tx.execute(
            "DELETE FROM entries WHERE file_id = ?1",
            params![file_id as i64],
        )?;

        {
            let mut entry_stmt = tx.prepare(
                "INSERT INTO entries (file_id, position, stem, key_id, display_name)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            let mut link_stmt = tx.prepare(
                "INSERT INTO links (entry_id, position, url, in_frame, scope)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;

            for (position, entry) in entries.iter().enumerate() {
                let entry_id = entry_stmt.insert(params![
                    file_id as i64,
                    position as i64,
                    entry.key.stem,
                    entry.key.id as i64,
                    entry.display_name,
                ])?;

                for (link_position, link) in entry.links.iter().enumerate() {
                    link_stmt.execute(params![
                        entry_id,
                        link_position as i64,
                        link.url,
                        link.in_frame as i64,
                        link.scope,
                    ])?;
                }
            }
        }

        tx.commit()?;
        Ok(())
    }

    fn query_entries(&self, query: &EntryQuery) -> Result<Vec<EntryRecord>> {
        let files_by_id: HashMap<u64, FileRecord> = self
            .load_files()?
            .into_iter()
            .map(|f| (f.id, f))
            .collect();

        let include_globs = build_globset(&query.globs)?;
        let exclude_globs = build_globset(&query.exclude_globs)?;

        // `substr` keeps `_` in stems literal, unlike LIKE.
        let mut stmt = self.conn.prepare(
            "SELECT id, file_id, stem, key_id, display_name
             FROM entries
             WHERE (?1 IS NULL OR substr(stem, 1, length(?1)) = ?1)
             ORDER BY file_id ASC, position ASC",
        )?;

        let prefix_param: Option<&str> = query.stem_prefix.as_deref();

        let rows = stmt.query_map(params![prefix_param], |row| {
            let id: i64 = row.get(0)?;
            let file_id: i64 = row.get(1)?;
            let stem: String = row.get(2)?;
            let key_id: i64 = row.get(3)?;
            let display_name: String = row.get(4)?;
            Ok((id, file_id, stem, key_id, display_name))
        })?;

        let mut results = Vec::new();

        for row in rows {
            let (id, file_id, stem, key_id, display_name) = row?;

            let file_id_u64 = file_id as u64;
            let file_record = match files_by_id.get(&file_id_u64) {
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

            results.push(EntryRecord {
                id: id as u64,
                file_id: file_id_u64,
                key: SearchKey::new(stem, key_id as u64),
                display_name,
                links: self.load_links(id)?,
            });
        }

        Ok(results)
    }

    fn count_entries(&self) -> Result<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM entries", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}
