//! Doxygen client-side search data.
//!
//! Doxygen writes one `searchData` array per `<section>_<n>.js` file
//! under `html/search/`, plus a `searchdata.js` describing which
//! sections and leading characters exist. This module parses and
//! writes both file kinds and discovers them on disk.

mod key;
mod label;
mod parser;
mod sections;
mod writer;

pub use key::{decode_stem, search_stem, stem_matches_name};
pub use label::{decode_html, encode_html, CompoundKind, CompoundRef, LinkTarget, ScopeLabel};
pub use parser::{parse_search_data, parse_section_index};
pub use sections::{partition_char, IndexedSection, PartitionName, Section, SectionIndex};
pub use writer::{write_search_data, write_section_index};

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use ignore::WalkBuilder;
use serde::Serialize;
use thiserror::Error;

use crate::index::build_globset;
use crate::models::SearchEntry;

/// Name of the per-site section table written next to the partitions.
pub const SECTION_INDEX_FILE: &str = "searchdata.js";

#[derive(Debug, Error)]
pub enum SearchDataError {
    #[error("failed to load JavaScript grammar: {0}")]
    Grammar(String),
    #[error("tree-sitter produced no syntax tree")]
    NoTree,
    #[error("JavaScript syntax error near line {line}")]
    Syntax { line: usize },
    #[error("no `{0}` declaration found")]
    MissingDeclaration(&'static str),
    #[error("`{name}` must be {expected}, found {found}")]
    UnexpectedValue {
        name: &'static str,
        expected: &'static str,
        found: String,
    },
    #[error("entry {index}: {reason}")]
    MalformedEntry { index: usize, reason: String },
    #[error("invalid search key `{0}`: {1}")]
    InvalidKey(String, &'static str),
    #[error("unknown section `{0}`")]
    UnknownSection(String),
}

pub type SearchDataResult<T> = Result<T, SearchDataError>;

/// Decoded contents of one `searchData` file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SearchDataFile {
    pub entries: Vec<SearchEntry>,
}

/// Read and parse a single `searchData` file.
pub fn load_file(path: &Path) -> Result<SearchDataFile> {
    let source = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let file = parse_search_data(&source)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    Ok(file)
}

/// Read and parse a `searchdata.js` section table.
pub fn load_section_index(path: &Path) -> Result<SectionIndex> {
    let source = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let index = parse_section_index(&source)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    Ok(index)
}

/// Search files found under a set of roots.
#[derive(Debug, Clone, Default)]
pub struct DiscoveredFiles {
    /// Partition files, sorted by path. Includes explicitly named files
    /// whose names do not follow the `<section>_<n>.js` pattern.
    pub partitions: Vec<PathBuf>,
    /// The first `searchdata.js` encountered, if any.
    pub section_index: Option<PathBuf>,
}

/// Walk `paths` and collect search files.
///
/// Directories contribute `<section>_<n>.js` files only, so Doxygen's
/// own `search.js` and the per-partition HTML stubs are skipped. A file
/// named directly on the command line is always taken.
pub fn discover(
    paths: &[PathBuf],
    globs: &[String],
    exclude_globs: &[String],
) -> Result<DiscoveredFiles> {
    let include = build_globset(globs)?;
    let exclude = build_globset(exclude_globs)?;

    let mut discovered = DiscoveredFiles::default();

    let Some(first) = paths.first() else {
        return Ok(discovered);
    };

    let mut builder = WalkBuilder::new(first);
    for path in paths.iter().skip(1) {
        builder.add(path);
    }

    for entry_result in builder.build() {
        let entry = match entry_result {
            Ok(e) => e,
            Err(err) => {
                tracing::debug!("skipping unreadable entry: {err}");
                continue;
            }
        };

        if !entry.file_type().map(|ft| ft.is_file()).unwrap_or(false) {
            continue;
        }

        let path = entry.path();

        if let Some(set) = &include {
            if !set.is_match(path) {
                continue;
            }
        }
        if let Some(set) = &exclude {
            if set.is_match(path) {
                continue;
            }
        }

        let file_name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");

        if file_name == SECTION_INDEX_FILE {
            if discovered.section_index.is_none() {
                discovered.section_index = Some(path.to_path_buf());
            }
            continue;
        }

        let explicit = entry.depth() == 0;
        if explicit || PartitionName::parse(file_name).is_some() {
            discovered.partitions.push(path.to_path_buf());
        } else {
            tracing::debug!("ignoring non-partition file {}", path.display());
        }
    }

    discovered.partitions.sort();
    discovered.partitions.dedup();

    Ok(discovered)
}

/// Partition name of a path, if its file name follows `<section>_<n>.js`.
pub fn partition_of(path: &Path) -> Option<PartitionName> {
    path.file_name()
        .and_then(|n| n.to_str())
        .and_then(PartitionName::parse)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn discover_picks_partitions_and_section_index() {
        let dir = tempdir().expect("tempdir");
        let root = dir.path();
        fs::write(root.join("functions_0.js"), "var searchData=\n[\n];").expect("write");
        fs::write(root.join("all_1a.js"), "var searchData=\n[\n];").expect("write");
        fs::write(root.join("search.js"), "function init() {}").expect("write");
        fs::write(root.join("functions_0.html"), "<html></html>").expect("write");
        fs::write(root.join(SECTION_INDEX_FILE), "var indexSectionNames = {};").expect("write");

        let discovered = discover(&[root.to_path_buf()], &[], &[]).expect("discover");

        let names: Vec<_> = discovered
            .partitions
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["all_1a.js", "functions_0.js"]);
        assert_eq!(
            discovered.section_index.as_deref(),
            Some(root.join(SECTION_INDEX_FILE).as_path())
        );
    }

    #[test]
    fn discover_keeps_explicit_files_and_applies_excludes() {
        let dir = tempdir().expect("tempdir");
        let root = dir.path();
        let custom = root.join("custom.js");
        fs::write(&custom, "var searchData=\n[\n];").expect("write");
        fs::write(root.join("classes_0.js"), "var searchData=\n[\n];").expect("write");
        fs::write(root.join("functions_0.js"), "var searchData=\n[\n];").expect("write");

        let discovered = discover(&[custom.clone()], &[], &[]).expect("discover");
        assert_eq!(discovered.partitions, vec![custom]);

        let filtered = discover(
            &[root.to_path_buf()],
            &[],
            &["**/classes_*".to_string()],
        )
        .expect("discover");
        assert_eq!(filtered.partitions, vec![root.join("functions_0.js")]);
    }
}
