//! Core search entry points.
//!
//! These functions provide the "search as a function" API used by the
//! CLI and the HTTP daemon.

use std::path::{Path, PathBuf};

use anyhow::{bail, Result};

use crate::index::{open_backend, EntryQuery};
use crate::models::{
    HitLink, IndexBackendKind, IndexConfig, QueryExpr, ResultLink, SearchConfig, SearchEntry,
    SearchHit, SearchResult, SearchSummary, Section, SEARCH_RESULT_VERSION,
};
use crate::search::query::{hit_matches, key_prefix_hint, parse_query_expr};
use crate::searchdata::{self, decode_html, LinkTarget, ScopeLabel};

/// Default on-disk location of the file index.
pub const DEFAULT_INDEX_DIR: &str = ".doxsearch";
/// Name of the SQLite index inside `DEFAULT_INDEX_DIR`.
pub const DEFAULT_SQLITE_FILE: &str = "index.sqlite";

/// Execute a search based on the provided configuration.
///
/// Entries are read from the `searchData` files under `paths`, or from
/// a prebuilt index when `config.index` is set and the index exists.
pub fn run_search(config: SearchConfig) -> Result<SearchResult> {
    if config.pattern.trim().is_empty() {
        bail!("search pattern must not be empty");
    }

    if config.paths.is_empty() {
        bail!("at least one search path is required");
    }

    for path in &config.paths {
        if !path.exists() {
            bail!("search path does not exist: {}", path.display());
        }
    }

    let query_expr = match config
        .query_expr
        .clone()
        .or_else(|| parse_query_expr(&config.pattern))
    {
        Some(expr) => expr,
        None => bail!("search pattern must not be empty"),
    };

    let candidates = match resolve_effective_index_config(&config) {
        Some(index_config) => {
            if config.reindex_on_search {
                crate::index::run_index(index_config.clone())?;
            }
            match collect_from_index(&config, &index_config, &query_expr)? {
                Some(hits) => hits,
                None => collect_from_files(&config)?,
            }
        }
        None => collect_from_files(&config)?,
    };

    let mut hits: Vec<SearchHit> = candidates
        .into_iter()
        .filter(|hit| config.sections.is_empty() || hit.section.is_some_and(|s| config.sections.contains(&s)))
        .filter(|hit| hit_matches(&query_expr, hit, config.literal))
        .collect();

    hits.sort_by(|a, b| {
        a.key
            .stem
            .cmp(&b.key.stem)
            .then_with(|| a.display_name.cmp(&b.display_name))
            .then_with(|| a.file.cmp(&b.file))
            .then_with(|| a.key.id.cmp(&b.key.id))
    });

    let total_matches = hits.len() as u64;
    let mut truncated = false;
    if let Some(limit) = config.limit {
        if hits.len() > limit {
            hits.truncate(limit);
            truncated = true;
        }
    }

    Ok(SearchResult {
        version: SEARCH_RESULT_VERSION.to_string(),
        query: config.pattern,
        hits,
        summary: SearchSummary {
            total_matches,
            truncated,
        },
    })
}

fn collect_from_files(config: &SearchConfig) -> Result<Vec<SearchHit>> {
    let discovered = searchdata::discover(&config.paths, &config.globs, &config.exclude_globs)?;

    let mut hits = Vec::new();
    for path in discovered.partitions {
        let section = searchdata::partition_of(&path).map(|p| p.section);
        if !config.sections.is_empty() && !section.is_some_and(|s| config.sections.contains(&s)) {
            continue;
        }

        let file = match searchdata::load_file(&path) {
            Ok(file) => file,
            Err(err) => {
                tracing::warn!("skipping {}: {err:#}", path.display());
                continue;
            }
        };

        hits.extend(
            file.entries
                .into_iter()
                .map(|entry| build_hit(&path, section, entry)),
        );
    }

    Ok(hits)
}

/// Candidate hits from the index, or `None` when the index has nothing
/// for the requested paths and the raw files should be read instead.
fn collect_from_index(
    config: &SearchConfig,
    index_config: &IndexConfig,
    expr: &QueryExpr,
) -> Result<Option<Vec<SearchHit>>> {
    if !index_config.index_path.exists() {
        tracing::debug!(
            "no index at {}, reading files",
            index_config.index_path.display()
        );
        return Ok(None);
    }

    let backend = match open_backend(index_config) {
        Ok(b) => b,
        Err(err) => {
            tracing::debug!("index unavailable, reading files: {err:#}");
            return Ok(None);
        }
    };

    if backend.list_files()?.is_empty() {
        return Ok(None);
    }

    let query = EntryQuery {
        stem_prefix: if config.literal { None } else { key_prefix_hint(expr) },
        sections: config.sections.clone(),
        paths: config.paths.clone(),
        globs: config.globs.clone(),
        exclude_globs: config.exclude_globs.clone(),
    };

    let files: std::collections::HashMap<u64, crate::index::FileRecord> = backend
        .list_files()?
        .into_iter()
        .map(|f| (f.id, f))
        .collect();

    let mut hits = Vec::new();
    for record in backend.query_entries(&query)? {
        let Some(file) = files.get(&record.file_id) else {
            continue;
        };
        let entry = SearchEntry {
            key: record.key,
            display_name: record.display_name,
            links: record.links,
        };
        hits.push(build_hit(&file.path, file.section, entry));
    }

    Ok(Some(hits))
}

/// Resolve the effective index configuration to use for a search.
///
/// - If `config.index` is `None`, indexing is disabled.
/// - An explicit backend and path are used as-is.
/// - The default file backend at `.doxsearch` is treated as "auto":
///   prefer an existing SQLite index at `.doxsearch/index.sqlite`,
///   else the file backend if `.doxsearch/` exists, else no index.
fn resolve_effective_index_config(config: &SearchConfig) -> Option<IndexConfig> {
    let index = config.index.clone()?;

    let default_root = PathBuf::from(DEFAULT_INDEX_DIR);

    if index.backend == IndexBackendKind::File && index.index_path == default_root {
        let sqlite_path = default_root.join(DEFAULT_SQLITE_FILE);

        if sqlite_path.exists() {
            return Some(IndexConfig {
                backend: IndexBackendKind::Sqlite,
                index_path: sqlite_path,
                ..index
            });
        }

        if default_root.join("meta.json").exists() || config.reindex_on_search {
            return Some(index);
        }

        return None;
    }

    Some(index)
}

/// Resolve one raw entry into a hit with decoded links.
pub fn build_hit(file: &Path, section: Option<Section>, entry: SearchEntry) -> SearchHit {
    SearchHit {
        file: file.to_path_buf(),
        section,
        key: entry.key,
        display_name: entry.display_name,
        links: entry.links.into_iter().map(build_link).collect(),
    }
}

fn build_link(link: ResultLink) -> HitLink {
    let target = LinkTarget::parse(&link.url);
    let label = ScopeLabel::parse(&link.scope);

    HitLink {
        page: target.page,
        anchor: target.anchor,
        in_frame: link.in_frame,
        owner: label.owner_path(),
        signature: label.signature(),
        scope: decode_html(&link.scope),
        compound: target.compound,
        url: link.url,
    }
}
