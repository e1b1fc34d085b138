//! Shared data models for search-index entries, configs, and results.
//!
//! These types form the stable JSON API surface used by the CLI, the
//! on-disk index, and the HTTP daemon.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub use crate::searchdata::{CompoundKind, CompoundRef, Section};

/// Schema version for `SearchResult` JSON payloads.
///
/// This version follows semver semantics (MAJOR.MINOR.PATCH):
/// - MAJOR: Breaking changes to required fields or field semantics.
/// - MINOR: Backward-compatible additions (new optional fields).
/// - PATCH: Documentation or internal changes only.
pub const SEARCH_RESULT_VERSION: &str = "1.0.0";

/// Schema version for `ValidationReport` JSON payloads.
///
/// Independent from `SEARCH_RESULT_VERSION`; new issue codes are a
/// MINOR change.
pub const VALIDATION_REPORT_VERSION: &str = "1.0.0";

/// Normalized search key of a single `searchData` entry.
///
/// On the wire this is the `stem_id` string Doxygen emits (for example
/// `addebbc_3631`): the encoded lowercase display name followed by a
/// site-wide numeric id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SearchKey {
    /// Encoded lowercase stem used for incremental prefix matching.
    pub stem: String,
    /// Disambiguating numeric id.
    pub id: u64,
}

/// One link of an entry's result list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultLink {
    /// Relative (or absolute, for external tag files) documentation URL.
    pub url: String,
    /// Whether the link opens inside the documentation frame
    /// (`1` on the wire) rather than a new window (`0`).
    pub in_frame: bool,
    /// Raw HTML scope label naming the owning scope and, for
    /// overloads, the full signature.
    pub scope: String,
}

/// A single `[key, [displayName, link, ...]]` element of `searchData`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchEntry {
    pub key: SearchKey,
    pub display_name: String,
    #[serde(default)]
    pub links: Vec<ResultLink>,
}

/// Field selector for a query term.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryField {
    /// Prefix match on the encoded key stem (Doxygen search-box semantics).
    Key,
    /// Case-insensitive substring of the display name.
    Name,
    /// Substring of the decoded scope labels.
    Scope,
    /// Substring of link pages.
    Page,
    /// Exact section name.
    Section,
    /// Any of the above.
    Text,
}

/// A single atomic term in a query expression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryTerm {
    pub field: QueryField,
    pub value: String,
}

/// Structured query expression.
///
/// - Space-separated groups are combined with AND.
/// - `A|B` within a group is treated as OR.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueryExpr {
    /// A single atomic term.
    Term(QueryTerm),
    /// Logical AND of multiple sub-expressions.
    And(Vec<QueryExpr>),
    /// Logical OR of multiple sub-expressions.
    Or(Vec<QueryExpr>),
}

/// Core configuration for a search operation.
///
/// This struct is built from CLI or daemon inputs and is consumed by the
/// core search engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Raw search pattern/string provided by the user.
    pub pattern: String,
    /// Search directories or individual `searchData` files.
    pub paths: Vec<PathBuf>,
    /// Inclusion globs applied to candidate files.
    #[serde(default)]
    pub globs: Vec<String>,
    /// Exclusion globs applied to candidate files.
    #[serde(default)]
    pub exclude_globs: Vec<String>,
    /// Restrict hits to these sections (empty = all sections).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sections: Vec<Section>,
    /// Require exact stem matches for bare and `key:` terms instead of
    /// prefix matches.
    #[serde(default)]
    pub literal: bool,
    /// Maximum number of hits to return (None = unlimited).
    pub limit: Option<usize>,
    /// Whether to refresh the configured index before searching it.
    #[serde(default)]
    pub reindex_on_search: bool,
    /// Optional prebuilt index to search instead of the raw files.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<IndexConfig>,
    /// Parsed representation of `pattern`, when the caller already has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_expr: Option<QueryExpr>,
}

/// A resolved link of a search hit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HitLink {
    /// URL exactly as stored in the search data.
    pub url: String,
    /// Page path with leading `../` segments removed.
    pub page: String,
    /// Fragment after `#`, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anchor: Option<String>,
    pub in_frame: bool,
    /// Scope label with HTML entities decoded.
    pub scope: String,
    /// Owning scope path (e.g. `Physics::ItoPlasma::ItoPlasmaPhysics`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    /// Member signature for overload labels (e.g. `tmp() const`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    /// Compound page the link points into, when recognizable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compound: Option<CompoundRef>,
}

/// A single matching entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    /// File the entry was read from (or imported from, for index searches).
    pub file: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section: Option<Section>,
    pub key: SearchKey,
    pub display_name: String,
    #[serde(default)]
    pub links: Vec<HitLink>,
}

/// Summary information for a search result set.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SearchSummary {
    /// Total number of matching entries before `limit` was applied.
    pub total_matches: u64,
    /// True if hits were truncated due to `limit`.
    pub truncated: bool,
}

/// Top-level result for a search invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    /// Schema version for this result payload.
    pub version: String,
    /// The original pattern or query string.
    pub query: String,
    #[serde(default)]
    pub hits: Vec<SearchHit>,
    pub summary: SearchSummary,
}

/// Backend kind for indexing.
///
/// JSON uses lowercase strings for stability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexBackendKind {
    File,
    Sqlite,
}

/// Configuration for building, updating, or inspecting an index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Search directories or files to import.
    pub paths: Vec<PathBuf>,
    /// Inclusion globs applied to candidate files.
    #[serde(default)]
    pub globs: Vec<String>,
    /// Exclusion globs applied to candidate files.
    #[serde(default)]
    pub exclude_globs: Vec<String>,
    /// Selected backend implementation.
    pub backend: IndexBackendKind,
    /// Location for on-disk index data (directory or file path).
    pub index_path: PathBuf,
}

/// Summary information about an index operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexSummary {
    /// Backend used for the index.
    pub backend: IndexBackendKind,
    /// Location of the index on disk.
    pub index_path: PathBuf,
    /// Number of files (re)imported, or held, for introspection.
    pub files_indexed: u64,
    /// Number of entries (re)imported, or held, for introspection.
    pub entries_indexed: u64,
    /// Canonical root for this index (absolute path).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root_path: Option<String>,
    /// Logical schema version for the index.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema_version: Option<String>,
    /// Version of the doxsearch tool that wrote the index.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_version: Option<String>,
    /// RFC 3339 creation timestamp for this index.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    /// RFC 3339 last-updated timestamp for this index.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

/// Configuration for a validation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidateConfig {
    /// Search directories or individual files to check.
    pub paths: Vec<PathBuf>,
    #[serde(default)]
    pub globs: Vec<String>,
    #[serde(default)]
    pub exclude_globs: Vec<String>,
    /// Treat warnings as failures.
    #[serde(default)]
    pub strict: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// Machine-readable identifier of a validation finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IssueCode {
    ParseError,
    DuplicateKey,
    KeyNameMismatch,
    EmptyResults,
    EmptyUrl,
    EmptyAnchor,
    UnsortedKeys,
    MixedPartition,
    UnknownPartition,
    PartitionMismatch,
    DuplicateId,
    MissingPartition,
    UnlistedPartition,
}

impl IssueCode {
    pub fn as_str(self) -> &'static str {
        match self {
            IssueCode::ParseError => "parse-error",
            IssueCode::DuplicateKey => "duplicate-key",
            IssueCode::KeyNameMismatch => "key-name-mismatch",
            IssueCode::EmptyResults => "empty-results",
            IssueCode::EmptyUrl => "empty-url",
            IssueCode::EmptyAnchor => "empty-anchor",
            IssueCode::UnsortedKeys => "unsorted-keys",
            IssueCode::MixedPartition => "mixed-partition",
            IssueCode::UnknownPartition => "unknown-partition",
            IssueCode::PartitionMismatch => "partition-mismatch",
            IssueCode::DuplicateId => "duplicate-id",
            IssueCode::MissingPartition => "missing-partition",
            IssueCode::UnlistedPartition => "unlisted-partition",
        }
    }

    pub fn severity(self) -> Severity {
        match self {
            IssueCode::UnsortedKeys
            | IssueCode::MixedPartition
            | IssueCode::UnknownPartition
            | IssueCode::PartitionMismatch
            | IssueCode::DuplicateId
            | IssueCode::UnlistedPartition => Severity::Warning,
            _ => Severity::Error,
        }
    }
}

/// A single validation finding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    pub severity: Severity,
    pub code: IssueCode,
    pub file: PathBuf,
    /// Offending entry key, for entry-level findings.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    pub message: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ValidationSummary {
    pub files_checked: u64,
    pub entries_checked: u64,
    pub errors: u64,
    pub warnings: u64,
    /// False when any error was found, or any warning in strict mode.
    pub passed: bool,
}

/// Top-level result of a validation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    pub version: String,
    #[serde(default)]
    pub issues: Vec<Issue>,
    pub summary: ValidationSummary,
}

/// Configuration for generating a search directory from a symbol table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateConfig {
    /// JSON or TOML symbol table.
    pub input: PathBuf,
    /// Directory receiving the `<section>_<n>.js` files and `searchdata.js`.
    pub output_dir: PathBuf,
    /// First numeric key id to assign.
    #[serde(default)]
    pub start_id: u64,
}

/// Per-section outcome of a generate run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionSummary {
    pub section: Section,
    /// Leading characters, one per written partition file.
    pub letters: String,
    pub entries: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateSummary {
    pub output_dir: PathBuf,
    pub files_written: u64,
    pub entries_written: u64,
    #[serde(default)]
    pub sections: Vec<SectionSummary>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_key_serializes_as_wire_string() {
        let key = SearchKey {
            stem: "addebbc".to_string(),
            id: 3631,
        };

        let json = serde_json::to_string(&key).expect("serialize");
        assert_eq!(json, "\"addebbc_3631\"");

        let decoded: SearchKey = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(decoded, key);
    }

    #[test]
    fn search_key_rejects_missing_id_on_deserialize() {
        let err = serde_json::from_str::<SearchKey>("\"addebbc\"");
        assert!(err.is_err());
    }

    #[test]
    fn issue_codes_use_kebab_case_on_the_wire() {
        let json = serde_json::to_string(&IssueCode::KeyNameMismatch).expect("serialize");
        assert_eq!(json, "\"key-name-mismatch\"");
        assert_eq!(IssueCode::KeyNameMismatch.as_str(), "key-name-mismatch");
        assert_eq!(IssueCode::DuplicateId.severity(), Severity::Warning);
        assert_eq!(IssueCode::EmptyUrl.severity(), Severity::Error);
    }
}
