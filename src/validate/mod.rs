//! Structural checks over Doxygen search directories.
//!
//! Each partition file is checked on its own (unique keys, keys that
//! encode their display names, non-empty result lists and link
//! targets, ordering). When a `searchdata.js` is present, partition
//! files are also checked against the letters it declares.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use anyhow::{bail, Result};

use crate::models::{
    Issue, IssueCode, SearchEntry, Severity, ValidateConfig, ValidationReport, ValidationSummary,
    VALIDATION_REPORT_VERSION,
};
use crate::searchdata::{self, partition_char, search_stem, PartitionName};

/// Validate every search file under `config.paths`.
pub fn run_validate(config: ValidateConfig) -> Result<ValidationReport> {
    if config.paths.is_empty() {
        bail!("at least one path is required");
    }
    for path in &config.paths {
        if !path.exists() {
            bail!("validate path does not exist: {}", path.display());
        }
    }

    let discovered = searchdata::discover(&config.paths, &config.globs, &config.exclude_globs)?;
    if discovered.partitions.is_empty() && discovered.section_index.is_none() {
        bail!("no search data files found");
    }

    let mut report = Report::default();
    let mut ids: HashMap<u64, PathBuf> = HashMap::new();
    let mut parsed: Vec<(PathBuf, Vec<SearchEntry>)> = Vec::new();

    for path in &discovered.partitions {
        report.files_checked += 1;

        if searchdata::partition_of(path).is_none() {
            report.push(
                IssueCode::UnknownPartition,
                path,
                None,
                "file name does not follow <section>_<n>.js".to_string(),
            );
        }

        let file = match searchdata::load_file(path) {
            Ok(file) => file,
            Err(err) => {
                report.push(IssueCode::ParseError, path, None, format!("{err:#}"));
                continue;
            }
        };

        report.entries_checked += file.entries.len() as u64;
        check_entries(&mut report, path, &file.entries);

        for entry in &file.entries {
            match ids.get(&entry.key.id) {
                Some(first) if first != path => report.push(
                    IssueCode::DuplicateId,
                    path,
                    Some(entry.key.to_string()),
                    format!("id {} is also used in {}", entry.key.id, first.display()),
                ),
                Some(_) => {}
                None => {
                    ids.insert(entry.key.id, path.clone());
                }
            }
        }

        parsed.push((path.clone(), file.entries));
    }

    if let Some(index_path) = &discovered.section_index {
        check_section_index(&mut report, index_path, &parsed);
    }

    Ok(report.finish(config.strict))
}

#[derive(Default)]
struct Report {
    issues: Vec<Issue>,
    files_checked: u64,
    entries_checked: u64,
}

impl Report {
    fn push(&mut self, code: IssueCode, file: &Path, key: Option<String>, message: String) {
        self.issues.push(Issue {
            severity: code.severity(),
            code,
            file: file.to_path_buf(),
            key,
            message,
        });
    }

    fn finish(self, strict: bool) -> ValidationReport {
        let errors = self
            .issues
            .iter()
            .filter(|i| i.severity == Severity::Error)
            .count() as u64;
        let warnings = self.issues.len() as u64 - errors;

        ValidationReport {
            version: VALIDATION_REPORT_VERSION.to_string(),
            issues: self.issues,
            summary: ValidationSummary {
                files_checked: self.files_checked,
                entries_checked: self.entries_checked,
                errors,
                warnings,
                passed: errors == 0 && (!strict || warnings == 0),
            },
        }
    }
}

fn check_entries(report: &mut Report, path: &Path, entries: &[SearchEntry]) {
    let mut seen_keys = HashSet::new();
    let mut previous_stem: Option<&str> = None;
    let mut unsorted_reported = false;
    let mut first_char: Option<char> = None;
    let mut mixed_reported = false;

    for entry in entries {
        let key = entry.key.to_string();

        if !seen_keys.insert(key.clone()) {
            report.push(
                IssueCode::DuplicateKey,
                path,
                Some(key.clone()),
                "key appears more than once in this file".to_string(),
            );
        }

        let expected = search_stem(&entry.display_name);
        if entry.key.stem != expected {
            report.push(
                IssueCode::KeyNameMismatch,
                path,
                Some(key.clone()),
                format!(
                    "stem `{}` does not encode display name `{}` (expected `{}`)",
                    entry.key.stem, entry.display_name, expected
                ),
            );
        }

        if entry.links.is_empty() {
            report.push(
                IssueCode::EmptyResults,
                path,
                Some(key.clone()),
                "entry has no result links".to_string(),
            );
        }

        for (n, link) in entry.links.iter().enumerate() {
            let (page, anchor) = match link.url.split_once('#') {
                Some((page, anchor)) => (page, Some(anchor)),
                None => (link.url.as_str(), None),
            };
            if page.trim_start_matches("../").trim().is_empty() {
                report.push(
                    IssueCode::EmptyUrl,
                    path,
                    Some(key.clone()),
                    format!("link {} has no target page", n + 1),
                );
            }
            if anchor.is_some_and(|a| a.trim().is_empty()) {
                report.push(
                    IssueCode::EmptyAnchor,
                    path,
                    Some(key.clone()),
                    format!("link {} ends in an empty `#` anchor", n + 1),
                );
            }
        }

        if let Some(prev) = previous_stem {
            if entry.key.stem.as_str() < prev && !unsorted_reported {
                unsorted_reported = true;
                report.push(
                    IssueCode::UnsortedKeys,
                    path,
                    Some(key.clone()),
                    format!("stem `{}` sorts before preceding `{prev}`", entry.key.stem),
                );
            }
        }
        previous_stem = Some(entry.key.stem.as_str());

        if let Some(ch) = partition_char(&entry.display_name) {
            match first_char {
                None => first_char = Some(ch),
                Some(first) if first != ch && !mixed_reported => {
                    mixed_reported = true;
                    report.push(
                        IssueCode::MixedPartition,
                        path,
                        Some(key.clone()),
                        format!("entry starts with `{ch}` but the file starts with `{first}`"),
                    );
                }
                Some(_) => {}
            }
        }
    }
}

fn check_section_index(
    report: &mut Report,
    index_path: &Path,
    parsed: &[(PathBuf, Vec<SearchEntry>)],
) {
    let index = match searchdata::load_section_index(index_path) {
        Ok(index) => index,
        Err(err) => {
            report.push(IssueCode::ParseError, index_path, None, format!("{err:#}"));
            return;
        }
    };

    let dir = index_path.parent().unwrap_or_else(|| Path::new(""));
    let listed: HashMap<PartitionName, char> = index.partitions().into_iter().collect();

    let mut listed_names: Vec<_> = listed.iter().collect();
    listed_names.sort();
    for (name, letter) in listed_names {
        let expected = dir.join(name.file_name());
        if !expected.is_file() {
            report.push(
                IssueCode::MissingPartition,
                index_path,
                None,
                format!("{} is listed for `{letter}` but does not exist", name.file_name()),
            );
        }
    }

    for (path, entries) in parsed {
        if path.parent() != Some(dir) {
            continue;
        }
        let Some(name) = searchdata::partition_of(path) else {
            continue;
        };

        let Some(letter) = listed.get(&name) else {
            report.push(
                IssueCode::UnlistedPartition,
                path,
                None,
                format!("{} is not listed in {}", name.file_name(), searchdata::SECTION_INDEX_FILE),
            );
            continue;
        };

        if let Some(entry) = entries
            .iter()
            .find(|e| partition_char(&e.display_name) != Some(*letter))
        {
            report.push(
                IssueCode::PartitionMismatch,
                path,
                Some(entry.key.to_string()),
                format!(
                    "`{}` does not start with `{letter}` as {} declares",
                    entry.display_name,
                    searchdata::SECTION_INDEX_FILE
                ),
            );
        }
    }
}
