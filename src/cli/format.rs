use std::cmp;
use std::path::Path;

use anyhow::Result;

use crate::models::{
    GenerateSummary, IndexBackendKind, IndexSummary, SearchResult, Severity, ValidationReport,
};
use crate::searchdata::{decode_html, SearchDataFile, SectionIndex};

/// Internal representation of a hit row rendered by the CLI.
///
/// Both text and table formats are derived from the same rows.
struct DisplayRow {
    file: String,
    section: String,
    key: String,
    name: String,
    scope: String,
    link_lines: Vec<String>,
}

/// Render a `SearchResult` in human-readable text form.
///
/// Each hit is rendered as `path: section: name (key)` followed by one
/// indented line per link: the decoded scope label and the URL.
pub fn print_text(result: &SearchResult) -> Result<()> {
    for row in build_rows(result) {
        if row.section.is_empty() {
            println!("{}: {} ({})", row.file, row.name, row.key);
        } else {
            println!("{}: {}: {} ({})", row.file, row.section, row.name, row.key);
        }
        for line in row.link_lines {
            println!("    {line}");
        }
    }

    if result.summary.truncated {
        println!(
            "… {} of {} matches shown",
            result.hits.len(),
            result.summary.total_matches
        );
    }

    Ok(())
}

/// Render a `SearchResult` as a simple table.
///
/// Columns: SECTION, KEY, NAME, LINKS, SCOPE (of the first link).
pub fn print_table(result: &SearchResult) -> Result<()> {
    let rows = build_rows(result);

    if rows.is_empty() {
        return Ok(());
    }

    const MAX_KEY_WIDTH: usize = 40;
    const MAX_NAME_WIDTH: usize = 30;
    const MAX_SCOPE_WIDTH: usize = 50;

    let section_header = "SECTION";
    let key_header = "KEY";
    let name_header = "NAME";
    let links_header = "LINKS";
    let scope_header = "SCOPE";

    let max_section_len = rows.iter().map(|r| r.section.chars().count()).max().unwrap_or(0);
    let max_key_len = rows.iter().map(|r| r.key.chars().count()).max().unwrap_or(0);
    let max_name_len = rows.iter().map(|r| r.name.chars().count()).max().unwrap_or(0);
    let max_scope_len = rows.iter().map(|r| r.scope.chars().count()).max().unwrap_or(0);

    let section_width = cmp::max(section_header.len(), max_section_len);
    let key_width = cmp::min(cmp::max(key_header.len(), max_key_len), MAX_KEY_WIDTH);
    let name_width = cmp::min(cmp::max(name_header.len(), max_name_len), MAX_NAME_WIDTH);
    let links_width = links_header.len();
    let scope_width = cmp::min(cmp::max(scope_header.len(), max_scope_len), MAX_SCOPE_WIDTH);

    println!(
        "{:<section_width$} {:<key_width$} {:<name_width$} {:>links_width$} {:<scope_width$}",
        section_header, key_header, name_header, links_header, scope_header
    );

    for row in rows {
        println!(
            "{:<section_width$} {:<key_width$} {:<name_width$} {:>links_width$} {:<scope_width$}",
            row.section,
            truncate(&row.key, key_width),
            truncate(&row.name, name_width),
            row.link_lines.len(),
            truncate(&row.scope, scope_width)
        );
    }

    Ok(())
}

fn build_rows(result: &SearchResult) -> Vec<DisplayRow> {
    result
        .hits
        .iter()
        .map(|hit| DisplayRow {
            file: hit.file.display().to_string(),
            section: hit.section.map(|s| s.to_string()).unwrap_or_default(),
            key: hit.key.to_string(),
            name: hit.display_name.clone(),
            scope: hit
                .links
                .first()
                .map(|l| l.scope.clone())
                .unwrap_or_default(),
            link_lines: hit
                .links
                .iter()
                .map(|link| {
                    let label = if link.scope.is_empty() {
                        link.page.as_str()
                    } else {
                        link.scope.as_str()
                    };
                    let external = if link.in_frame { "" } else { " [external]" };
                    format!("{label}  {}{external}", link.url)
                })
                .collect(),
        })
        .collect()
}

/// Render an `IndexSummary` in human-readable text form.
pub fn print_index_summary_text(summary: &IndexSummary) -> Result<()> {
    let backend_str = match summary.backend {
        IndexBackendKind::File => "file",
        IndexBackendKind::Sqlite => "sqlite",
    };

    println!("backend      : {backend_str}");
    println!("index_path   : {}", summary.index_path.display());

    if let Some(root) = &summary.root_path {
        println!("root_path    : {root}");
    }
    if let Some(schema) = &summary.schema_version {
        println!("schema       : {schema}");
    }
    if let Some(tool) = &summary.tool_version {
        println!("tool_version : {tool}");
    }
    if let Some(created) = &summary.created_at {
        println!("created_at   : {created}");
    }
    if let Some(updated) = &summary.updated_at {
        println!("updated_at   : {updated}");
    }

    println!("files        : {}", summary.files_indexed);
    println!("entries      : {}", summary.entries_indexed);

    Ok(())
}

/// Render a `ValidationReport` as one line per issue plus a summary.
pub fn print_validation_text(report: &ValidationReport) -> Result<()> {
    for issue in &report.issues {
        let severity = severity_str(issue.severity);
        match &issue.key {
            Some(key) => println!(
                "{severity}[{}]: {}: {key}: {}",
                issue.code.as_str(),
                issue.file.display(),
                issue.message
            ),
            None => println!(
                "{severity}[{}]: {}: {}",
                issue.code.as_str(),
                issue.file.display(),
                issue.message
            ),
        }
    }

    print_validation_summary(report);
    Ok(())
}

/// Render a `ValidationReport` as a table of issues plus a summary.
pub fn print_validation_table(report: &ValidationReport) -> Result<()> {
    if !report.issues.is_empty() {
        const MAX_FILE_WIDTH: usize = 40;

        let code_width = report
            .issues
            .iter()
            .map(|i| i.code.as_str().len())
            .max()
            .unwrap_or(0)
            .max("CODE".len());
        let file_width = report
            .issues
            .iter()
            .map(|i| i.file.display().to_string().chars().count())
            .max()
            .unwrap_or(0)
            .clamp("FILE".len(), MAX_FILE_WIDTH);

        println!(
            "{:<8} {:<code_width$} {:<file_width$} MESSAGE",
            "SEVERITY", "CODE", "FILE"
        );
        for issue in &report.issues {
            println!(
                "{:<8} {:<code_width$} {:<file_width$} {}",
                severity_str(issue.severity),
                issue.code.as_str(),
                truncate(&issue.file.display().to_string(), file_width),
                issue.message
            );
        }
    }

    print_validation_summary(report);
    Ok(())
}

fn print_validation_summary(report: &ValidationReport) {
    let s = &report.summary;
    println!(
        "{}: {} file(s), {} entries, {} error(s), {} warning(s)",
        if s.passed { "ok" } else { "FAILED" },
        s.files_checked,
        s.entries_checked,
        s.errors,
        s.warnings
    );
}

fn severity_str(severity: Severity) -> &'static str {
    match severity {
        Severity::Error => "error",
        Severity::Warning => "warning",
    }
}

/// Render a `GenerateSummary` in human-readable text form.
pub fn print_generate_summary_text(summary: &GenerateSummary) -> Result<()> {
    println!(
        "Wrote {} files with {} entries to {}",
        summary.files_written,
        summary.entries_written,
        summary.output_dir.display()
    );

    let width = summary
        .sections
        .iter()
        .map(|s| s.section.prefix().len())
        .max()
        .unwrap_or(0);

    for section in &summary.sections {
        println!(
            "  {:<width$} {:>5} entries  {}",
            section.section.prefix(),
            section.entries,
            section.letters
        );
    }

    Ok(())
}

/// Render the entries of one search file.
pub fn print_search_data_text(path: &Path, file: &SearchDataFile) -> Result<()> {
    println!("{}: {} entries", path.display(), file.entries.len());

    for entry in &file.entries {
        println!("{}  {}", entry.key, entry.display_name);
        for link in &entry.links {
            let external = if link.in_frame { "" } else { " [external]" };
            println!("    {}  {}{external}", link.url, decode_html(&link.scope));
        }
    }

    Ok(())
}

/// Render a `searchdata.js` section table.
pub fn print_section_index_text(path: &Path, index: &SectionIndex) -> Result<()> {
    println!("{}: {} sections", path.display(), index.sections.len());

    let width = index
        .sections
        .iter()
        .map(|s| s.section.prefix().len())
        .max()
        .unwrap_or(0);

    for section in &index.sections {
        println!(
            "  {:<width$} {:<12} {}",
            section.section.prefix(),
            section.section.label(),
            section.letters.iter().collect::<String>()
        );
    }

    Ok(())
}

fn truncate(s: &str, max_width: usize) -> String {
    let char_count = s.chars().count();
    if char_count <= max_width {
        s.to_string()
    } else if max_width <= 1 {
        "…".to_string()
    } else {
        s.chars()
            .take(max_width.saturating_sub(1))
            .collect::<String>()
            + "…"
    }
}

#[cfg(test)]
mod tests {
    use super::truncate;

    #[test]
    fn truncate_leaves_short_strings_unchanged() {
        assert_eq!(truncate("abc", 5), "abc");
        assert_eq!(truncate("abc", 3), "abc");
    }

    #[test]
    fn truncate_ascii_strings_with_ellipsis() {
        assert_eq!(truncate("abcdef", 4), "abc…");
        assert_eq!(truncate("abcdef", 1), "…");
    }

    #[test]
    fn truncate_handles_unicode_characters() {
        let s = "éééé"; // multi-byte UTF-8 characters
        assert_eq!(truncate(s, 3), "éé…");
        assert_eq!(truncate(s, 2), "é…");
    }
}
