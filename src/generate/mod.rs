//! Build a Doxygen search directory from a symbol table.
//!
//! The table lists symbols as `{name, section, url, scope, external}`
//! records in JSON (`{"symbols": [...]}` or a bare array) or TOML
//! (`[[symbols]]`). Every symbol is also filed under `all`, same-named
//! symbols of a section merge into one entry, and ids are assigned by
//! one counter in section, letter, and entry order.

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::models::{
    GenerateConfig, GenerateSummary, ResultLink, SearchEntry, SearchKey, Section, SectionSummary,
};
use crate::searchdata::{
    self, encode_html, partition_char, search_stem, write_search_data, write_section_index,
    IndexedSection, PartitionName, SearchDataFile, SectionIndex,
};

/// One documented symbol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolSpec {
    pub name: String,
    pub section: Section,
    /// Link target relative to the documentation root, or absolute for
    /// symbols documented elsewhere.
    pub url: String,
    /// Plain-text scope label; HTML-escaped on output.
    #[serde(default)]
    pub scope: String,
    /// Open in a new window rather than the documentation frame.
    #[serde(default)]
    pub external: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolTable {
    #[serde(default)]
    pub symbols: Vec<SymbolSpec>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum JsonTable {
    Table(SymbolTable),
    List(Vec<SymbolSpec>),
}

/// Read a symbol table, choosing the format from the file extension.
pub fn load_symbol_table(path: &Path) -> Result<SymbolTable> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read symbol table {}", path.display()))?;

    let is_toml = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("toml"));

    if is_toml {
        toml::from_str(&text)
            .with_context(|| format!("failed to parse symbol table {}", path.display()))
    } else {
        let table: JsonTable = serde_json::from_str(&text)
            .with_context(|| format!("failed to parse symbol table {}", path.display()))?;
        Ok(match table {
            JsonTable::Table(table) => table,
            JsonTable::List(symbols) => SymbolTable { symbols },
        })
    }
}

/// Partition files of one section, in letter order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionFiles {
    pub section: Section,
    pub partitions: Vec<(char, SearchDataFile)>,
}

/// Generated site, ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Site {
    pub sections: Vec<SectionFiles>,
}

impl Site {
    pub fn section_index(&self) -> SectionIndex {
        SectionIndex {
            sections: self
                .sections
                .iter()
                .map(|s| IndexedSection {
                    section: s.section,
                    letters: s.partitions.iter().map(|(ch, _)| *ch).collect(),
                })
                .collect(),
        }
    }

    pub fn entry_count(&self) -> u64 {
        self.sections
            .iter()
            .flat_map(|s| s.partitions.iter())
            .map(|(_, file)| file.entries.len() as u64)
            .sum()
    }
}

/// Sort key for letters and entries: stem first, name as tie-break.
type EntrySortKey = (String, String);

/// Group, merge, sort, and number the symbols of a table.
pub fn build_site(table: &SymbolTable, start_id: u64) -> Result<Site> {
    // section -> letter stem -> (letter, entries by (stem, name))
    let mut grouped: BTreeMap<Section, BTreeMap<String, (char, BTreeMap<EntrySortKey, Vec<ResultLink>>)>> =
        BTreeMap::new();

    for (n, symbol) in table.symbols.iter().enumerate() {
        let Some(letter) = partition_char(&symbol.name) else {
            bail!("symbol {} has an empty name", n + 1);
        };
        if symbol.url.trim().is_empty() {
            bail!("symbol `{}` has an empty url", symbol.name);
        }
        if symbol.url.ends_with('#') {
            bail!("symbol `{}` has an empty anchor in {}", symbol.name, symbol.url);
        }

        let link = ResultLink {
            url: symbol.url.clone(),
            in_frame: !symbol.external,
            scope: encode_html(&symbol.scope),
        };

        let mut targets = vec![symbol.section];
        if symbol.section != Section::All {
            targets.push(Section::All);
        }

        for section in targets {
            let (_, entries) = grouped
                .entry(section)
                .or_default()
                .entry(search_stem(&letter.to_string()))
                .or_insert_with(|| (letter, BTreeMap::new()));
            entries
                .entry((search_stem(&symbol.name), symbol.name.clone()))
                .or_default()
                .push(link.clone());
        }
    }

    let mut next_id = start_id;
    let mut sections = Vec::new();

    for (section, letters) in grouped {
        let mut partitions = Vec::new();
        for (_, (letter, entries)) in letters {
            let mut file = SearchDataFile::default();
            for ((stem, name), links) in entries {
                file.entries.push(SearchEntry {
                    key: SearchKey::new(stem, next_id),
                    display_name: name,
                    links,
                });
                next_id = next_id
                    .checked_add(1)
                    .context("search key ids overflowed")?;
            }
            partitions.push((letter, file));
        }
        sections.push(SectionFiles {
            section,
            partitions,
        });
    }

    Ok(Site { sections })
}

/// Generate a search directory from `config.input`.
///
/// Partition files left over from an earlier run that the new site
/// does not produce are removed, so the directory stays consistent
/// with its `searchdata.js`.
pub fn run_generate(config: GenerateConfig) -> Result<GenerateSummary> {
    let table = load_symbol_table(&config.input)?;
    if table.symbols.is_empty() {
        bail!("symbol table {} lists no symbols", config.input.display());
    }

    let site = build_site(&table, config.start_id)?;

    fs::create_dir_all(&config.output_dir).with_context(|| {
        format!("failed to create output directory {}", config.output_dir.display())
    })?;

    let mut written = HashSet::new();
    let mut sections = Vec::new();

    for section_files in &site.sections {
        let mut entries = 0u64;
        let mut letters = String::new();

        for (n, (letter, file)) in section_files.partitions.iter().enumerate() {
            let name = PartitionName::new(section_files.section, n as u32).file_name();
            let path = config.output_dir.join(&name);
            fs::write(&path, write_search_data(file))
                .with_context(|| format!("failed to write {}", path.display()))?;

            written.insert(name);
            entries += file.entries.len() as u64;
            letters.push(*letter);
        }

        sections.push(SectionSummary {
            section: section_files.section,
            letters,
            entries,
        });
    }

    let index_path = config.output_dir.join(searchdata::SECTION_INDEX_FILE);
    fs::write(&index_path, write_section_index(&site.section_index()))
        .with_context(|| format!("failed to write {}", index_path.display()))?;

    remove_stale_partitions(&config.output_dir, &written)?;

    let summary = GenerateSummary {
        output_dir: config.output_dir,
        files_written: written.len() as u64 + 1,
        entries_written: site.entry_count(),
        sections,
    };

    tracing::info!(
        "generated {} file(s) with {} entries in {}",
        summary.files_written,
        summary.entries_written,
        summary.output_dir.display()
    );

    Ok(summary)
}

fn remove_stale_partitions(dir: &Path, keep: &HashSet<String>) -> Result<()> {
    for dir_entry in fs::read_dir(dir)? {
        let dir_entry = dir_entry?;
        let file_name = dir_entry.file_name();
        let Some(name) = file_name.to_str() else {
            continue;
        };
        if PartitionName::parse(name).is_some() && !keep.contains(name) {
            tracing::info!("removing stale partition {}", dir_entry.path().display());
            fs::remove_file(dir_entry.path())?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ValidateConfig;
    use crate::validate::run_validate;
    use tempfile::tempdir;

    fn symbol(name: &str, section: Section, url: &str, scope: &str) -> SymbolSpec {
        SymbolSpec {
            name: name.to_string(),
            section,
            url: url.to_string(),
            scope: scope.to_string(),
            external: false,
        }
    }

    fn table() -> SymbolTable {
        SymbolTable {
            symbols: vec![
                symbol("tmp", Section::Functions, "../classItoParticle.html#a1", "ItoParticle::tmp()"),
                symbol("tmp", Section::Functions, "../classItoParticle.html#a2", "ItoParticle::tmp() const"),
                symbol("addParticles", Section::Functions, "../classItoSolver.html#a3", "ItoSolver::addParticles()"),
                symbol("ItoSolver", Section::Classes, "../classItoSolver.html", "ItoSolver"),
                symbol("~Timer", Section::Functions, "../classTimer.html#a4", "Timer::~Timer()"),
                SymbolSpec {
                    external: true,
                    ..symbol("List", Section::Classes, "https://example.org/List.html", "List< T >")
                },
            ],
        }
    }

    #[test]
    fn site_groups_sections_and_letters_in_order() {
        let site = build_site(&table(), 100).expect("site");

        let layout: Vec<(Section, String)> = site
            .sections
            .iter()
            .map(|s| (s.section, s.partitions.iter().map(|(c, _)| *c).collect()))
            .collect();

        assert_eq!(
            layout,
            vec![
                (Section::All, "~ailt".to_string()),
                (Section::Classes, "il".to_string()),
                (Section::Functions, "~at".to_string()),
            ]
        );

        let all = &site.sections[0];
        assert_eq!(all.partitions[0].1.entries[0].key.to_string(), "_7etimer_100");
        assert_eq!(all.partitions[1].1.entries[0].key.to_string(), "addparticles_101");

        let functions = &site.sections[2];
        let tmp = &functions.partitions[2].1.entries[0];
        assert_eq!(tmp.display_name, "tmp");
        assert_eq!(tmp.links.len(), 2);
        assert_eq!(site.entry_count(), 5 + 2 + 3);
    }

    #[test]
    fn scopes_are_escaped_and_external_links_leave_the_frame() {
        let site = build_site(&table(), 0).expect("site");
        let classes = &site.sections[1];
        let list = &classes.partitions[1].1.entries[0];
        assert_eq!(list.links[0].scope, "List&lt; T &gt;");
        assert!(!list.links[0].in_frame);
    }

    #[test]
    fn rejects_empty_names_and_urls() {
        let mut bad = table();
        bad.symbols.push(symbol("", Section::Functions, "../a.html", ""));
        assert!(build_site(&bad, 0).is_err());

        let mut bad = table();
        bad.symbols.push(symbol("x", Section::Functions, "  ", ""));
        assert!(build_site(&bad, 0).is_err());
    }

    #[test]
    fn generated_directory_validates_cleanly() {
        let dir = tempdir().expect("tempdir");
        let input = dir.path().join("symbols.json");
        fs::write(&input, serde_json::to_string(&table()).expect("json")).expect("write");
        let out = dir.path().join("search");
        fs::create_dir_all(&out).expect("mkdir");
        fs::write(out.join("pages_0.js"), "var searchData=\n[\n];").expect("write");

        let summary = run_generate(GenerateConfig {
            input,
            output_dir: out.clone(),
            start_id: 1,
        })
        .expect("generate");

        assert_eq!(summary.files_written, 5 + 2 + 3 + 1);
        assert_eq!(summary.entries_written, 10);
        assert!(!out.join("pages_0.js").exists());
        assert!(out.join("all_4.js").exists());

        let report = run_validate(ValidateConfig {
            paths: vec![out],
            globs: Vec::new(),
            exclude_globs: Vec::new(),
            strict: true,
        })
        .expect("validate");
        assert!(report.issues.is_empty(), "{:?}", report.issues);
        assert!(report.summary.passed);
    }

    #[test]
    fn toml_tables_and_bare_json_arrays_load() {
        let dir = tempdir().expect("tempdir");

        let toml_path = dir.path().join("symbols.toml");
        fs::write(
            &toml_path,
            "[[symbols]]\nname = \"axby\"\nsection = \"functions\"\nurl = \"../classEBHelmholtzOp.html#a1\"\nscope = \"EBHelmholtzOp\"\n",
        )
        .expect("write");
        let table = load_symbol_table(&toml_path).expect("toml");
        assert_eq!(table.symbols.len(), 1);
        assert_eq!(table.symbols[0].section, Section::Functions);
        assert!(!table.symbols[0].external);

        let json_path = dir.path().join("symbols.json");
        fs::write(
            &json_path,
            r#"[{"name": "tree", "section": "variables", "url": "../a.html#t"}]"#,
        )
        .expect("write");
        let table = load_symbol_table(&json_path).expect("json");
        assert_eq!(table.symbols[0].scope, "");
    }
}
