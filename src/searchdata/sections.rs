//! Search sections, partition file names, and the `searchdata.js` table.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::searchdata::SearchDataError;

/// Documentation index section, in the order Doxygen numbers them.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Section {
    All,
    Classes,
    Namespaces,
    Files,
    Functions,
    Variables,
    Typedefs,
    Enums,
    Enumvalues,
    Properties,
    Events,
    Related,
    Defines,
    Groups,
    Pages,
    Concepts,
}

impl Section {
    pub const ALL: [Section; 16] = [
        Section::All,
        Section::Classes,
        Section::Namespaces,
        Section::Files,
        Section::Functions,
        Section::Variables,
        Section::Typedefs,
        Section::Enums,
        Section::Enumvalues,
        Section::Properties,
        Section::Events,
        Section::Related,
        Section::Defines,
        Section::Groups,
        Section::Pages,
        Section::Concepts,
    ];

    /// File-name prefix (`functions` in `functions_13.js`).
    pub fn prefix(self) -> &'static str {
        match self {
            Section::All => "all",
            Section::Classes => "classes",
            Section::Namespaces => "namespaces",
            Section::Files => "files",
            Section::Functions => "functions",
            Section::Variables => "variables",
            Section::Typedefs => "typedefs",
            Section::Enums => "enums",
            Section::Enumvalues => "enumvalues",
            Section::Properties => "properties",
            Section::Events => "events",
            Section::Related => "related",
            Section::Defines => "defines",
            Section::Groups => "groups",
            Section::Pages => "pages",
            Section::Concepts => "concepts",
        }
    }

    /// Label shown in the search box's section selector.
    pub fn label(self) -> &'static str {
        match self {
            Section::All => "All",
            Section::Classes => "Classes",
            Section::Namespaces => "Namespaces",
            Section::Files => "Files",
            Section::Functions => "Functions",
            Section::Variables => "Variables",
            Section::Typedefs => "Typedefs",
            Section::Enums => "Enumerations",
            Section::Enumvalues => "Enumerator",
            Section::Properties => "Properties",
            Section::Events => "Events",
            Section::Related => "Friends",
            Section::Defines => "Macros",
            Section::Groups => "Modules",
            Section::Pages => "Pages",
            Section::Concepts => "Concepts",
        }
    }

    pub fn from_prefix(prefix: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.prefix() == prefix)
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

impl FromStr for Section {
    type Err = SearchDataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        Self::from_prefix(&lower).ok_or_else(|| SearchDataError::UnknownSection(s.to_string()))
    }
}

/// Leading character an entry is partitioned by: the lowercased first
/// character of its display name.
pub fn partition_char(name: &str) -> Option<char> {
    let first = name.chars().next()?;
    first.to_lowercase().next()
}

/// Name of one partition file, `<section>_<n>.js` with `n` in
/// lowercase hex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PartitionName {
    pub section: Section,
    pub number: u32,
}

impl PartitionName {
    pub fn new(section: Section, number: u32) -> Self {
        Self { section, number }
    }

    /// Parse a file name such as `functions_13.js`.
    pub fn parse(file_name: &str) -> Option<Self> {
        let stem = file_name.strip_suffix(".js")?;
        let (prefix, number) = stem.rsplit_once('_')?;
        let section = Section::from_prefix(prefix)?;
        if number.is_empty() || !number.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        let number = u32::from_str_radix(number, 16).ok()?;
        Some(Self { section, number })
    }

    pub fn file_name(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for PartitionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{:x}.js", self.section.prefix(), self.number)
    }
}

/// One row of `searchdata.js`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexedSection {
    pub section: Section,
    /// Leading characters in partition order; position `n` is stored in
    /// `<section>_<n>.js`.
    pub letters: Vec<char>,
}

/// Contents of `searchdata.js`: the sections that have content, in
/// display order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SectionIndex {
    pub sections: Vec<IndexedSection>,
}

impl SectionIndex {
    pub fn letters_for(&self, section: Section) -> Option<&[char]> {
        self.sections
            .iter()
            .find(|s| s.section == section)
            .map(|s| s.letters.as_slice())
    }

    /// Every partition file the table promises, with its letter.
    pub fn partitions(&self) -> Vec<(PartitionName, char)> {
        self.sections
            .iter()
            .flat_map(|s| {
                s.letters
                    .iter()
                    .enumerate()
                    .map(move |(n, ch)| (PartitionName::new(s.section, n as u32), *ch))
            })
            .collect()
    }
}
