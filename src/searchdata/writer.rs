//! Serializers producing the exact layout Doxygen emits.

use std::fmt::Write as _;

use crate::models::{ResultLink, SearchEntry};
use crate::searchdata::{SearchDataFile, SectionIndex};

/// Render a partition file.
///
/// The output has no trailing newline, matching Doxygen, so an
/// unmodified file parses and re-renders to identical bytes.
pub fn write_search_data(file: &SearchDataFile) -> String {
    let mut out = String::from("var searchData=\n[\n");

    for (i, entry) in file.entries.iter().enumerate() {
        if i > 0 {
            out.push_str(",\n");
        }
        out.push_str("  ");
        write_entry(&mut out, entry);
    }
    if !file.entries.is_empty() {
        out.push('\n');
    }

    out.push_str("];");
    out
}

fn write_entry(out: &mut String, entry: &SearchEntry) {
    out.push('[');
    push_js_string(out, &entry.key.to_string());
    out.push_str(",[");
    push_js_string(out, &entry.display_name);
    for link in &entry.links {
        out.push(',');
        write_link(out, link);
    }
    out.push_str("]]");
}

fn write_link(out: &mut String, link: &ResultLink) {
    out.push('[');
    push_js_string(out, &link.url);
    out.push_str(if link.in_frame { ",1," } else { ",0," });
    push_js_string(out, &link.scope);
    out.push(']');
}

fn push_js_string(out: &mut String, value: &str) {
    out.push('\'');
    for ch in value.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            c => out.push(c),
        }
    }
    out.push('\'');
}

/// Render `searchdata.js`, numbering sections in the given order.
pub fn write_section_index(index: &SectionIndex) -> String {
    let mut out = String::new();

    write_object(&mut out, "indexSectionsWithContent", index, |s| {
        s.letters.iter().collect()
    });
    out.push('\n');
    write_object(&mut out, "indexSectionNames", index, |s| {
        s.section.prefix().to_string()
    });
    out.push('\n');
    write_object(&mut out, "indexSectionLabels", index, |s| {
        s.section.label().to_string()
    });

    out
}

fn write_object(
    out: &mut String,
    name: &str,
    index: &SectionIndex,
    value: impl Fn(&crate::searchdata::IndexedSection) -> String,
) {
    let _ = writeln!(out, "var {name} =\n{{");
    let last = index.sections.len().saturating_sub(1);
    for (n, section) in index.sections.iter().enumerate() {
        let _ = write!(out, "  {n}: \"{}\"", escape_double_quoted(&value(section)));
        out.push_str(if n == last { "\n" } else { ",\n" });
    }
    out.push_str("};\n");
}

fn escape_double_quoted(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            c => out.push(c),
        }
    }
    out
}
