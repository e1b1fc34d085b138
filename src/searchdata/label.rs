//! Scope labels and link targets of search results.
//!
//! A scope label is an HTML fragment such as
//! `ParticleContainer::addParticles(const List&lt; P &gt; &amp;a_particles)`
//! for overloads, or just the owning scope (`ElectrostaticEbBc`) for
//! single results. Link URLs point into Doxygen's generated pages,
//! whose file names encode the compound kind and name.

use serde::{Deserialize, Serialize};

/// Decode the HTML entities Doxygen emits in scope labels.
pub fn decode_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(pos) = rest.find('&') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];

        let decoded = tail
            .find(';')
            .filter(|end| *end <= 10)
            .and_then(|end| decode_entity(&tail[1..end]).map(|ch| (ch, end)));

        match decoded {
            Some((ch, end)) => {
                out.push(ch);
                rest = &tail[end + 1..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }

    out.push_str(rest);
    out
}

fn decode_entity(name: &str) -> Option<char> {
    match name {
        "lt" => Some('<'),
        "gt" => Some('>'),
        "amp" => Some('&'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{a0}'),
        _ => {
            let num = name.strip_prefix('#')?;
            let code = match num.strip_prefix('x').or_else(|| num.strip_prefix('X')) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => num.parse::<u32>().ok()?,
            };
            char::from_u32(code)
        }
    }
}

/// Escape text for use as a scope label.
pub fn encode_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Structured view of a scope label.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ScopeLabel {
    /// Label text with entities decoded and surrounding whitespace trimmed.
    pub text: String,
    /// Owning scope path, outermost first.
    pub owner: Vec<String>,
    /// Member name, present only for signature labels.
    pub member: Option<String>,
    /// Parenthesized argument list, including the parentheses.
    pub arguments: Option<String>,
    /// Trailing qualifiers such as `const`, `=0`, or `=default`.
    pub qualifiers: Option<String>,
}

impl ScopeLabel {
    pub fn parse(raw: &str) -> Self {
        let text = decode_html(raw).trim().to_string();

        let (head, arguments, qualifiers) = match signature_start(&text) {
            Some(open) => {
                let (args, rest) = split_arguments(&text[open..]);
                let quals = rest.trim();
                (
                    &text[..open],
                    Some(args.to_string()),
                    (!quals.is_empty()).then(|| quals.to_string()),
                )
            }
            None => (text.as_str(), None, None),
        };

        let mut owner = split_scope(head);
        let member = if arguments.is_some() { owner.pop() } else { None };

        Self {
            owner,
            member,
            arguments,
            qualifiers,
            text,
        }
    }

    /// Owning scope joined with `::`.
    pub fn owner_path(&self) -> Option<String> {
        (!self.owner.is_empty()).then(|| self.owner.join("::"))
    }

    /// Member name, arguments, and qualifiers of a signature label.
    pub fn signature(&self) -> Option<String> {
        let member = self.member.as_deref()?;
        let mut sig = member.to_string();
        if let Some(args) = &self.arguments {
            sig.push_str(args);
        }
        if let Some(quals) = &self.qualifiers {
            if !quals.starts_with('=') {
                sig.push(' ');
            }
            sig.push_str(quals);
        }
        Some(sig)
    }
}

/// Byte offset of the `(` opening the argument list, skipping the
/// punctuation of `operator` names such as `operator()` or `operator<`.
fn signature_start(text: &str) -> Option<usize> {
    let from = match operator_member(text) {
        Some(pos) => {
            let after = pos + "operator".len();
            if text[after..].starts_with("()") {
                after + 2
            } else {
                after + text[after..].find('(')?
            }
        }
        None => 0,
    };

    let mut depth: i32 = 0;
    for (idx, ch) in text[from..].char_indices() {
        match ch {
            '<' => depth += 1,
            '>' => depth = (depth - 1).max(0),
            '(' if depth == 0 => return Some(from + idx),
            _ => {}
        }
    }
    None
}

/// Offset of an `operator` keyword that names the member: it starts the
/// text or follows `::`, and is not the head of a longer identifier.
fn operator_member(text: &str) -> Option<usize> {
    text.match_indices("operator").map(|(pos, _)| pos).find(|&pos| {
        let member_start = pos == 0 || text[..pos].ends_with("::");
        let ends_word = text[pos + "operator".len()..]
            .chars()
            .next()
            .map_or(true, |c| !(c.is_alphanumeric() || c == '_'));
        member_start && ends_word
    })
}

/// Split `(args) rest` at the matching close parenthesis.
fn split_arguments(text: &str) -> (&str, &str) {
    let mut depth = 0usize;
    for (idx, ch) in text.char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return (&text[..=idx], &text[idx + 1..]);
                }
            }
            _ => {}
        }
    }
    (text, "")
}

/// Split a qualified name on `::` outside template brackets.
fn split_scope(head: &str) -> Vec<String> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut depth: i32 = 0;
    let mut chars = head.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '<' => {
                depth += 1;
                current.push(ch);
            }
            '>' => {
                depth = (depth - 1).max(0);
                current.push(ch);
            }
            ':' if depth == 0 && chars.peek() == Some(&':') => {
                chars.next();
                segments.push(std::mem::take(&mut current));
            }
            _ => current.push(ch),
        }
    }
    segments.push(current);

    segments
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Kind of a generated documentation page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompoundKind {
    Class,
    Struct,
    Union,
    Namespace,
    Interface,
    Concept,
    File,
    Group,
    Dir,
    Page,
}

/// Compound a link points into, recovered from the page file name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompoundRef {
    pub kind: CompoundKind,
    pub name: String,
}

const COMPOUND_PREFIXES: &[(&str, CompoundKind)] = &[
    ("class", CompoundKind::Class),
    ("struct", CompoundKind::Struct),
    ("union", CompoundKind::Union),
    ("namespace", CompoundKind::Namespace),
    ("interface", CompoundKind::Interface),
    ("concept", CompoundKind::Concept),
];

/// Generated overview pages whose names collide with compound prefixes.
const INDEX_PAGES: &[&str] = &[
    "annotated",
    "classes",
    "concepts",
    "namespaces",
    "namespacemembers",
    "namespacemembers_func",
    "namespacemembers_vars",
    "namespacemembers_type",
    "namespacemembers_enum",
];

impl CompoundRef {
    /// Recover the compound from a page path such as
    /// `classPhysics_1_1ItoPlasma_1_1ItoPlasmaPhysics.html`.
    pub fn from_page(page: &str) -> Option<Self> {
        let file = page.rsplit('/').next()?;
        let stem = file.strip_suffix(".html")?;
        if stem.is_empty() {
            return None;
        }

        if let Some(name) = stem.strip_prefix("group__") {
            return Some(Self {
                kind: CompoundKind::Group,
                name: decode_page_name(name),
            });
        }
        if stem.starts_with("dir_") {
            return Some(Self {
                kind: CompoundKind::Dir,
                name: stem["dir_".len()..].to_string(),
            });
        }
        if INDEX_PAGES.contains(&stem) {
            return Some(Self {
                kind: CompoundKind::Page,
                name: stem.to_string(),
            });
        }
        if is_file_page(stem) {
            return Some(Self {
                kind: CompoundKind::File,
                name: decode_page_name(stem),
            });
        }

        for (prefix, kind) in COMPOUND_PREFIXES {
            if let Some(name) = stem.strip_prefix(prefix) {
                if !name.is_empty() {
                    return Some(Self {
                        kind: *kind,
                        name: decode_page_name(name),
                    });
                }
            }
        }

        Some(Self {
            kind: CompoundKind::Page,
            name: decode_page_name(stem),
        })
    }
}

/// File pages end in `_8<ext>` (the escaped `.`), where the `_` is not
/// itself the second half of an escaped underscore.
fn is_file_page(stem: &str) -> bool {
    let Some(pos) = stem.rfind("_8") else {
        return false;
    };
    let ext = &stem[pos + 2..];
    if ext.is_empty() || ext.len() > 4 || !ext.bytes().all(|b| b.is_ascii_alphanumeric()) {
        return false;
    }
    let underscores = stem[..=pos].bytes().rev().take_while(|b| *b == b'_').count();
    underscores % 2 == 1
}

/// Reverse Doxygen's page file-name escaping.
fn decode_page_name(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len());
    let mut i = 0;

    while i < chars.len() {
        if chars[i] != '_' || i + 1 >= chars.len() {
            out.push(chars[i]);
            i += 1;
            continue;
        }

        let next = chars[i + 1];
        let (decoded, consumed) = match next {
            '_' => (Some('_'), 2),
            '1' => (Some(':'), 2),
            '2' => (Some('/'), 2),
            '3' => (Some('<'), 2),
            '4' => (Some('>'), 2),
            '5' => (Some('*'), 2),
            '6' => (Some('&'), 2),
            '7' => (Some('|'), 2),
            '8' => (Some('.'), 2),
            '9' => (Some('!'), 2),
            '0' => match chars.get(i + 2) {
                Some('0') => (Some(','), 3),
                Some('1') => (Some(' '), 3),
                Some('2') => (Some('{'), 3),
                Some('3') => (Some('}'), 3),
                Some('4') => (Some('?'), 3),
                Some('5') => (Some('^'), 3),
                Some('6') => (Some('%'), 3),
                Some('7') => (Some('('), 3),
                Some('8') => (Some(')'), 3),
                Some('9') => (Some('+'), 3),
                Some('a') => (Some('='), 3),
                Some('b') => (Some('$'), 3),
                Some('c') => (Some('\\'), 3),
                Some('d') => (Some('@'), 3),
                Some('e') => (Some(']'), 3),
                Some('f') => (Some('['), 3),
                Some('g') => (Some('#'), 3),
                _ => (None, 1),
            },
            c if c.is_ascii_lowercase() => (Some(c.to_ascii_uppercase()), 2),
            _ => (None, 1),
        };

        match decoded {
            Some(ch) => out.push(ch),
            None => out.push('_'),
        }
        i += consumed;
    }

    out
}

/// Parsed link URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkTarget {
    /// Page path with leading `../` segments removed.
    pub page: String,
    /// Text after `#`. `Some("")` when the URL ends in a bare `#`.
    pub anchor: Option<String>,
    pub compound: Option<CompoundRef>,
}

impl LinkTarget {
    pub fn parse(url: &str) -> Self {
        let mut rest = url.trim();
        while let Some(stripped) = rest.strip_prefix("../") {
            rest = stripped;
        }

        let (page, anchor) = match rest.split_once('#') {
            Some((page, anchor)) => (page, Some(anchor.to_string())),
            None => (rest, None),
        };

        Self {
            page: page.to_string(),
            anchor,
            compound: CompoundRef::from_page(page),
        }
    }
}
