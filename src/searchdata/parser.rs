//! Tree-sitter backed reader for `searchData` and `searchdata.js` files.

use tree_sitter::{Node, Parser, Tree};
use tree_sitter_javascript::LANGUAGE;

use crate::models::{ResultLink, SearchEntry, SearchKey};
use crate::searchdata::{
    IndexedSection, SearchDataError, SearchDataFile, SearchDataResult, Section, SectionIndex,
};

const SEARCH_DATA_VAR: &str = "searchData";
const SECTIONS_WITH_CONTENT_VAR: &str = "indexSectionsWithContent";
const SECTION_NAMES_VAR: &str = "indexSectionNames";

/// Literal value extracted from the syntax tree.
#[derive(Debug, Clone, PartialEq)]
enum JsValue {
    Str(String),
    Num(f64),
    Bool(bool),
    Array(Vec<JsValue>),
    Object(Vec<(String, JsValue)>),
    Other(String),
}

impl JsValue {
    fn describe(&self) -> String {
        match self {
            JsValue::Str(_) => "a string".to_string(),
            JsValue::Num(_) => "a number".to_string(),
            JsValue::Bool(_) => "a boolean".to_string(),
            JsValue::Array(_) => "an array".to_string(),
            JsValue::Object(_) => "an object".to_string(),
            JsValue::Other(kind) => format!("`{kind}`"),
        }
    }
}

/// Parse the contents of one `<section>_<n>.js` file.
pub fn parse_search_data(source: &str) -> SearchDataResult<SearchDataFile> {
    let tree = parse_tree(source)?;
    let bytes = source.as_bytes();

    let value = find_declaration(tree.root_node(), bytes, SEARCH_DATA_VAR)
        .ok_or(SearchDataError::MissingDeclaration(SEARCH_DATA_VAR))?;

    let items = match to_value(value, bytes) {
        JsValue::Array(items) => items,
        other => {
            return Err(SearchDataError::UnexpectedValue {
                name: SEARCH_DATA_VAR,
                expected: "an array",
                found: other.describe(),
            })
        }
    };

    let entries = items
        .into_iter()
        .enumerate()
        .map(|(index, item)| decode_entry(index, item))
        .collect::<SearchDataResult<Vec<_>>>()?;

    Ok(SearchDataFile { entries })
}

/// Parse the `searchdata.js` section table.
///
/// `indexSectionsWithContent` and `indexSectionNames` are joined on
/// their numeric keys; `indexSectionLabels` is display-only and ignored.
pub fn parse_section_index(source: &str) -> SearchDataResult<SectionIndex> {
    let tree = parse_tree(source)?;
    let bytes = source.as_bytes();

    let contents = declared_object(tree.root_node(), bytes, SECTIONS_WITH_CONTENT_VAR)?;
    let names = declared_object(tree.root_node(), bytes, SECTION_NAMES_VAR)?;

    let mut rows: Vec<(u32, IndexedSection)> = Vec::new();
    for (slot, value) in contents {
        let JsValue::Str(letters) = &value else {
            return Err(SearchDataError::UnexpectedValue {
                name: SECTIONS_WITH_CONTENT_VAR,
                expected: "string values",
                found: value.describe(),
            });
        };

        let name = names
            .iter()
            .find(|(k, _)| *k == slot)
            .and_then(|(_, v)| match v {
                JsValue::Str(s) => Some(s.as_str()),
                _ => None,
            })
            .ok_or_else(|| SearchDataError::UnexpectedValue {
                name: SECTION_NAMES_VAR,
                expected: "a name for every section with content",
                found: format!("nothing for slot {slot}"),
            })?;

        let section: Section = name.parse()?;
        let order = slot.parse::<u32>().unwrap_or(u32::MAX);
        rows.push((
            order,
            IndexedSection {
                section,
                letters: letters.chars().collect(),
            },
        ));
    }

    rows.sort_by_key(|(order, _)| *order);
    Ok(SectionIndex {
        sections: rows.into_iter().map(|(_, s)| s).collect(),
    })
}

fn parse_tree(source: &str) -> SearchDataResult<Tree> {
    let mut parser = Parser::new();
    let language = LANGUAGE.into();
    parser
        .set_language(&language)
        .map_err(|err| SearchDataError::Grammar(err.to_string()))?;

    let tree = parser.parse(source, None).ok_or(SearchDataError::NoTree)?;

    if tree.root_node().has_error() {
        let line = first_error_line(tree.root_node()).unwrap_or(1);
        return Err(SearchDataError::Syntax { line });
    }

    Ok(tree)
}

fn first_error_line(node: Node) -> Option<usize> {
    if node.is_error() || node.is_missing() {
        return Some(node.start_position().row + 1);
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.has_error() || child.is_missing() {
            if let Some(line) = first_error_line(child) {
                return Some(line);
            }
        }
    }
    None
}

/// Value node bound to `name`, via `var`/`let`/`const` or a bare
/// assignment at the top level.
fn find_declaration<'t>(root: Node<'t>, bytes: &[u8], name: &str) -> Option<Node<'t>> {
    let mut cursor = root.walk();
    for stmt in root.named_children(&mut cursor) {
        match stmt.kind() {
            "variable_declaration" | "lexical_declaration" => {
                let mut inner = stmt.walk();
                for declarator in stmt.named_children(&mut inner) {
                    if declarator.kind() != "variable_declarator" {
                        continue;
                    }
                    let matches = declarator
                        .child_by_field_name("name")
                        .and_then(|n| n.utf8_text(bytes).ok())
                        == Some(name);
                    if matches {
                        if let Some(value) = declarator.child_by_field_name("value") {
                            return Some(value);
                        }
                    }
                }
            }
            "expression_statement" => {
                let Some(expr) = stmt.named_child(0) else {
                    continue;
                };
                if expr.kind() != "assignment_expression" {
                    continue;
                }
                let matches = expr
                    .child_by_field_name("left")
                    .and_then(|n| n.utf8_text(bytes).ok())
                    == Some(name);
                if matches {
                    if let Some(value) = expr.child_by_field_name("right") {
                        return Some(value);
                    }
                }
            }
            _ => {}
        }
    }
    None
}

fn declared_object(
    root: Node,
    bytes: &[u8],
    name: &'static str,
) -> SearchDataResult<Vec<(String, JsValue)>> {
    let node = find_declaration(root, bytes, name).ok_or(SearchDataError::MissingDeclaration(name))?;
    match to_value(node, bytes) {
        JsValue::Object(pairs) => Ok(pairs),
        other => Err(SearchDataError::UnexpectedValue {
            name,
            expected: "an object",
            found: other.describe(),
        }),
    }
}

fn to_value(node: Node, bytes: &[u8]) -> JsValue {
    let text = node.utf8_text(bytes).unwrap_or("");
    match node.kind() {
        "string" => JsValue::Str(unquote(text)),
        "number" => text
            .parse::<f64>()
            .map(JsValue::Num)
            .unwrap_or_else(|_| JsValue::Other("number".to_string())),
        "true" => JsValue::Bool(true),
        "false" => JsValue::Bool(false),
        "parenthesized_expression" => match node.named_child(0) {
            Some(inner) => to_value(inner, bytes),
            None => JsValue::Other(node.kind().to_string()),
        },
        "array" => {
            let mut cursor = node.walk();
            let items = node
                .named_children(&mut cursor)
                .filter(|child| child.kind() != "comment")
                .map(|child| to_value(child, bytes))
                .collect();
            JsValue::Array(items)
        }
        "object" => {
            let mut cursor = node.walk();
            let mut pairs = Vec::new();
            for child in node.named_children(&mut cursor) {
                if child.kind() != "pair" {
                    continue;
                }
                let (Some(key), Some(value)) = (
                    child.child_by_field_name("key"),
                    child.child_by_field_name("value"),
                ) else {
                    continue;
                };
                let key_text = key.utf8_text(bytes).unwrap_or("");
                let key = if key.kind() == "string" {
                    unquote(key_text)
                } else {
                    key_text.to_string()
                };
                pairs.push((key, to_value(value, bytes)));
            }
            JsValue::Object(pairs)
        }
        kind => JsValue::Other(kind.to_string()),
    }
}

fn decode_entry(index: usize, value: JsValue) -> SearchDataResult<SearchEntry> {
    let malformed = |reason: String| SearchDataError::MalformedEntry { index, reason };

    let mut parts = match value {
        JsValue::Array(parts) => parts,
        other => return Err(malformed(format!("expected an array, found {}", other.describe()))),
    };
    if parts.len() != 2 {
        return Err(malformed(format!(
            "expected [key, [name, links...]], found {} elements",
            parts.len()
        )));
    }

    let body = parts.pop().unwrap_or(JsValue::Array(Vec::new()));
    let key = match parts.pop() {
        Some(JsValue::Str(raw)) => raw
            .parse::<SearchKey>()
            .map_err(|err| malformed(err.to_string()))?,
        Some(other) => return Err(malformed(format!("key must be a string, found {}", other.describe()))),
        None => return Err(malformed("missing key".to_string())),
    };

    let body = match body {
        JsValue::Array(body) => body,
        other => {
            return Err(malformed(format!(
                "result list must be an array, found {}",
                other.describe()
            )))
        }
    };

    let mut body = body.into_iter();
    let display_name = match body.next() {
        Some(JsValue::Str(name)) => name,
        Some(other) => {
            return Err(malformed(format!(
                "display name must be a string, found {}",
                other.describe()
            )))
        }
        None => return Err(malformed("missing display name".to_string())),
    };

    let mut links = Vec::new();
    for item in body {
        // Older Doxygen releases wrap the links in one more array.
        if let JsValue::Array(inner) = &item {
            if matches!(inner.first(), None | Some(JsValue::Array(_))) {
                for nested in inner.iter().cloned() {
                    links.push(decode_link(nested).map_err(malformed)?);
                }
                continue;
            }
        }
        links.push(decode_link(item).map_err(malformed)?);
    }

    Ok(SearchEntry {
        key,
        display_name,
        links,
    })
}

fn decode_link(value: JsValue) -> Result<ResultLink, String> {
    let fields = match value {
        JsValue::Array(fields) => fields,
        other => return Err(format!("link must be an array, found {}", other.describe())),
    };
    if fields.len() < 2 || fields.len() > 3 {
        return Err(format!(
            "link must be [url, flag, scope], found {} elements",
            fields.len()
        ));
    }

    let mut fields = fields.into_iter();
    let url = match fields.next() {
        Some(JsValue::Str(url)) => url,
        Some(other) => return Err(format!("link url must be a string, found {}", other.describe())),
        None => return Err("missing link url".to_string()),
    };
    let in_frame = match fields.next() {
        Some(JsValue::Num(n)) => n != 0.0,
        Some(JsValue::Bool(b)) => b,
        // `[url, scope]` links carry no flag and always open in the frame.
        Some(JsValue::Str(scope)) if fields.len() == 0 => {
            return Ok(ResultLink {
                url,
                in_frame: true,
                scope,
            })
        }
        Some(other) => return Err(format!("link flag must be 0 or 1, found {}", other.describe())),
        None => return Err("missing link flag".to_string()),
    };
    let scope = match fields.next() {
        Some(JsValue::Str(scope)) => scope,
        Some(other) => return Err(format!("scope label must be a string, found {}", other.describe())),
        None => String::new(),
    };

    Ok(ResultLink {
        url,
        in_frame,
        scope,
    })
}

/// Strip the quotes of a JavaScript string literal and resolve escapes.
fn unquote(literal: &str) -> String {
    let inner = if literal.len() >= 2 {
        &literal[1..literal.len() - 1]
    } else {
        literal
    };

    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        let Some(esc) = chars.next() else {
            out.push('\\');
            break;
        };
        match esc {
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            'b' => out.push('\u{8}'),
            'f' => out.push('\u{c}'),
            'v' => out.push('\u{b}'),
            '0' => out.push('\0'),
            'x' => {
                let hex: String = chars.by_ref().take(2).collect();
                match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                    Some(c) => out.push(c),
                    None => {
                        out.push_str("\\x");
                        out.push_str(&hex);
                    }
                }
            }
            'u' => {
                let hex: String = if chars.peek() == Some(&'{') {
                    chars.next();
                    chars.by_ref().take_while(|c| *c != '}').collect()
                } else {
                    chars.by_ref().take(4).collect()
                };
                match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                    Some(c) => out.push(c),
                    None => {
                        out.push_str("\\u");
                        out.push_str(&hex);
                    }
                }
            }
            '\n' => {}
            other => out.push(other),
        }
    }

    out
}
