//! Query DSL parsing and evaluation utilities.
//!
//! This module implements the small structured query language used
//! by the search engine and CLI. It supports fielded terms such as
//! `key:add`, `name:Particle`, `scope:ItoSolver`, `section:functions`,
//! and simple AND/OR composition:
//! - Space-separated groups are combined with AND.
//! - `A|B` within a group is treated as OR.
//! - When the first alternative in a group has a known field,
//!   subsequent bare alternatives inherit that field (e.g.
//!   `section:functions|variables`).

use crate::models::{QueryExpr, QueryField, QueryTerm, SearchHit, Section};
use crate::searchdata::search_stem;

/// Parse a raw query string into a `QueryExpr`.
///
/// - Leading/trailing whitespace is ignored.
/// - Tokens are split on whitespace (honoring double quotes) and
///   within each token `|` separates OR alternatives.
/// - Bare atoms are `key:` terms, so `addpart` behaves like typing
///   into Doxygen's search box; atoms with an unknown field become
///   `text:` terms.
pub fn parse_query_expr(input: &str) -> Option<QueryExpr> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }

    let mut group_exprs = Vec::new();

    for token in tokenize(trimmed) {
        let mut clauses = Vec::new();
        let mut default_field: Option<QueryField> = None;

        for raw_alt in token.split('|') {
            let alt = raw_alt.trim();
            if alt.is_empty() {
                continue;
            }
            let term = match default_field {
                Some(field) if !alt.contains(':') => QueryTerm {
                    field,
                    value: alt.to_string(),
                },
                _ => {
                    let t = parse_term(alt);
                    default_field.get_or_insert(t.field);
                    t
                }
            };
            clauses.push(QueryExpr::Term(term));
        }

        if let Some(expr) = collapse(clauses, QueryExpr::Or) {
            group_exprs.push(expr);
        }
    }

    collapse(group_exprs, QueryExpr::And)
}

fn collapse(mut exprs: Vec<QueryExpr>, combine: fn(Vec<QueryExpr>) -> QueryExpr) -> Option<QueryExpr> {
    match exprs.len() {
        0 => None,
        1 => exprs.pop(),
        _ => Some(combine(exprs)),
    }
}

/// Tokenize a query string, treating whitespace as separators and
/// allowing double-quoted segments to contain spaces.
fn tokenize(input: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for ch in input.chars() {
        match ch {
            '"' => {
                in_quotes = !in_quotes;
            }
            c if c.is_whitespace() && !in_quotes => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            _ => current.push(ch),
        }
    }

    if !current.is_empty() {
        tokens.push(current);
    }

    tokens
}

fn parse_term(atom: &str) -> QueryTerm {
    let Some((head, rest)) = atom.split_once(':') else {
        return QueryTerm {
            field: QueryField::Key,
            value: atom.to_string(),
        };
    };

    let field = match head.to_ascii_lowercase().as_str() {
        "key" => QueryField::Key,
        "name" => QueryField::Name,
        "scope" => QueryField::Scope,
        "page" => QueryField::Page,
        "section" => QueryField::Section,
        "text" => QueryField::Text,
        // `Physics::CdrPlasma` and friends: not a field at all.
        _ => {
            return QueryTerm {
                field: QueryField::Text,
                value: atom.to_string(),
            }
        }
    };

    QueryTerm {
        field,
        value: rest.to_string(),
    }
}

/// Stem prefix every hit must share, when the expression pins one.
///
/// Used to narrow index lookups before the full expression runs in
/// memory. Only top-level `key:` terms (directly or under AND) qualify.
pub fn key_prefix_hint(expr: &QueryExpr) -> Option<String> {
    match expr {
        QueryExpr::Term(QueryTerm {
            field: QueryField::Key,
            value,
        }) => {
            let value = value.strip_prefix('=').unwrap_or(value);
            let stem = search_stem(value);
            (!stem.is_empty()).then_some(stem)
        }
        QueryExpr::Term(_) | QueryExpr::Or(_) => None,
        QueryExpr::And(clauses) => clauses
            .iter()
            .filter_map(key_prefix_hint)
            .max_by_key(|stem| stem.len()),
    }
}

/// Evaluate the query expression against a resolved hit.
///
/// The `literal` flag makes `key:` terms (and bare terms) require an
/// exact stem match instead of a prefix match.
pub fn hit_matches(expr: &QueryExpr, hit: &SearchHit, literal: bool) -> bool {
    match expr {
        QueryExpr::Term(term) => term_matches(term, hit, literal),
        QueryExpr::And(clauses) => clauses.iter().all(|c| hit_matches(c, hit, literal)),
        QueryExpr::Or(clauses) => clauses.iter().any(|c| hit_matches(c, hit, literal)),
    }
}

fn term_matches(term: &QueryTerm, hit: &SearchHit, literal: bool) -> bool {
    let (value, exact) = match term.value.strip_prefix('=') {
        Some(rest) => (rest, true),
        None => (term.value.as_str(), false),
    };

    match term.field {
        QueryField::Key => key_matches(hit, value, exact || literal),
        QueryField::Name => name_matches(hit, value, exact),
        QueryField::Scope => hit
            .links
            .iter()
            .any(|link| contains_or_equals(&link.scope, value, exact)),
        QueryField::Page => hit
            .links
            .iter()
            .any(|link| contains_or_equals(&link.page, value, exact)),
        QueryField::Section => match value.parse::<Section>() {
            Ok(section) => hit.section == Some(section),
            Err(_) => false,
        },
        QueryField::Text => {
            key_matches(hit, value, exact)
                || name_matches(hit, value, exact)
                || hit.links.iter().any(|link| {
                    contains_or_equals(&link.scope, value, exact)
                        || contains_or_equals(&link.page, value, exact)
                })
        }
    }
}

fn key_matches(hit: &SearchHit, value: &str, exact: bool) -> bool {
    let wanted = search_stem(value);
    if exact {
        hit.key.stem == wanted
    } else {
        hit.key.stem.starts_with(&wanted)
    }
}

fn name_matches(hit: &SearchHit, value: &str, exact: bool) -> bool {
    if exact {
        hit.display_name == value
    } else {
        hit.display_name
            .to_lowercase()
            .contains(&value.to_lowercase())
    }
}

fn contains_or_equals(haystack: &str, value: &str, exact: bool) -> bool {
    if exact {
        haystack == value
    } else {
        haystack.contains(value)
    }
}
