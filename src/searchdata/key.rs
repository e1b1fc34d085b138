//! Search-key encoding.
//!
//! Doxygen lowercases a symbol name and replaces every ASCII byte that
//! is not alphanumeric with `_` plus two hex digits, then appends a
//! site-wide `_<id>` suffix: `operator==` becomes `operator_3d_3d_812`.

use std::fmt::{self, Write as _};
use std::str::FromStr;

use crate::models::SearchKey;
use crate::searchdata::SearchDataError;

/// Encode a display name into its search-key stem.
pub fn search_stem(name: &str) -> String {
    let mut stem = String::with_capacity(name.len());
    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            stem.push(ch.to_ascii_lowercase());
        } else if ch.is_ascii() {
            let _ = write!(stem, "_{:02x}", ch as u32);
        } else {
            stem.extend(ch.to_lowercase());
        }
    }
    stem
}

/// Reverse `search_stem`, yielding the lowercase display name.
///
/// A `_` that is not followed by two hex digits is kept verbatim.
pub fn decode_stem(stem: &str) -> String {
    let chars: Vec<char> = stem.chars().collect();
    let mut out = String::with_capacity(stem.len());
    let mut i = 0;

    while i < chars.len() {
        if chars[i] == '_' && i + 2 < chars.len() {
            let hi = chars[i + 1].to_digit(16);
            let lo = chars[i + 2].to_digit(16);
            if let (Some(hi), Some(lo)) = (hi, lo) {
                out.push(char::from((hi * 16 + lo) as u8));
                i += 3;
                continue;
            }
        }
        out.push(chars[i]);
        i += 1;
    }

    out
}

/// Whether `stem` is the encoded form of `name`.
pub fn stem_matches_name(stem: &str, name: &str) -> bool {
    search_stem(name) == stem
}

impl SearchKey {
    pub fn new(stem: impl Into<String>, id: u64) -> Self {
        Self {
            stem: stem.into(),
            id,
        }
    }

    /// Build the key Doxygen would assign to `name` with the given id.
    pub fn for_name(name: &str, id: u64) -> Self {
        Self::new(search_stem(name), id)
    }
}

impl fmt::Display for SearchKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.stem, self.id)
    }
}

impl FromStr for SearchKey {
    type Err = SearchDataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (stem, id) = s
            .rsplit_once('_')
            .ok_or_else(|| SearchDataError::InvalidKey(s.to_string(), "missing numeric id suffix"))?;

        if stem.is_empty() {
            return Err(SearchDataError::InvalidKey(s.to_string(), "empty stem"));
        }
        if id.is_empty() || !id.bytes().all(|b| b.is_ascii_digit()) {
            return Err(SearchDataError::InvalidKey(
                s.to_string(),
                "id suffix is not a decimal number",
            ));
        }

        let id = id
            .parse::<u64>()
            .map_err(|_| SearchDataError::InvalidKey(s.to_string(), "id suffix out of range"))?;

        Ok(Self::new(stem, id))
    }
}

impl TryFrom<String> for SearchKey {
    type Error = SearchDataError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SearchKey> for String {
    fn from(key: SearchKey) -> Self {
        key.to_string()
    }
}
