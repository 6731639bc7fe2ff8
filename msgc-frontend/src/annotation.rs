//! Field annotations
//!
//! A struct tag such as `` `json:"name" msg:"3,extension"` `` is looked up
//! by key and the selected body split on commas. Part 0 picks the field's
//! tag, part 1 may carry a marker.

use msgc_common::{GenError, Trail};

/// What part 0 of an annotation says about the field's tag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagIndex {
    /// Empty: take the next implicit tag
    Implicit,
    /// `-`: drop the field
    Skip,
    Explicit(u16),
}

/// Part 1 markers understood by the builder. Anything else is left to the
/// printer (`omitempty` and friends).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    None,
    Extension,
    Flatten,
}

pub const SKIP_SENTINEL: &str = "-";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotation {
    pub parts: Vec<String>,
}

impl Annotation {
    pub fn parse(body: &str) -> Self {
        Self {
            parts: body.split(',').map(str::to_string).collect(),
        }
    }

    /// Read the annotation from a raw struct tag, trying `keys` in order.
    /// The first key with a non-empty value wins.
    pub fn from_raw<S: AsRef<str>>(raw: &str, keys: &[S]) -> Self {
        let tag = raw.trim_matches('`');
        let body = keys
            .iter()
            .filter_map(|key| lookup(tag, key.as_ref()))
            .find(|value| !value.is_empty())
            .unwrap_or_default();
        Self::parse(&body)
    }

    pub fn index(&self, trail: &Trail) -> Result<TagIndex, GenError> {
        let first = self.parts.first().map(String::as_str).unwrap_or("");
        match first {
            "" => Ok(TagIndex::Implicit),
            SKIP_SENTINEL => Ok(TagIndex::Skip),
            text => text
                .parse::<u16>()
                .map(TagIndex::Explicit)
                .map_err(|e| GenError::translate(format!("invalid index {text:?}: {e}"), trail)),
        }
    }

    pub fn marker(&self) -> Marker {
        match self.parts.get(1).map(String::as_str) {
            Some("extension") => Marker::Extension,
            Some("flatten") => Marker::Flatten,
            _ => Marker::None,
        }
    }
}

/// Look up `key` in a conventional `key:"value" key2:"value2"` tag string.
///
/// Returns `None` when the key is absent or the tag is malformed from that
/// point on.
pub fn lookup(tag: &str, key: &str) -> Option<String> {
    let mut rest = tag;
    loop {
        rest = rest.trim_start_matches(' ');
        if rest.is_empty() {
            return None;
        }

        let name_end = rest
            .find(|c: char| c <= ' ' || c == ':' || c == '"' || c == '\u{7f}')
            .unwrap_or(rest.len());
        if name_end == 0 || !rest[name_end..].starts_with(":\"") {
            return None;
        }
        let name = &rest[..name_end];
        rest = &rest[name_end + 1..];

        let (quoted, after) = split_quoted(rest)?;
        rest = after;
        if name == key {
            return unquote(quoted);
        }
    }
}

/// Split a leading double-quoted string (quotes included) off `s`
fn split_quoted(s: &str) -> Option<(&str, &str)> {
    let mut escaped = false;
    for (i, c) in s.char_indices().skip(1) {
        match c {
            _ if escaped => escaped = false,
            '\\' => escaped = true,
            '"' => return Some((&s[..=i], &s[i + 1..])),
            _ => {}
        }
    }
    None
}

fn unquote(quoted: &str) -> Option<String> {
    let inner = quoted.strip_prefix('"')?.strip_suffix('"')?;
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next()? {
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            '\\' => out.push('\\'),
            '"' => out.push('"'),
            '\'' => out.push('\''),
            _ => return None,
        }
    }
    Some(out)
}
