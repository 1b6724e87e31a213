//! Token interpolation for templated paths, filters and display fields.
//!
//! Step configuration mixes two placeholder conventions, `(name)` and
//! `` `name` ``; both mark the same thing. Resolution happens in two
//! passes with different policies:
//!
//! 1. [`interpolate`] resolves against accumulated flow state before a
//!    query runs. A token nobody can resolve is left in place so a
//!    misconfigured path stays visible in logs instead of silently
//!    collapsing to an empty segment.
//! 2. [`render`] resolves against a fetched document's fields when rows are
//!    built. Missing fields become blanks there, since raw tokens must
//!    never reach display text.

use crate::document::{self, Document};
use ahash::AHashMap;

/// A fallback resolver consulted for tokens absent from the variable map.
pub type TokenFallback<'a> = &'a dyn Fn(&str) -> Option<String>;

#[derive(Debug, PartialEq)]
enum Segment<'a> {
    Literal(&'a str),
    /// Token name plus the raw text including delimiters.
    Token { name: &'a str, raw: &'a str },
}

/// Splits a template into literal runs and `(name)` / `` `name` `` tokens.
fn scan(template: &str) -> Vec<Segment<'_>> {
    let mut segments = Vec::new();
    let mut rest = template;
    loop {
        let open = rest.find(['(', '`']);
        let Some(open) = open else {
            if !rest.is_empty() {
                segments.push(Segment::Literal(rest));
            }
            return segments;
        };
        let close_delim = if rest.as_bytes()[open] == b'(' { ')' } else { '`' };
        let Some(close) = rest[open + 1..].find(close_delim) else {
            // Unmatched delimiter stays literal text.
            segments.push(Segment::Literal(rest));
            return segments;
        };
        let close = open + 1 + close;
        if open > 0 {
            segments.push(Segment::Literal(&rest[..open]));
        }
        segments.push(Segment::Token {
            name: &rest[open + 1..close],
            raw: &rest[open..=close],
        });
        rest = &rest[close + 1..];
        if rest.is_empty() {
            return segments;
        }
    }
}

/// Resolves tokens from flow state.
///
/// Per-token resolution order: the explicit `vars` map, then the caller's
/// `fallback` closure, then leave the token textually unresolved. The
/// fallback is how the engine supplies "most recent collected identifier"
/// and "currently selected choice" without naming them in every template.
pub fn interpolate(
    template: &str,
    vars: &AHashMap<String, String>,
    fallback: Option<TokenFallback<'_>>,
) -> String {
    let mut out = String::with_capacity(template.len());
    for segment in scan(template) {
        match segment {
            Segment::Literal(text) => out.push_str(text),
            Segment::Token { name, raw } => {
                if let Some(v) = vars.get(name) {
                    out.push_str(v);
                } else if let Some(v) = fallback.and_then(|f| f(name)) {
                    out.push_str(&v);
                } else {
                    out.push_str(raw);
                }
            }
        }
    }
    out
}

/// Resolves tokens from a single document's fields, supporting dotted
/// key paths for nested values. Missing fields render blank; doubled
/// spaces left behind by blank substitutions are collapsed and the result
/// is trimmed.
pub fn render(template: &str, doc: &Document) -> String {
    let mut out = String::with_capacity(template.len());
    for segment in scan(template) {
        match segment {
            Segment::Literal(text) => out.push_str(text),
            Segment::Token { name, .. } => {
                if let Some(text) = document::get_text(doc, name) {
                    out.push_str(&text);
                }
            }
        }
    }
    collapse_spaces(&out)
}

fn collapse_spaces(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last_was_space = false;
    for ch in text.chars() {
        if ch == ' ' {
            if !last_was_space {
                out.push(ch);
            }
            last_was_space = true;
        } else {
            out.push(ch);
            last_was_space = false;
        }
    }
    out.trim().to_string()
}

/// True when the template contains at least one resolvable token.
pub fn has_tokens(template: &str) -> bool {
    scan(template)
        .iter()
        .any(|s| matches!(s, Segment::Token { .. }))
}
