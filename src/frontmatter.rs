//! Frontmatter parsing for agent definition files.
//!
//! Agent files are markdown documents that open with a `---` delimited header
//! block carrying a restricted YAML-like subset: flat `key: value` pairs,
//! inline bracket arrays and multi-line dash arrays. The parser is a small
//! state machine, deliberately not a general YAML implementation: existing
//! content files rely on its exact quirks (no nested mappings, no multi-line
//! strings, no anchors; single surrounding quotes stripped per end). Content
//! outside those shapes is either skipped or captured as a raw string.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single frontmatter value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FrontmatterValue {
    Null,
    Bool(bool),
    String(String),
    List(Vec<String>),
}

impl FrontmatterValue {
    /// Value as a string, if it is one.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FrontmatterValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Value as a string list, if it is one.
    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            FrontmatterValue::List(items) => Some(items),
            _ => None,
        }
    }

    /// Coerce to a list: lists pass through, a string becomes a one-element
    /// list, everything else is empty.
    pub fn to_string_list(&self) -> Vec<String> {
        match self {
            FrontmatterValue::List(items) => items.clone(),
            FrontmatterValue::String(s) => vec![s.clone()],
            _ => Vec::new(),
        }
    }
}

/// Parsed header block: an unordered bag of normalized keys to values.
/// Unknown keys pass through untouched so callers keep lossless access.
pub type RawFrontmatter = BTreeMap<String, FrontmatterValue>;

/// Extract the raw header text between the leading `---` line and the next
/// `---` line. The block must open at the very start of the document.
fn header_block(content: &str) -> Option<&str> {
    let rest = content.strip_prefix("---\n")?;
    let end = rest.find("\n---")?;
    Some(&rest[..end])
}

/// Normalize a hyphenated key to the joined convention used in the registry:
/// `escalates-to` becomes `escalatesTo`. Only a hyphen followed by a
/// lowercase ASCII letter is collapsed.
fn normalize_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    let mut chars = key.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '-' {
            if let Some(next) = chars.peek().copied() {
                if next.is_ascii_lowercase() {
                    chars.next();
                    out.push(next.to_ascii_uppercase());
                    continue;
                }
            }
        }
        out.push(c);
    }
    out
}

/// Strip one surrounding quote character from each end, independently.
/// `"run test"` becomes `run test`; a value that only ends with a quote
/// loses only the trailing one.
fn strip_quotes(value: &str) -> &str {
    let value = value
        .strip_prefix('"')
        .or_else(|| value.strip_prefix('\''))
        .unwrap_or(value);
    value
        .strip_suffix('"')
        .or_else(|| value.strip_suffix('\''))
        .unwrap_or(value)
}

/// Split a `key: value` line into a valid key and its raw value.
/// Keys are restricted to ASCII letters, underscores and hyphens.
fn split_key_value(line: &str) -> Option<(&str, &str)> {
    let trimmed = line.trim_start();
    let (key, value) = trimmed.split_once(':')?;
    if key.is_empty() || !key.chars().all(|c| c.is_ascii_alphabetic() || c == '_' || c == '-') {
        return None;
    }
    Some((key, value.trim()))
}

/// Parse the frontmatter header of a document.
///
/// Returns `None` when no header block is found. The line-by-line state
/// machine tracks at most one pending multi-line array:
/// an empty value opens the array, following `- item` lines append to it,
/// and the next `key: value` line (or end of input) flushes it.
pub fn parse_frontmatter(content: &str) -> Option<RawFrontmatter> {
    let header = header_block(content)?;

    let mut result = RawFrontmatter::new();
    let mut pending: Option<(String, Vec<String>)> = None;

    for line in header.lines() {
        if line.trim().is_empty() {
            continue;
        }

        // Array item lines only count while an array is open.
        if let Some((_, items)) = pending.as_mut() {
            if let Some(rest) = line.trim().strip_prefix('-') {
                let value = rest.trim();
                if !value.is_empty() {
                    items.push(value.to_string());
                }
                continue;
            }
        }

        let Some((key, value)) = split_key_value(line) else {
            continue;
        };

        if let Some((key, items)) = pending.take() {
            result.insert(key, FrontmatterValue::List(items));
        }

        let key = normalize_key(key);

        if let Some(inner) = value.strip_prefix('[').and_then(|v| v.strip_suffix(']')) {
            let items: Vec<String> = inner
                .split(',')
                .map(|item| strip_quotes(item.trim()).to_string())
                .filter(|item| !item.is_empty())
                .collect();
            result.insert(key, FrontmatterValue::List(items));
        } else if value.is_empty() {
            pending = Some((key, Vec::new()));
        } else if value == "null" {
            result.insert(key, FrontmatterValue::Null);
        } else if value == "true" || value == "false" {
            result.insert(key, FrontmatterValue::Bool(value == "true"));
        } else {
            result.insert(key, FrontmatterValue::String(strip_quotes(value).to_string()));
        }
    }

    if let Some((key, items)) = pending.take() {
        result.insert(key, FrontmatterValue::List(items));
    }

    Some(result)
}
