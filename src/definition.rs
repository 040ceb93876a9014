//! Agent definition records and the file-to-definition builder.
//!
//! One markdown file becomes one [`AgentDefinition`]: the normalized entity
//! the registry, validator and integrity tracker all operate on. Building a
//! definition reads the file once, parses its frontmatter and computes a
//! SHA-256 content hash over the entire raw document (header included), so
//! identical content always yields an identical hash regardless of filename.

use crate::frontmatter::{parse_frontmatter, FrontmatterValue, RawFrontmatter};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};

/// Canonical in-memory record for one agent definition file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentDefinition {
    /// Unique name: explicit `name` field, else the file stem with a trailing
    /// `-agent` suffix stripped and upper-cased.
    pub name: String,
    /// Absolute path of the source file. Immutable after creation.
    pub file_path: PathBuf,
    /// Categorical tag: `agent`, `meta-agent`, `workflow`, `core-dna`, an
    /// arbitrary string, or `unknown` when absent.
    #[serde(rename = "type")]
    pub agent_type: String,
    /// Parent document this definition inherits from, by filename.
    pub inherits: Option<String>,
    /// Peer references by name. Order-preserving, duplicates allowed.
    pub collaborates: Vec<String>,
    /// Escalation target, or `None` for an explicit no-escalation root.
    pub escalates_to: Option<String>,
    /// Deduplicated union of the comma-split `trigger` field and `aliases`.
    pub triggers: Vec<String>,
    /// Timestamp of the last manual verification, if recorded.
    pub last_verified: Option<DateTime<Utc>>,
    /// SHA-256 hex digest of the full raw file content.
    pub hash: String,
    /// The unmodified parsed header, for lossless access to unmodeled fields.
    pub raw_frontmatter: RawFrontmatter,
    pub size_bytes: u64,
    pub line_count: usize,
}

/// Outcome of building one definition. A discriminated value, never a panic:
/// a corrupt file must not take down a whole registry load.
#[derive(Debug, Clone)]
pub enum ParseOutcome {
    Success(Box<AgentDefinition>),
    Failure { file_path: PathBuf, reason: String },
}

impl ParseOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ParseOutcome::Success(_))
    }
}

/// SHA-256 hex digest of arbitrary content. The content-addressing primitive
/// for all integrity tracking.
pub fn content_hash(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    hex::encode(hasher.finalize())
}

/// Union of comma-split `trigger` and the `aliases` list, first occurrence
/// wins on duplicates.
fn extract_triggers(frontmatter: &RawFrontmatter) -> Vec<String> {
    let mut triggers: Vec<String> = Vec::new();

    if let Some(trigger) = frontmatter.get("trigger").and_then(FrontmatterValue::as_str) {
        for part in trigger.split(',') {
            triggers.push(part.trim().to_string());
        }
    }

    if let Some(aliases) = frontmatter.get("aliases").and_then(FrontmatterValue::as_list) {
        triggers.extend(aliases.iter().cloned());
    }

    let mut seen = std::collections::HashSet::new();
    triggers.retain(|t| seen.insert(t.clone()));
    triggers
}

/// Best-effort timestamp parsing: RFC 3339 first, then a bare date.
fn parse_last_verified(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| DateTime::from_naive_utc_and_offset(naive, Utc))
}

/// Derive the agent name from its file path: stem, minus a trailing `-agent`
/// suffix, upper-cased.
fn name_from_path(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    stem.strip_suffix("-agent").unwrap_or(&stem).to_uppercase()
}

/// Build an [`AgentDefinition`] from a file on disk.
///
/// Expected failure modes (missing file, unreadable content, absent
/// frontmatter) come back as [`ParseOutcome::Failure`] with a human-readable
/// reason; nothing crosses this boundary as an error.
pub fn parse_agent_file(file_path: &Path) -> ParseOutcome {
    let content = match fs::read_to_string(file_path) {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return ParseOutcome::Failure {
                file_path: file_path.to_path_buf(),
                reason: format!("File not found: {}", file_path.display()),
            };
        }
        Err(err) => {
            return ParseOutcome::Failure {
                file_path: file_path.to_path_buf(),
                reason: format!("Failed to read {}: {}", file_path.display(), err),
            };
        }
    };

    let size_bytes = match fs::metadata(file_path) {
        Ok(meta) => meta.len(),
        Err(err) => {
            return ParseOutcome::Failure {
                file_path: file_path.to_path_buf(),
                reason: format!("Failed to stat {}: {}", file_path.display(), err),
            };
        }
    };

    let Some(frontmatter) = parse_frontmatter(&content) else {
        return ParseOutcome::Failure {
            file_path: file_path.to_path_buf(),
            reason: format!("Frontmatter not found in: {}", file_path.display()),
        };
    };

    let name = frontmatter
        .get("name")
        .and_then(FrontmatterValue::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| name_from_path(file_path));

    let agent_type = frontmatter
        .get("type")
        .and_then(FrontmatterValue::as_str)
        .unwrap_or("unknown")
        .to_string();

    let inherits = frontmatter
        .get("inherits")
        .and_then(FrontmatterValue::as_str)
        .map(str::to_string);

    let collaborates = frontmatter
        .get("collaborates")
        .map(FrontmatterValue::to_string_list)
        .unwrap_or_default();

    let escalates_to = frontmatter
        .get("escalatesTo")
        .and_then(FrontmatterValue::as_str)
        .map(str::to_string);

    let last_verified = frontmatter
        .get("lastVerified")
        .and_then(FrontmatterValue::as_str)
        .and_then(parse_last_verified);

    let definition = AgentDefinition {
        name,
        file_path: file_path.to_path_buf(),
        agent_type,
        inherits,
        collaborates,
        escalates_to,
        triggers: extract_triggers(&frontmatter),
        last_verified,
        hash: content_hash(content.as_bytes()),
        raw_frontmatter: frontmatter,
        size_bytes,
        line_count: content.split('\n').count(),
    };

    ParseOutcome::Success(Box::new(definition))
}
