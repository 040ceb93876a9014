//! Integrity tracking for agent definitions.
//!
//! Builds a deterministic hash chain over the current registry (blocks in
//! agent-name order, each linked to the previous block's hash), snapshots the
//! name-to-hash map with an order-independent snapshot hash, diffs snapshots
//! to find drift, and persists an append-only snapshot history to a flat JSON
//! file capped at the most recent 100 entries.
//!
//! A block's stored `hash` is its definition's content hash, not a hash of
//! the block's own fields; [`hash_block`] computes the latter but the chain
//! builder deliberately does not use it. Switching the chain over would
//! invalidate every previously persisted snapshot, so the exercised behavior
//! is preserved.

use crate::definition::content_hash;
use crate::error::{RegistryError, WardenError};
use crate::registry::Registry;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

/// Previous-link sentinel for the first block in a chain.
pub const GENESIS_HASH: &str =
    "0000000000000000000000000000000000000000000000000000000000000000";

/// Snapshot history file, relative to the project root.
pub const INTEGRITY_FILE: &str = "Feedback/logs/agent-integrity.json";

/// Maximum number of snapshots retained in the history file.
const MAX_HISTORY: usize = 100;

/// One link in the integrity chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntegrityBlock {
    pub agent_name: String,
    /// Content hash of the definition at chain-build time.
    pub hash: String,
    /// Hash of the preceding block; genesis sentinel for the first.
    pub previous_hash: String,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub agent_type: String,
    pub size_bytes: u64,
}

/// An ordered, linked sequence of per-agent hash records.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntegrityChain {
    pub genesis_hash: String,
    pub head_hash: String,
    pub blocks: Vec<IntegrityBlock>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
    Added,
    Modified,
    Removed,
}

impl std::fmt::Display for ChangeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChangeType::Added => write!(f, "added"),
            ChangeType::Modified => write!(f, "modified"),
            ChangeType::Removed => write!(f, "removed"),
        }
    }
}

/// One difference between two snapshots. Absent sides carry an empty hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntegrityDiff {
    pub agent_name: String,
    pub old_hash: String,
    pub new_hash: String,
    pub change_type: ChangeType,
}

/// Point-in-time capture of every agent's content hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntegritySnapshot {
    /// Order-independent hash over the sorted name:hash pairs.
    pub snapshot_hash: String,
    pub timestamp: DateTime<Utc>,
    pub hashes: BTreeMap<String, String>,
    pub agent_count: usize,
}

/// Chain walk result: the first block whose previous-link does not match.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainVerification {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub broken_at: Option<String>,
}

/// Live-registry comparison result.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentsVerification {
    pub valid: bool,
    pub tampered_agents: Vec<String>,
}

/// Canonical serialization of a block's fields, minus its own hash.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BlockFields<'a> {
    agent_name: &'a str,
    previous_hash: &'a str,
    timestamp: String,
    #[serde(rename = "type")]
    agent_type: &'a str,
    size_bytes: u64,
}

/// SHA-256 over the canonical JSON of a block's fields.
///
/// Defined for completeness; the chain builder stores content hashes instead
/// (see module docs).
pub fn hash_block(block: &IntegrityBlock) -> String {
    let fields = BlockFields {
        agent_name: &block.agent_name,
        previous_hash: &block.previous_hash,
        timestamp: block.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
        agent_type: &block.agent_type,
        size_bytes: block.size_bytes,
    };
    // BlockFields serialization is infallible.
    let canonical = serde_json::to_string(&fields).unwrap_or_default();
    content_hash(canonical.as_bytes())
}

/// Order-independent hash of a name-to-hash map: sorted `name:hash` pairs
/// joined with `|`.
pub fn hash_snapshot(hashes: &BTreeMap<String, String>) -> String {
    let joined = hashes
        .iter()
        .map(|(name, hash)| format!("{}:{}", name, hash))
        .collect::<Vec<_>>()
        .join("|");
    content_hash(joined.as_bytes())
}

/// Capture the current state of every agent as a snapshot, from a fresh
/// registry view.
pub fn create_snapshot(registry: &mut Registry) -> Result<IntegritySnapshot, RegistryError> {
    registry.invalidate();
    let snapshot = registry.load(false)?;

    let hashes: BTreeMap<String, String> = snapshot
        .list_all()
        .map(|agent| (agent.name.clone(), agent.hash.clone()))
        .collect();

    Ok(IntegritySnapshot {
        snapshot_hash: hash_snapshot(&hashes),
        timestamp: Utc::now(),
        agent_count: hashes.len(),
        hashes,
    })
}

/// Partition the union of both keyspaces into added, removed and modified.
pub fn diff_snapshots(old: &IntegritySnapshot, new: &IntegritySnapshot) -> Vec<IntegrityDiff> {
    let names: BTreeSet<&String> = old.hashes.keys().chain(new.hashes.keys()).collect();
    let mut diffs = Vec::new();

    for name in names {
        let old_hash = old.hashes.get(name);
        let new_hash = new.hashes.get(name);

        match (old_hash, new_hash) {
            (None, Some(new_hash)) => diffs.push(IntegrityDiff {
                agent_name: name.clone(),
                old_hash: String::new(),
                new_hash: new_hash.clone(),
                change_type: ChangeType::Added,
            }),
            (Some(old_hash), None) => diffs.push(IntegrityDiff {
                agent_name: name.clone(),
                old_hash: old_hash.clone(),
                new_hash: String::new(),
                change_type: ChangeType::Removed,
            }),
            (Some(old_hash), Some(new_hash)) if old_hash != new_hash => {
                diffs.push(IntegrityDiff {
                    agent_name: name.clone(),
                    old_hash: old_hash.clone(),
                    new_hash: new_hash.clone(),
                    change_type: ChangeType::Modified,
                })
            }
            _ => {}
        }
    }

    diffs
}

/// Build the integrity chain from a fresh registry view: blocks sorted by
/// agent name, each previous-link set to the prior block's hash.
pub fn create_chain(registry: &mut Registry) -> Result<IntegrityChain, RegistryError> {
    registry.invalidate();
    let snapshot = registry.load(false)?;

    let mut blocks = Vec::new();
    let mut previous_hash = GENESIS_HASH.to_string();
    let now = Utc::now();

    // list_all iterates the name-keyed map in sorted order already.
    for agent in snapshot.list_all() {
        let block = IntegrityBlock {
            agent_name: agent.name.clone(),
            hash: agent.hash.clone(),
            previous_hash,
            timestamp: now,
            agent_type: agent.agent_type.clone(),
            size_bytes: agent.size_bytes,
        };
        previous_hash = block.hash.clone();
        blocks.push(block);
    }

    Ok(IntegrityChain {
        genesis_hash: GENESIS_HASH.to_string(),
        head_hash: previous_hash,
        blocks,
        created_at: now,
        updated_at: now,
    })
}

/// Walk the chain in stored order checking every previous-link. Empty and
/// single-block chains are trivially valid.
pub fn verify_chain(chain: &IntegrityChain) -> ChainVerification {
    let mut expected_previous = GENESIS_HASH.to_string();

    for block in &chain.blocks {
        if block.previous_hash != expected_previous {
            return ChainVerification {
                valid: false,
                broken_at: Some(block.agent_name.clone()),
            };
        }
        expected_previous = block.hash.clone();
    }

    ChainVerification {
        valid: true,
        broken_at: None,
    }
}

/// Compare a saved chain against the live registry. Agents that still exist
/// with a different content hash are reported as tampered; removed agents are
/// not (removal shows up in snapshot diffs instead).
pub fn verify_against_chain(
    chain: &IntegrityChain,
    registry: &mut Registry,
) -> Result<AgentsVerification, RegistryError> {
    registry.invalidate();
    let snapshot = registry.load(false)?;

    let mut tampered = Vec::new();
    for block in &chain.blocks {
        if let Some(agent) = snapshot.get(&block.agent_name) {
            if agent.hash != block.hash {
                tampered.push(block.agent_name.clone());
            }
        }
    }

    Ok(AgentsVerification {
        valid: tampered.is_empty(),
        tampered_agents: tampered,
    })
}

/// Append a snapshot to the conventional history file.
pub fn save_snapshot(
    snapshot: &IntegritySnapshot,
    project_root: &Path,
) -> Result<(), WardenError> {
    save_snapshot_to(snapshot, project_root, Path::new(INTEGRITY_FILE))
}

/// Append a snapshot to `relative_file` under the project root, creating
/// parent directories as needed and evicting the oldest entries beyond the
/// cap.
pub fn save_snapshot_to(
    snapshot: &IntegritySnapshot,
    project_root: &Path,
    relative_file: &Path,
) -> Result<(), WardenError> {
    let path = project_root.join(relative_file);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut history = load_history_from(project_root, relative_file);
    history.push(snapshot.clone());
    if history.len() > MAX_HISTORY {
        history.drain(..history.len() - MAX_HISTORY);
    }

    let json = serde_json::to_string_pretty(&history)?;
    fs::write(&path, json)?;
    debug!(file = %path.display(), entries = history.len(), "Snapshot history saved");
    Ok(())
}

/// Most recently persisted snapshot, or `None` when there is no usable
/// history.
pub fn load_latest_snapshot(project_root: &Path) -> Option<IntegritySnapshot> {
    load_history(project_root).pop()
}

pub fn load_latest_snapshot_from(
    project_root: &Path,
    relative_file: &Path,
) -> Option<IntegritySnapshot> {
    load_history_from(project_root, relative_file).pop()
}

/// Full persisted history at the conventional location, oldest first.
pub fn load_history(project_root: &Path) -> Vec<IntegritySnapshot> {
    load_history_from(project_root, Path::new(INTEGRITY_FILE))
}

/// Full persisted history, oldest first. Missing or corrupt files degrade to
/// an empty history.
pub fn load_history_from(project_root: &Path, relative_file: &Path) -> Vec<IntegritySnapshot> {
    let path = project_root.join(relative_file);
    let Ok(content) = fs::read_to_string(&path) else {
        return Vec::new();
    };

    match serde_json::from_str(&content) {
        Ok(history) => history,
        Err(err) => {
            warn!(file = %path.display(), %err, "Corrupt snapshot history; treating as empty");
            Vec::new()
        }
    }
}
