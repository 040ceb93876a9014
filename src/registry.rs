//! Agent registry: in-memory aggregate of agent definitions loaded from disk.
//!
//! The registry scans a fixed subdirectory of the project root for markdown
//! files, builds each [`AgentDefinition`] through the definition builder and
//! holds them in a name-keyed map with aggregate statistics. Loads are cached
//! for a short TTL to amortize repeated filesystem scans; callers that need a
//! guaranteed-fresh view (validation, integrity snapshotting) invalidate
//! first. One corrupt file never fails a load: it is skipped and recorded as
//! a diagnostic on the snapshot so callers can observe the degradation.

use crate::definition::{parse_agent_file, AgentDefinition, ParseOutcome};
use crate::error::RegistryError;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Relative directory scanned for agent definition files.
pub const AGENTS_DIR: &str = ".agent/workflows";

/// Marker file that identifies the project root.
pub const PROJECT_MARKER: &str = "package.json";

/// How long a loaded snapshot is served before the next scan.
pub const CACHE_TTL: Duration = Duration::from_secs(60);

/// Aggregate statistics for one registry snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct RegistryStats {
    pub total_agents: usize,
    pub total_workflows: usize,
    pub total_files: usize,
    pub last_updated: DateTime<Utc>,
    pub by_type: BTreeMap<String, usize>,
}

/// A file that failed to parse during a load. The load itself succeeds.
#[derive(Debug, Clone, Serialize)]
pub struct SkippedFile {
    pub file_path: PathBuf,
    pub reason: String,
}

/// Criteria for filtering agents. All set fields must match (AND).
#[derive(Debug, Clone, Default)]
pub struct RegistryFilter {
    /// Match any of these types.
    pub agent_type: Option<Vec<String>>,
    /// Require (or forbid) a non-empty collaborates list.
    pub has_collaborations: Option<bool>,
    pub inherits_from: Option<String>,
    pub escalates_to: Option<String>,
}

/// Relational projection of one agent, for dependency-graph consumers.
#[derive(Debug, Clone, Serialize)]
pub struct DependencyEntry {
    pub collaborates: Vec<String>,
    pub escalates_to: Option<String>,
    pub inherits: Option<String>,
}

/// One immutable view of every agent on disk at load time.
#[derive(Debug, Clone)]
pub struct RegistrySnapshot {
    agents: BTreeMap<String, AgentDefinition>,
    /// Upper-cased name -> canonical name, built once at load time so lookups
    /// get the conventional case-insensitive-ish fallback without repeated
    /// case conversion.
    normalized: HashMap<String, String>,
    pub stats: RegistryStats,
    pub skipped: Vec<SkippedFile>,
}

impl RegistrySnapshot {
    /// Look up an agent by exact name, falling back to the upper-cased index.
    /// Agents are conventionally upper-case, so `get("router")` resolves the
    /// same definition as `get("ROUTER")`.
    pub fn get(&self, name: &str) -> Option<&AgentDefinition> {
        if let Some(agent) = self.agents.get(name) {
            return Some(agent);
        }
        self.normalized
            .get(&name.to_uppercase())
            .and_then(|canonical| self.agents.get(canonical))
    }

    /// All agents in name order.
    pub fn list_all(&self) -> impl Iterator<Item = &AgentDefinition> {
        self.agents.values()
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    /// Linear scan applying all set filter criteria.
    pub fn filter(&self, criteria: &RegistryFilter) -> Vec<&AgentDefinition> {
        self.agents
            .values()
            .filter(|agent| {
                if let Some(types) = &criteria.agent_type {
                    if !types.iter().any(|t| t == &agent.agent_type) {
                        return false;
                    }
                }
                if let Some(wants_collab) = criteria.has_collaborations {
                    if agent.collaborates.is_empty() == wants_collab {
                        return false;
                    }
                }
                if let Some(parent) = &criteria.inherits_from {
                    if agent.inherits.as_deref() != Some(parent.as_str()) {
                        return false;
                    }
                }
                if let Some(target) = &criteria.escalates_to {
                    if agent.escalates_to.as_deref() != Some(target.as_str()) {
                        return false;
                    }
                }
                true
            })
            .collect()
    }

    /// Project the registry into a name -> relations map.
    pub fn dependency_map(&self) -> BTreeMap<String, DependencyEntry> {
        self.agents
            .iter()
            .map(|(name, agent)| {
                (
                    name.clone(),
                    DependencyEntry {
                        collaborates: agent.collaborates.clone(),
                        escalates_to: agent.escalates_to.clone(),
                        inherits: agent.inherits.clone(),
                    },
                )
            })
            .collect()
    }
}

/// Injectable time source so the cache TTL is testable.
pub trait Clock {
    fn now(&self) -> Instant;
}

/// Wall-clock time source used outside tests.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Walk upward from `start` until a directory containing the project marker
/// is found.
pub fn find_project_root(start: Option<&Path>) -> Result<PathBuf, RegistryError> {
    let start = match start {
        Some(path) => path.to_path_buf(),
        None => std::env::current_dir()?,
    };

    let mut current = start.clone();
    loop {
        if current.join(PROJECT_MARKER).exists() {
            return Ok(current);
        }
        if !current.pop() {
            return Err(RegistryError::ProjectRootNotFound(start));
        }
    }
}

/// Registry service owning the project root and the load cache.
pub struct Registry {
    project_root: PathBuf,
    agents_dir: PathBuf,
    ttl: Duration,
    cache: Option<(RegistrySnapshot, Instant)>,
    clock: Box<dyn Clock>,
}

impl Registry {
    /// Create a registry rooted at `project_root`, scanning the conventional
    /// agents directory with the default TTL.
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        Self::with_clock(project_root, AGENTS_DIR, CACHE_TTL, Box::new(SystemClock))
    }

    /// Create a registry with an explicit agents directory (relative to the
    /// project root), TTL and time source.
    pub fn with_clock(
        project_root: impl Into<PathBuf>,
        agents_dir: impl AsRef<Path>,
        ttl: Duration,
        clock: Box<dyn Clock>,
    ) -> Self {
        let project_root = project_root.into();
        let agents_dir = project_root.join(agents_dir.as_ref());
        Self {
            project_root,
            agents_dir,
            ttl,
            cache: None,
            clock,
        }
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    /// List agent definition files, lexicographically sorted. This order
    /// decides last-write-wins on name collisions.
    pub fn list_agent_files(&self) -> Result<Vec<PathBuf>, RegistryError> {
        if !self.agents_dir.is_dir() {
            return Err(RegistryError::AgentsDirNotFound(self.agents_dir.clone()));
        }

        let mut files: Vec<PathBuf> = std::fs::read_dir(&self.agents_dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file() && path.extension().map_or(false, |ext| ext == "md"))
            .collect();
        files.sort();
        Ok(files)
    }

    /// Load the registry, serving the cached snapshot while it is younger
    /// than the TTL unless `force_refresh` is set.
    pub fn load(&mut self, force_refresh: bool) -> Result<&RegistrySnapshot, RegistryError> {
        let now = self.clock.now();

        let fresh = matches!(&self.cache, Some((_, at)) if now.duration_since(*at) < self.ttl);
        if fresh && !force_refresh {
            debug!("Serving cached registry snapshot");
            return Ok(&self.cache.as_ref().unwrap().0);
        }

        let snapshot = self.build_snapshot()?;
        info!(
            files = snapshot.stats.total_files,
            agents = snapshot.stats.total_agents,
            workflows = snapshot.stats.total_workflows,
            skipped = snapshot.skipped.len(),
            "Registry loaded"
        );
        self.cache = Some((snapshot, now));
        Ok(&self.cache.as_ref().unwrap().0)
    }

    /// Drop the cached snapshot immediately.
    pub fn invalidate(&mut self) {
        self.cache = None;
    }

    fn build_snapshot(&self) -> Result<RegistrySnapshot, RegistryError> {
        let files = self.list_agent_files()?;

        let mut agents: BTreeMap<String, AgentDefinition> = BTreeMap::new();
        let mut by_type: BTreeMap<String, usize> = BTreeMap::new();
        let mut skipped: Vec<SkippedFile> = Vec::new();
        let mut agent_count = 0usize;
        let mut workflow_count = 0usize;

        for file in &files {
            match parse_agent_file(file) {
                ParseOutcome::Success(agent) => {
                    *by_type.entry(agent.agent_type.clone()).or_insert(0) += 1;
                    match agent.agent_type.as_str() {
                        "agent" | "meta-agent" => agent_count += 1,
                        "workflow" => workflow_count += 1,
                        _ => {}
                    }
                    agents.insert(agent.name.clone(), *agent);
                }
                ParseOutcome::Failure { file_path, reason } => {
                    warn!(file = %file_path.display(), %reason, "Skipping agent file");
                    skipped.push(SkippedFile { file_path, reason });
                }
            }
        }

        let normalized = agents
            .keys()
            .map(|name| (name.to_uppercase(), name.clone()))
            .collect();

        Ok(RegistrySnapshot {
            normalized,
            stats: RegistryStats {
                total_agents: agent_count,
                total_workflows: workflow_count,
                total_files: files.len(),
                last_updated: Utc::now(),
                by_type,
            },
            skipped,
            agents,
        })
    }
}
