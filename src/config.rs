//! Runtime configuration.
//!
//! Settings load from an optional `.agent/warden.toml` under the project
//! root; every field has a default so the tool runs with no config file at
//! all. CLI flags override file values override defaults.

use crate::error::WardenError;
use crate::integrity::INTEGRITY_FILE;
use crate::logging::LoggingConfig;
use crate::registry::{AGENTS_DIR, CACHE_TTL};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Config file location, relative to the project root.
pub const CONFIG_FILE: &str = ".agent/warden.toml";

/// External liveness probe settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeConfig {
    /// Health endpoint of the knowledge-graph service.
    #[serde(default = "default_probe_url")]
    pub url: String,

    /// Probe timeout in milliseconds. Any failure inside the window,
    /// including timeout, reports the service as offline.
    #[serde(default = "default_probe_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_probe_url() -> String {
    "http://localhost:8000/health".to_string()
}

fn default_probe_timeout_ms() -> u64 {
    2000
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            url: default_probe_url(),
            timeout_ms: default_probe_timeout_ms(),
        }
    }
}

impl ProbeConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Registry layout and caching settings. Defaults match the conventional
/// project layout, so most projects never set these.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Directory scanned for agent definitions, relative to the project root.
    #[serde(default = "default_agents_dir")]
    pub agents_dir: String,

    /// Snapshot history file, relative to the project root.
    #[serde(default = "default_integrity_file")]
    pub integrity_file: String,

    /// Registry cache TTL in milliseconds.
    #[serde(default = "default_cache_ttl_ms")]
    pub cache_ttl_ms: u64,
}

fn default_agents_dir() -> String {
    AGENTS_DIR.to_string()
}

fn default_integrity_file() -> String {
    INTEGRITY_FILE.to_string()
}

fn default_cache_ttl_ms() -> u64 {
    CACHE_TTL.as_millis() as u64
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            agents_dir: default_agents_dir(),
            integrity_file: default_integrity_file(),
            cache_ttl_ms: default_cache_ttl_ms(),
        }
    }
}

impl RegistryConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_millis(self.cache_ttl_ms)
    }
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WardenConfig {
    #[serde(default)]
    pub registry: RegistryConfig,

    #[serde(default)]
    pub probe: ProbeConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl WardenConfig {
    /// Load configuration from the conventional file under `project_root`,
    /// falling back to defaults when the file is absent.
    pub fn load(project_root: &Path) -> Result<Self, WardenError> {
        let path = project_root.join(CONFIG_FILE);
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)?;
        toml::from_str(&content)
            .map_err(|err| WardenError::ConfigError(format!("{}: {}", path.display(), err)))
    }
}
