//! Logging System
//!
//! Structured logging via the `tracing` crate. Level and format come from
//! configuration with an environment override; output goes to stderr so the
//! CLI's report rendering on stdout stays clean.

use crate::error::WardenError;
use serde::{Deserialize, Serialize};
use tracing_subscriber::{fmt, EnvFilter};

/// Environment variable consulted for filter directives, taking precedence
/// over the configured level.
pub const LOG_ENV_VAR: &str = "WARDEN_LOG";

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error, off
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format: json, text (default: text)
    #[serde(default = "default_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_format() -> String {
    "text".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_format(),
        }
    }
}

/// Initialize the logging system.
///
/// Priority order (highest to lowest): `WARDEN_LOG` env var, provided
/// config, defaults. Safe to call once per process; a second call fails.
pub fn init_logging(config: Option<&LoggingConfig>) -> Result<(), WardenError> {
    let defaults = LoggingConfig::default();
    let config = config.unwrap_or(&defaults);

    let filter = EnvFilter::try_from_env(LOG_ENV_VAR)
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|err| WardenError::ConfigError(format!("Invalid log level: {}", err)))?;

    let builder = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    let result = if config.format == "json" {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    result.map_err(|err| WardenError::ConfigError(format!("Failed to init logging: {}", err)))
}
