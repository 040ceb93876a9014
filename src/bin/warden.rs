//! Warden CLI Binary
//!
//! Command-line interface for the agent registry, validator and integrity
//! tracker.

use clap::Parser;
use std::path::Path;
use std::process;
use tracing::{error, info};
use warden::cli::{Cli, RunContext};
use warden::config::WardenConfig;
use warden::logging::{init_logging, LoggingConfig};
use warden::registry::find_project_root;

fn main() {
    let cli = Cli::parse();

    // Resolve the root up front so the config file's logging section applies
    // whether the root was passed or discovered.
    let root = cli.root.clone().or_else(|| find_project_root(None).ok());

    let logging_config = build_logging_config(&cli, root.as_deref());
    if let Err(e) = init_logging(Some(&logging_config)) {
        eprintln!("Failed to initialize logging: {}", e);
        process::exit(1);
    }

    info!("Warden CLI starting");

    let mut context = match RunContext::new(root) {
        Ok(ctx) => ctx,
        Err(e) => {
            error!("Error initializing: {}", e);
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    match context.execute(&cli.command) {
        Ok(code) => {
            info!(code, "Command completed");
            process::exit(code);
        }
        Err(e) => {
            error!("Command failed: {}", e);
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}

/// Build logging configuration from CLI args and the optional config file.
/// Precedence: CLI flags override config file override defaults.
fn build_logging_config(cli: &Cli, root: Option<&Path>) -> LoggingConfig {
    let mut config = root
        .and_then(|root| WardenConfig::load(root).ok())
        .map(|c| c.logging)
        .unwrap_or_default();

    if cli.verbose {
        config.level = "debug".to_string();
    }
    if let Some(ref level) = cli.log_level {
        config.level = level.clone();
    }
    if let Some(ref format) = cli.log_format {
        config.format = format.clone();
    }

    config
}
