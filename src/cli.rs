//! Warden CLI
//!
//! Command-line surface over the registry, validator, integrity tracker and
//! health dashboard. Commands print a formatted summary to stdout and map
//! failures onto process exit codes; the exact text layout is presentation
//! only, the printed information (counts, per-rule breakdown, per-issue
//! detail) is the contract.

use crate::config::WardenConfig;
use crate::dashboard::{self, HealthReport, HealthStatus, ServiceStatus};
use crate::error::WardenError;
use crate::integrity;
use crate::registry::{find_project_root, Registry, RegistrySnapshot, SystemClock};
use crate::validator::{self, Severity, ValidationSummary};
use clap::{Parser, Subcommand};
use comfy_table::Table;
use owo_colors::OwoColorize;
use std::path::{Path, PathBuf};

/// Warden - registry, validation and integrity tracking for agent definitions
#[derive(Parser)]
#[command(name = "warden")]
#[command(about = "Registry, validation and integrity tracking for markdown agent definitions")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Project root (default: walk upward from the current directory)
    #[arg(long)]
    pub root: Option<PathBuf>,

    /// Enable verbose logging (default: off)
    #[arg(long, default_value = "false")]
    pub verbose: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Load the registry and print stats and agents
    Registry {
        /// Also print the dependency map
        #[arg(long)]
        deps: bool,
    },
    /// Validate every agent and report issues
    Validate,
    /// Snapshot, diff and verify the integrity chain
    Integrity {
        /// Do not persist the new snapshot
        #[arg(long)]
        no_save: bool,
    },
    /// Full health dashboard
    Health {
        /// Do not persist the new snapshot
        #[arg(long)]
        no_save: bool,
    },
}

/// Resolved execution context: project root, config and registry service.
pub struct RunContext {
    registry: Registry,
    config: WardenConfig,
}

impl RunContext {
    pub fn new(root: Option<PathBuf>) -> Result<Self, WardenError> {
        let root = match root {
            Some(root) => root,
            None => find_project_root(None)?,
        };
        let config = WardenConfig::load(&root)?;
        let registry = Registry::with_clock(
            root,
            &config.registry.agents_dir,
            config.registry.cache_ttl(),
            Box::new(SystemClock),
        );
        Ok(Self { registry, config })
    }

    /// Execute a command, returning the process exit code.
    pub fn execute(&mut self, command: &Commands) -> Result<i32, WardenError> {
        match command {
            Commands::Registry { deps } => self.run_registry(*deps),
            Commands::Validate => self.run_validate(),
            Commands::Integrity { no_save } => self.run_integrity(!no_save),
            Commands::Health { no_save } => self.run_health(!no_save),
        }
    }

    fn run_registry(&mut self, deps: bool) -> Result<i32, WardenError> {
        let snapshot = self.registry.load(false)?;
        print!("{}", render_registry(snapshot, deps));
        Ok(0)
    }

    fn run_validate(&mut self) -> Result<i32, WardenError> {
        let summary = validator::validate_all(&mut self.registry)?;
        print!("{}", render_validation(&summary));
        Ok(if summary.by_severity.error > 0 { 1 } else { 0 })
    }

    fn run_integrity(&mut self, save: bool) -> Result<i32, WardenError> {
        let root = self.registry.project_root().to_path_buf();
        let integrity_file = self.config.registry.integrity_file.clone();

        let current = integrity::create_snapshot(&mut self.registry)?;
        println!("Current snapshot:");
        println!("  Hash: {}...", &current.snapshot_hash[..16]);
        println!("  Agents: {}", current.agent_count);
        println!("  Timestamp: {}", current.timestamp.to_rfc3339());

        match integrity::load_latest_snapshot_from(&root, Path::new(&integrity_file)) {
            Some(last) => {
                println!("\nLast saved snapshot:");
                println!("  Hash: {}...", &last.snapshot_hash[..16]);
                println!("  Agents: {}", last.agent_count);
                println!("  Timestamp: {}", last.timestamp.to_rfc3339());

                let diffs = integrity::diff_snapshots(&last, &current);
                if diffs.is_empty() {
                    println!("\nNo changes detected since last snapshot");
                } else {
                    println!("\nChanges detected: {}", diffs.len());
                    for diff in &diffs {
                        println!("  {} ({})", diff.agent_name, diff.change_type);
                    }
                }
            }
            None => println!("\nNo previous snapshot found"),
        }

        let chain = integrity::create_chain(&mut self.registry)?;
        let verification = integrity::verify_chain(&chain);
        println!("\nChain integrity:");
        if verification.valid {
            println!("  Valid: {}", "yes".green());
        } else {
            println!("  Valid: {}", "no".red());
            if let Some(broken_at) = &verification.broken_at {
                println!("  Broken at: {}", broken_at);
            }
        }
        println!("  Blocks: {}", chain.blocks.len());
        if !chain.head_hash.is_empty() {
            let head = &chain.head_hash[..chain.head_hash.len().min(16)];
            println!("  Head: {}...", head);
        }

        if save {
            integrity::save_snapshot_to(&current, &root, Path::new(&integrity_file))?;
            println!("\nSnapshot saved to {}", integrity_file);
        }

        Ok(if verification.valid { 0 } else { 1 })
    }

    fn run_health(&mut self, save: bool) -> Result<i32, WardenError> {
        let (report, code) = dashboard::run_health_check(&mut self.registry, &self.config, save)?;
        print!("{}", render_health_report(&report));
        if save {
            println!("Snapshot saved to {}", self.config.registry.integrity_file);
        }
        Ok(code)
    }
}

/// One line per issue severity, colorized for terminals.
fn severity_label(severity: Severity) -> String {
    match severity {
        Severity::Error => "error".red().to_string(),
        Severity::Warning => "warning".yellow().to_string(),
        Severity::Info => "info".blue().to_string(),
    }
}

fn render_registry(snapshot: &RegistrySnapshot, deps: bool) -> String {
    let mut out = String::new();

    out.push_str("Agent registry loaded\n\n");
    out.push_str("Stats:\n");
    out.push_str(&format!("  Total files: {}\n", snapshot.stats.total_files));
    out.push_str(&format!("  Agents: {}\n", snapshot.stats.total_agents));
    out.push_str(&format!("  Workflows: {}\n", snapshot.stats.total_workflows));
    for (agent_type, count) in &snapshot.stats.by_type {
        out.push_str(&format!("  {}: {}\n", agent_type, count));
    }
    out.push_str(&format!(
        "  Last updated: {}\n",
        snapshot.stats.last_updated.to_rfc3339()
    ));

    let mut table = Table::new();
    table.set_header(vec!["Name", "Type", "Collaborates", "Escalates to"]);
    for agent in snapshot.list_all() {
        table.add_row(vec![
            agent.name.clone(),
            agent.agent_type.clone(),
            agent.collaborates.join(", "),
            agent.escalates_to.clone().unwrap_or_default(),
        ]);
    }
    out.push_str(&format!("\n{}\n", table));

    if !snapshot.skipped.is_empty() {
        out.push_str(&format!("\nSkipped files: {}\n", snapshot.skipped.len()));
        for skipped in &snapshot.skipped {
            out.push_str(&format!(
                "  {}: {}\n",
                skipped.file_path.display(),
                skipped.reason
            ));
        }
    }

    if deps {
        out.push_str("\nDependency map:\n");
        for (name, entry) in snapshot.dependency_map() {
            out.push_str(&format!(
                "  {} -> collaborates [{}], escalates {}, inherits {}\n",
                name,
                entry.collaborates.join(", "),
                entry.escalates_to.as_deref().unwrap_or("-"),
                entry.inherits.as_deref().unwrap_or("-"),
            ));
        }
    }

    out
}

fn render_validation(summary: &ValidationSummary) -> String {
    let score = validator::health_score(summary);
    let mut out = String::new();

    out.push_str("Agent validation\n\n");
    out.push_str("Summary:\n");
    out.push_str(&format!("  Total agents: {}\n", summary.total_agents));
    out.push_str(&format!("  Valid: {}\n", summary.valid_agents));
    out.push_str(&format!("  Invalid: {}\n", summary.invalid_agents));
    out.push_str(&format!("  Total issues: {}\n", summary.total_issues));
    out.push_str(&format!("  Health score: {}/100\n", score));

    out.push_str("\nBy severity:\n");
    out.push_str(&format!("  Errors: {}\n", summary.by_severity.error));
    out.push_str(&format!("  Warnings: {}\n", summary.by_severity.warning));
    out.push_str(&format!("  Info: {}\n", summary.by_severity.info));

    if summary.total_issues > 0 {
        out.push_str("\nIssues by rule:\n");
        for (rule, count) in &summary.by_rule {
            out.push_str(&format!("  {}: {}\n", rule, count));
        }

        out.push_str("\nIssues:\n");
        for result in &summary.results {
            for issue in &result.issues {
                out.push_str(&format!(
                    "  {} [{}] {}\n",
                    severity_label(issue.severity),
                    result.agent_name,
                    issue.message
                ));
                if let Some(suggestion) = &issue.suggestion {
                    out.push_str(&format!("      {}\n", suggestion));
                }
            }
        }
    }

    out
}

fn render_health_report(report: &HealthReport) -> String {
    let mut out = String::new();

    let status = match report.status {
        HealthStatus::Healthy => report.status.as_str().green().to_string(),
        HealthStatus::Degraded => report.status.as_str().yellow().to_string(),
        HealthStatus::Critical => report.status.as_str().red().to_string(),
    };

    out.push_str(&format!(
        "Agent health dashboard - {}\n\n",
        report.timestamp.to_rfc3339()
    ));
    out.push_str(&format!("Health score: {}/100 ({})\n", report.score, status));

    out.push_str("\nRegistry:\n");
    out.push_str(&format!("  Agents: {}\n", report.registry.total_agents));
    out.push_str(&format!("  Workflows: {}\n", report.registry.total_workflows));
    out.push_str(&format!("  Total files: {}\n", report.registry.total_files));

    out.push_str("\nValidation:\n");
    out.push_str(&format!(
        "  Valid: {} | Invalid: {}\n",
        report.validation.valid_agents, report.validation.invalid_agents
    ));
    out.push_str(&format!(
        "  Errors: {} | Warnings: {} | Info: {}\n",
        report.validation.errors, report.validation.warnings, report.validation.infos
    ));

    out.push_str("\nIntegrity:\n");
    out.push_str(&format!(
        "  Chain: {}\n",
        if report.integrity.chain_valid {
            "valid".green().to_string()
        } else {
            "broken".red().to_string()
        }
    ));
    out.push_str(&format!("  Blocks: {}\n", report.integrity.blocks_count));
    out.push_str(&format!("  Changes: {}\n", report.integrity.changes_detected));
    for change in &report.integrity.changes_since_last_snapshot {
        out.push_str(&format!("    {}\n", change));
    }

    out.push_str("\nKnowledge service:\n");
    let probe = match report.probe.status {
        ServiceStatus::Online => "online".green().to_string(),
        ServiceStatus::Offline => "offline".red().to_string(),
        ServiceStatus::Unknown => "unknown".yellow().to_string(),
    };
    out.push_str(&format!("  Status: {}\n", probe));

    out.push_str("\nRecommendations:\n");
    for recommendation in &report.recommendations {
        out.push_str(&format!("  - {}\n", recommendation));
    }
    out.push('\n');

    out
}
