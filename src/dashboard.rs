//! Health dashboard: one composed report over registry, validation and
//! integrity state, plus a single external liveness probe.
//!
//! Pure composition over the other modules. The probe is the only network
//! call in the crate; it runs with a hard timeout and any failure, timeout
//! included, degrades to an offline status rather than an error.

use crate::config::{ProbeConfig, WardenConfig};
use crate::error::WardenError;
use crate::integrity::{
    create_chain, create_snapshot, diff_snapshots, load_latest_snapshot_from, save_snapshot_to,
    verify_chain,
};
use crate::registry::Registry;
use crate::validator::{health_score, validate_all};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, warn};

/// Interpreted health status, mapped from the numeric score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Critical,
}

impl HealthStatus {
    /// Score bands: >= 90 healthy, >= 70 degraded, else critical.
    pub fn from_score(score: u32) -> Self {
        if score >= 90 {
            HealthStatus::Healthy
        } else if score >= 70 {
            HealthStatus::Degraded
        } else {
            HealthStatus::Critical
        }
    }

    pub fn exit_code(self) -> i32 {
        match self {
            HealthStatus::Healthy => 0,
            HealthStatus::Degraded => 1,
            HealthStatus::Critical => 2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            HealthStatus::Healthy => "healthy",
            HealthStatus::Degraded => "degraded",
            HealthStatus::Critical => "critical",
        }
    }
}

/// Liveness of the external knowledge-graph service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceStatus {
    Online,
    Offline,
    Unknown,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProbeMetrics {
    pub status: ServiceStatus,
    pub last_check: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegistryMetrics {
    pub total_agents: usize,
    pub total_workflows: usize,
    pub total_files: usize,
    pub by_type: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidationMetrics {
    pub valid_agents: usize,
    pub invalid_agents: usize,
    pub total_issues: usize,
    pub errors: usize,
    pub warnings: usize,
    pub infos: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct IntegrityMetrics {
    pub chain_valid: bool,
    pub blocks_count: usize,
    pub snapshot_hash: String,
    pub changes_detected: usize,
    pub changes_since_last_snapshot: Vec<String>,
}

/// The full composed report.
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub score: u32,
    pub status: HealthStatus,
    pub timestamp: DateTime<Utc>,
    pub registry: RegistryMetrics,
    pub validation: ValidationMetrics,
    pub integrity: IntegrityMetrics,
    pub probe: ProbeMetrics,
    pub recommendations: Vec<String>,
}

/// Probe the external service's health endpoint.
///
/// Connection errors, non-success statuses and timeouts all report offline.
pub fn probe_service(config: &ProbeConfig) -> ProbeMetrics {
    let status = match reqwest::blocking::Client::builder()
        .timeout(config.timeout())
        .build()
    {
        Ok(client) => match client.get(&config.url).send() {
            Ok(response) if response.status().is_success() => ServiceStatus::Online,
            Ok(_) => ServiceStatus::Offline,
            Err(err) => {
                debug!(url = %config.url, %err, "Liveness probe failed");
                ServiceStatus::Offline
            }
        },
        Err(err) => {
            warn!(%err, "Could not build probe client");
            ServiceStatus::Unknown
        }
    };

    ProbeMetrics {
        status,
        last_check: Utc::now(),
    }
}

/// Fixed ordered set of conditionals over the computed metrics, with a single
/// all-clear fallback.
fn recommendations(
    validation: &ValidationMetrics,
    integrity: &IntegrityMetrics,
    probe: &ProbeMetrics,
) -> Vec<String> {
    let mut out = Vec::new();

    if validation.errors > 0 {
        out.push(format!(
            "Fix {} critical validation error(s)",
            validation.errors
        ));
    }
    if validation.warnings > 0 {
        out.push(format!("Review {} validation warning(s)", validation.warnings));
    }
    if integrity.changes_detected > 0 {
        out.push(format!(
            "{} agent(s) modified since last snapshot",
            integrity.changes_detected
        ));
    }
    if probe.status == ServiceStatus::Offline {
        out.push("Knowledge service is offline - check the service".to_string());
    }
    if !integrity.chain_valid {
        out.push("Integrity chain is broken".to_string());
    }

    if out.is_empty() {
        out.push("Ecosystem healthy - no action needed".to_string());
    }
    out
}

/// Generate the complete health report.
pub fn generate_report(
    registry: &mut Registry,
    config: &WardenConfig,
) -> Result<HealthReport, WardenError> {
    registry.invalidate();
    let project_root = registry.project_root().to_path_buf();

    let stats = registry.load(false)?.stats.clone();
    let registry_metrics = RegistryMetrics {
        total_agents: stats.total_agents,
        total_workflows: stats.total_workflows,
        total_files: stats.total_files,
        by_type: stats.by_type,
    };

    let summary = validate_all(registry)?;
    let score = health_score(&summary);
    let validation_metrics = ValidationMetrics {
        valid_agents: summary.valid_agents,
        invalid_agents: summary.invalid_agents,
        total_issues: summary.total_issues,
        errors: summary.by_severity.error,
        warnings: summary.by_severity.warning,
        infos: summary.by_severity.info,
    };

    let current = create_snapshot(registry)?;
    let last = load_latest_snapshot_from(&project_root, Path::new(&config.registry.integrity_file));
    let chain = create_chain(registry)?;
    let verification = verify_chain(&chain);

    let diffs = last
        .as_ref()
        .map(|last| diff_snapshots(last, &current))
        .unwrap_or_default();
    let integrity_metrics = IntegrityMetrics {
        chain_valid: verification.valid,
        blocks_count: chain.blocks.len(),
        snapshot_hash: current.snapshot_hash.clone(),
        changes_detected: diffs.len(),
        changes_since_last_snapshot: diffs
            .iter()
            .map(|d| format!("{} ({})", d.agent_name, d.change_type))
            .collect(),
    };

    let probe = probe_service(&config.probe);
    let recommendations = recommendations(&validation_metrics, &integrity_metrics, &probe);

    Ok(HealthReport {
        score,
        status: HealthStatus::from_score(score),
        timestamp: Utc::now(),
        registry: registry_metrics,
        validation: validation_metrics,
        integrity: integrity_metrics,
        probe,
        recommendations,
    })
}

/// Run the full health check: generate the report, persist a fresh snapshot
/// as a side effect (unless disabled), and map status to a process exit code.
pub fn run_health_check(
    registry: &mut Registry,
    config: &WardenConfig,
    save: bool,
) -> Result<(HealthReport, i32), WardenError> {
    let report = generate_report(registry, config)?;

    if save {
        let snapshot = create_snapshot(registry)?;
        save_snapshot_to(
            &snapshot,
            registry.project_root(),
            Path::new(&config.registry.integrity_file),
        )?;
    }

    let code = report.status.exit_code();
    Ok((report, code))
}
