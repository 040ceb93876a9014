//! Validation rules for agent definitions.
//!
//! Four independent rule checks run against each definition: frontmatter
//! completeness, cross-reference existence, the knowledge-graph integration
//! convention, and escalation-chain acyclicity. Every rule returns issues as
//! plain values; nothing here panics or aborts a batch. An aggregate health
//! score condenses the issue counts into a bounded 0-100 heuristic.

use crate::definition::AgentDefinition;
use crate::error::RegistryError;
use crate::registry::{Registry, RegistrySnapshot};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;

/// Agents allowed to sit at the top of the escalation hierarchy.
const ROOT_AGENTS: [&str; 2] = ["ARQUITETO", "ROUTER"];

/// Designated root of the escalation hierarchy.
const HIERARCHY_ROOT: &str = "ARQUITETO";

/// Agents exempt from the knowledge-integration convention.
const KNOWLEDGE_EXEMPT: [&str; 4] = ["_DNA", "ROUTER", "CONHECIMENTO", "MANUTENCAO"];

/// Collaborator keywords that satisfy the knowledge-integration convention.
const KNOWLEDGE_KEYWORDS: [&str; 2] = ["CONHECIMENTO", "GRAPHITI"];

/// An unquoted `escalates-to: null` with a trailing inline comment leaks the
/// comment into the parsed value. Existing content files carry this exact
/// string, so the reference check exempts it.
const NULL_WITH_COMMENT: &str = "null  # Meta-orquestrador - topo da hierarquia operacional";

/// Escalation chains longer than this are abandoned rather than walked.
const MAX_ESCALATION_DEPTH: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

/// A single finding against one agent. Issues are data, not exceptions.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationIssue {
    pub severity: Severity,
    pub agent_name: String,
    pub rule: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl ValidationIssue {
    fn new(severity: Severity, agent: &str, rule: &str, message: String) -> Self {
        Self {
            severity,
            agent_name: agent.to_string(),
            rule: rule.to_string(),
            message,
            suggestion: None,
        }
    }

    fn suggest(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }
}

/// Per-agent validation outcome.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub agent_name: String,
    pub issues: Vec<ValidationIssue>,
}

/// Issue counts per severity.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct SeverityCounts {
    pub error: usize,
    pub warning: usize,
    pub info: usize,
}

impl SeverityCounts {
    fn record(&mut self, severity: Severity) {
        match severity {
            Severity::Error => self.error += 1,
            Severity::Warning => self.warning += 1,
            Severity::Info => self.info += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.error + self.warning + self.info
    }
}

/// Aggregate outcome of validating a whole registry.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationSummary {
    pub total_agents: usize,
    pub valid_agents: usize,
    pub invalid_agents: usize,
    pub total_issues: usize,
    pub by_rule: BTreeMap<String, usize>,
    pub by_severity: SeverityCounts,
    pub results: Vec<ValidationResult>,
}

/// Strip the conventional filename suffixes from a reference so it can be
/// resolved as a registry name: `codigo-agent.md` and `CODIGO.md` both
/// normalize to their bare name.
fn normalize_reference(reference: &str) -> &str {
    let reference = reference.strip_suffix("-agent.md").unwrap_or(reference);
    reference.strip_suffix(".md").unwrap_or(reference)
}

fn is_agent_like(agent: &AgentDefinition) -> bool {
    agent.agent_type == "agent" || agent.agent_type == "meta-agent"
}

/// Frontmatter completeness: required `type`, expected `inherits` and
/// `escalates-to` for agent-like definitions.
pub fn validate_frontmatter(agent: &AgentDefinition) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    if agent.agent_type.is_empty() || agent.agent_type == "unknown" {
        issues.push(
            ValidationIssue::new(
                Severity::Error,
                &agent.name,
                "frontmatter-type",
                "Frontmatter has no `type` field".to_string(),
            )
            .suggest("Add `type: agent` or `type: workflow` to the frontmatter"),
        );
    }

    if is_agent_like(agent) && agent.inherits.is_none() {
        issues.push(
            ValidationIssue::new(
                Severity::Warning,
                &agent.name,
                "frontmatter-inherits",
                "Agent does not inherit from any other (missing `inherits`)".to_string(),
            )
            .suggest("Add `inherits: _DNA.md` to inherit core values"),
        );
    }

    if is_agent_like(agent)
        && agent.escalates_to.is_none()
        && !ROOT_AGENTS.contains(&agent.name.as_str())
    {
        issues.push(
            ValidationIssue::new(
                Severity::Info,
                &agent.name,
                "frontmatter-escalates",
                "Agent has no `escalates-to` defined".to_string(),
            )
            .suggest("Consider defining which agent decisions escalate to"),
        );
    }

    issues
}

/// Cross-reference existence: `inherits` must resolve on disk, collaborators
/// and escalation targets must resolve in the registry.
pub fn validate_references(
    agent: &AgentDefinition,
    snapshot: &RegistrySnapshot,
    project_root: &Path,
) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    if let Some(inherits) = &agent.inherits {
        // Inherited documents conventionally live in memory/, with workflows/
        // as a legacy fallback and the config root as a last resort.
        let candidates = [
            project_root.join(".agent").join("memory").join(inherits),
            project_root.join(".agent").join("workflows").join(inherits),
            project_root.join(".agent").join(inherits),
        ];

        if !candidates.iter().any(|p| p.exists()) {
            issues.push(
                ValidationIssue::new(
                    Severity::Error,
                    &agent.name,
                    "reference-inherits",
                    format!("Inherited file does not exist: {}", inherits),
                )
                .suggest(format!("Check that {} exists in .agent/memory/", inherits)),
            );
        }
    }

    for collaborator in &agent.collaborates {
        let normalized = normalize_reference(collaborator);
        if snapshot.get(normalized).is_none() {
            issues.push(
                ValidationIssue::new(
                    Severity::Warning,
                    &agent.name,
                    "reference-collaborates",
                    format!("Collaboration with nonexistent agent: {}", collaborator),
                )
                .suggest(format!("Check that {} exists in the registry", collaborator)),
            );
        }
    }

    if let Some(target) = &agent.escalates_to {
        if target != "null" {
            let normalized = normalize_reference(target);
            if snapshot.get(normalized).is_none() && normalized != NULL_WITH_COMMENT {
                issues.push(
                    ValidationIssue::new(
                        Severity::Error,
                        &agent.name,
                        "reference-escalates",
                        format!("Escalation to nonexistent agent: {}", target),
                    )
                    .suggest(format!("Check that {} exists in the registry", target)),
                );
            }
        }
    }

    issues
}

/// Knowledge-integration convention: plain agents are nudged (info, not a
/// defect) to declare a collaboration with the knowledge graph.
pub fn validate_knowledge_integration(agent: &AgentDefinition) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    let exempt = KNOWLEDGE_EXEMPT.contains(&agent.name.as_str());
    if !exempt && agent.agent_type == "agent" {
        let integrated = agent.collaborates.iter().any(|collaborator| {
            KNOWLEDGE_KEYWORDS
                .iter()
                .any(|keyword| collaborator.contains(keyword))
        });

        if !integrated {
            issues.push(
                ValidationIssue::new(
                    Severity::Info,
                    &agent.name,
                    "integration-graphiti",
                    "Agent does not declare a collaboration with CONHECIMENTO".to_string(),
                )
                .suggest("Consider integrating with the knowledge graph"),
            );
        }
    }

    issues
}

/// Escalation-chain acyclicity over the whole agent set.
///
/// Chains that terminate without reaching the hierarchy root are tolerated;
/// dangling is intentional. Only a revisited name is an error.
pub fn validate_escalation_chain(agents: &[&AgentDefinition]) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    let agent_map: HashMap<&str, &AgentDefinition> =
        agents.iter().map(|a| (a.name.as_str(), *a)).collect();

    for agent in agents {
        if !is_agent_like(agent) || agent.name == HIERARCHY_ROOT {
            continue;
        }

        let mut visited: Vec<&str> = Vec::new();
        let mut visited_set: HashSet<&str> = HashSet::new();
        let mut current: Option<&AgentDefinition> = Some(agent);
        let mut depth = 0;

        while let Some(node) = current {
            let Some(target) = node.escalates_to.as_deref() else {
                break;
            };
            if depth >= MAX_ESCALATION_DEPTH {
                break;
            }
            if visited_set.contains(node.name.as_str()) {
                issues.push(
                    ValidationIssue::new(
                        Severity::Error,
                        &agent.name,
                        "escalation-cycle",
                        format!(
                            "Cycle detected in escalation chain: {} → {}",
                            visited.join(" → "),
                            node.name
                        ),
                    )
                    .suggest("Remove the cycle from the escalation hierarchy"),
                );
                break;
            }

            visited_set.insert(node.name.as_str());
            visited.push(node.name.as_str());
            current = agent_map.get(normalize_reference(target)).copied();
            depth += 1;
        }
    }

    issues
}

/// Run all per-agent rules for one definition.
pub fn validate_agent(
    agent: &AgentDefinition,
    snapshot: &RegistrySnapshot,
    project_root: &Path,
) -> ValidationResult {
    let mut issues = Vec::new();
    issues.extend(validate_frontmatter(agent));
    issues.extend(validate_references(agent, snapshot, project_root));
    issues.extend(validate_knowledge_integration(agent));

    ValidationResult {
        valid: !issues.iter().any(|i| i.severity == Severity::Error),
        agent_name: agent.name.clone(),
        issues,
    }
}

/// Validate every agent in the registry against a guaranteed-fresh view.
///
/// The global escalation-chain check runs once for the whole set and its
/// issues merge into the owning agent's result, flipping `valid` if an error
/// is introduced.
pub fn validate_all(registry: &mut Registry) -> Result<ValidationSummary, RegistryError> {
    registry.invalidate();
    let project_root = registry.project_root().to_path_buf();
    let snapshot = registry.load(false)?;
    let agents: Vec<&AgentDefinition> = snapshot.list_all().collect();

    let mut results: Vec<ValidationResult> = Vec::new();
    let mut by_rule: BTreeMap<String, usize> = BTreeMap::new();
    let mut by_severity = SeverityCounts::default();

    for agent in &agents {
        let result = validate_agent(agent, snapshot, &project_root);
        for issue in &result.issues {
            *by_rule.entry(issue.rule.clone()).or_insert(0) += 1;
            by_severity.record(issue.severity);
        }
        results.push(result);
    }

    for issue in validate_escalation_chain(&agents) {
        *by_rule.entry(issue.rule.clone()).or_insert(0) += 1;
        by_severity.record(issue.severity);

        if let Some(result) = results.iter_mut().find(|r| r.agent_name == issue.agent_name) {
            if issue.severity == Severity::Error {
                result.valid = false;
            }
            result.issues.push(issue);
        }
    }

    let total_agents = agents.len();
    let valid_agents = results.iter().filter(|r| r.valid).count();

    Ok(ValidationSummary {
        total_agents,
        valid_agents,
        invalid_agents: total_agents - valid_agents,
        total_issues: by_severity.total(),
        by_rule,
        by_severity,
        results,
    })
}

/// Bounded linear heuristic mapping issue counts onto 0-100.
///
/// Errors weigh 10, warnings 3, info 1; the penalty is normalized against 15
/// points per agent and rounded. A heuristic, not a calibrated metric.
pub fn health_score(summary: &ValidationSummary) -> u32 {
    if summary.total_agents == 0 {
        return 100;
    }

    let penalty = (summary.by_severity.error * 10
        + summary.by_severity.warning * 3
        + summary.by_severity.info) as f64;
    let max_penalty = (summary.total_agents * 15) as f64;

    let score = (100.0 - (penalty / max_penalty) * 100.0).max(0.0);
    score.round() as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Registry;
    use std::fs;
    use tempfile::TempDir;

    fn project(files: &[(&str, &str)]) -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("package.json"), "{}").unwrap();
        let agents = dir.path().join(".agent/workflows");
        fs::create_dir_all(&agents).unwrap();
        for (name, content) in files {
            fs::write(agents.join(name), content).unwrap();
        }
        dir
    }

    fn loaded(dir: &TempDir) -> (Registry, RegistrySnapshot) {
        let mut registry = Registry::new(dir.path());
        let snapshot = registry.load(false).unwrap().clone();
        (registry, snapshot)
    }

    #[test]
    fn test_missing_type_is_error() {
        let dir = project(&[("mystery.md", "---\nname: MYSTERY\n---\n")]);
        let (_, snapshot) = loaded(&dir);
        let agent = snapshot.get("MYSTERY").unwrap();
        let issues = validate_frontmatter(agent);
        assert!(issues
            .iter()
            .any(|i| i.rule == "frontmatter-type" && i.severity == Severity::Error));
    }

    #[test]
    fn test_missing_inherits_is_warning() {
        let dir = project(&[("codigo-agent.md", "---\ntype: agent\n---\n")]);
        let (_, snapshot) = loaded(&dir);
        let issues = validate_frontmatter(snapshot.get("CODIGO").unwrap());
        assert!(issues
            .iter()
            .any(|i| i.rule == "frontmatter-inherits" && i.severity == Severity::Warning));
    }

    #[test]
    fn test_root_agents_exempt_from_escalation_info() {
        let dir = project(&[
            ("router-agent.md", "---\ntype: meta-agent\ninherits: _DNA.md\n---\n"),
            ("codigo-agent.md", "---\ntype: agent\ninherits: _DNA.md\n---\n"),
        ]);
        let (_, snapshot) = loaded(&dir);

        let router = validate_frontmatter(snapshot.get("ROUTER").unwrap());
        assert!(!router.iter().any(|i| i.rule == "frontmatter-escalates"));

        let codigo = validate_frontmatter(snapshot.get("CODIGO").unwrap());
        assert!(codigo
            .iter()
            .any(|i| i.rule == "frontmatter-escalates" && i.severity == Severity::Info));
    }

    #[test]
    fn test_workflow_not_held_to_agent_rules() {
        let dir = project(&[("deploy.md", "---\ntype: workflow\n---\n")]);
        let (_, snapshot) = loaded(&dir);
        let issues = validate_frontmatter(snapshot.get("DEPLOY").unwrap());
        assert!(issues.is_empty());
    }

    #[test]
    fn test_inherits_resolves_in_memory_dir() {
        let dir = project(&[(
            "codigo-agent.md",
            "---\ntype: agent\ninherits: _DNA.md\n---\n",
        )]);
        let memory = dir.path().join(".agent/memory");
        fs::create_dir_all(&memory).unwrap();
        fs::write(memory.join("_DNA.md"), "---\ntype: core-dna\n---\n").unwrap();

        let (_, snapshot) = loaded(&dir);
        let issues =
            validate_references(snapshot.get("CODIGO").unwrap(), &snapshot, dir.path());
        assert!(!issues.iter().any(|i| i.rule == "reference-inherits"));
    }

    #[test]
    fn test_missing_inherits_file_is_error() {
        let dir = project(&[(
            "codigo-agent.md",
            "---\ntype: agent\ninherits: GHOST.md\n---\n",
        )]);
        let (_, snapshot) = loaded(&dir);
        let issues =
            validate_references(snapshot.get("CODIGO").unwrap(), &snapshot, dir.path());
        assert!(issues
            .iter()
            .any(|i| i.rule == "reference-inherits" && i.severity == Severity::Error));
    }

    #[test]
    fn test_unknown_collaborator_is_warning() {
        let dir = project(&[(
            "codigo-agent.md",
            "---\ntype: agent\ncollaborates: [GHOST]\n---\n",
        )]);
        let (_, snapshot) = loaded(&dir);
        let issues =
            validate_references(snapshot.get("CODIGO").unwrap(), &snapshot, dir.path());
        assert!(issues
            .iter()
            .any(|i| i.rule == "reference-collaborates" && i.severity == Severity::Warning));
    }

    #[test]
    fn test_collaborator_reference_suffixes_normalized() {
        let dir = project(&[
            ("router-agent.md", "---\ntype: meta-agent\n---\n"),
            (
                "codigo-agent.md",
                "---\ntype: agent\ncollaborates: [router-agent.md]\n---\n",
            ),
        ]);
        let (_, snapshot) = loaded(&dir);
        let issues =
            validate_references(snapshot.get("CODIGO").unwrap(), &snapshot, dir.path());
        assert!(!issues.iter().any(|i| i.rule == "reference-collaborates"));
    }

    #[test]
    fn test_unknown_escalation_target_is_error() {
        let dir = project(&[(
            "codigo-agent.md",
            "---\ntype: agent\nescalates-to: GHOST\n---\n",
        )]);
        let (_, snapshot) = loaded(&dir);
        let issues =
            validate_references(snapshot.get("CODIGO").unwrap(), &snapshot, dir.path());
        assert!(issues
            .iter()
            .any(|i| i.rule == "reference-escalates" && i.severity == Severity::Error));
    }

    #[test]
    fn test_literal_null_string_escalation_exempt() {
        let dir = project(&[(
            "codigo-agent.md",
            "---\ntype: agent\nescalates-to: \"null\"\n---\n",
        )]);
        let (_, snapshot) = loaded(&dir);
        let issues =
            validate_references(snapshot.get("CODIGO").unwrap(), &snapshot, dir.path());
        assert!(!issues.iter().any(|i| i.rule == "reference-escalates"));
    }

    #[test]
    fn test_knowledge_integration_nudge() {
        let dir = project(&[
            ("codigo-agent.md", "---\ntype: agent\n---\n"),
            (
                "dados-agent.md",
                "---\ntype: agent\ncollaborates: [CONHECIMENTO]\n---\n",
            ),
        ]);
        let (_, snapshot) = loaded(&dir);

        let bare = validate_knowledge_integration(snapshot.get("CODIGO").unwrap());
        assert!(bare
            .iter()
            .any(|i| i.rule == "integration-graphiti" && i.severity == Severity::Info));

        let integrated = validate_knowledge_integration(snapshot.get("DADOS").unwrap());
        assert!(integrated.is_empty());
    }

    #[test]
    fn test_knowledge_exempt_names() {
        let dir = project(&[("router-agent.md", "---\ntype: agent\nname: ROUTER\n---\n")]);
        let (_, snapshot) = loaded(&dir);
        assert!(validate_knowledge_integration(snapshot.get("ROUTER").unwrap()).is_empty());
    }

    #[test]
    fn test_escalation_cycle_detected() {
        let dir = project(&[
            ("a-agent.md", "---\ntype: agent\nname: A\nescalates-to: B\n---\n"),
            ("b-agent.md", "---\ntype: agent\nname: B\nescalates-to: A\n---\n"),
        ]);
        let (_, snapshot) = loaded(&dir);
        let agents: Vec<&AgentDefinition> = snapshot.list_all().collect();
        let issues = validate_escalation_chain(&agents);
        assert!(issues
            .iter()
            .any(|i| i.rule == "escalation-cycle" && i.severity == Severity::Error));
    }

    #[test]
    fn test_dangling_chain_tolerated() {
        let dir = project(&[(
            "a-agent.md",
            "---\ntype: agent\nname: A\nescalates-to: MISSING\n---\n",
        )]);
        let (_, snapshot) = loaded(&dir);
        let agents: Vec<&AgentDefinition> = snapshot.list_all().collect();
        // The chain dangles without reaching the root; intentionally not an error.
        assert!(validate_escalation_chain(&agents).is_empty());
    }

    #[test]
    fn test_validate_all_merges_chain_issues() {
        let dir = project(&[
            ("a-agent.md", "---\ntype: agent\nname: A\ninherits: X\nescalates-to: B\n---\n"),
            ("b-agent.md", "---\ntype: agent\nname: B\ninherits: X\nescalates-to: A\n---\n"),
        ]);
        // Make inherits resolve so the only errors come from the cycle.
        fs::write(dir.path().join(".agent").join("X"), "x").unwrap();

        let mut registry = Registry::new(dir.path());
        let summary = validate_all(&mut registry).unwrap();
        assert!(summary.by_rule.contains_key("escalation-cycle"));
        let flagged = summary
            .results
            .iter()
            .find(|r| r.issues.iter().any(|i| i.rule == "escalation-cycle"))
            .unwrap();
        assert!(!flagged.valid);
    }

    #[test]
    fn test_health_score_empty_registry_is_100() {
        let summary = ValidationSummary {
            total_agents: 0,
            valid_agents: 0,
            invalid_agents: 0,
            total_issues: 0,
            by_rule: BTreeMap::new(),
            by_severity: SeverityCounts::default(),
            results: Vec::new(),
        };
        assert_eq!(health_score(&summary), 100);
    }

    #[test]
    fn test_health_score_penalizes_errors() {
        let mut by_severity = SeverityCounts::default();
        by_severity.error = 1;
        let summary = ValidationSummary {
            total_agents: 2,
            valid_agents: 1,
            invalid_agents: 1,
            total_issues: 1,
            by_rule: BTreeMap::new(),
            by_severity,
            results: Vec::new(),
        };
        let score = health_score(&summary);
        assert!(score < 100);
        // 100 - 100 * 10 / 30 = 67 after rounding
        assert_eq!(score, 67);
    }

    #[test]
    fn test_health_score_floors_at_zero() {
        let mut by_severity = SeverityCounts::default();
        by_severity.error = 50;
        let summary = ValidationSummary {
            total_agents: 1,
            valid_agents: 0,
            invalid_agents: 1,
            total_issues: 50,
            by_rule: BTreeMap::new(),
            by_severity,
            results: Vec::new(),
        };
        assert_eq!(health_score(&summary), 0);
    }
}
