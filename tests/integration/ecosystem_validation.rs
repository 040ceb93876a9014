//! End-to-end registry and validation scenarios over a real directory tree.

use super::test_utils::{healthy_ecosystem, project_with_agents, write_agent};
use warden::registry::Registry;
use warden::validator::{health_score, validate_all, Severity};

#[test]
fn test_healthy_ecosystem_loads_validates_and_scores() {
    let project = healthy_ecosystem();
    let mut registry = Registry::new(project.path());

    let snapshot = registry.load(false).unwrap();
    assert_eq!(snapshot.len(), 3);
    assert!(snapshot.get("_DNA").is_some());
    assert!(snapshot.get("ROUTER").is_some());
    assert!(snapshot.get("CODIGO").is_some());

    let summary = validate_all(&mut registry).unwrap();
    assert_eq!(summary.total_agents, 3);
    assert_eq!(
        summary.by_severity.error, 0,
        "healthy ecosystem must have zero errors: {:?}",
        summary.results
    );

    let score = health_score(&summary);
    assert!(score >= 90, "expected score >= 90, got {}", score);
}

#[test]
fn test_case_insensitive_lookup_contract() {
    let project = healthy_ecosystem();
    let mut registry = Registry::new(project.path());
    let snapshot = registry.load(false).unwrap();

    let exact = snapshot.get("ROUTER").unwrap();
    let fallback = snapshot.get("router").unwrap();
    assert_eq!(exact.name, fallback.name);
    assert_eq!(exact.hash, fallback.hash);
}

#[test]
fn test_corrupt_file_does_not_break_validation() {
    let project = healthy_ecosystem();
    write_agent(project.path(), "garbage.md", "completely unstructured text");

    let mut registry = Registry::new(project.path());
    let snapshot = registry.load(false).unwrap();
    assert_eq!(snapshot.len(), 3);
    assert_eq!(snapshot.skipped.len(), 1);

    let summary = validate_all(&mut registry).unwrap();
    assert_eq!(summary.total_agents, 3);
}

#[test]
fn test_cycle_reported_through_full_validation() {
    let project = project_with_agents(&[
        (
            "a-agent.md",
            "---\ntype: agent\nname: A\ninherits: _DNA.md\nescalates-to: B\n---\n",
        ),
        (
            "b-agent.md",
            "---\ntype: agent\nname: B\ninherits: _DNA.md\nescalates-to: A\n---\n",
        ),
        ("_DNA.md", "---\ntype: core-dna\nname: _DNA\n---\n"),
    ]);

    let mut registry = Registry::new(project.path());
    let summary = validate_all(&mut registry).unwrap();

    let cycle_issues: Vec<_> = summary
        .results
        .iter()
        .flat_map(|r| r.issues.iter())
        .filter(|i| i.rule == "escalation-cycle")
        .collect();
    assert!(!cycle_issues.is_empty());
    assert!(cycle_issues.iter().all(|i| i.severity == Severity::Error));
    assert!(cycle_issues
        .iter()
        .any(|i| i.agent_name == "A" || i.agent_name == "B"));
}

#[test]
fn test_validation_issues_surface_counts_by_rule() {
    let project = project_with_agents(&[
        // Missing type, missing inherits target, unknown collaborator.
        ("broken.md", "---\nname: BROKEN\ninherits: GHOST.md\ncollaborates: [NOBODY]\n---\n"),
    ]);

    let mut registry = Registry::new(project.path());
    let summary = validate_all(&mut registry).unwrap();

    assert_eq!(summary.by_rule["frontmatter-type"], 1);
    assert_eq!(summary.by_rule["reference-inherits"], 1);
    assert_eq!(summary.by_rule["reference-collaborates"], 1);
    assert!(summary.by_severity.error >= 2);
    assert_eq!(summary.invalid_agents, 1);
}
