//! Shared fixtures for integration tests.

use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Create a temp project with a marker file and an agents directory holding
/// the given files.
pub fn project_with_agents(files: &[(&str, &str)]) -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("package.json"), "{}").unwrap();
    let agents = dir.path().join(".agent/workflows");
    fs::create_dir_all(&agents).unwrap();
    for (name, content) in files {
        fs::write(agents.join(name), content).unwrap();
    }
    dir
}

/// Overwrite one agent file in an existing project.
pub fn write_agent(root: &Path, name: &str, content: &str) {
    fs::write(root.join(".agent/workflows").join(name), content).unwrap();
}

/// A small healthy ecosystem: a core DNA document, a root meta-agent and one
/// agent escalating to it.
pub fn healthy_ecosystem() -> TempDir {
    project_with_agents(&[
        ("_DNA.md", "---\ntype: core-dna\nname: _DNA\n---\n\n# Core DNA\n"),
        (
            "ROUTER-agent.md",
            "---\ntype: meta-agent\ninherits: _DNA.md\n---\n\n# Router\n",
        ),
        (
            "CODIGO-agent.md",
            "---\ntype: agent\ninherits: _DNA.md\nescalates-to: ROUTER\n---\n\n# Codigo\n",
        ),
    ])
}
