//! Warden: registry, validation and integrity tracking for agent definitions.
//!
//! Scans a project's `.agent/workflows` directory of markdown files with
//! frontmatter headers, builds an in-memory agent registry, validates
//! cross-references and escalation chains, and maintains a hash-chain ledger
//! of definition content for tamper and drift detection.

pub mod cli;
pub mod config;
pub mod dashboard;
pub mod definition;
pub mod error;
pub mod frontmatter;
pub mod integrity;
pub mod logging;
pub mod registry;
pub mod validator;
