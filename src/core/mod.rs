//! Core functionality for lint-sweeper.
//!
//! This module provides the building blocks of a sweep: configuration and
//! credentials, the git and linter adapters, the GitHub client, the cache,
//! the per-repository processor and the worker pool that drives it.

pub mod artifacts;
pub mod cache;
pub mod config;
pub mod context;
pub mod coordinator;
pub mod credentials;
pub mod dirs;
pub mod error;
pub mod git;
pub mod github;
pub mod lint;
pub mod logger;
pub mod process;
pub mod processor;
pub mod report;
pub mod state;
pub mod templates;

// === Error handling ===
pub use error::{Result, SweeperError};

// === Configuration and identity ===
pub use config::Config;
pub use context::{ContextFactory, RepositoryContext, RepositoryRef};
pub use credentials::{CredentialInputs, Credentials};

// === Logging ===
pub use logger::{Logger, StructuredLogger};

// === Adapters ===
// Narrow traits at every external boundary, with the production implementation next to each
pub use git::{GitCli, GitRepo, VersionControl};
pub use github::{CodeHost, GitHubClient, NewPullRequest};
pub use lint::{LintEngine, LintResult, Linter, Offense};

// === Processing ===
pub use artifacts::ArtifactManager;
pub use cache::{is_fresh, CacheStats, CacheStore};
pub use coordinator::Coordinator;
pub use processor::{RepositoryHandler, RepositoryProcessor};
pub use state::{ArtifactKind, ArtifactRef, CacheEntry, CacheResult, OutcomeStatus, ProcessingOutcome};

// === Templates ===
pub use templates::{render_template, TemplateContext, Templates, TEMPLATES};

// === Output formatting ===
pub use report::{print_error, print_info, print_section_header, print_success, RunSummary};
