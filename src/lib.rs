//! Lint Sweeper - run a linter with auto-correction across every repository in
//! an organization that carries a given topic.
//!
//! Each repository is cloned (or updated), linted, and auto-corrected. Fixes are
//! pushed to a dedicated branch with a pull request; offenses that need a human
//! are filed as an issue. A persisted cache keyed by repository and commit SHA
//! lets unchanged repositories be skipped on the next run.
//!
//! # Public API
//! The main public interface is re-exported from the [`core`] module, which provides:
//! - Configuration and credential resolution
//! - The git, linter and GitHub adapters behind narrow traits
//! - The per-repository processor and the worker pool coordinator
//! - The cache store and run summary

pub mod commands;
pub mod core;

// Re-export the core public API for external users
pub use core::{
    ArtifactKind,
    ArtifactRef,
    CacheResult,
    CacheStore,
    CodeHost,
    // Configuration
    Config,
    ContextFactory,
    Coordinator,
    Credentials,
    LintResult,
    Linter,
    OutcomeStatus,
    ProcessingOutcome,
    RepositoryProcessor,
    RepositoryRef,
    Result,
    RunSummary,
    // Error handling
    SweeperError,
    VersionControl,
};
