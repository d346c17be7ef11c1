//! Domain-specific error types and error handling utilities.
//!
//! This module defines [`SweeperError`] which covers every failure mode of a
//! lint-sweeper run. It uses `thiserror` for ergonomic error definitions and
//! includes constructors for the common failure scenarios.
//!
//! # Public API
//! - [`SweeperError`]: Main error enum covering all failure modes
//! - [`Result<T>`]: Type alias for `std::result::Result<T, SweeperError>`
//!
//! # Error Categories
//! - **Setup**: credentials, configuration, repository discovery (fatal to the run)
//! - **Subprocess**: git and linter failures, timeouts
//! - **API**: code-hosting HTTP failures
//! - **Cache**: persistence failures (never fatal, logged by callers)

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Domain-specific error types for lint-sweeper
#[derive(Error, Debug)]
pub enum SweeperError {
    // Setup errors
    #[error("Invalid credentials: {message}")]
    InvalidCredentials { message: String },

    #[error("Invalid configuration: {message}")]
    Config { message: String },

    #[error("No repositories found for organization '{org}' with topic '{topic}'")]
    NoRepositoriesFound { org: String, topic: String },

    #[error("Invalid repository identifier '{input}'. Use the form owner/name")]
    InvalidRepositoryId { input: String },

    // Git and subprocess errors
    #[error("Git repository error: {0}")]
    Git(#[from] git2::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to start '{program}': {source}")]
    CommandSpawn {
        program: String,
        source: std::io::Error,
    },

    #[error("'{program}' failed: {message}")]
    CommandFailed { program: String, message: String },

    #[error("'{program}' timed out after {}s", timeout.as_secs())]
    CommandTimeout { program: String, timeout: Duration },

    #[error("Linter exited with code {exit_code} and produced no parsable report")]
    LintOutputUnparsable { exit_code: i32, output: String },

    // Code-hosting API errors
    #[error("GitHub API request failed during {operation}: {message}")]
    Api { operation: String, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] ureq::Error),

    #[error("Failed to sign GitHub App token: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    // Cache errors
    #[error("Failed to create cache directory '{path}': {source}")]
    CacheDirectoryCreationFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write cache file '{path}': {source}")]
    CacheWriteFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("No cache entry for '{key}'")]
    CacheEntryNotFound { key: String },

    // Pool and serialization errors
    #[error("Failed to build worker pool: {message}")]
    WorkerPool { message: String },

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience type alias for Results using SweeperError
pub type Result<T> = std::result::Result<T, SweeperError>;

impl SweeperError {
    /// Create an invalid credentials error
    pub fn invalid_credentials(message: impl Into<String>) -> Self {
        Self::InvalidCredentials {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config_error(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn no_repositories_found(org: impl Into<String>, topic: impl Into<String>) -> Self {
        Self::NoRepositoriesFound {
            org: org.into(),
            topic: topic.into(),
        }
    }

    pub fn invalid_repository_id(input: impl Into<String>) -> Self {
        Self::InvalidRepositoryId {
            input: input.into(),
        }
    }

    /// Create an error for a subprocess that could not be started
    pub fn command_spawn(program: impl Into<String>, source: std::io::Error) -> Self {
        Self::CommandSpawn {
            program: program.into(),
            source,
        }
    }

    /// Create an error for a subprocess that exited unsuccessfully
    pub fn command_failed(program: impl Into<String>, message: impl Into<String>) -> Self {
        Self::CommandFailed {
            program: program.into(),
            message: message.into(),
        }
    }

    pub fn command_timeout(program: impl Into<String>, timeout: Duration) -> Self {
        Self::CommandTimeout {
            program: program.into(),
            timeout,
        }
    }

    /// Create an API error tagged with the operation that failed
    pub fn api(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Api {
            operation: operation.into(),
            message: message.into(),
        }
    }

    pub fn cache_directory_creation_failed(
        path: impl Into<PathBuf>,
        source: std::io::Error,
    ) -> Self {
        Self::CacheDirectoryCreationFailed {
            path: path.into(),
            source,
        }
    }

    pub fn cache_write_failed(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::CacheWriteFailed {
            path: path.into(),
            source,
        }
    }

    pub fn worker_pool(message: impl Into<String>) -> Self {
        Self::WorkerPool {
            message: message.into(),
        }
    }

    /// Errors that abort the whole run before any repository is processed.
    pub fn is_setup_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidCredentials { .. }
                | Self::Config { .. }
                | Self::NoRepositoriesFound { .. }
                | Self::InvalidRepositoryId { .. }
                | Self::WorkerPool { .. }
        )
    }
}
