//! Per-repository identity and access.
//!
//! A [`RepositoryContext`] is created by the [`ContextFactory`] once per
//! repository per run, moved into the worker that processes it, and dropped
//! when processing finishes. Nothing in it is shared with other workers
//! except the read-only credential bundle and the logger.

use crate::core::credentials::Credentials;
use crate::core::error::{Result, SweeperError};
use crate::core::logger::{Fields, Logger};
use log::Level;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A repository as discovered or named on the command line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryRef {
    pub owner: String,
    pub name: String,
    pub clone_url: String,
    /// Known when discovery came from the API; resolved from the remote otherwise.
    pub default_branch: Option<String>,
}

impl RepositoryRef {
    /// Parse an `owner/name` identifier into a reference on `git_host`.
    pub fn parse(input: &str, git_host: &str) -> Result<Self> {
        let trimmed = input.trim().trim_end_matches(".git");
        let mut parts = trimmed.split('/');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(owner), Some(name), None) if valid_segment(owner) && valid_segment(name) => {
                Ok(Self {
                    owner: owner.to_string(),
                    name: name.to_string(),
                    clone_url: format!("https://{git_host}/{owner}/{name}.git"),
                    default_branch: None,
                })
            }
            _ => Err(SweeperError::invalid_repository_id(input)),
        }
    }

    /// `owner/name`; also the cache key.
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

fn valid_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment != "."
        && segment != ".."
        && segment
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

pub struct RepositoryContext {
    pub repo: RepositoryRef,
    /// Working directory, unique to this repository.
    pub work_dir: PathBuf,
    pub credentials: Arc<Credentials>,
    logger: Arc<dyn Logger>,
}

impl RepositoryContext {
    pub fn owner(&self) -> &str {
        &self.repo.owner
    }

    pub fn name(&self) -> &str {
        &self.repo.name
    }

    pub fn full_name(&self) -> String {
        self.repo.full_name()
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// Clone URL with `token` embedded for HTTPS remotes. Other schemes
    /// (local paths, `file://`, ssh) are returned unchanged.
    pub fn authenticated_url(&self, token: &str) -> String {
        match self.repo.clone_url.strip_prefix("https://") {
            Some(rest) => format!(
                "https://{}:{}@{}",
                self.credentials.git_username(),
                token,
                rest
            ),
            None => self.repo.clone_url.clone(),
        }
    }

    pub fn debug(&self, message: &str, fields: Fields<'_>) {
        self.emit(Level::Debug, message, fields);
    }

    pub fn info(&self, message: &str, fields: Fields<'_>) {
        self.emit(Level::Info, message, fields);
    }

    pub fn warn(&self, message: &str, fields: Fields<'_>) {
        self.emit(Level::Warn, message, fields);
    }

    pub fn error(&self, message: &str, fields: Fields<'_>) {
        self.emit(Level::Error, message, fields);
    }

    fn emit(&self, level: Level, message: &str, fields: Fields<'_>) {
        let repo = self.full_name();
        let mut all: Vec<(&str, &str)> = Vec::with_capacity(fields.len() + 1);
        all.push(("repo", repo.as_str()));
        all.extend_from_slice(fields);
        self.logger.log(level, message, &all);
    }
}

/// Builds contexts with the run-wide pieces (workspace root, credentials, logger).
#[derive(Clone)]
pub struct ContextFactory {
    workspace_root: PathBuf,
    credentials: Arc<Credentials>,
    logger: Arc<dyn Logger>,
}

impl ContextFactory {
    pub fn new(
        workspace_root: impl Into<PathBuf>,
        credentials: Arc<Credentials>,
        logger: Arc<dyn Logger>,
    ) -> Self {
        Self {
            workspace_root: workspace_root.into(),
            credentials,
            logger,
        }
    }

    /// Working directories are keyed by `owner/name` so no two repositories share one.
    pub fn create(&self, repo: RepositoryRef) -> RepositoryContext {
        let work_dir = self.workspace_root.join(&repo.owner).join(&repo.name);
        RepositoryContext {
            repo,
            work_dir,
            credentials: Arc::clone(&self.credentials),
            logger: Arc::clone(&self.logger),
        }
    }

    pub fn logger(&self) -> Arc<dyn Logger> {
        Arc::clone(&self.logger)
    }
}
