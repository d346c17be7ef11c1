//! Immutable run configuration.
//!
//! [`Config`] is built once (from CLI flags and their environment fallbacks)
//! and shared read-only as `Arc<Config>` by every component.

use crate::core::error::{Result, SweeperError};
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_THREADS: usize = 4;
pub const DEFAULT_CACHE_TTL_DAYS: i64 = 7;
pub const DEFAULT_LINT_TIMEOUT_SECS: u64 = 600;
pub const DEFAULT_GIT_TIMEOUT_SECS: u64 = 300;
pub const DEFAULT_FIX_BRANCH: &str = "lint-sweeper/autocorrect";
pub const DEFAULT_COMMIT_MESSAGE: &str = "style: apply linter auto-corrections";
pub const DEFAULT_PR_TITLE: &str = "Apply linter auto-corrections";
pub const DEFAULT_ISSUE_TITLE: &str = "Linter offenses requiring manual review";
pub const DEFAULT_LINT_COMMAND: &str = "rubocop";
pub const DEFAULT_API_URL: &str = "https://api.github.com";
pub const DEFAULT_GIT_HOST: &str = "github.com";
pub const DEFAULT_LABEL: &str = "lint";

#[derive(Debug, Clone, Serialize)]
pub struct Config {
    /// Organization searched for repositories.
    pub org: Option<String>,
    /// Topic repositories must carry to be discovered.
    pub topic: Option<String>,
    pub threads: usize,
    pub cache_file: PathBuf,
    pub cache_ttl_days: i64,
    pub workspace_root: PathBuf,
    /// Linter program followed by any fixed leading arguments (e.g. `bundle exec rubocop`).
    pub lint_command: Vec<String>,
    pub lint_timeout: Duration,
    pub git_timeout: Duration,
    pub fix_branch: String,
    pub commit_message: String,
    pub pr_title: String,
    pub issue_title: String,
    pub labels: Vec<String>,
    pub committer_name: String,
    pub committer_email: String,
    pub api_url: String,
    pub git_host: String,
    /// Remove each working directory once its repository is processed.
    pub clean_workspaces: bool,
}

impl Config {
    /// Configuration with every tunable at its default, rooted at the given paths.
    pub fn with_paths(cache_file: impl Into<PathBuf>, workspace_root: impl Into<PathBuf>) -> Self {
        Self {
            org: None,
            topic: None,
            threads: DEFAULT_THREADS,
            cache_file: cache_file.into(),
            cache_ttl_days: DEFAULT_CACHE_TTL_DAYS,
            workspace_root: workspace_root.into(),
            lint_command: vec![DEFAULT_LINT_COMMAND.to_string()],
            lint_timeout: Duration::from_secs(DEFAULT_LINT_TIMEOUT_SECS),
            git_timeout: Duration::from_secs(DEFAULT_GIT_TIMEOUT_SECS),
            fix_branch: DEFAULT_FIX_BRANCH.to_string(),
            commit_message: DEFAULT_COMMIT_MESSAGE.to_string(),
            pr_title: DEFAULT_PR_TITLE.to_string(),
            issue_title: DEFAULT_ISSUE_TITLE.to_string(),
            labels: vec![DEFAULT_LABEL.to_string()],
            committer_name: "lint-sweeper".to_string(),
            committer_email: "lint-sweeper@users.noreply.github.com".to_string(),
            api_url: DEFAULT_API_URL.to_string(),
            git_host: DEFAULT_GIT_HOST.to_string(),
            clean_workspaces: false,
        }
    }

    /// Reject configurations no run could succeed with.
    pub fn validate(self) -> Result<Self> {
        if self.threads == 0 {
            return Err(SweeperError::config_error("threads must be at least 1"));
        }
        if self.cache_ttl_days < 0 {
            return Err(SweeperError::config_error("cache TTL cannot be negative"));
        }
        if self.lint_command.iter().all(|part| part.trim().is_empty()) {
            return Err(SweeperError::config_error("lint command is empty"));
        }
        if self.fix_branch.trim().is_empty() {
            return Err(SweeperError::config_error("fix branch name is empty"));
        }
        if self.lint_timeout.is_zero() || self.git_timeout.is_zero() {
            return Err(SweeperError::config_error("timeouts must be greater than zero"));
        }
        Ok(self)
    }
}

/// Split a shell-like command string on whitespace (`"bundle exec rubocop"`).
pub fn split_command(command: &str) -> Vec<String> {
    command.split_whitespace().map(str::to_string).collect()
}
