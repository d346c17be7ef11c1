//! Per-repository processing state machine.
//!
//! ```text
//! start -> cloned -> lint_checked -> clean ----------------------------------+
//!                         |                                                  |
//!                         +-> needs_fix -> autocorrected -> no_real_change --+
//!                                               |                            |
//!                                               +-> committed -> pushed ->   |
//!                                                   artifact_created --------+-> cache_updated -> done
//! ```
//!
//! A cache hit after cloning goes straight to `done` without linting. Any
//! failure moves to `error`; the cache is still updated with an error result
//! whenever the current SHA is known, so the next run retries the repository.

use crate::core::artifacts::ArtifactManager;
use crate::core::cache::CacheStore;
use crate::core::config::Config;
use crate::core::context::RepositoryContext;
use crate::core::error::Result;
use crate::core::git::VersionControl;
use crate::core::github::CodeHost;
use crate::core::lint::{LintResult, Linter};
use crate::core::state::{ArtifactRef, OutcomeStatus, ProcessingOutcome};
use crate::core::templates::{issue_body, pull_request_body};
use chrono::Utc;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

/// Anything that can turn a repository context into an outcome.
pub trait RepositoryHandler: Send + Sync {
    fn process(&self, ctx: RepositoryContext) -> ProcessingOutcome;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Start,
    Cloned,
    LintChecked,
    NeedsFix,
    Autocorrected,
    Committed,
    Pushed,
    ArtifactCreated,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Start => "start",
            Self::Cloned => "cloned",
            Self::LintChecked => "lint_checked",
            Self::NeedsFix => "needs_fix",
            Self::Autocorrected => "autocorrected",
            Self::Committed => "committed",
            Self::Pushed => "pushed",
            Self::ArtifactCreated => "artifact_created",
        };
        f.write_str(name)
    }
}

/// What is known about a repository while its state machine runs.
#[derive(Debug)]
struct Progress {
    stage: Stage,
    sha: Option<String>,
    auto_correctable: usize,
    manual_only: usize,
    artifacts: Vec<ArtifactRef>,
    artifact_errors: Vec<String>,
}

impl Progress {
    fn new() -> Self {
        Self {
            stage: Stage::Start,
            sha: None,
            auto_correctable: 0,
            manual_only: 0,
            artifacts: Vec::new(),
            artifact_errors: Vec::new(),
        }
    }

    fn advance(&mut self, ctx: &RepositoryContext, stage: Stage) {
        ctx.debug(
            "transition",
            &[
                ("from", self.stage.to_string().as_str()),
                ("to", stage.to_string().as_str()),
            ],
        );
        self.stage = stage;
    }
}

pub struct RepositoryProcessor {
    config: Arc<Config>,
    cache: Arc<CacheStore>,
    git: Arc<dyn VersionControl>,
    linter: Arc<dyn Linter>,
    host: Arc<dyn CodeHost>,
    artifacts: ArtifactManager,
}

impl RepositoryProcessor {
    pub fn new(
        config: Arc<Config>,
        cache: Arc<CacheStore>,
        git: Arc<dyn VersionControl>,
        linter: Arc<dyn Linter>,
        host: Arc<dyn CodeHost>,
    ) -> Self {
        let artifacts = ArtifactManager::new(Arc::clone(&host), config.labels.clone());
        Self {
            config,
            cache,
            git,
            linter,
            host,
            artifacts,
        }
    }

    fn run(&self, ctx: &RepositoryContext, progress: &mut Progress) -> Result<OutcomeStatus> {
        let dir = ctx.work_dir();

        let token = self.host.git_token()?;
        let remote_url = ctx.authenticated_url(&token);
        let base_branch = self.git.sync(ctx, &remote_url)?;
        let sha = self.git.head_sha(dir)?;
        progress.sha = Some(sha.clone());
        progress.advance(ctx, Stage::Cloned);

        if self.cache.should_skip(&ctx.full_name(), &sha, Utc::now()) {
            ctx.info("cache hit, skipping", &[("sha", sha.as_str())]);
            return Ok(OutcomeStatus::Skipped);
        }

        let result = self.linter.check(dir)?;
        progress.auto_correctable = result.auto_correctable_count();
        progress.manual_only = result.manual_only_count();
        progress.advance(ctx, Stage::LintChecked);
        ctx.info(
            "lint checked",
            &[
                ("total", result.total_count().to_string().as_str()),
                ("auto", progress.auto_correctable.to_string().as_str()),
                ("manual", progress.manual_only.to_string().as_str()),
            ],
        );

        if result.is_clean() {
            return Ok(OutcomeStatus::NoIssues);
        }

        progress.advance(ctx, Stage::NeedsFix);
        self.git.reset_branch(dir, &self.config.fix_branch)?;
        let changed = self.linter.autocorrect(dir)?;
        progress.advance(ctx, Stage::Autocorrected);

        if !changed {
            ctx.info("autocorrect produced no changes", &[]);
            if progress.manual_only == 0 {
                return Ok(OutcomeStatus::NoIssues);
            }
            self.open_issue(ctx, &result, progress);
            return Ok(OutcomeStatus::ManualIssueCreated);
        }

        self.git.commit_all(dir, &self.config.commit_message)?;
        progress.advance(ctx, Stage::Committed);
        self.git
            .force_push(dir, &remote_url, &self.config.fix_branch)?;
        progress.advance(ctx, Stage::Pushed);

        self.open_pull_request(ctx, &base_branch, &result, progress);
        if progress.manual_only > 0 {
            self.open_issue(ctx, &result, progress);
        }
        Ok(OutcomeStatus::AutoFixedPrCreated)
    }

    fn open_pull_request(
        &self,
        ctx: &RepositoryContext,
        base_branch: &str,
        result: &LintResult,
        progress: &mut Progress,
    ) {
        let body = pull_request_body(&ctx.full_name(), result);
        match self.artifacts.create_pull_request(
            ctx,
            &self.config.fix_branch,
            base_branch,
            &self.config.pr_title,
            &body,
        ) {
            Ok(pr) => {
                progress.artifacts.push(pr);
                progress.advance(ctx, Stage::ArtifactCreated);
            }
            Err(e) => {
                ctx.error(
                    "pull request creation failed",
                    &[("error", e.to_string().as_str())],
                );
                progress
                    .artifact_errors
                    .push(format!("pull request: {e}"));
            }
        }
    }

    fn open_issue(&self, ctx: &RepositoryContext, result: &LintResult, progress: &mut Progress) {
        let body = issue_body(&ctx.full_name(), result);
        match self
            .artifacts
            .create_issue(ctx, &self.config.issue_title, &body)
        {
            Ok(issue) => {
                progress.artifacts.push(issue);
                progress.advance(ctx, Stage::ArtifactCreated);
            }
            Err(e) => {
                ctx.error("issue creation failed", &[("error", e.to_string().as_str())]);
                progress.artifact_errors.push(format!("issue: {e}"));
            }
        }
    }

    fn update_cache(&self, ctx: &RepositoryContext, progress: &Progress, status: OutcomeStatus) {
        let (Some(sha), Some(result)) = (progress.sha.as_deref(), status.cache_result()) else {
            return;
        };
        if let Err(e) = self.cache.record(&ctx.full_name(), sha, result, Utc::now()) {
            ctx.error("cache update failed", &[("error", e.to_string().as_str())]);
        }
    }

    fn clean_workspace(&self, ctx: &RepositoryContext) {
        if !self.config.clean_workspaces || !ctx.work_dir().exists() {
            return;
        }
        if let Err(e) = std::fs::remove_dir_all(ctx.work_dir()) {
            ctx.warn(
                "failed to remove working directory",
                &[("error", e.to_string().as_str())],
            );
        }
    }
}

impl RepositoryHandler for RepositoryProcessor {
    fn process(&self, ctx: RepositoryContext) -> ProcessingOutcome {
        let started = Instant::now();
        let mut progress = Progress::new();
        ctx.info("processing", &[]);

        let (mut status, mut error) = match self.run(&ctx, &mut progress) {
            Ok(status) => (status, None),
            Err(e) => {
                let stage = progress.stage.to_string();
                ctx.error(
                    "processing failed",
                    &[("stage", stage.as_str()), ("error", e.to_string().as_str())],
                );
                (OutcomeStatus::Error, Some(format!("after {stage}: {e}")))
            }
        };

        if !progress.artifact_errors.is_empty() {
            status = OutcomeStatus::Error;
            error = Some(progress.artifact_errors.join("; "));
        }

        self.update_cache(&ctx, &progress, status);
        self.clean_workspace(&ctx);

        let elapsed = started.elapsed();
        ctx.info(
            "done",
            &[
                ("status", status.label()),
                ("elapsed_ms", elapsed.as_millis().to_string().as_str()),
            ],
        );

        let artifact_failed = !progress.artifact_errors.is_empty();
        ProcessingOutcome {
            repository: ctx.full_name(),
            status,
            auto_correctable: progress.auto_correctable,
            manual_only: progress.manual_only,
            elapsed,
            error,
            artifacts: progress.artifacts,
            artifact_failed,
        }
    }
}
