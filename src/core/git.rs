//! Git operations for repository working directories.
//!
//! Two layers live here:
//! - [`GitRepo`]: read-only inspection through `git2` (HEAD SHA, branch names,
//!   working-tree status).
//! - [`GitCli`]: the [`VersionControl`] implementation that mutates
//!   repositories by shelling out to `git` (clone, fetch, branch, commit, push),
//!   each call bounded by a timeout.
//!
//! # Error semantics
//! Every failure is returned as a [`SweeperError`]; none of them are fatal to
//! the run. The processor turns them into an `error` outcome for the one
//! repository involved. Command output is redacted before it is put into an
//! error, since push and fetch URLs carry access tokens.

use crate::core::context::RepositoryContext;
use crate::core::error::{Result, SweeperError};
use crate::core::process::{redact, run_with_timeout, CommandOutput};
use git2::{BranchType, Repository, Status, StatusOptions};
use std::fs;
use std::path::Path;
use std::process::Command;
use std::time::Duration;

pub struct GitRepo {
    repo: Repository,
}

impl GitRepo {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let repo = Repository::open(path)?;
        Ok(GitRepo { repo })
    }

    pub fn head_sha(&self) -> Result<String> {
        let commit = self.repo.head()?.peel_to_commit()?;
        Ok(commit.id().to_string())
    }

    pub fn current_branch(&self) -> Result<Option<String>> {
        let head = self.repo.head()?;
        if head.is_branch() {
            Ok(head.shorthand().map(str::to_string))
        } else {
            Ok(None)
        }
    }

    pub fn branch_exists(&self, name: &str) -> bool {
        self.repo.find_branch(name, BranchType::Local).is_ok()
    }

    /// True when the working tree differs from HEAD in any way, including
    /// untracked files and file-mode-only changes.
    pub fn has_working_tree_changes(&self) -> Result<bool> {
        let mut opts = StatusOptions::new();
        opts.include_untracked(true);
        opts.recurse_untracked_dirs(true);
        opts.include_ignored(false);

        let statuses = self.repo.statuses(Some(&mut opts))?;
        Ok(statuses
            .iter()
            .any(|entry| entry.status() != Status::CURRENT && !entry.status().is_ignored()))
    }
}

/// Clone/update/branch/commit/push primitives used by the processor.
pub trait VersionControl: Send + Sync {
    /// Clone `ctx` into its working directory, or fetch and hard-reset an
    /// existing clone. Returns the base (default) branch that is checked out.
    fn sync(&self, ctx: &RepositoryContext, fetch_url: &str) -> Result<String>;

    fn head_sha(&self, dir: &Path) -> Result<String>;

    /// Delete `branch` if it exists, then recreate it from the current HEAD.
    fn reset_branch(&self, dir: &Path, branch: &str) -> Result<()>;

    /// Stage everything and commit it with `message`.
    fn commit_all(&self, dir: &Path, message: &str) -> Result<()>;

    /// Force-push HEAD to `branch` on `remote_url`.
    fn force_push(&self, dir: &Path, remote_url: &str, branch: &str) -> Result<()>;
}

pub struct GitCli {
    timeout: Duration,
    committer_name: String,
    committer_email: String,
}

impl GitCli {
    pub fn new(
        timeout: Duration,
        committer_name: impl Into<String>,
        committer_email: impl Into<String>,
    ) -> Self {
        Self {
            timeout,
            committer_name: committer_name.into(),
            committer_email: committer_email.into(),
        }
    }

    /// Execute a git command, failing on a non-zero exit.
    fn execute_git_command(&self, dir: Option<&Path>, args: &[&str]) -> Result<CommandOutput> {
        let mut cmd = Command::new("git");
        cmd.args(args).env("GIT_TERMINAL_PROMPT", "0");
        if let Some(dir) = dir {
            cmd.current_dir(dir);
        }

        let output = run_with_timeout(cmd, self.timeout)?;
        if !output.success() {
            let subcommand = args.first().copied().unwrap_or("git");
            return Err(SweeperError::command_failed(
                format!("git {subcommand}"),
                redact(output.stderr.trim()),
            ));
        }
        Ok(output)
    }

    fn clone_fresh(&self, ctx: &RepositoryContext, fetch_url: &str) -> Result<String> {
        let dir = ctx.work_dir();
        if let Some(parent) = dir.parent() {
            fs::create_dir_all(parent)?;
        }

        let dir_str = dir.to_string_lossy();
        let mut args = vec!["clone", "--depth", "1", "--single-branch"];
        if let Some(branch) = ctx.repo.default_branch.as_deref() {
            args.extend(["--branch", branch]);
        }
        args.extend([fetch_url, &*dir_str]);
        self.execute_git_command(None, &args)?;

        // Keep the token out of .git/config.
        self.execute_git_command(
            Some(dir),
            &["remote", "set-url", "origin", &ctx.repo.clone_url],
        )?;

        match ctx.repo.default_branch.clone() {
            Some(branch) => Ok(branch),
            None => GitRepo::open(dir)?
                .current_branch()?
                .ok_or_else(|| SweeperError::command_failed("git clone", "HEAD is detached")),
        }
    }

    fn update(&self, ctx: &RepositoryContext, fetch_url: &str) -> Result<String> {
        let dir = ctx.work_dir();
        let branch = match ctx.repo.default_branch.clone() {
            Some(branch) => branch,
            None => self.remote_default_branch(dir, fetch_url)?,
        };

        self.execute_git_command(Some(dir), &["fetch", "--depth", "1", fetch_url, &branch])?;
        self.execute_git_command(Some(dir), &["checkout", "-f", "-B", &branch, "FETCH_HEAD"])?;
        self.execute_git_command(Some(dir), &["clean", "-fd"])?;
        Ok(branch)
    }

    fn remote_default_branch(&self, dir: &Path, fetch_url: &str) -> Result<String> {
        let output =
            self.execute_git_command(Some(dir), &["ls-remote", "--symref", fetch_url, "HEAD"])?;
        parse_symref(&output.stdout).ok_or_else(|| {
            SweeperError::command_failed("git ls-remote", "remote did not report a HEAD branch")
        })
    }
}

impl VersionControl for GitCli {
    fn sync(&self, ctx: &RepositoryContext, fetch_url: &str) -> Result<String> {
        let dir = ctx.work_dir();

        if dir.join(".git").is_dir() {
            match self.update(ctx, fetch_url) {
                Ok(branch) => {
                    ctx.debug("updated existing clone", &[("branch", branch.as_str())]);
                    return Ok(branch);
                }
                Err(e) => {
                    ctx.warn("update failed, recloning", &[("error", e.to_string().as_str())]);
                }
            }
        }

        if dir.exists() {
            fs::remove_dir_all(dir)?;
        }
        let branch = self.clone_fresh(ctx, fetch_url)?;
        ctx.debug("cloned", &[("branch", branch.as_str())]);
        Ok(branch)
    }

    fn head_sha(&self, dir: &Path) -> Result<String> {
        GitRepo::open(dir)?.head_sha()
    }

    fn reset_branch(&self, dir: &Path, branch: &str) -> Result<()> {
        if GitRepo::open(dir)?.branch_exists(branch) {
            self.execute_git_command(Some(dir), &["branch", "-D", branch])?;
        }
        self.execute_git_command(Some(dir), &["checkout", "-b", branch])?;
        Ok(())
    }

    fn commit_all(&self, dir: &Path, message: &str) -> Result<()> {
        self.execute_git_command(Some(dir), &["add", "-A"])?;

        let name = format!("user.name={}", self.committer_name);
        let email = format!("user.email={}", self.committer_email);
        self.execute_git_command(
            Some(dir),
            &["-c", &name, "-c", &email, "commit", "--no-verify", "-m", message],
        )?;
        Ok(())
    }

    fn force_push(&self, dir: &Path, remote_url: &str, branch: &str) -> Result<()> {
        let refspec = format!("HEAD:refs/heads/{branch}");
        self.execute_git_command(Some(dir), &["push", "--force", remote_url, &refspec])?;
        Ok(())
    }
}

/// Extract the branch from `git ls-remote --symref <url> HEAD` output
/// (`ref: refs/heads/main\tHEAD`).
pub fn parse_symref(output: &str) -> Option<String> {
    output.lines().find_map(|line| {
        let target = line.strip_prefix("ref:")?.split_whitespace().next()?;
        target.strip_prefix("refs/heads/").map(str::to_string)
    })
}
