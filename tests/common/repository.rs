//! Seed repositories acting as remotes
//!
//! A seed is a bare repository with one commit on `main`, built from a scratch
//! working copy. Processing clones it over `file://` and force-pushes the fix
//! branch back into it, so tests can inspect what a run pushed.

#![allow(dead_code)]

use anyhow::{bail, Context};
use lint_sweeper::core::RepositoryRef;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

pub struct SeedRepo {
    pub temp_dir: TempDir,
    pub bare: PathBuf,
    pub owner: String,
    pub name: String,
}

impl SeedRepo {
    pub fn url(&self) -> String {
        format!("file://{}", self.bare.display())
    }

    /// Reference the processor can clone; the default branch is left for git to resolve.
    pub fn reference(&self) -> RepositoryRef {
        RepositoryRef {
            owner: self.owner.clone(),
            name: self.name.clone(),
            clone_url: self.url(),
            default_branch: None,
        }
    }

    pub fn branch_sha(&self, branch: &str) -> Option<String> {
        let output = Command::new("git")
            .args(["rev-parse", "--verify", "--quiet", &format!("refs/heads/{branch}")])
            .current_dir(&self.bare)
            .output()
            .ok()?;
        output
            .status
            .success()
            .then(|| String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    /// Contents of `path` at the tip of `branch`.
    pub fn file_at(&self, branch: &str, path: &str) -> anyhow::Result<String> {
        let output = Command::new("git")
            .args(["show", &format!("{branch}:{path}")])
            .current_dir(&self.bare)
            .output()?;
        if !output.status.success() {
            bail!("git show failed: {}", String::from_utf8_lossy(&output.stderr));
        }
        Ok(String::from_utf8(output.stdout)?)
    }

    /// Commit a change to `main` through a throwaway working copy.
    pub fn push_commit(&self, path: &str, content: &str, message: &str) -> anyhow::Result<()> {
        let scratch = TempDir::new()?;
        git(scratch.path(), &["clone", &self.url(), "."])?;
        write_file(scratch.path(), path, content)?;
        git(scratch.path(), &["add", "-A"])?;
        git(scratch.path(), &["commit", "-m", message])?;
        git(scratch.path(), &["push", "origin", "main"])?;
        Ok(())
    }
}

/// Run git with a fixed identity, failing on a non-zero exit.
pub fn git(dir: &Path, args: &[&str]) -> anyhow::Result<String> {
    let output = Command::new("git")
        .args(["-c", "user.name=Test User", "-c", "user.email=test@example.com"])
        .args(args)
        .current_dir(dir)
        .output()
        .with_context(|| format!("spawning git {args:?}"))?;
    if !output.status.success() {
        bail!(
            "git {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

pub fn write_file(root: &Path, relative: &str, content: &str) -> anyhow::Result<()> {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, content)?;
    Ok(())
}

/// Create a bare seed repository named `owner/name` holding `files` on `main`.
pub fn seed_repo(owner: &str, name: &str, files: &[(&str, &str)]) -> anyhow::Result<SeedRepo> {
    let temp_dir = TempDir::new()?;
    let work = temp_dir.path().join("work");
    fs::create_dir_all(&work)?;

    git(&work, &["init", "--initial-branch=main"])?;
    for (path, content) in files {
        write_file(&work, path, content)?;
    }
    git(&work, &["add", "-A"])?;
    git(&work, &["commit", "-m", "Initial commit"])?;

    let bare = temp_dir.path().join(format!("{name}.git"));
    git(
        temp_dir.path(),
        &["clone", "--bare", &work.to_string_lossy(), &bare.to_string_lossy()],
    )?;

    Ok(SeedRepo {
        temp_dir,
        bare,
        owner: owner.to_string(),
        name: name.to_string(),
    })
}

/// A seed with a single Ruby file.
pub fn ruby_seed(name: &str) -> anyhow::Result<SeedRepo> {
    seed_repo("acme", name, &[("app.rb", "puts \"hello\"\n")])
}
