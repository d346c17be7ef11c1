//! A processor wired to the real git adapter, a fake host and a fake linter

#![allow(dead_code)]

use super::fakes::{FakeHost, FakeLinter};
use lint_sweeper::core::{
    CacheStore, Config, ContextFactory, Credentials, GitCli, Linter, ProcessingOutcome,
    RepositoryHandler, RepositoryProcessor, RepositoryRef, StructuredLogger,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

pub struct Harness {
    pub temp_dir: TempDir,
    pub config: Arc<Config>,
    pub cache: Arc<CacheStore>,
    pub host: Arc<FakeHost>,
    pub linter: Arc<dyn Linter>,
    processor: RepositoryProcessor,
    contexts: ContextFactory,
}

pub fn test_config(root: &std::path::Path) -> Config {
    let mut config = Config::with_paths(root.join("cache.json"), root.join("workspaces"));
    config.git_timeout = Duration::from_secs(60);
    config.lint_timeout = Duration::from_secs(60);
    config.committer_name = "Sweeper Bot".to_string();
    config.committer_email = "bot@example.com".to_string();
    config
}

impl Harness {
    pub fn new(host: FakeHost, linter: Arc<dyn Linter>) -> anyhow::Result<Self> {
        Self::with_config(host, linter, |_| {})
    }

    pub fn with_config(
        host: FakeHost,
        linter: Arc<dyn Linter>,
        adjust: impl FnOnce(&mut Config),
    ) -> anyhow::Result<Self> {
        let temp_dir = TempDir::new()?;
        let mut config = test_config(temp_dir.path());
        adjust(&mut config);
        let config = Arc::new(config.validate()?);

        let cache = Arc::new(CacheStore::open(&config.cache_file, config.cache_ttl_days));
        let host = Arc::new(host);
        let git = Arc::new(GitCli::new(
            config.git_timeout,
            config.committer_name.clone(),
            config.committer_email.clone(),
        ));
        let processor = RepositoryProcessor::new(
            Arc::clone(&config),
            Arc::clone(&cache),
            git,
            Arc::clone(&linter),
            host.clone(),
        );
        let contexts = ContextFactory::new(
            &config.workspace_root,
            Arc::new(Credentials::Token("test-token".to_string())),
            Arc::new(StructuredLogger),
        );

        Ok(Self {
            temp_dir,
            config,
            cache,
            host,
            linter,
            processor,
            contexts,
        })
    }

    pub fn process(&self, repo: RepositoryRef) -> ProcessingOutcome {
        self.processor.process(self.contexts.create(repo))
    }

    pub fn work_dir(&self, repo: &RepositoryRef) -> PathBuf {
        self.config.workspace_root.join(&repo.owner).join(&repo.name)
    }

    /// A fresh store over the same file, as the next run would see it.
    pub fn reload_cache(&self) -> CacheStore {
        CacheStore::open(&self.config.cache_file, self.config.cache_ttl_days)
    }
}
