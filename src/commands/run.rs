use crate::commands::{resolve_repositories, AuthArgs, TargetArgs};
use crate::core::{
    cache::CacheStore,
    config::{self, split_command, Config},
    context::{ContextFactory, RepositoryRef},
    coordinator::Coordinator,
    credentials::Credentials,
    dirs,
    error::{Result, SweeperError},
    git::{GitCli, VersionControl},
    github::{CodeHost, GitHubClient},
    lint::{LintEngine, Linter},
    logger::{Logger, StructuredLogger},
    processor::RepositoryProcessor,
    report::{print_info, RunSummary},
};
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    #[command(flatten)]
    pub auth: AuthArgs,

    #[command(flatten)]
    pub target: TargetArgs,

    /// Maximum number of repositories processed in parallel
    #[arg(long, env = "LINT_SWEEPER_THREADS", default_value_t = config::DEFAULT_THREADS)]
    pub threads: usize,

    /// Cache file [default: <cache dir>/lint-sweeper/cache.json]
    #[arg(long, env = "LINT_SWEEPER_CACHE_FILE")]
    pub cache_file: Option<PathBuf>,

    /// Days a cache entry for an unchanged repository stays valid
    #[arg(long, env = "LINT_SWEEPER_CACHE_TTL_DAYS", default_value_t = config::DEFAULT_CACHE_TTL_DAYS)]
    pub cache_ttl_days: i64,

    /// Directory holding one working copy per repository [default: <cache dir>/lint-sweeper/workspaces]
    #[arg(long, env = "LINT_SWEEPER_WORKSPACE")]
    pub workspace: Option<PathBuf>,

    /// Linter command, split on whitespace (e.g. "bundle exec rubocop")
    #[arg(long, env = "LINT_SWEEPER_LINT_COMMAND", default_value = config::DEFAULT_LINT_COMMAND)]
    pub lint_command: String,

    /// Seconds before a linter run is killed
    #[arg(long, env = "LINT_SWEEPER_LINT_TIMEOUT", default_value_t = config::DEFAULT_LINT_TIMEOUT_SECS)]
    pub lint_timeout: u64,

    /// Seconds before a git command is killed
    #[arg(long, env = "LINT_SWEEPER_GIT_TIMEOUT", default_value_t = config::DEFAULT_GIT_TIMEOUT_SECS)]
    pub git_timeout: u64,

    /// Branch the auto-corrections are pushed to
    #[arg(long, env = "LINT_SWEEPER_BRANCH", default_value = config::DEFAULT_FIX_BRANCH)]
    pub branch: String,

    #[arg(long, env = "LINT_SWEEPER_COMMIT_MESSAGE", default_value = config::DEFAULT_COMMIT_MESSAGE)]
    pub commit_message: String,

    #[arg(long, env = "LINT_SWEEPER_PR_TITLE", default_value = config::DEFAULT_PR_TITLE)]
    pub pr_title: String,

    #[arg(long, env = "LINT_SWEEPER_ISSUE_TITLE", default_value = config::DEFAULT_ISSUE_TITLE)]
    pub issue_title: String,

    /// Label attached to created pull requests and issues; repeatable
    #[arg(long = "label", env = "LINT_SWEEPER_LABELS", value_delimiter = ',', default_value = config::DEFAULT_LABEL)]
    pub labels: Vec<String>,

    #[arg(long, env = "LINT_SWEEPER_COMMITTER_NAME")]
    pub committer_name: Option<String>,

    #[arg(long, env = "LINT_SWEEPER_COMMITTER_EMAIL")]
    pub committer_email: Option<String>,

    /// Write the run summary as JSON to this path
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// Remove each working copy after it has been processed
    #[arg(long)]
    pub clean: bool,
}

impl RunArgs {
    pub fn to_config(&self) -> Result<Config> {
        let cache_file = match &self.cache_file {
            Some(path) => path.clone(),
            None => dirs::default_cache_file()?,
        };
        let workspace_root = match &self.workspace {
            Some(path) => path.clone(),
            None => dirs::default_workspace_root()?,
        };

        let mut config = Config::with_paths(cache_file, workspace_root);
        config.org = self.target.org.clone();
        config.topic = self.target.topic.clone();
        config.threads = self.threads;
        config.cache_ttl_days = self.cache_ttl_days;
        config.lint_command = split_command(&self.lint_command);
        config.lint_timeout = Duration::from_secs(self.lint_timeout);
        config.git_timeout = Duration::from_secs(self.git_timeout);
        config.fix_branch = self.branch.clone();
        config.commit_message = self.commit_message.clone();
        config.pr_title = self.pr_title.clone();
        config.issue_title = self.issue_title.clone();
        config.labels = self
            .labels
            .iter()
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty())
            .collect();
        if let Some(name) = &self.committer_name {
            config.committer_name = name.clone();
        }
        if let Some(email) = &self.committer_email {
            config.committer_email = email.clone();
        }
        config.api_url = self.target.api_url.clone();
        config.git_host = self.target.git_host.clone();
        config.clean_workspaces = self.clean;
        config.validate()
    }
}

/// Process `repositories` with the production git adapter and linter.
pub fn sweep(
    config: Arc<Config>,
    credentials: Credentials,
    host: Arc<dyn CodeHost>,
    repositories: Vec<RepositoryRef>,
) -> Result<RunSummary> {
    let git: Arc<dyn VersionControl> = Arc::new(GitCli::new(
        config.git_timeout,
        config.committer_name.clone(),
        config.committer_email.clone(),
    ));
    let linter: Arc<dyn Linter> = Arc::new(LintEngine::new(
        config.lint_command.clone(),
        config.lint_timeout,
    ));
    sweep_with(config, credentials, host, git, linter, repositories)
}

/// Process `repositories` with injected components.
pub fn sweep_with(
    config: Arc<Config>,
    credentials: Credentials,
    host: Arc<dyn CodeHost>,
    git: Arc<dyn VersionControl>,
    linter: Arc<dyn Linter>,
    repositories: Vec<RepositoryRef>,
) -> Result<RunSummary> {
    let started = Instant::now();
    let cache = Arc::new(CacheStore::open(&config.cache_file, config.cache_ttl_days));
    let logger: Arc<dyn Logger> = Arc::new(StructuredLogger);

    let processor = RepositoryProcessor::new(
        Arc::clone(&config),
        Arc::clone(&cache),
        git,
        linter,
        host,
    );
    let contexts = ContextFactory::new(&config.workspace_root, Arc::new(credentials), logger);
    let coordinator = Coordinator::new(Arc::new(processor), contexts, config.threads);

    let outcomes = coordinator.run(repositories)?;
    Ok(RunSummary::new(outcomes, cache.stats(), started.elapsed()))
}

/// Run a full sweep. Returns the process exit code.
pub fn execute_run(args: RunArgs) -> Result<i32> {
    let config = Arc::new(args.to_config()?);
    let credentials = Credentials::resolve(&args.auth.inputs())?;
    log::debug!("using {} credentials", credentials.kind());

    let host: Arc<dyn CodeHost> = Arc::new(GitHubClient::new(&config.api_url, &credentials)?);
    host.git_token().map_err(|e| {
        SweeperError::invalid_credentials(format!("could not obtain an access token: {e}"))
    })?;

    let repositories = resolve_repositories(host.as_ref(), &args.target)?;
    print_info(&format!(
        "Sweeping {} repositories with {} workers",
        repositories.len(),
        config.threads.min(repositories.len()).max(1)
    ));

    let summary = sweep(config, credentials, host, repositories)?;
    summary.print();

    if let Some(path) = &args.report {
        summary.write_json(path)?;
        log::info!("wrote run report to {}", path.display());
    }

    Ok(summary.exit_code())
}
