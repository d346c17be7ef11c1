pub mod cache;
pub mod discover;
pub mod run;

pub use cache::*;
pub use discover::*;
pub use run::*;

use crate::core::config::{DEFAULT_API_URL, DEFAULT_GIT_HOST};
use crate::core::credentials::CredentialInputs;
use clap::Args;

/// Credential flags shared by every subcommand that talks to GitHub.
#[derive(Args, Debug, Clone, Default)]
pub struct AuthArgs {
    /// Personal access token
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// GitHub App id
    #[arg(long, env = "GITHUB_APP_ID")]
    pub app_id: Option<String>,

    /// GitHub App installation id
    #[arg(long, env = "GITHUB_INSTALLATION_ID")]
    pub installation_id: Option<String>,

    /// GitHub App private key (PEM text or path to a PEM file)
    #[arg(long, env = "GITHUB_PRIVATE_KEY", hide_env_values = true)]
    pub private_key: Option<String>,
}

impl AuthArgs {
    pub fn inputs(&self) -> CredentialInputs {
        CredentialInputs {
            token: self.token.clone(),
            app_id: self.app_id.clone(),
            installation_id: self.installation_id.clone(),
            private_key: self.private_key.clone(),
        }
    }
}

/// Which repositories to work on.
#[derive(Args, Debug, Clone)]
pub struct TargetArgs {
    /// Organization to search
    #[arg(long, env = "LINT_SWEEPER_ORG")]
    pub org: Option<String>,

    /// Topic the repositories must carry
    #[arg(long, env = "LINT_SWEEPER_TOPIC")]
    pub topic: Option<String>,

    /// Explicit repository (owner/name); repeatable, skips the search
    #[arg(long = "repo", value_name = "OWNER/NAME")]
    pub repos: Vec<String>,

    /// GitHub API base URL
    #[arg(long, env = "LINT_SWEEPER_API_URL", default_value = DEFAULT_API_URL)]
    pub api_url: String,

    /// Host used to build clone URLs
    #[arg(long, env = "LINT_SWEEPER_GIT_HOST", default_value = DEFAULT_GIT_HOST)]
    pub git_host: String,
}
