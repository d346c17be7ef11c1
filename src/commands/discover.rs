use crate::commands::{AuthArgs, TargetArgs};
use crate::core::{
    context::RepositoryRef,
    credentials::Credentials,
    error::{Result, SweeperError},
    github::{CodeHost, GitHubClient},
    report::print_section_header,
};
use clap::Args;
use colored::*;

#[derive(Args, Debug, Clone)]
pub struct DiscoverArgs {
    #[command(flatten)]
    pub auth: AuthArgs,

    #[command(flatten)]
    pub target: TargetArgs,

    /// Print the repositories as JSON
    #[arg(long)]
    pub json: bool,
}

/// Explicit `--repo` values win; otherwise search `org` for `topic`.
pub fn resolve_repositories(host: &dyn CodeHost, target: &TargetArgs) -> Result<Vec<RepositoryRef>> {
    if !target.repos.is_empty() {
        return target
            .repos
            .iter()
            .map(|input| RepositoryRef::parse(input, &target.git_host))
            .collect();
    }

    let (Some(org), Some(topic)) = (target.org.as_deref(), target.topic.as_deref()) else {
        return Err(SweeperError::config_error(
            "--org and --topic are required unless --repo is given",
        ));
    };

    let repos = host.search_repositories(org, topic)?;
    if repos.is_empty() {
        return Err(SweeperError::no_repositories_found(org, topic));
    }
    log::info!("discovered {} repositories in {org} with topic {topic}", repos.len());
    Ok(repos)
}

pub fn execute_discover(args: DiscoverArgs) -> Result<()> {
    let credentials = Credentials::resolve(&args.auth.inputs())?;
    let host = GitHubClient::new(&args.target.api_url, &credentials)?;
    let repos = resolve_repositories(&host, &args.target)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&repos)?);
        return Ok(());
    }

    print_section_header(&format!("Repositories ({})", repos.len()));
    for repo in &repos {
        println!(
            "  {:<40} {}",
            repo.full_name().white(),
            repo.default_branch.as_deref().unwrap_or("-").bright_black()
        );
    }
    println!();
    Ok(())
}
