use clap::{Parser, Subcommand};
use lint_sweeper::commands::*;
use lint_sweeper::core::{error::SweeperError, print_error};
use std::process;

#[derive(Parser)]
#[command(name = "lint-sweeper")]
#[command(about = "Run a linter with auto-correction across many repositories")]
#[command(version)]
struct Cli {
    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Lint, auto-correct and open pull requests or issues for every repository
    Run(RunArgs),
    /// List the repositories a run would process
    Discover(DiscoverArgs),
    /// Inspect or clear the repository cache
    Cache(CacheArgs),
}

/// Exit code for errors that stop the run before any repository is processed.
const SETUP_FAILURE: i32 = 2;

fn report(e: SweeperError) -> i32 {
    print_error(&e.to_string());
    if e.is_setup_error() {
        SETUP_FAILURE
    } else {
        1
    }
}

fn main() {
    let cli = Cli::parse();

    // RUST_LOG still overrides the flag.
    let default_filter = if cli.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp_millis()
        .init();

    let code = match cli.command {
        Commands::Run(args) => execute_run(args).unwrap_or_else(report),
        Commands::Discover(args) => execute_discover(args).map(|()| 0).unwrap_or_else(report),
        Commands::Cache(args) => execute_cache(args).map(|()| 0).unwrap_or_else(report),
    };

    process::exit(code);
}
