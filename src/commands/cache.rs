use crate::core::{
    cache::{is_fresh, CacheStore},
    config::DEFAULT_CACHE_TTL_DAYS,
    dirs,
    error::{Result, SweeperError},
    report::{print_section_header, print_success},
    state::{CacheEntry, CacheResult},
};
use chrono::{DateTime, Utc};
use clap::{Args, Subcommand};
use colored::*;
use std::path::PathBuf;

#[derive(Args, Debug, Clone)]
pub struct CacheArgs {
    /// Cache file [default: <cache dir>/lint-sweeper/cache.json]
    #[arg(long, env = "LINT_SWEEPER_CACHE_FILE", global = true)]
    pub cache_file: Option<PathBuf>,

    #[command(subcommand)]
    pub action: CacheAction,
}

#[derive(Subcommand, Debug, Clone)]
pub enum CacheAction {
    /// Entry count and per-result totals
    Stats,
    /// Print the entry for one repository
    Show {
        /// Repository as owner/name
        repository: String,
    },
    /// Delete the cache file
    Clear,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct CacheTotals {
    pub entries: usize,
    pub success: usize,
    pub issues_found: usize,
    pub error: usize,
    /// Entries past their TTL; they will be reprocessed on the next run.
    pub expired: usize,
}

pub fn cache_totals(store: &CacheStore, now: DateTime<Utc>) -> CacheTotals {
    let mut totals = CacheTotals::default();
    for entry in store.entries().values() {
        totals.entries += 1;
        match entry.result {
            CacheResult::Success => totals.success += 1,
            CacheResult::IssuesFound => totals.issues_found += 1,
            CacheResult::Error => totals.error += 1,
        }
        if !is_fresh(Some(entry), &entry.sha, entry_ttl(store, entry), now) {
            totals.expired += 1;
        }
    }
    totals
}

fn entry_ttl(store: &CacheStore, entry: &CacheEntry) -> i64 {
    if entry.ttl_days > 0 {
        entry.ttl_days
    } else {
        store.ttl_days()
    }
}

fn format_timestamp(seconds: i64) -> String {
    DateTime::from_timestamp(seconds, 0)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| seconds.to_string())
}

pub fn execute_cache(args: CacheArgs) -> Result<()> {
    let path = match args.cache_file {
        Some(path) => path,
        None => dirs::default_cache_file()?,
    };
    let store = CacheStore::open(&path, DEFAULT_CACHE_TTL_DAYS);

    match args.action {
        CacheAction::Stats => {
            let totals = cache_totals(&store, Utc::now());
            print_section_header(&format!("Cache {}", path.display()));
            println!("  {:<14} {}", "entries", totals.entries.to_string().white());
            println!("  {:<14} {}", "success", totals.success.to_string().green());
            println!("  {:<14} {}", "issues found", totals.issues_found.to_string().blue());
            println!("  {:<14} {}", "error", totals.error.to_string().red());
            println!("  {:<14} {}", "expired", totals.expired.to_string().yellow());
            println!();
        }
        CacheAction::Show { repository } => {
            let entry = store
                .lookup(repository.trim())
                .ok_or_else(|| SweeperError::CacheEntryNotFound {
                    key: repository.clone(),
                })?;
            print_section_header(&repository);
            println!("  {:<12} {}", "sha", entry.sha);
            println!("  {:<12} {:?}", "result", entry.result);
            println!("  {:<12} {}", "checked", format_timestamp(entry.timestamp));
            if entry.first_seen > 0 {
                println!("  {:<12} {}", "first seen", format_timestamp(entry.first_seen));
            }
            println!();
        }
        CacheAction::Clear => {
            store.clear()?;
            print_success(&format!("Cleared {}", path.display()));
            println!();
        }
    }
    Ok(())
}
