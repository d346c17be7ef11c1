//! Terminal and JSON reporting for a sweep run.
//!
//! # Design Principles
//! - **Consistent color scheme**: red for errors, green for success, yellow for skipped
//! - **Standardized spacing**: newline before every section
//! - **Machine-readable twin**: everything printed is also available via [`RunSummary::write_json`]

use crate::core::cache::CacheStats;
use crate::core::error::Result;
use crate::core::state::{ArtifactKind, ArtifactRef, OutcomeStatus, ProcessingOutcome};
use colored::*;
use serde::Serialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Formats and prints an error message with consistent styling
///
/// # Format
/// ```text
///
/// ✕ Error: <message>
///
/// ```
pub fn print_error(message: &str) {
    eprintln!("\n{} {}\n", "✕ Error:".red(), message.white());
}

/// Formats and prints a success message with consistent styling
pub fn print_success(message: &str) {
    println!("\n{} {}", "✓".green(), message.white());
}

pub fn print_info(message: &str) {
    println!("\n{}\n", message.white());
}

/// Formats and prints a section header
///
/// # Format
/// ```text
///
/// <header>:
///
/// ```
pub fn print_section_header(header: &str) {
    println!("\n{}:\n", header.white());
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct OutcomeCounts {
    pub processed: usize,
    pub skipped: usize,
    pub no_issues: usize,
    pub pull_requests: usize,
    pub issues: usize,
    pub errors: usize,
}

/// Everything a run produced, in completion order.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub outcomes: Vec<ProcessingOutcome>,
    pub cache: CacheStats,
    #[serde(rename = "elapsed_ms", serialize_with = "serialize_millis")]
    pub elapsed: Duration,
    pub counts: OutcomeCounts,
}

fn serialize_millis<S: serde::Serializer>(
    value: &Duration,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_u64(value.as_millis() as u64)
}

impl RunSummary {
    pub fn new(outcomes: Vec<ProcessingOutcome>, cache: CacheStats, elapsed: Duration) -> Self {
        let counts = count_outcomes(&outcomes);
        Self {
            outcomes,
            cache,
            elapsed,
            counts,
        }
    }

    pub fn artifacts(&self, kind: ArtifactKind) -> Vec<(&str, &ArtifactRef)> {
        self.outcomes
            .iter()
            .flat_map(|o| {
                o.artifacts
                    .iter()
                    .filter(move |a| a.kind == kind)
                    .map(move |a| (o.repository.as_str(), a))
            })
            .collect()
    }

    pub fn failures(&self) -> impl Iterator<Item = &ProcessingOutcome> {
        self.outcomes.iter().filter(|o| o.is_failure())
    }

    /// 0 iff no repository ended in error and no artifact attempt failed.
    pub fn exit_code(&self) -> i32 {
        if self.failures().next().is_some() {
            1
        } else {
            0
        }
    }

    pub fn print(&self) {
        print_section_header("Repositories");
        for outcome in &self.outcomes {
            println!(
                "  {} {:<40} {}",
                status_marker(outcome.status),
                outcome.repository,
                detail(outcome).bright_black()
            );
        }

        for (title, kind) in [
            ("Pull requests", ArtifactKind::PullRequest),
            ("Issues", ArtifactKind::Issue),
        ] {
            let artifacts = self.artifacts(kind);
            if artifacts.is_empty() {
                continue;
            }
            print_section_header(title);
            for (repository, artifact) in artifacts {
                let note = if artifact.created { "" } else { " (already open)" };
                println!(
                    "  {} #{} {}{}",
                    repository,
                    artifact.number,
                    artifact.url.blue(),
                    note.bright_black()
                );
            }
        }

        let failures: Vec<_> = self.failures().collect();
        if !failures.is_empty() {
            print_section_header("Errors");
            for outcome in failures {
                println!(
                    "  {} {}: {}",
                    "✕".red(),
                    outcome.repository,
                    outcome.error.as_deref().unwrap_or("unknown error")
                );
            }
        }

        let c = &self.counts;
        let line = format!(
            "{} processed, {} skipped, {} clean, {} pull requests, {} issues, {} errors in {:.1}s (cache: {} hits, {} misses)",
            c.processed,
            c.skipped,
            c.no_issues,
            c.pull_requests,
            c.issues,
            c.errors,
            self.elapsed.as_secs_f64(),
            self.cache.hits,
            self.cache.misses
        );
        if self.exit_code() == 0 {
            print_success(&line);
        } else {
            println!("\n{} {}", "✕".red(), line.white());
        }
        println!();
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

fn count_outcomes(outcomes: &[ProcessingOutcome]) -> OutcomeCounts {
    let mut counts = OutcomeCounts {
        processed: outcomes.len(),
        ..Default::default()
    };
    for outcome in outcomes {
        match outcome.status {
            OutcomeStatus::Skipped => counts.skipped += 1,
            OutcomeStatus::NoIssues => counts.no_issues += 1,
            OutcomeStatus::AutoFixedPrCreated | OutcomeStatus::ManualIssueCreated => {}
            OutcomeStatus::Error => counts.errors += 1,
        }
        for artifact in &outcome.artifacts {
            match artifact.kind {
                ArtifactKind::PullRequest => counts.pull_requests += 1,
                ArtifactKind::Issue => counts.issues += 1,
            }
        }
    }
    counts
}

fn status_marker(status: OutcomeStatus) -> ColoredString {
    match status {
        OutcomeStatus::Skipped => "○".yellow(),
        OutcomeStatus::NoIssues => "✓".green(),
        OutcomeStatus::AutoFixedPrCreated | OutcomeStatus::ManualIssueCreated => "●".blue(),
        OutcomeStatus::Error => "✕".red(),
    }
}

fn detail(outcome: &ProcessingOutcome) -> String {
    match outcome.status {
        OutcomeStatus::Skipped => "cache hit".to_string(),
        OutcomeStatus::NoIssues if outcome.manual_only + outcome.auto_correctable == 0 => {
            "no offenses".to_string()
        }
        _ => format!(
            "{} ({} auto, {} manual, {}ms)",
            outcome.status.label(),
            outcome.auto_correctable,
            outcome.manual_only,
            outcome.elapsed.as_millis()
        ),
    }
}
