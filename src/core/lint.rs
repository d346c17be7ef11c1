//! Linter execution and report parsing.
//!
//! The linter is an external subprocess. [`LintEngine::check`] runs it in
//! read-only JSON mode and normalizes the report into a [`LintResult`];
//! [`LintEngine::autocorrect`] runs it in mutating mode and then asks git
//! whether the working tree actually changed.
//!
//! # Exit code conventions
//! - `0`: no offenses. Malformed output is logged and treated as empty.
//! - non-zero with a parsable report (stdout first, then stderr): offenses found.
//! - non-zero without a parsable report: [`SweeperError::LintOutputUnparsable`].
//!
//! Every offense is either auto-correctable or manual-only. An offense whose
//! report lacks the `correctable` flag is counted as manual-only.

use crate::core::error::{Result, SweeperError};
use crate::core::git::GitRepo;
use crate::core::process::run_with_timeout;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

const CHECK_ARGS: [&str; 3] = ["--display-cop-names", "--format", "json"];
const AUTOCORRECT_ARGS: [&str; 1] = ["--autocorrect-all"];
/// Exit codes above this mean the linter itself failed (bad config, crash).
const MAX_OFFENSE_EXIT_CODE: i32 = 1;
const RAW_OUTPUT_LOG_LIMIT: usize = 2000;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    #[serde(default)]
    pub line: u32,
    #[serde(default)]
    pub column: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Offense {
    pub rule: String,
    pub severity: String,
    pub message: String,
    pub location: Location,
    pub auto_correctable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileOffenses {
    pub path: PathBuf,
    pub offenses: Vec<Offense>,
}

/// Normalized output of one linter invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LintResult {
    pub files: Vec<FileOffenses>,
    pub inspected_file_count: usize,
}

impl LintResult {
    pub fn total_count(&self) -> usize {
        self.files.iter().map(|f| f.offenses.len()).sum()
    }

    pub fn auto_correctable_count(&self) -> usize {
        self.offenses().filter(|(_, o)| o.auto_correctable).count()
    }

    pub fn manual_only_count(&self) -> usize {
        self.offenses().filter(|(_, o)| !o.auto_correctable).count()
    }

    pub fn is_clean(&self) -> bool {
        self.total_count() == 0
    }

    /// Every offense paired with the file it was reported in.
    pub fn offenses(&self) -> impl Iterator<Item = (&Path, &Offense)> {
        self.files
            .iter()
            .flat_map(|f| f.offenses.iter().map(move |o| (f.path.as_path(), o)))
    }

    pub fn manual_offenses(&self) -> impl Iterator<Item = (&Path, &Offense)> {
        self.offenses().filter(|(_, o)| !o.auto_correctable)
    }

    pub fn auto_correctable_offenses(&self) -> impl Iterator<Item = (&Path, &Offense)> {
        self.offenses().filter(|(_, o)| o.auto_correctable)
    }
}

// Wire format of the linter's JSON report.
#[derive(Deserialize)]
struct RawReport {
    files: Vec<RawFile>,
    #[serde(default)]
    summary: Option<RawSummary>,
}

#[derive(Deserialize)]
struct RawFile {
    path: PathBuf,
    #[serde(default)]
    offenses: Vec<RawOffense>,
}

#[derive(Deserialize)]
struct RawOffense {
    cop_name: String,
    #[serde(default)]
    correctable: Option<bool>,
    #[serde(default = "default_severity")]
    severity: String,
    #[serde(default)]
    message: String,
    #[serde(default)]
    location: Location,
}

#[derive(Deserialize)]
struct RawSummary {
    #[serde(default)]
    offense_count: Option<usize>,
    #[serde(default)]
    inspected_file_count: Option<usize>,
}

fn default_severity() -> String {
    "convention".to_string()
}

/// Parse a JSON report. Files without offenses are dropped.
pub fn parse_report(raw: &str) -> std::result::Result<LintResult, serde_json::Error> {
    let report: RawReport = serde_json::from_str(raw)?;
    let reported_files = report.files.len();

    let files: Vec<FileOffenses> = report
        .files
        .into_iter()
        .filter(|f| !f.offenses.is_empty())
        .map(|f| FileOffenses {
            path: f.path,
            offenses: f
                .offenses
                .into_iter()
                .map(|o| Offense {
                    rule: o.cop_name,
                    severity: o.severity,
                    message: o.message,
                    location: o.location,
                    auto_correctable: o.correctable.unwrap_or(false),
                })
                .collect(),
        })
        .collect();

    let mut result = LintResult {
        files,
        inspected_file_count: reported_files,
    };

    if let Some(summary) = report.summary {
        if let Some(inspected) = summary.inspected_file_count {
            result.inspected_file_count = inspected;
        }
        if let Some(expected) = summary.offense_count {
            if expected != result.total_count() {
                log::warn!(
                    "linter summary reports {expected} offenses but {} were listed",
                    result.total_count()
                );
            }
        }
    }

    Ok(result)
}

pub trait Linter: Send + Sync {
    /// Run the linter without modifying files.
    fn check(&self, repo_dir: &Path) -> Result<LintResult>;

    /// Run the linter in auto-correct mode; true when the working tree changed.
    fn autocorrect(&self, repo_dir: &Path) -> Result<bool>;
}

pub struct LintEngine {
    command: Vec<String>,
    timeout: Duration,
}

impl LintEngine {
    pub fn new(command: Vec<String>, timeout: Duration) -> Self {
        Self { command, timeout }
    }

    fn program(&self) -> &str {
        self.command.first().map(String::as_str).unwrap_or("linter")
    }

    fn build_command(&self, repo_dir: &Path, extra: &[&str]) -> Command {
        let mut cmd = Command::new(self.program());
        cmd.args(self.command.iter().skip(1))
            .args(extra)
            .current_dir(repo_dir);
        cmd
    }
}

impl Linter for LintEngine {
    fn check(&self, repo_dir: &Path) -> Result<LintResult> {
        let output = run_with_timeout(self.build_command(repo_dir, &CHECK_ARGS), self.timeout)?;

        if output.success() {
            return Ok(match parse_report(&output.stdout) {
                Ok(result) => result,
                Err(e) => {
                    log::error!(
                        "malformed linter report in {}: {e}; raw output: {}",
                        repo_dir.display(),
                        truncate(&output.stdout, RAW_OUTPUT_LOG_LIMIT)
                    );
                    LintResult::default()
                }
            });
        }

        for channel in [&output.stdout, &output.stderr] {
            if let Ok(result) = parse_report(channel) {
                return Ok(result);
            }
        }

        let raw = format!("{}{}", output.stdout, output.stderr);
        log::error!(
            "linter exited with {} in {}; raw output: {}",
            output.exit_code(),
            repo_dir.display(),
            truncate(&raw, RAW_OUTPUT_LOG_LIMIT)
        );
        Err(SweeperError::LintOutputUnparsable {
            exit_code: output.exit_code(),
            output: truncate(&raw, RAW_OUTPUT_LOG_LIMIT).to_string(),
        })
    }

    fn autocorrect(&self, repo_dir: &Path) -> Result<bool> {
        let output = run_with_timeout(
            self.build_command(repo_dir, &AUTOCORRECT_ARGS),
            self.timeout,
        )?;

        let code = output.exit_code();
        if !(0..=MAX_OFFENSE_EXIT_CODE).contains(&code) {
            return Err(SweeperError::command_failed(
                self.program(),
                format!(
                    "autocorrect exited with {code}: {}",
                    truncate(output.stderr.trim(), RAW_OUTPUT_LOG_LIMIT)
                ),
            ));
        }

        GitRepo::open(repo_dir)?.has_working_tree_changes()
    }
}

/// Cut `text` to at most `limit` bytes on a char boundary.
fn truncate(text: &str, limit: usize) -> &str {
    if text.len() <= limit {
        return text;
    }
    let mut end = limit;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}
