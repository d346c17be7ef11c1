//! Records produced and persisted while processing repositories.
//!
//! # Public API
//! - [`CacheEntry`] / [`CacheResult`]: what the cache remembers per repository
//! - [`ProcessingOutcome`] / [`OutcomeStatus`]: what one repository's processing returned
//! - [`ArtifactRef`] / [`ArtifactKind`]: a created (or already open) pull request or issue

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheResult {
    Success,
    IssuesFound,
    Error,
}

/// Persisted state of one repository, keyed by `owner/name` in the cache file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub sha: String,
    /// Unix seconds of the last processing attempt.
    pub timestamp: i64,
    pub result: CacheResult,
    #[serde(default)]
    pub ttl_days: i64,
    /// Unix seconds of the first time this repository was recorded.
    #[serde(default)]
    pub first_seen: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    PullRequest,
    Issue,
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PullRequest => write!(f, "pull request"),
            Self::Issue => write!(f, "issue"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactRef {
    pub kind: ArtifactKind,
    pub number: u64,
    pub url: String,
    /// False when an already-open artifact was reused instead of creating one.
    pub created: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    /// Cache hit: same SHA within TTL, nothing was run.
    Skipped,
    NoIssues,
    AutoFixedPrCreated,
    ManualIssueCreated,
    Error,
}

impl OutcomeStatus {
    /// The value recorded in the cache for this status, if any.
    pub fn cache_result(self) -> Option<CacheResult> {
        match self {
            Self::Skipped => None,
            Self::NoIssues => Some(CacheResult::Success),
            Self::AutoFixedPrCreated | Self::ManualIssueCreated => Some(CacheResult::IssuesFound),
            Self::Error => Some(CacheResult::Error),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Skipped => "skipped",
            Self::NoIssues => "no issues",
            Self::AutoFixedPrCreated => "pull request",
            Self::ManualIssueCreated => "issue",
            Self::Error => "error",
        }
    }
}

/// The result of processing one repository. Built once, never mutated by the coordinator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingOutcome {
    pub repository: String,
    pub status: OutcomeStatus,
    pub auto_correctable: usize,
    pub manual_only: usize,
    #[serde(with = "duration_millis")]
    pub elapsed: Duration,
    pub error: Option<String>,
    pub artifacts: Vec<ArtifactRef>,
    /// True when at least one pull request or issue creation attempt failed.
    pub artifact_failed: bool,
}

impl ProcessingOutcome {
    pub fn is_failure(&self) -> bool {
        self.status == OutcomeStatus::Error || self.artifact_failed
    }
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(deserializer)?))
    }
}
