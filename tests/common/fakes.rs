//! In-memory stand-ins for the code host and the linter
//!
//! Both fakes record what they were asked to do so tests can assert on calls
//! that must, or must not, have happened.

#![allow(dead_code)]

use lint_sweeper::core::{
    error::{Result, SweeperError},
    github::{CodeHost, NewPullRequest},
    lint::{parse_report, LintResult, Linter},
    ArtifactKind, ArtifactRef, GitRepo, RepositoryRef,
};
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostCall {
    Search { org: String, topic: String },
    FindPullRequest { repo: String, head: String },
    CreatePullRequest { repo: String, head: String, base: String, body: String },
    FindIssue { repo: String, title: String },
    CreateIssue { repo: String, title: String, body: String },
    AddLabels { repo: String, number: u64, labels: Vec<String> },
}

#[derive(Default)]
pub struct FakeHost {
    repositories: Vec<RepositoryRef>,
    fail_pull_requests: bool,
    fail_issues: bool,
    fail_labels: bool,
    calls: Mutex<Vec<HostCall>>,
    /// (repo, head branch) -> open pull request
    open_pulls: Mutex<Vec<(String, String, ArtifactRef)>>,
    /// (repo, title) -> open issue
    open_issues: Mutex<Vec<(String, String, ArtifactRef)>>,
    next_number: AtomicU64,
}

impl FakeHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_repositories(mut self, repositories: Vec<RepositoryRef>) -> Self {
        self.repositories = repositories;
        self
    }

    pub fn failing_pull_requests(mut self) -> Self {
        self.fail_pull_requests = true;
        self
    }

    pub fn failing_issues(mut self) -> Self {
        self.fail_issues = true;
        self
    }

    pub fn failing_labels(mut self) -> Self {
        self.fail_labels = true;
        self
    }

    pub fn with_open_pull_request(self, repo: &str, head: &str, number: u64) -> Self {
        self.open_pulls.lock().unwrap().push((
            repo.to_string(),
            head.to_string(),
            artifact(ArtifactKind::PullRequest, repo, number, false),
        ));
        self
    }

    pub fn with_open_issue(self, repo: &str, title: &str, number: u64) -> Self {
        self.open_issues.lock().unwrap().push((
            repo.to_string(),
            title.to_string(),
            artifact(ArtifactKind::Issue, repo, number, false),
        ));
        self
    }

    pub fn calls(&self) -> Vec<HostCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn created_pull_requests(&self) -> Vec<HostCall> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c, HostCall::CreatePullRequest { .. }))
            .collect()
    }

    pub fn created_issues(&self) -> Vec<HostCall> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c, HostCall::CreateIssue { .. }))
            .collect()
    }

    fn record(&self, call: HostCall) {
        self.calls.lock().unwrap().push(call);
    }

    fn number(&self) -> u64 {
        self.next_number.fetch_add(1, Ordering::SeqCst) + 100
    }
}

fn artifact(kind: ArtifactKind, repo: &str, number: u64, created: bool) -> ArtifactRef {
    let segment = match kind {
        ArtifactKind::PullRequest => "pull",
        ArtifactKind::Issue => "issues",
    };
    ArtifactRef {
        kind,
        number,
        url: format!("https://github.com/{repo}/{segment}/{number}"),
        created,
    }
}

impl CodeHost for FakeHost {
    fn search_repositories(&self, org: &str, topic: &str) -> Result<Vec<RepositoryRef>> {
        self.record(HostCall::Search {
            org: org.to_string(),
            topic: topic.to_string(),
        });
        Ok(self.repositories.clone())
    }

    fn find_open_pull_request(
        &self,
        owner: &str,
        repo: &str,
        head_branch: &str,
    ) -> Result<Option<ArtifactRef>> {
        let full = format!("{owner}/{repo}");
        self.record(HostCall::FindPullRequest {
            repo: full.clone(),
            head: head_branch.to_string(),
        });
        Ok(self
            .open_pulls
            .lock()
            .unwrap()
            .iter()
            .find(|(r, h, _)| *r == full && h == head_branch)
            .map(|(_, _, a)| ArtifactRef {
                created: false,
                ..a.clone()
            }))
    }

    fn create_pull_request(
        &self,
        owner: &str,
        repo: &str,
        pr: &NewPullRequest<'_>,
    ) -> Result<ArtifactRef> {
        let full = format!("{owner}/{repo}");
        self.record(HostCall::CreatePullRequest {
            repo: full.clone(),
            head: pr.head.to_string(),
            base: pr.base.to_string(),
            body: pr.body.to_string(),
        });
        if self.fail_pull_requests {
            return Err(SweeperError::api("create pull request", "HTTP 422: Validation Failed"));
        }
        let created = artifact(ArtifactKind::PullRequest, &full, self.number(), true);
        self.open_pulls
            .lock()
            .unwrap()
            .push((full, pr.head.to_string(), created.clone()));
        Ok(created)
    }

    fn find_open_issue(&self, owner: &str, repo: &str, title: &str) -> Result<Option<ArtifactRef>> {
        let full = format!("{owner}/{repo}");
        self.record(HostCall::FindIssue {
            repo: full.clone(),
            title: title.to_string(),
        });
        Ok(self
            .open_issues
            .lock()
            .unwrap()
            .iter()
            .find(|(r, t, _)| *r == full && t == title)
            .map(|(_, _, a)| ArtifactRef {
                created: false,
                ..a.clone()
            }))
    }

    fn create_issue(&self, owner: &str, repo: &str, title: &str, body: &str) -> Result<ArtifactRef> {
        let full = format!("{owner}/{repo}");
        self.record(HostCall::CreateIssue {
            repo: full.clone(),
            title: title.to_string(),
            body: body.to_string(),
        });
        if self.fail_issues {
            return Err(SweeperError::api("create issue", "HTTP 410: Issues are disabled"));
        }
        let created = artifact(ArtifactKind::Issue, &full, self.number(), true);
        self.open_issues
            .lock()
            .unwrap()
            .push((full, title.to_string(), created.clone()));
        Ok(created)
    }

    fn add_labels(&self, owner: &str, repo: &str, number: u64, labels: &[String]) -> Result<()> {
        self.record(HostCall::AddLabels {
            repo: format!("{owner}/{repo}"),
            number,
            labels: labels.to_vec(),
        });
        if self.fail_labels {
            return Err(SweeperError::api("add labels", "HTTP 403: Forbidden"));
        }
        Ok(())
    }

    fn git_token(&self) -> Result<String> {
        Ok("test-token".to_string())
    }
}

/// What the fake auto-correct step does to the working tree.
#[derive(Debug, Clone)]
pub enum Autocorrect {
    /// Leave the tree untouched.
    NoChange,
    /// Overwrite `path` with `content`.
    Rewrite { path: String, content: String },
    Fail,
}

pub struct FakeLinter {
    report: String,
    autocorrect: Autocorrect,
    check_calls: AtomicUsize,
    autocorrect_calls: AtomicUsize,
}

impl FakeLinter {
    pub fn new(report: &str, autocorrect: Autocorrect) -> Self {
        Self {
            report: report.to_string(),
            autocorrect,
            check_calls: AtomicUsize::new(0),
            autocorrect_calls: AtomicUsize::new(0),
        }
    }

    pub fn clean() -> Self {
        Self::new(CLEAN_REPORT, Autocorrect::NoChange)
    }

    pub fn check_calls(&self) -> usize {
        self.check_calls.load(Ordering::SeqCst)
    }

    pub fn autocorrect_calls(&self) -> usize {
        self.autocorrect_calls.load(Ordering::SeqCst)
    }
}

impl Linter for FakeLinter {
    fn check(&self, _repo_dir: &Path) -> Result<LintResult> {
        self.check_calls.fetch_add(1, Ordering::SeqCst);
        Ok(parse_report(&self.report)?)
    }

    fn autocorrect(&self, repo_dir: &Path) -> Result<bool> {
        self.autocorrect_calls.fetch_add(1, Ordering::SeqCst);
        match &self.autocorrect {
            Autocorrect::NoChange => {}
            Autocorrect::Rewrite { path, content } => fs::write(repo_dir.join(path), content)?,
            Autocorrect::Fail => {
                return Err(SweeperError::command_failed("rubocop", "autocorrect exited with 2"))
            }
        }
        GitRepo::open(repo_dir)?.has_working_tree_changes()
    }
}

pub const CLEAN_REPORT: &str =
    r#"{"files": [{"path": "app.rb", "offenses": []}], "summary": {"offense_count": 0}}"#;

/// One auto-correctable and two manual-only offenses in `app.rb`.
pub const MIXED_REPORT: &str = r#"{
    "files": [{"path": "app.rb", "offenses": [
        {"cop_name": "Style/StringLiterals", "correctable": true, "severity": "convention",
         "message": "Prefer single-quoted strings", "location": {"line": 1, "column": 6}},
        {"cop_name": "Metrics/MethodLength", "correctable": false, "severity": "convention",
         "message": "Method has too many lines. [14/10]", "location": {"line": 3, "column": 3}},
        {"cop_name": "Lint/UselessAssignment", "correctable": false, "severity": "warning",
         "message": "Useless assignment to variable - x.", "location": {"line": 5, "column": 5}}
    ]}],
    "summary": {"offense_count": 3}
}"#;

/// Two manual-only offenses and nothing auto-correctable.
pub const MANUAL_ONLY_REPORT: &str = r#"{
    "files": [{"path": "app.rb", "offenses": [
        {"cop_name": "Metrics/AbcSize", "correctable": false, "severity": "convention",
         "message": "Assignment Branch Condition size is too high.", "location": {"line": 2, "column": 3}},
        {"cop_name": "Lint/Debugger", "correctable": false, "severity": "warning",
         "message": "Remove debugger entry point.", "location": {"line": 4, "column": 1}}
    ]}],
    "summary": {"offense_count": 2}
}"#;

/// Fix applied by the fake auto-correct for [`MIXED_REPORT`].
pub fn single_quote_fix() -> Autocorrect {
    Autocorrect::Rewrite {
        path: "app.rb".to_string(),
        content: "puts 'hello'\n".to_string(),
    }
}
