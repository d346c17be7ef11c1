use lint_sweeper::core::config::{DEFAULT_FIX_BRANCH, DEFAULT_ISSUE_TITLE};
use lint_sweeper::core::{ArtifactKind, CacheResult, LintEngine, OutcomeStatus};
use std::sync::Arc;
use std::time::Duration;

mod common;
use common::{fakes::*, harness::Harness, repository::*};

#[cfg(test)]
mod processor_scenarios {
    use super::*;

    #[test]
    fn test_mixed_offenses_open_pull_request_and_issue() -> anyhow::Result<()> {
        let seed = ruby_seed("widgets")?;
        let main_sha = seed.branch_sha("main").unwrap();
        let harness = Harness::new(
            FakeHost::new(),
            Arc::new(FakeLinter::new(MIXED_REPORT, single_quote_fix())),
        )?;

        let outcome = harness.process(seed.reference());

        assert_eq!(outcome.status, OutcomeStatus::AutoFixedPrCreated, "{outcome:?}");
        assert_eq!((outcome.auto_correctable, outcome.manual_only), (1, 2));
        assert!(!outcome.is_failure());
        let kinds: Vec<_> = outcome.artifacts.iter().map(|a| a.kind).collect();
        assert_eq!(kinds, vec![ArtifactKind::PullRequest, ArtifactKind::Issue]);
        assert!(outcome.artifacts.iter().all(|a| a.created));

        // The fix branch was pushed with the corrected file; main is untouched.
        assert!(seed.branch_sha(DEFAULT_FIX_BRANCH).is_some());
        assert_eq!(seed.file_at(DEFAULT_FIX_BRANCH, "app.rb")?, "puts 'hello'\n");
        assert_eq!(seed.branch_sha("main").unwrap(), main_sha);

        let pulls = harness.host.created_pull_requests();
        assert_eq!(pulls.len(), 1);
        let HostCall::CreatePullRequest { head, base, body, .. } = &pulls[0] else {
            unreachable!()
        };
        assert_eq!(head, DEFAULT_FIX_BRANCH);
        assert_eq!(base, "main");
        assert!(body.contains("Auto-corrected: 1, Manual Review Needed: 2"));

        let issues = harness.host.created_issues();
        assert_eq!(issues.len(), 1);
        let HostCall::CreateIssue { body, .. } = &issues[0] else {
            unreachable!()
        };
        assert!(body.contains("Manual Review Needed: 2"));
        assert!(body.contains("Metrics/MethodLength"));
        assert!(body.contains("Lint/UselessAssignment"));
        assert!(!body.contains("Style/StringLiterals"));

        let labelled = harness
            .host
            .calls()
            .into_iter()
            .filter(|c| matches!(c, HostCall::AddLabels { labels, .. } if labels == &["lint".to_string()]))
            .count();
        assert_eq!(labelled, 2);

        let entry = harness.reload_cache().lookup("acme/widgets").unwrap();
        assert_eq!(entry.result, CacheResult::IssuesFound);
        assert_eq!(entry.sha, main_sha);
        Ok(())
    }

    #[test]
    fn test_clean_repository_creates_nothing() -> anyhow::Result<()> {
        let seed = ruby_seed("clean")?;
        let linter = Arc::new(FakeLinter::clean());
        let harness = Harness::new(FakeHost::new(), linter.clone())?;

        let outcome = harness.process(seed.reference());

        assert_eq!(outcome.status, OutcomeStatus::NoIssues);
        assert!(outcome.artifacts.is_empty());
        assert!(harness.host.calls().is_empty());
        assert_eq!(linter.autocorrect_calls(), 0);
        assert!(seed.branch_sha(DEFAULT_FIX_BRANCH).is_none());

        let entry = harness.reload_cache().lookup("acme/clean").unwrap();
        assert_eq!(entry.result, CacheResult::Success);
        Ok(())
    }

    #[test]
    fn test_unchanged_repository_is_skipped_without_linting() -> anyhow::Result<()> {
        let seed = ruby_seed("cached")?;
        let linter = Arc::new(FakeLinter::clean());
        let harness = Harness::new(FakeHost::new(), linter.clone())?;

        assert_eq!(harness.process(seed.reference()).status, OutcomeStatus::NoIssues);
        let second = harness.process(seed.reference());

        assert_eq!(second.status, OutcomeStatus::Skipped);
        assert_eq!(linter.check_calls(), 1);
        let stats = harness.cache.stats();
        assert_eq!((stats.hits, stats.misses), (1, 1));
        Ok(())
    }

    #[test]
    fn test_new_commit_invalidates_cache_entry() -> anyhow::Result<()> {
        let seed = ruby_seed("moving")?;
        let linter = Arc::new(FakeLinter::clean());
        let harness = Harness::new(FakeHost::new(), linter.clone())?;
        harness.process(seed.reference());

        seed.push_commit("lib/extra.rb", "x = 1\n", "Add extra")?;
        let outcome = harness.process(seed.reference());

        assert_eq!(outcome.status, OutcomeStatus::NoIssues);
        assert_eq!(linter.check_calls(), 2);
        let entry = harness.reload_cache().lookup("acme/moving").unwrap();
        assert_eq!(Some(entry.sha), seed.branch_sha("main"));
        assert!(harness.work_dir(&seed.reference()).join("lib/extra.rb").exists());
        Ok(())
    }

    #[test]
    fn test_zero_ttl_never_skips() -> anyhow::Result<()> {
        let seed = ruby_seed("no-ttl")?;
        let linter = Arc::new(FakeLinter::clean());
        let harness = Harness::with_config(FakeHost::new(), linter.clone(), |c| {
            c.cache_ttl_days = 0
        })?;

        harness.process(seed.reference());
        std::thread::sleep(Duration::from_millis(1100));
        let second = harness.process(seed.reference());

        assert_eq!(second.status, OutcomeStatus::NoIssues);
        assert_eq!(linter.check_calls(), 2);
        Ok(())
    }

    #[test]
    fn test_unparsable_linter_failure_is_recorded_as_error() -> anyhow::Result<()> {
        let seed = ruby_seed("broken-config")?;
        let scripts = tempfile::TempDir::new()?;
        let marker = scripts.path().join("autocorrect-ran");
        let script = scripts.path().join("linter.sh");
        std::fs::write(
            &script,
            format!(
                "case \"$*\" in\n  *--autocorrect-all*) touch '{}'; exit 0;;\nesac\necho 'Error: unrecognized cop Foo/Bar' >&2\nexit 2\n",
                marker.display()
            ),
        )?;
        let linter = Arc::new(LintEngine::new(
            vec!["sh".to_string(), script.to_string_lossy().into_owned()],
            Duration::from_secs(30),
        ));
        let harness = Harness::new(FakeHost::new(), linter)?;

        let outcome = harness.process(seed.reference());

        assert_eq!(outcome.status, OutcomeStatus::Error);
        assert_eq!((outcome.auto_correctable, outcome.manual_only), (0, 0));
        assert!(outcome.error.as_deref().unwrap().contains("no parsable report"));
        assert!(!marker.exists(), "autocorrect must not run");
        assert!(harness.host.calls().is_empty());

        let entry = harness.reload_cache().lookup("acme/broken-config").unwrap();
        assert_eq!(entry.result, CacheResult::Error);

        // Errored entries are retried even though the SHA did not move.
        assert_eq!(harness.process(seed.reference()).status, OutcomeStatus::Error);
        let retried = harness.reload_cache().lookup("acme/broken-config").unwrap();
        assert_eq!(retried.result, CacheResult::Error);
        assert_eq!((retried.sha, retried.first_seen), (entry.sha, entry.first_seen));
        Ok(())
    }

    #[test]
    fn test_manual_only_offenses_without_changes_open_issue() -> anyhow::Result<()> {
        let seed = ruby_seed("manual")?;
        let linter = Arc::new(FakeLinter::new(MANUAL_ONLY_REPORT, Autocorrect::NoChange));
        let harness = Harness::new(FakeHost::new(), linter.clone())?;

        let outcome = harness.process(seed.reference());

        assert_eq!(outcome.status, OutcomeStatus::ManualIssueCreated);
        assert_eq!(outcome.manual_only, 2);
        assert_eq!(linter.autocorrect_calls(), 1);
        assert!(harness.host.created_pull_requests().is_empty());
        assert_eq!(harness.host.created_issues().len(), 1);
        assert!(seed.branch_sha(DEFAULT_FIX_BRANCH).is_none(), "nothing is pushed");
        assert_eq!(
            harness.reload_cache().lookup("acme/manual").unwrap().result,
            CacheResult::IssuesFound
        );
        Ok(())
    }

    #[test]
    fn test_existing_pull_request_is_reused() -> anyhow::Result<()> {
        let seed = ruby_seed("reuse")?;
        let host = FakeHost::new().with_open_pull_request("acme/reuse", DEFAULT_FIX_BRANCH, 7);
        let harness = Harness::new(
            host,
            Arc::new(FakeLinter::new(MIXED_REPORT, single_quote_fix())),
        )?;

        let outcome = harness.process(seed.reference());

        assert_eq!(outcome.status, OutcomeStatus::AutoFixedPrCreated);
        assert!(harness.host.created_pull_requests().is_empty());
        let pr = &outcome.artifacts[0];
        assert_eq!((pr.kind, pr.number, pr.created), (ArtifactKind::PullRequest, 7, false));
        // The branch behind the open PR is still refreshed.
        assert_eq!(seed.file_at(DEFAULT_FIX_BRANCH, "app.rb")?, "puts 'hello'\n");
        Ok(())
    }

    #[test]
    fn test_existing_issue_is_reused() -> anyhow::Result<()> {
        let seed = ruby_seed("reuse-issue")?;
        let host = FakeHost::new().with_open_issue("acme/reuse-issue", DEFAULT_ISSUE_TITLE, 9);
        let harness = Harness::new(
            host,
            Arc::new(FakeLinter::new(MANUAL_ONLY_REPORT, Autocorrect::NoChange)),
        )?;

        let outcome = harness.process(seed.reference());

        assert_eq!(outcome.status, OutcomeStatus::ManualIssueCreated);
        assert!(harness.host.created_issues().is_empty());
        assert_eq!(outcome.artifacts[0].number, 9);
        Ok(())
    }

    #[test]
    fn test_failed_pull_request_marks_outcome_as_error() -> anyhow::Result<()> {
        let seed = ruby_seed("pr-fails")?;
        let harness = Harness::new(
            FakeHost::new().failing_pull_requests(),
            Arc::new(FakeLinter::new(MIXED_REPORT, single_quote_fix())),
        )?;

        let outcome = harness.process(seed.reference());

        assert_eq!(outcome.status, OutcomeStatus::Error);
        assert!(outcome.artifact_failed);
        assert!(outcome.error.as_deref().unwrap().contains("pull request"));
        // The issue is still filed.
        assert_eq!(outcome.artifacts.len(), 1);
        assert_eq!(outcome.artifacts[0].kind, ArtifactKind::Issue);
        assert_eq!(
            harness.reload_cache().lookup("acme/pr-fails").unwrap().result,
            CacheResult::Error
        );
        Ok(())
    }

    #[test]
    fn test_label_failure_does_not_fail_artifact() -> anyhow::Result<()> {
        let seed = ruby_seed("labels")?;
        let harness = Harness::new(
            FakeHost::new().failing_labels(),
            Arc::new(FakeLinter::new(MIXED_REPORT, single_quote_fix())),
        )?;

        let outcome = harness.process(seed.reference());

        assert_eq!(outcome.status, OutcomeStatus::AutoFixedPrCreated);
        assert!(!outcome.is_failure());
        Ok(())
    }

    #[test]
    fn test_autocorrect_failure_pushes_nothing() -> anyhow::Result<()> {
        let seed = ruby_seed("autocorrect-fails")?;
        let harness = Harness::new(
            FakeHost::new(),
            Arc::new(FakeLinter::new(MIXED_REPORT, Autocorrect::Fail)),
        )?;

        let outcome = harness.process(seed.reference());

        assert_eq!(outcome.status, OutcomeStatus::Error);
        assert!(outcome.error.as_deref().unwrap().contains("needs_fix"));
        assert!(seed.branch_sha(DEFAULT_FIX_BRANCH).is_none());
        assert!(harness.host.calls().is_empty());
        Ok(())
    }

    #[test]
    fn test_clone_failure_is_an_error_without_cache_entry() -> anyhow::Result<()> {
        let seed = ruby_seed("gone")?;
        let mut reference = seed.reference();
        reference.clone_url = format!("file://{}", seed.temp_dir.path().join("missing.git").display());
        let harness = Harness::new(FakeHost::new(), Arc::new(FakeLinter::clean()))?;

        let outcome = harness.process(reference);

        assert_eq!(outcome.status, OutcomeStatus::Error);
        assert!(outcome.error.as_deref().unwrap().contains("after start"));
        assert!(harness.reload_cache().lookup("acme/gone").is_none());
        Ok(())
    }

    #[test]
    fn test_clean_flag_removes_working_directory() -> anyhow::Result<()> {
        let seed = ruby_seed("ephemeral")?;
        let harness = Harness::with_config(FakeHost::new(), Arc::new(FakeLinter::clean()), |c| {
            c.clean_workspaces = true
        })?;

        let outcome = harness.process(seed.reference());

        assert_eq!(outcome.status, OutcomeStatus::NoIssues);
        assert!(!harness.work_dir(&seed.reference()).exists());
        Ok(())
    }
}
