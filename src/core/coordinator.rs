//! Fans repositories out over a bounded worker pool.
//!
//! Workers pull one repository at a time from rayon's work-stealing queue, so a
//! slow repository never holds back the rest of a statically assigned batch.
//! Outcomes are collected in completion order. A panicking worker becomes an
//! error outcome for its repository and never aborts the run.

use crate::core::context::{ContextFactory, RepositoryRef};
use crate::core::error::{Result, SweeperError};
use crate::core::processor::RepositoryHandler;
use crate::core::state::{OutcomeStatus, ProcessingOutcome};
use rayon::ThreadPoolBuilder;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{mpsc, Arc};
use std::time::{Duration, Instant};

pub struct Coordinator {
    handler: Arc<dyn RepositoryHandler>,
    contexts: ContextFactory,
    threads: usize,
}

impl Coordinator {
    pub fn new(handler: Arc<dyn RepositoryHandler>, contexts: ContextFactory, threads: usize) -> Self {
        Self {
            handler,
            contexts,
            threads,
        }
    }

    /// `min(threads, repositories)`, never below one.
    pub fn worker_count(&self, repositories: usize) -> usize {
        self.threads.min(repositories).max(1)
    }

    /// Process every repository and return outcomes in completion order.
    pub fn run(&self, repositories: Vec<RepositoryRef>) -> Result<Vec<ProcessingOutcome>> {
        if repositories.is_empty() {
            return Ok(Vec::new());
        }

        let workers = self.worker_count(repositories.len());
        let pool = ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("sweeper-worker-{i}"))
            .build()
            .map_err(|e| SweeperError::worker_pool(e.to_string()))?;

        let logger = self.contexts.logger();
        logger.info(
            "starting run",
            &[
                ("repositories", repositories.len().to_string().as_str()),
                ("workers", workers.to_string().as_str()),
            ],
        );

        let expected = repositories.len();
        let (tx, rx) = mpsc::channel();
        pool.scope(|scope| {
            for repo in repositories {
                let tx = tx.clone();
                let handler = Arc::clone(&self.handler);
                let contexts = &self.contexts;
                scope.spawn(move |_| {
                    let outcome = process_isolated(handler.as_ref(), contexts, repo);
                    // The receiver outlives the scope.
                    let _ = tx.send(outcome);
                });
            }
        });
        drop(tx);

        let outcomes: Vec<ProcessingOutcome> = rx.into_iter().collect();
        if outcomes.len() != expected {
            logger.warn(
                "some repositories produced no outcome",
                &[
                    ("expected", expected.to_string().as_str()),
                    ("received", outcomes.len().to_string().as_str()),
                ],
            );
        }
        Ok(outcomes)
    }
}

fn process_isolated(
    handler: &dyn RepositoryHandler,
    contexts: &ContextFactory,
    repo: RepositoryRef,
) -> ProcessingOutcome {
    let full_name = repo.full_name();
    let started = Instant::now();
    let ctx = contexts.create(repo);

    match panic::catch_unwind(AssertUnwindSafe(|| handler.process(ctx))) {
        Ok(outcome) => outcome,
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            contexts.logger().error(
                "worker panicked",
                &[("repo", full_name.as_str()), ("panic", message.as_str())],
            );
            panicked_outcome(full_name, message, started.elapsed())
        }
    }
}

fn panicked_outcome(repository: String, message: String, elapsed: Duration) -> ProcessingOutcome {
    ProcessingOutcome {
        repository,
        status: OutcomeStatus::Error,
        auto_correctable: 0,
        manual_only: 0,
        elapsed,
        error: Some(format!("worker panicked: {message}")),
        artifacts: Vec::new(),
        artifact_failed: false,
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
