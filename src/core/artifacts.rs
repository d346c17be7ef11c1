//! Pull request and issue creation with de-duplication.
//!
//! Both creation paths first look for an open artifact of the same identity
//! (PR: same head branch; issue: same title) and return it instead of
//! creating a duplicate. Labels are attached to newly created artifacts only;
//! a labelling failure is logged and does not fail the artifact.

use crate::core::context::RepositoryContext;
use crate::core::error::Result;
use crate::core::github::{CodeHost, NewPullRequest};
use crate::core::state::ArtifactRef;
use std::sync::Arc;

pub struct ArtifactManager {
    host: Arc<dyn CodeHost>,
    labels: Vec<String>,
}

impl ArtifactManager {
    pub fn new(host: Arc<dyn CodeHost>, labels: Vec<String>) -> Self {
        Self { host, labels }
    }

    pub fn find_existing_open_pr(
        &self,
        ctx: &RepositoryContext,
        branch: &str,
    ) -> Result<Option<ArtifactRef>> {
        self.host
            .find_open_pull_request(ctx.owner(), ctx.name(), branch)
    }

    pub fn create_pull_request(
        &self,
        ctx: &RepositoryContext,
        branch: &str,
        base: &str,
        title: &str,
        body: &str,
    ) -> Result<ArtifactRef> {
        if let Some(existing) = self.find_existing_open_pr(ctx, branch)? {
            ctx.info(
                "pull request already open",
                &[("url", existing.url.as_str()), ("branch", branch)],
            );
            return Ok(existing);
        }

        let created = self.host.create_pull_request(
            ctx.owner(),
            ctx.name(),
            &NewPullRequest {
                title,
                head: branch,
                base,
                body,
            },
        )?;
        ctx.info("pull request created", &[("url", created.url.as_str())]);
        self.label(ctx, &created);
        Ok(created)
    }

    pub fn create_issue(&self, ctx: &RepositoryContext, title: &str, body: &str) -> Result<ArtifactRef> {
        if let Some(existing) = self.host.find_open_issue(ctx.owner(), ctx.name(), title)? {
            ctx.info("issue already open", &[("url", existing.url.as_str())]);
            return Ok(existing);
        }

        let created = self.host.create_issue(ctx.owner(), ctx.name(), title, body)?;
        ctx.info("issue created", &[("url", created.url.as_str())]);
        self.label(ctx, &created);
        Ok(created)
    }

    fn label(&self, ctx: &RepositoryContext, artifact: &ArtifactRef) {
        if self.labels.is_empty() {
            return;
        }
        if let Err(e) = self
            .host
            .add_labels(ctx.owner(), ctx.name(), artifact.number, &self.labels)
        {
            ctx.warn(
                "failed to attach labels",
                &[
                    ("url", artifact.url.as_str()),
                    ("error", e.to_string().as_str()),
                ],
            );
        }
    }
}
