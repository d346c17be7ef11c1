//! GitHub REST client.
//!
//! [`CodeHost`] is the narrow surface the rest of the crate needs from the
//! code-hosting service; [`GitHubClient`] implements it over blocking `ureq`
//! calls. Personal access tokens are used as-is. GitHub App credentials are
//! exchanged for an installation token (JWT signed with the App's private
//! key), cached, and refreshed shortly before expiry.

use crate::core::context::RepositoryRef;
use crate::core::credentials::Credentials;
use crate::core::error::{Result, SweeperError};
use crate::core::state::{ArtifactKind, ArtifactRef};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use std::time::Duration;
use ureq::http::Response;
use ureq::{Agent, Body, RequestBuilder};

const PER_PAGE: usize = 100;
/// The search API never returns more than this many results.
const SEARCH_RESULT_CAP: usize = 1000;
const MAX_ISSUE_PAGES: usize = 10;
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);
const TOKEN_REFRESH_MARGIN_MINUTES: i64 = 5;
const USER_AGENT: &str = concat!("lint-sweeper/", env!("CARGO_PKG_VERSION"));

pub struct NewPullRequest<'a> {
    pub title: &'a str,
    pub head: &'a str,
    pub base: &'a str,
    pub body: &'a str,
}

pub trait CodeHost: Send + Sync {
    /// Repositories in `org` tagged with `topic`, archived ones excluded.
    fn search_repositories(&self, org: &str, topic: &str) -> Result<Vec<RepositoryRef>>;

    fn find_open_pull_request(
        &self,
        owner: &str,
        repo: &str,
        head_branch: &str,
    ) -> Result<Option<ArtifactRef>>;

    fn create_pull_request(
        &self,
        owner: &str,
        repo: &str,
        pr: &NewPullRequest<'_>,
    ) -> Result<ArtifactRef>;

    /// An open issue (not pull request) with exactly this title.
    fn find_open_issue(&self, owner: &str, repo: &str, title: &str)
        -> Result<Option<ArtifactRef>>;

    fn create_issue(&self, owner: &str, repo: &str, title: &str, body: &str)
        -> Result<ArtifactRef>;

    fn add_labels(&self, owner: &str, repo: &str, number: u64, labels: &[String]) -> Result<()>;

    /// Token usable for git over HTTPS.
    fn git_token(&self) -> Result<String>;
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    total_count: usize,
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    name: String,
    owner: Owner,
    clone_url: String,
    default_branch: Option<String>,
    #[serde(default)]
    archived: bool,
}

#[derive(Debug, Deserialize)]
struct Owner {
    login: String,
}

#[derive(Debug, Deserialize)]
struct NumberedItem {
    number: u64,
    html_url: String,
    #[serde(default)]
    title: String,
    /// Present when an issues-endpoint item is really a pull request.
    #[serde(default)]
    pull_request: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
struct InstallationToken {
    token: String,
    expires_at: DateTime<Utc>,
}

impl InstallationToken {
    fn is_usable(&self, now: DateTime<Utc>) -> bool {
        self.expires_at - ChronoDuration::minutes(TOKEN_REFRESH_MARGIN_MINUTES) > now
    }
}

#[derive(Serialize)]
struct AppClaims {
    iss: String,
    iat: i64,
    exp: i64,
}

enum TokenSource {
    Static(String),
    App {
        app_id: u64,
        installation_id: u64,
        key: EncodingKey,
        cached: Mutex<Option<InstallationToken>>,
    },
}

pub struct GitHubClient {
    agent: Agent,
    api_url: String,
    tokens: TokenSource,
}

impl GitHubClient {
    pub fn new(api_url: &str, credentials: &Credentials) -> Result<Self> {
        let tokens = match credentials {
            Credentials::Token(token) => TokenSource::Static(token.clone()),
            Credentials::App {
                app_id,
                installation_id,
                private_key,
            } => TokenSource::App {
                app_id: *app_id,
                installation_id: *installation_id,
                key: EncodingKey::from_rsa_pem(private_key.as_bytes()).map_err(|e| {
                    SweeperError::invalid_credentials(format!("unusable App private key: {e}"))
                })?,
                cached: Mutex::new(None),
            },
        };

        let config = Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(HTTP_TIMEOUT))
            .build();

        Ok(Self {
            agent: Agent::new_with_config(config),
            api_url: api_url.trim_end_matches('/').to_string(),
            tokens,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_url, path)
    }

    fn with_token<Any>(&self, req: RequestBuilder<Any>, token: &str) -> RequestBuilder<Any> {
        req.header("Authorization", format!("Bearer {token}"))
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", "2022-11-28")
            .header("User-Agent", USER_AGENT)
    }

    fn auth<Any>(&self, req: RequestBuilder<Any>) -> Result<RequestBuilder<Any>> {
        let token = self.git_token()?;
        Ok(self.with_token(req, &token))
    }

    fn mint_installation_token(
        &self,
        app_id: u64,
        installation_id: u64,
        key: &EncodingKey,
    ) -> Result<InstallationToken> {
        let now = Utc::now().timestamp();
        let claims = AppClaims {
            iss: app_id.to_string(),
            iat: now - 60,
            exp: now + 9 * 60,
        };
        let jwt = jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, key)?;

        let req = self.agent.post(self.url(&format!(
            "/app/installations/{installation_id}/access_tokens"
        )));
        let response = self.with_token(req, &jwt).send_empty()?;
        let token: InstallationToken = read_json("mint installation token", response)?;
        log::debug!("minted installation token expiring at {}", token.expires_at);
        Ok(token)
    }

    fn search_page(&self, query: &str, page: usize) -> Result<SearchResponse> {
        let req = self
            .agent
            .get(self.url("/search/repositories"))
            .query("q", query)
            .query("per_page", PER_PAGE.to_string())
            .query("page", page.to_string());
        let response = self.auth(req)?.call()?;
        read_json("search repositories", response)
    }
}

impl CodeHost for GitHubClient {
    fn search_repositories(&self, org: &str, topic: &str) -> Result<Vec<RepositoryRef>> {
        let query = search_query(org, topic);
        let mut repos = Vec::new();
        let mut seen = 0usize;
        let mut page = 1usize;

        loop {
            let response = self.search_page(&query, page)?;
            let count = response.items.len();
            seen += count;
            log::debug!(
                "search page {page}: {count} items ({seen}/{})",
                response.total_count
            );

            repos.extend(response.items.into_iter().filter_map(search_item_to_ref));

            if count < PER_PAGE || seen >= response.total_count || seen >= SEARCH_RESULT_CAP {
                break;
            }
            page += 1;
        }

        Ok(repos)
    }

    fn find_open_pull_request(
        &self,
        owner: &str,
        repo: &str,
        head_branch: &str,
    ) -> Result<Option<ArtifactRef>> {
        let req = self
            .agent
            .get(self.url(&format!("/repos/{owner}/{repo}/pulls")))
            .query("state", "open")
            .query("head", format!("{owner}:{head_branch}"))
            .query("per_page", "1");
        let response = self.auth(req)?.call()?;
        let pulls: Vec<NumberedItem> = read_json("list pull requests", response)?;

        Ok(pulls
            .into_iter()
            .next()
            .map(|item| to_artifact(ArtifactKind::PullRequest, item, false)))
    }

    fn create_pull_request(
        &self,
        owner: &str,
        repo: &str,
        pr: &NewPullRequest<'_>,
    ) -> Result<ArtifactRef> {
        let req = self
            .agent
            .post(self.url(&format!("/repos/{owner}/{repo}/pulls")));
        let response = self.auth(req)?.send_json(serde_json::json!({
            "title": pr.title,
            "head": pr.head,
            "base": pr.base,
            "body": pr.body,
        }))?;
        let item: NumberedItem = read_json("create pull request", response)?;
        Ok(to_artifact(ArtifactKind::PullRequest, item, true))
    }

    fn find_open_issue(
        &self,
        owner: &str,
        repo: &str,
        title: &str,
    ) -> Result<Option<ArtifactRef>> {
        for page in 1..=MAX_ISSUE_PAGES {
            let req = self
                .agent
                .get(self.url(&format!("/repos/{owner}/{repo}/issues")))
                .query("state", "open")
                .query("per_page", PER_PAGE.to_string())
                .query("page", page.to_string());
            let response = self.auth(req)?.call()?;
            let items: Vec<NumberedItem> = read_json("list issues", response)?;
            let count = items.len();

            if let Some(item) = items
                .into_iter()
                .find(|item| item.pull_request.is_none() && item.title == title)
            {
                return Ok(Some(to_artifact(ArtifactKind::Issue, item, false)));
            }
            if count < PER_PAGE {
                break;
            }
        }
        Ok(None)
    }

    fn create_issue(
        &self,
        owner: &str,
        repo: &str,
        title: &str,
        body: &str,
    ) -> Result<ArtifactRef> {
        let req = self
            .agent
            .post(self.url(&format!("/repos/{owner}/{repo}/issues")));
        let response = self
            .auth(req)?
            .send_json(serde_json::json!({ "title": title, "body": body }))?;
        let item: NumberedItem = read_json("create issue", response)?;
        Ok(to_artifact(ArtifactKind::Issue, item, true))
    }

    fn add_labels(&self, owner: &str, repo: &str, number: u64, labels: &[String]) -> Result<()> {
        if labels.is_empty() {
            return Ok(());
        }
        let req = self
            .agent
            .post(self.url(&format!("/repos/{owner}/{repo}/issues/{number}/labels")));
        let response = self
            .auth(req)?
            .send_json(serde_json::json!({ "labels": labels }))?;
        let _: serde_json::Value = read_json("add labels", response)?;
        Ok(())
    }

    fn git_token(&self) -> Result<String> {
        match &self.tokens {
            TokenSource::Static(token) => Ok(token.clone()),
            TokenSource::App {
                app_id,
                installation_id,
                key,
                cached,
            } => {
                let mut cached = cached.lock().unwrap_or_else(|e| e.into_inner());
                if let Some(token) = cached.as_ref().filter(|t| t.is_usable(Utc::now())) {
                    return Ok(token.token.clone());
                }
                let token = self.mint_installation_token(*app_id, *installation_id, key)?;
                let value = token.token.clone();
                *cached = Some(token);
                Ok(value)
            }
        }
    }
}

/// Deserialize a successful response, or turn an error status into [`SweeperError::Api`].
fn read_json<T: serde::de::DeserializeOwned>(
    operation: &str,
    mut response: Response<Body>,
) -> Result<T> {
    let status = response.status();
    if !status.is_success() {
        let body = response.body_mut().read_to_string().unwrap_or_default();
        let message = serde_json::from_str::<serde_json::Value>(&body)
            .ok()
            .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_string))
            .unwrap_or(body);
        return Err(SweeperError::api(
            operation,
            format!("HTTP {}: {}", status.as_u16(), message),
        ));
    }
    Ok(response.body_mut().read_json()?)
}

fn search_query(org: &str, topic: &str) -> String {
    format!("org:{org} topic:{topic}")
}

fn search_item_to_ref(item: SearchItem) -> Option<RepositoryRef> {
    if item.archived {
        log::debug!("skipping archived repository {}/{}", item.owner.login, item.name);
        return None;
    }
    Some(RepositoryRef {
        owner: item.owner.login,
        name: item.name,
        clone_url: item.clone_url,
        default_branch: item.default_branch,
    })
}

fn to_artifact(kind: ArtifactKind, item: NumberedItem, created: bool) -> ArtifactRef {
    ArtifactRef {
        kind,
        number: item.number,
        url: item.html_url,
        created,
    }
}
