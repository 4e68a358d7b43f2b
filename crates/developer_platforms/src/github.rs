use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::header::{HeaderMap, ACCEPT};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, instrument, trace};

use crate::{
    errors::Error,
    models::{CommitRecord, Identity, PullRequestRecord, User, Verification},
    pagination::{list_all_pages, Page, RetryPolicy, PAGE_SIZE},
    RemoteClient,
};

#[cfg(test)]
#[path = "github_tests.rs"]
mod tests;

/// API address of the public GitHub instance.
pub const PUBLIC_API_URL: &str = "https://api.github.com";

/// Closed pull requests are listed at most this many pages deep. Large
/// repositories have tens of thousands of closed pull requests and only the
/// most recent ones can fall into a reporting period.
pub const MAX_PULL_REQUEST_PAGES: u32 = 15;

const JSON_MEDIA_TYPE: &str = "application/vnd.github+json";
const DIFF_MEDIA_TYPE: &str = "application/vnd.github.v3.diff";
const USER_AGENT: &str = concat!("pkup/", env!("CARGO_PKG_VERSION"));

/// Returns the REST API address for a GitHub Enterprise Server host.
///
/// Enterprise servers serve the REST API under `/api/v3`; the suffix is added
/// unless the configured address already ends with it.
///
/// # Examples
///
/// ```rust
/// use pkup_developer_platforms::github::enterprise_api_url;
///
/// assert_eq!(
///     enterprise_api_url("https://github.example.com/").unwrap(),
///     "https://github.example.com/api/v3"
/// );
/// ```
pub fn enterprise_api_url(enterprise_url: &str) -> Result<String, Error> {
    let trimmed = enterprise_url.trim().trim_end_matches('/');
    if !(trimmed.starts_with("https://") || trimmed.starts_with("http://")) {
        return Err(Error::InvalidUrl(enterprise_url.to_string()));
    }

    if trimmed.ends_with("/api/v3") {
        Ok(trimmed.to_string())
    } else {
        Ok(format!("{}/api/v3", trimmed))
    }
}

/// Computes how long to wait before retrying a rate-limited request.
///
/// `Retry-After` (seconds, used by the secondary rate limits) wins over
/// `X-RateLimit-Reset` (epoch seconds of the primary limit reset). A reset
/// time in the past yields a zero wait.
fn rate_limit_wait(headers: &HeaderMap, now: DateTime<Utc>) -> Option<Duration> {
    let header_number = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<i64>().ok())
    };

    if let Some(seconds) = header_number("retry-after") {
        return Some(Duration::from_secs(seconds.max(0) as u64));
    }

    header_number("x-ratelimit-reset")
        .map(|reset| Duration::from_secs((reset - now.timestamp()).max(0) as u64))
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

#[derive(Debug, Deserialize)]
struct ApiName {
    name: String,
}

#[derive(Debug, Deserialize)]
struct ApiAccount {
    login: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiGitSignature {
    name: Option<String>,
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiVerification {
    #[serde(default)]
    verified: bool,
    payload: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiGitCommit {
    message: Option<String>,
    author: Option<ApiGitSignature>,
    committer: Option<ApiGitSignature>,
    verification: Option<ApiVerification>,
}

#[derive(Debug, Deserialize)]
struct ApiCommit {
    sha: String,
    commit: ApiGitCommit,
    author: Option<ApiAccount>,
    committer: Option<ApiAccount>,
}

fn identity(account: Option<ApiAccount>, signature: Option<ApiGitSignature>) -> Identity {
    let (name, email) = match signature {
        Some(s) => (s.name, s.email),
        None => (None, None),
    };

    Identity {
        login: account.and_then(|a| a.login),
        name,
        email,
    }
}

impl From<ApiCommit> for CommitRecord {
    fn from(value: ApiCommit) -> Self {
        let ApiCommit {
            sha,
            commit,
            author,
            committer,
        } = value;

        CommitRecord {
            sha,
            message: commit.message.unwrap_or_default(),
            author: identity(author, commit.author),
            committer: identity(committer, commit.committer),
            verification: commit.verification.map(|v| Verification {
                verified: v.verified,
                payload: v.payload,
            }),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApiPullRequest {
    number: u64,
    title: Option<String>,
    merged_at: Option<DateTime<Utc>>,
    closed_at: Option<DateTime<Utc>>,
    merge_commit_sha: Option<String>,
}

impl From<ApiPullRequest> for PullRequestRecord {
    fn from(value: ApiPullRequest) -> Self {
        PullRequestRecord {
            number: value.number,
            title: value.title.unwrap_or_default(),
            merged_at: value.merged_at,
            closed_at: value.closed_at,
            merge_commit_sha: value.merge_commit_sha,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApiUser {
    login: String,
    name: Option<String>,
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiRelease {
    tag_name: String,
}

/// Client for the GitHub REST API, public or Enterprise Server.
///
/// One client owns one authenticated HTTP session for one host. Every call
/// goes through the client's [`RetryPolicy`], so rate-limited responses are
/// retried in place.
#[derive(Clone)]
pub struct GitHubClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
    retry: RetryPolicy,
}

impl std::fmt::Debug for GitHubClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubClient")
            .field("base_url", &self.base_url)
            .field("authenticated", &self.token.is_some())
            .field("retry", &self.retry)
            .finish()
    }
}

impl GitHubClient {
    /// Creates a client for the public host (`enterprise_url` empty) or for a
    /// GitHub Enterprise Server instance.
    pub fn new(token: Option<String>, enterprise_url: &str) -> Result<Self, Error> {
        let base_url = if enterprise_url.is_empty() {
            PUBLIC_API_URL.to_string()
        } else {
            enterprise_api_url(enterprise_url)?
        };

        Self::with_base_url(base_url, token)
    }

    /// Creates a client that talks to an explicit API address.
    pub fn with_base_url(base_url: impl Into<String>, token: Option<String>) -> Result<Self, Error> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| Error::Transport(e.to_string()))?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.filter(|t| !t.is_empty()),
            retry: RetryPolicy::default(),
        })
    }

    /// Replaces the rate-limit retry policy.
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// The API address requests are sent to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn send(
        &self,
        path: &str,
        query: &[(&str, String)],
        accept: &str,
    ) -> Result<reqwest::Response, Error> {
        let url = format!("{}{}", self.base_url, path);
        trace!(url = url.as_str(), "Sending request");

        let mut request = self.http.get(&url).header(ACCEPT, accept).query(query);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        if status == StatusCode::FORBIDDEN || status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = rate_limit_wait(response.headers(), Utc::now());
            debug!(
                status = status.as_u16(),
                retry_after_seconds = retry_after.map(|d| d.as_secs()),
                "Request was rate limited"
            );
            return Err(Error::RateLimitExceeded { retry_after });
        }

        let message = match response.json::<ApiErrorBody>().await {
            Ok(body) => body.message,
            Err(_) => status.canonical_reason().unwrap_or("unknown").to_string(),
        };

        Err(Error::ApiError {
            status: status.as_u16(),
            message,
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, Error> {
        self.retry
            .run(|| async {
                let response = self.send(path, &[], JSON_MEDIA_TYPE).await?;
                Ok(response.json::<T>().await?)
            })
            .await
    }

    /// Lists every page of `path`. With `tolerate_conflict` a `409 Conflict`
    /// (empty repository) ends the listing instead of failing it.
    async fn get_all_pages<T: DeserializeOwned + Send>(
        &self,
        path: &str,
        query: Vec<(&'static str, String)>,
        max_pages: Option<u32>,
        tolerate_conflict: bool,
    ) -> Result<Vec<T>, Error> {
        list_all_pages(&self.retry, max_pages, |page| {
            let mut query = query.clone();
            async move {
                query.push(("per_page", PAGE_SIZE.to_string()));
                query.push(("page", page.to_string()));

                match self.send(path, &query, JSON_MEDIA_TYPE).await {
                    Ok(response) => {
                        let items: Vec<T> = response.json().await?;
                        Ok(Page::from_items(items, PAGE_SIZE))
                    }
                    Err(e) if tolerate_conflict && e.is_conflict() => {
                        debug!(path, "Repository is empty");
                        Ok(Page::empty())
                    }
                    Err(e) => Err(e),
                }
            }
        })
        .await
    }

    /// Looks up a user account.
    #[instrument(skip(self))]
    pub async fn get_user(&self, username: &str) -> Result<User, Error> {
        let path = format!("/users/{}", urlencoding::encode(username));
        let user: ApiUser = self
            .get_json(&path)
            .await
            .map_err(|e| e.for_target("get user", username))?;

        Ok(User {
            login: user.login,
            name: user.name,
            email: user.email,
        })
    }
}

fn repo_path(org: &str, repo: &str, rest: &str) -> String {
    format!(
        "/repos/{}/{}{}",
        urlencoding::encode(org),
        urlencoding::encode(repo),
        rest
    )
}

fn timestamp(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Secs, true)
}

#[async_trait]
impl RemoteClient for GitHubClient {
    #[instrument(skip(self))]
    async fn list_repositories(&self, org: &str) -> Result<Vec<String>, Error> {
        let path = format!("/orgs/{}/repos", urlencoding::encode(org));
        let repos: Vec<ApiName> = self
            .get_all_pages(&path, Vec::new(), None, true)
            .await
            .map_err(|e| e.for_target("list repositories", org))?;

        debug!(org, count = repos.len(), "Listed organization repositories");
        Ok(repos.into_iter().map(|r| r.name).collect())
    }

    #[instrument(skip(self))]
    async fn list_branches(&self, org: &str, repo: &str) -> Result<Vec<String>, Error> {
        let path = repo_path(org, repo, "/branches");
        let branches: Vec<ApiName> = self
            .get_all_pages(&path, Vec::new(), None, true)
            .await
            .map_err(|e| e.for_target("list branches", format!("{}/{}", org, repo)))?;

        Ok(branches.into_iter().map(|b| b.name).collect())
    }

    #[instrument(skip(self))]
    async fn list_commits(
        &self,
        org: &str,
        repo: &str,
        branch: &str,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<CommitRecord>, Error> {
        let path = repo_path(org, repo, "/commits");
        let mut query = vec![("since", timestamp(since)), ("until", timestamp(until))];
        if !branch.is_empty() {
            query.push(("sha", branch.to_string()));
        }

        let commits: Vec<ApiCommit> = self
            .get_all_pages(&path, query, None, true)
            .await
            .map_err(|e| e.for_target("list commits", format!("{}/{}", org, repo)))?;

        debug!(org, repo, branch, count = commits.len(), "Listed commits");
        Ok(commits.into_iter().map(CommitRecord::from).collect())
    }

    #[instrument(skip(self))]
    async fn list_pull_requests(
        &self,
        org: &str,
        repo: &str,
    ) -> Result<Vec<PullRequestRecord>, Error> {
        let path = repo_path(org, repo, "/pulls");
        let query = vec![("state", "closed".to_string())];
        let prs: Vec<ApiPullRequest> = self
            .get_all_pages(&path, query, Some(MAX_PULL_REQUEST_PAGES), false)
            .await
            .map_err(|e| e.for_target("list pull requests", format!("{}/{}", org, repo)))?;

        Ok(prs.into_iter().map(PullRequestRecord::from).collect())
    }

    #[instrument(skip(self))]
    async fn list_pull_request_commits(
        &self,
        org: &str,
        repo: &str,
        number: u64,
    ) -> Result<Vec<CommitRecord>, Error> {
        let path = repo_path(org, repo, &format!("/pulls/{}/commits", number));
        let commits: Vec<ApiCommit> = self
            .get_all_pages(&path, Vec::new(), None, false)
            .await
            .map_err(|e| {
                e.for_target(
                    "list pull request commits",
                    format!("{}/{}#{}", org, repo, number),
                )
            })?;

        Ok(commits.into_iter().map(CommitRecord::from).collect())
    }

    #[instrument(skip(self))]
    async fn get_diff(&self, org: &str, repo: &str, sha: &str) -> Result<String, Error> {
        let path = repo_path(org, repo, &format!("/commits/{}", urlencoding::encode(sha)));
        self.retry
            .run(|| async {
                let response = self.send(&path, &[], DIFF_MEDIA_TYPE).await?;
                Ok(response.text().await?)
            })
            .await
            .map_err(|e| e.for_target("get diff", format!("{}/{}@{}", org, repo, sha)))
    }

    async fn get_user_signatures(&self, username: &str) -> Result<Vec<String>, Error> {
        Ok(self.get_user(username).await?.signatures())
    }

    #[instrument(skip(self))]
    async fn get_latest_release(&self, org: &str, repo: &str) -> Result<Option<String>, Error> {
        let path = repo_path(org, repo, "/releases/latest");
        match self.get_json::<ApiRelease>(&path).await {
            Ok(release) => Ok(Some(release.tag_name)),
            Err(Error::ApiError { status: 404, .. }) => Ok(None),
            Err(e) => Err(e.for_target("get latest release", format!("{}/{}", org, repo))),
        }
    }
}
