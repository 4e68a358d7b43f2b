use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use pkup_developer_platforms::errors::Error;
use pkup_developer_platforms::models::{CommitRecord, Identity, PullRequestRecord};
use pkup_developer_platforms::RemoteClient;

use crate::registry::RemoteRegistry;

/// In-memory remote that records every call it receives.
#[derive(Debug, Default)]
pub struct MockRemote {
    repos: HashMap<String, Vec<String>>,
    branches: HashMap<String, Vec<String>>,
    commits: HashMap<(String, String), Vec<CommitRecord>>,
    pull_requests: HashMap<String, Vec<PullRequestRecord>>,
    pull_request_commits: HashMap<(String, u64), Vec<CommitRecord>>,
    diffs: HashMap<String, String>,
    signatures: HashMap<String, Vec<String>>,
    failing: HashSet<String>,
    delay: Option<Duration>,
    calls: Mutex<Vec<String>>,
}

impl MockRemote {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_org(mut self, org: &str, repos: &[&str]) -> Self {
        self.repos
            .insert(org.to_string(), repos.iter().map(|r| r.to_string()).collect());
        self
    }

    pub fn with_branches(mut self, repo: &str, branches: &[&str]) -> Self {
        self.branches
            .insert(repo.to_string(), branches.iter().map(|b| b.to_string()).collect());
        self
    }

    /// Commits returned for `repo` (`org/repo`) on `branch` (`""` is the default branch).
    pub fn with_commits(mut self, repo: &str, branch: &str, commits: Vec<CommitRecord>) -> Self {
        self.commits
            .insert((repo.to_string(), branch.to_string()), commits);
        self
    }

    pub fn with_pull_requests(mut self, repo: &str, prs: Vec<PullRequestRecord>) -> Self {
        self.pull_requests.insert(repo.to_string(), prs);
        self
    }

    pub fn with_pull_request_commits(
        mut self,
        repo: &str,
        number: u64,
        commits: Vec<CommitRecord>,
    ) -> Self {
        self.pull_request_commits
            .insert((repo.to_string(), number), commits);
        self
    }

    pub fn with_diff(mut self, sha: &str, diff: &str) -> Self {
        self.diffs.insert(sha.to_string(), diff.to_string());
        self
    }

    pub fn with_user(mut self, username: &str, signatures: &[&str]) -> Self {
        self.signatures.insert(
            username.to_string(),
            signatures.iter().map(|s| s.to_string()).collect(),
        );
        self
    }

    /// Every call naming `target` (an org, `org/repo` or username) fails.
    pub fn failing_for(mut self, target: &str) -> Self {
        self.failing.insert(target.to_string());
        self
    }

    /// Every call sleeps before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn into_arc(self) -> Arc<dyn RemoteClient> {
        Arc::new(self)
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self, prefix: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }

    async fn record(&self, call: String, target: &str) -> Result<(), Error> {
        self.calls.lock().unwrap().push(call);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if self.failing.contains(target) {
            return Err(Error::ApiError {
                status: 500,
                message: format!("{} is broken", target),
            });
        }

        Ok(())
    }
}

#[async_trait]
impl RemoteClient for MockRemote {
    async fn list_repositories(&self, org: &str) -> Result<Vec<String>, Error> {
        self.record(format!("list_repositories {}", org), org).await?;
        Ok(self.repos.get(org).cloned().unwrap_or_default())
    }

    async fn list_branches(&self, org: &str, repo: &str) -> Result<Vec<String>, Error> {
        let name = format!("{}/{}", org, repo);
        self.record(format!("list_branches {}", name), &name).await?;
        Ok(self.branches.get(&name).cloned().unwrap_or_default())
    }

    async fn list_commits(
        &self,
        org: &str,
        repo: &str,
        branch: &str,
        _since: DateTime<Utc>,
        _until: DateTime<Utc>,
    ) -> Result<Vec<CommitRecord>, Error> {
        let name = format!("{}/{}", org, repo);
        self.record(format!("list_commits {} {}", name, branch), &name)
            .await?;
        Ok(self
            .commits
            .get(&(name, branch.to_string()))
            .cloned()
            .unwrap_or_default())
    }

    async fn list_pull_requests(
        &self,
        org: &str,
        repo: &str,
    ) -> Result<Vec<PullRequestRecord>, Error> {
        let name = format!("{}/{}", org, repo);
        self.record(format!("list_pull_requests {}", name), &name)
            .await?;
        Ok(self.pull_requests.get(&name).cloned().unwrap_or_default())
    }

    async fn list_pull_request_commits(
        &self,
        org: &str,
        repo: &str,
        number: u64,
    ) -> Result<Vec<CommitRecord>, Error> {
        let name = format!("{}/{}", org, repo);
        self.record(format!("list_pull_request_commits {} {}", name, number), &name)
            .await?;
        Ok(self
            .pull_request_commits
            .get(&(name, number))
            .cloned()
            .unwrap_or_default())
    }

    async fn get_diff(&self, org: &str, repo: &str, sha: &str) -> Result<String, Error> {
        let name = format!("{}/{}", org, repo);
        self.record(format!("get_diff {} {}", name, sha), sha).await?;
        Ok(self.diffs.get(sha).cloned().unwrap_or_default())
    }

    async fn get_user_signatures(&self, username: &str) -> Result<Vec<String>, Error> {
        self.record(format!("get_user_signatures {}", username), username)
            .await?;
        Ok(self.signatures.get(username).cloned().unwrap_or_default())
    }

    async fn get_latest_release(&self, org: &str, repo: &str) -> Result<Option<String>, Error> {
        let name = format!("{}/{}", org, repo);
        self.record(format!("get_latest_release {}", name), &name)
            .await?;
        Ok(None)
    }
}

/// A commit authored by `login` with a `feat: <sha>` message.
pub fn commit(sha: &str, login: &str) -> CommitRecord {
    CommitRecord {
        sha: sha.to_string(),
        message: format!("feat: change {}\n\ndetails", sha),
        author: Identity {
            login: Some(login.to_string()),
            name: None,
            email: None,
        },
        committer: Identity::default(),
        verification: None,
    }
}

/// A registry holding the given mocks. The mocks stay reachable through the
/// returned `Arc`s so tests can inspect recorded calls.
pub fn registry_with(clients: Vec<(&str, Arc<MockRemote>)>) -> RemoteRegistry {
    RemoteRegistry::from_clients(
        clients
            .into_iter()
            .map(|(host, client)| (host.to_string(), client as Arc<dyn RemoteClient>)),
    )
}

pub fn period() -> (DateTime<Utc>, DateTime<Utc>) {
    use chrono::TimeZone;
    (
        Utc.with_ymd_and_hms(2024, 1, 18, 23, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(2024, 2, 18, 22, 59, 59).unwrap(),
    )
}
