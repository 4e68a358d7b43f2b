//! Memoized commit listing.
//!
//! Commits are listed per repository without regard to who wrote them, so the
//! same listing serves every report subject. [`CommitLister`] computes it at
//! most once: the first caller resolves the repositories and fans out one task
//! per repository, callers arriving in the meantime wait for that same
//! computation, and later callers get the cached value.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use pkup_developer_platforms::errors::Error;
use pkup_developer_platforms::models::CommitRecord;
use pkup_developer_platforms::RemoteClient;
use tokio::sync::OnceCell;
use tokio::task::JoinSet;
use tracing::{debug, info, instrument, warn};

use crate::config::Config;
use crate::errors::PkupError;
use crate::registry::RemoteRegistry;
use crate::resolver::{RepoResolver, RepoTarget};

#[cfg(test)]
#[path = "lister_tests.rs"]
mod tests;

/// Commits of one repository across its listed branches.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepoCommits {
    pub org: String,
    pub repo: String,
    pub enterprise_url: String,
    pub commits: Vec<CommitRecord>,
}

pub type RepoCommitsList = Vec<RepoCommits>;

/// Keeps the first commit for every SHA.
pub fn unique_by_sha(commits: Vec<CommitRecord>) -> Vec<CommitRecord> {
    let mut seen = HashSet::new();
    commits
        .into_iter()
        .filter(|commit| seen.insert(commit.sha.clone()))
        .collect()
}

/// Lists commits of every branch in the target's branch plan.
///
/// An empty branch plan lists the default branch.
#[instrument(skip(client, target), fields(repo = %target.full_name()))]
pub async fn list_repo_commits(
    client: &dyn RemoteClient,
    target: &RepoTarget,
    since: DateTime<Utc>,
    until: DateTime<Utc>,
) -> Result<Vec<CommitRecord>, Error> {
    let default_branch = [String::new()];
    let branches: &[String] = if target.branches.is_empty() {
        &default_branch
    } else {
        &target.branches
    };

    let mut commits = Vec::new();
    for branch in branches {
        let listed = client
            .list_commits(&target.org, &target.repo, branch, since, until)
            .await?;
        debug!(branch = branch.as_str(), count = listed.len(), "Listed branch commits");
        commits.extend(listed);
    }

    if target.unique_only {
        commits = unique_by_sha(commits);
    }

    Ok(commits)
}

/// Computes the repository commit listing once per instance.
///
/// The first call's configuration and window are the ones used; later calls
/// return the same result whatever they pass.
#[derive(Debug)]
pub struct CommitLister {
    strict: bool,
    resolver: Arc<RepoResolver>,
    cell: OnceCell<Result<Arc<RepoCommitsList>, PkupError>>,
}

impl CommitLister {
    /// With `strict`, a repository whose commits cannot be listed fails the
    /// listing. Otherwise it is logged and reported with no commits.
    pub fn new(strict: bool) -> Self {
        Self::with_resolver(strict, Arc::new(RepoResolver::new()))
    }

    /// Like [`CommitLister::new`], reading the targets from a shared resolver.
    pub fn with_resolver(strict: bool, resolver: Arc<RepoResolver>) -> Self {
        Self {
            strict,
            resolver,
            cell: OnceCell::new(),
        }
    }

    /// Returns the memoized listing, computing it on first use.
    pub async fn list(
        &self,
        config: &Config,
        registry: &RemoteRegistry,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Arc<RepoCommitsList>, PkupError> {
        self.cell
            .get_or_init(|| async {
                self.fetch(config, registry, since, until)
                    .await
                    .map(Arc::new)
            })
            .await
            .clone()
    }

    #[instrument(skip_all)]
    async fn fetch(
        &self,
        config: &Config,
        registry: &RemoteRegistry,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<RepoCommitsList, PkupError> {
        let targets = self.resolver.resolve(config, registry).await?;

        let mut tasks = JoinSet::new();
        for (index, target) in targets.iter().cloned().enumerate() {
            let client = registry.require(&target.enterprise_url)?;
            tasks.spawn(async move {
                let result = list_repo_commits(client.as_ref(), &target, since, until).await;
                (index, result)
            });
        }

        let mut listings: Vec<Option<Vec<CommitRecord>>> = vec![None; targets.len()];
        let mut errors = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            let (index, result) = match joined {
                Ok(value) => value,
                Err(e) => {
                    errors.push(PkupError::Listing {
                        target: "unknown repository".to_string(),
                        message: e.to_string(),
                    });
                    continue;
                }
            };

            let target = &targets[index];
            match result {
                Ok(commits) => listings[index] = Some(commits),
                Err(e) if self.strict => errors.push(PkupError::Listing {
                    target: target.full_name(),
                    message: e.to_string(),
                }),
                Err(e) => {
                    warn!(
                        repo = %target.full_name(),
                        error = %e,
                        "Failed to list commits, the repository is reported without commits"
                    );
                }
            }
        }

        PkupError::from_errors(errors)?;

        let result: RepoCommitsList = targets
            .iter()
            .zip(listings)
            .map(|(target, commits)| RepoCommits {
                org: target.org.clone(),
                repo: target.repo.clone(),
                enterprise_url: target.enterprise_url.clone(),
                commits: commits.unwrap_or_default(),
            })
            .collect();

        info!(
            repositories = result.len(),
            commits = result.iter().map(|r| r.commits.len()).sum::<usize>(),
            "Listed repository commits"
        );
        Ok(result)
    }
}
