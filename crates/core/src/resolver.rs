use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::OnceCell;
use tracing::{debug, info, instrument};

use crate::config::{Config, Remote};
use crate::errors::PkupError;
use crate::registry::RemoteRegistry;

#[cfg(test)]
#[path = "resolver_tests.rs"]
mod tests;

/// A repository to read commits from, after organizations were expanded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepoTarget {
    pub org: String,
    pub repo: String,
    pub enterprise_url: String,

    /// Branches to list; empty means the default branch only
    pub branches: Vec<String>,
    pub unique_only: bool,
}

impl RepoTarget {
    /// `org/repo`
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.org, self.repo)
    }
}

/// Resolves the repository targets once per instance.
///
/// Commit listing and every pull request subject of a run share one
/// resolver, so organizations and branches are listed once per run.
#[derive(Debug, Default)]
pub struct RepoResolver {
    cell: OnceCell<Result<Arc<Vec<RepoTarget>>, PkupError>>,
}

impl RepoResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the memoized targets, resolving them on first use.
    ///
    /// A failed resolution is cached too.
    pub async fn resolve(
        &self,
        config: &Config,
        registry: &RemoteRegistry,
    ) -> Result<Arc<Vec<RepoTarget>>, PkupError> {
        self.cell
            .get_or_init(|| async { resolve_repositories(config, registry).await.map(Arc::new) })
            .await
            .clone()
    }
}

/// Expands the configured organizations and repositories into repo targets.
///
/// Explicit repositories come first and are kept as configured. Every
/// repository found in an organization is added with the organization's
/// settings unless an explicit entry already has the same `org/repo` name.
/// Targets with `allBranches` get the repository's full branch list.
///
/// Any listing failure aborts the whole resolution.
#[instrument(skip_all)]
pub async fn resolve_repositories(
    config: &Config,
    registry: &RemoteRegistry,
) -> Result<Vec<RepoTarget>, PkupError> {
    let explicit: HashSet<&str> = config.repos.iter().map(|r| r.name.as_str()).collect();
    let mut remotes: Vec<Remote> = config.repos.clone();

    for org in &config.orgs {
        let client = registry.require(&org.enterprise_url)?;
        let names = client
            .list_repositories(&org.name)
            .await
            .map_err(|e| PkupError::Resolution(e.to_string()))?;

        let before = remotes.len();
        for name in names {
            let full_name = format!("{}/{}", org.name, name);
            if explicit.contains(full_name.as_str()) {
                debug!(repo = full_name.as_str(), "Explicit repository entry wins");
                continue;
            }

            remotes.push(Remote {
                name: full_name,
                ..org.clone()
            });
        }

        debug!(
            org = org.name.as_str(),
            count = remotes.len() - before,
            "Expanded organization"
        );
    }

    let mut targets = Vec::with_capacity(remotes.len());
    for remote in remotes {
        let (org, repo) = remote.org_and_repo().ok_or_else(|| {
            PkupError::Resolution(format!("'{}' is not an <org>/<repo> name", remote.name))
        })?;

        let branches = if remote.all_branches {
            let client = registry.require(&remote.enterprise_url)?;
            client
                .list_branches(org, repo)
                .await
                .map_err(|e| PkupError::Resolution(e.to_string()))?
        } else {
            remote.branches.clone()
        };

        targets.push(RepoTarget {
            org: org.to_string(),
            repo: repo.to_string(),
            enterprise_url: remote.enterprise_url.clone(),
            branches,
            unique_only: remote.unique_only,
        });
    }

    info!(count = targets.len(), "Resolved repositories");
    Ok(targets)
}
