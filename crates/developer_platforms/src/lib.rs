use async_trait::async_trait;
use chrono::{DateTime, Utc};

pub mod authorship;

pub mod errors;

pub mod github;

pub mod models;

pub mod pagination;

use errors::Error;
use models::{CommitRecord, PullRequestRecord};

/// Trait for reading commit history from a code hosting platform.
///
/// One implementation is bound to one host (the public GitHub instance or a
/// GitHub Enterprise Server). All listing methods return every page of the
/// underlying listing; rate-limited responses are retried by the
/// implementation before an error is surfaced.
///
/// # Example Implementation
///
/// ```rust,no_run
/// use async_trait::async_trait;
/// use chrono::{DateTime, Utc};
/// use pkup_developer_platforms::{
///     errors::Error,
///     models::{CommitRecord, PullRequestRecord},
///     RemoteClient,
/// };
///
/// #[derive(Debug)]
/// struct StaticRemote {
///     commits: Vec<CommitRecord>,
/// }
///
/// #[async_trait]
/// impl RemoteClient for StaticRemote {
///     async fn list_commits(
///         &self,
///         _org: &str,
///         _repo: &str,
///         _branch: &str,
///         _since: DateTime<Utc>,
///         _until: DateTime<Utc>,
///     ) -> Result<Vec<CommitRecord>, Error> {
///         Ok(self.commits.clone())
///     }
///
///     // Implement other required methods...
///     # async fn list_repositories(&self, _: &str) -> Result<Vec<String>, Error> { unimplemented!() }
///     # async fn list_branches(&self, _: &str, _: &str) -> Result<Vec<String>, Error> { unimplemented!() }
///     # async fn list_pull_requests(&self, _: &str, _: &str) -> Result<Vec<PullRequestRecord>, Error> { unimplemented!() }
///     # async fn list_pull_request_commits(&self, _: &str, _: &str, _: u64) -> Result<Vec<CommitRecord>, Error> { unimplemented!() }
///     # async fn get_diff(&self, _: &str, _: &str, _: &str) -> Result<String, Error> { unimplemented!() }
///     # async fn get_user_signatures(&self, _: &str) -> Result<Vec<String>, Error> { unimplemented!() }
///     # async fn get_latest_release(&self, _: &str, _: &str) -> Result<Option<String>, Error> { unimplemented!() }
/// }
/// ```
#[async_trait]
pub trait RemoteClient: Send + Sync + std::fmt::Debug {
    /// Lists the names of all repositories in an organization.
    ///
    /// An organization without repositories yields an empty list.
    async fn list_repositories(&self, org: &str) -> Result<Vec<String>, Error>;

    /// Lists the branch names of a repository.
    ///
    /// An empty repository yields an empty list.
    async fn list_branches(&self, org: &str, repo: &str) -> Result<Vec<String>, Error>;

    /// Lists the commits of `branch` created between `since` and `until`.
    ///
    /// An empty `branch` selects the repository's default branch. An empty
    /// repository yields an empty list.
    async fn list_commits(
        &self,
        org: &str,
        repo: &str,
        branch: &str,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<CommitRecord>, Error>;

    /// Lists the closed pull requests of a repository, most recent first.
    async fn list_pull_requests(
        &self,
        org: &str,
        repo: &str,
    ) -> Result<Vec<PullRequestRecord>, Error>;

    /// Lists the commits that make up a pull request.
    async fn list_pull_request_commits(
        &self,
        org: &str,
        repo: &str,
        number: u64,
    ) -> Result<Vec<CommitRecord>, Error>;

    /// Returns the unified diff of a single commit.
    async fn get_diff(&self, org: &str, repo: &str, sha: &str) -> Result<String, Error>;

    /// Returns the identities a user can appear under in commit data:
    /// the profile display name (when set) followed by the login.
    async fn get_user_signatures(&self, username: &str) -> Result<Vec<String>, Error>;

    /// Returns the tag of the latest published release, or `None` when the
    /// repository has no releases.
    async fn get_latest_release(&self, org: &str, repo: &str) -> Result<Option<String>, Error>;
}
