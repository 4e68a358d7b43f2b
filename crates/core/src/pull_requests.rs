//! Pull request based collection.
//!
//! Older reports were built from pull requests instead of commits: a pull
//! request merged (or, optionally, closed) in the period counts for a user
//! when the user authored or committed any of its commits.

use chrono::{DateTime, Utc};
use pkup_developer_platforms::authorship::{is_in_window, is_pull_request_author};
use pkup_developer_platforms::errors::Error;
use pkup_developer_platforms::models::PullRequestRecord;
use pkup_developer_platforms::RemoteClient;
use tracing::{debug, instrument, trace};

#[cfg(test)]
#[path = "pull_requests_tests.rs"]
mod tests;

/// Lists the pull requests of `repo` that belong to `username`.
///
/// Only the most recent closed pull requests are scanned (see
/// [`pkup_developer_platforms::github::MAX_PULL_REQUEST_PAGES`]). The period
/// filter runs before any per pull request commit listing. Results are
/// ordered by merge time, newest first, with closed-not-merged ones last.
#[instrument(skip(client))]
pub async fn collect_user_pull_requests(
    client: &dyn RemoteClient,
    org: &str,
    repo: &str,
    username: &str,
    since: DateTime<Utc>,
    until: DateTime<Utc>,
    with_closed: bool,
) -> Result<Vec<PullRequestRecord>, Error> {
    let mut in_period: Vec<PullRequestRecord> = client
        .list_pull_requests(org, repo)
        .await?
        .into_iter()
        .filter(|pr| is_in_window(pr, since, until, with_closed))
        .collect();
    in_period.sort_by(|a, b| b.merged_at.cmp(&a.merged_at));
    debug!(count = in_period.len(), "Pull requests closed in the period");

    let mut owned = Vec::new();
    for pr in in_period {
        let commits = client.list_pull_request_commits(org, repo, pr.number).await?;
        if is_pull_request_author(&commits, username) {
            trace!(number = pr.number, "User is one of the pull request authors");
            owned.push(pr);
        }
    }

    Ok(owned)
}
