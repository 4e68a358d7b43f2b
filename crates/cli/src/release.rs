//! Release advisory.

use std::time::Duration;

use pkup_developer_platforms::errors::Error;
use pkup_developer_platforms::github::GitHubClient;
use pkup_developer_platforms::pagination::RetryPolicy;
use pkup_developer_platforms::RemoteClient;
use tracing::{trace, warn};

#[cfg(test)]
#[path = "release_tests.rs"]
mod tests;

/// Organization publishing the tool
pub const UPSTREAM_ORG: &str = "pPrecel";

/// Repository publishing the tool
pub const UPSTREAM_REPO: &str = "PKUP";

/// Version of this binary
pub const CURRENT_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Longest time the release lookup may take
pub const RELEASE_CHECK_TIMEOUT: Duration = Duration::from_secs(3);

/// Client for the release lookup.
///
/// A rate-limited lookup is not retried: the advisory never waits for a
/// rate limit to reset.
pub fn advisory_client(client: GitHubClient) -> GitHubClient {
    client.with_retry_policy(RetryPolicy {
        max_attempts: 1,
        ..RetryPolicy::default()
    })
}

/// Advisory client for the public host, authenticated when a token is known.
pub fn public_advisory_client(token: Option<String>) -> Result<GitHubClient, Error> {
    Ok(advisory_client(GitHubClient::new(token, "")?))
}

/// Returns `true` when `latest` names another version than `current`.
/// A leading `v` is ignored on both.
pub fn is_outdated(current: &str, latest: &str) -> bool {
    current.trim_start_matches('v') != latest.trim_start_matches('v')
}

/// Tag of the latest upstream release.
///
/// Lookup failures and lookups exceeding [`RELEASE_CHECK_TIMEOUT`] are only
/// traced.
pub async fn latest_release(client: &dyn RemoteClient) -> Option<String> {
    let lookup = client.get_latest_release(UPSTREAM_ORG, UPSTREAM_REPO);
    match tokio::time::timeout(RELEASE_CHECK_TIMEOUT, lookup).await {
        Ok(Ok(tag)) => tag,
        Ok(Err(e)) => {
            trace!(error = %e, "Failed to look up the latest release");
            None
        }
        Err(_) => {
            trace!(
                timeout_secs = RELEASE_CHECK_TIMEOUT.as_secs(),
                "The latest release lookup timed out"
            );
            None
        }
    }
}

/// Warns when a newer release exists. Returns the advertised tag.
pub async fn check_for_update(client: &dyn RemoteClient, current: &str) -> Option<String> {
    let latest = latest_release(client).await?;
    if !is_outdated(current, &latest) {
        trace!(version = current, "Running the latest release");
        return None;
    }

    warn!(
        current = current,
        latest = latest.as_str(),
        "A new pkup release is available: https://github.com/{}/{}/releases/latest",
        UPSTREAM_ORG,
        UPSTREAM_REPO
    );
    Some(latest)
}
