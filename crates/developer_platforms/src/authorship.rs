//! Decides whether a commit or pull request belongs to a person.
//!
//! GitHub records authorship differently depending on how a commit was made
//! (web UI, rebase, squash merge, signed commit), so a commit is attributed to
//! an identity if any of these match:
//!
//! - the author's login or display name,
//! - the committer's login or display name,
//! - an `author <identity> ` or `Co-authored-by: <identity> ` line in a
//!   verified signature payload.

use chrono::{DateTime, Utc};

use crate::models::{CommitRecord, PullRequestRecord};

#[cfg(test)]
#[path = "authorship_tests.rs"]
mod tests;

/// Returns `true` if `identity` is the author, committer or a co-author of `commit`.
///
/// An empty identity never matches.
pub fn is_author(commit: &CommitRecord, identity: &str) -> bool {
    if identity.is_empty() {
        return false;
    }

    commit.author.matches(identity)
        || commit.committer.matches(identity)
        || is_verified_payload_author(commit, identity)
}

fn is_verified_payload_author(commit: &CommitRecord, identity: &str) -> bool {
    let payload = match &commit.verification {
        Some(v) if v.verified => match v.payload.as_deref() {
            Some(p) => p,
            None => return false,
        },
        _ => return false,
    };

    let author_prefix = format!("author {} ", identity);
    let co_author_prefix = format!("Co-authored-by: {} ", identity);
    payload
        .lines()
        .any(|line| line.starts_with(&author_prefix) || line.starts_with(&co_author_prefix))
}

/// Keeps the commits that belong to any of the given identities.
///
/// Identities are tried in order and the first match wins, so a commit
/// matching several identities is still returned once.
pub fn filter_user_commits(commits: &[CommitRecord], identities: &[String]) -> Vec<CommitRecord> {
    commits
        .iter()
        .filter(|commit| identities.iter().any(|identity| is_author(commit, identity)))
        .cloned()
        .collect()
}

/// Returns `true` if `login` authored or committed any of the pull request's commits.
pub fn is_pull_request_author(commits: &[CommitRecord], login: &str) -> bool {
    if login.is_empty() {
        return false;
    }

    commits.iter().any(|commit| {
        commit.author.login.as_deref() == Some(login)
            || commit.committer.login.as_deref() == Some(login)
    })
}

/// Returns `true` if the pull request was merged inside `(after, before)`,
/// or, with `include_closed`, closed without merging inside that window.
pub fn is_in_window(
    pr: &PullRequestRecord,
    after: DateTime<Utc>,
    before: DateTime<Utc>,
    include_closed: bool,
) -> bool {
    let inside = |at: DateTime<Utc>| at > after && at < before;

    match (pr.merged_at, pr.closed_at) {
        (Some(merged_at), _) => inside(merged_at),
        (None, Some(closed_at)) => include_closed && inside(closed_at),
        (None, None) => false,
    }
}
