//! # Models
//!
//! This module contains the data models returned by the developer platform
//! clients.
//!
//! The platform APIs surface identity information inconsistently (some
//! responses only carry a login, others only a git display name), so the
//! models flatten everything into optional fields that the authorship checks
//! in [`crate::authorship`] can compare against.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[cfg(test)]
#[path = "models_tests.rs"]
mod tests;

/// Identity of a commit author or committer.
///
/// `login` is the platform account the commit was linked to, `name` and `email`
/// come from the git signature.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// The platform login, if the commit is linked to an account
    pub login: Option<String>,

    /// The display name from the git signature
    pub name: Option<String>,

    /// The email address from the git signature
    pub email: Option<String>,
}

impl Identity {
    /// Returns `true` if the login or the display name equals `identity`.
    pub fn matches(&self, identity: &str) -> bool {
        self.login.as_deref() == Some(identity) || self.name.as_deref() == Some(identity)
    }
}

/// Signature verification information attached to a commit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verification {
    /// Whether the platform verified the GPG/SSH signature
    pub verified: bool,

    /// The raw signed commit text. Contains `author`, `committer` and any
    /// `Co-authored-by:` lines.
    pub payload: Option<String>,
}

/// A single commit as listed from a repository.
///
/// # Examples
///
/// ```
/// use pkup_developer_platforms::models::{CommitRecord, Identity};
///
/// let commit = CommitRecord {
///     sha: "abcdef1234567890".to_string(),
///     message: "fix: handle empty repositories\n\nDetails".to_string(),
///     author: Identity {
///         login: Some("alice".to_string()),
///         ..Default::default()
///     },
///     ..Default::default()
/// };
///
/// assert_eq!(commit.title(), "fix: handle empty repositories");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitRecord {
    /// The full commit SHA
    pub sha: String,

    /// The full commit message
    pub message: String,

    /// Who wrote the change
    pub author: Identity,

    /// Who created the commit object
    pub committer: Identity,

    /// Signature verification details, when the platform returned them
    pub verification: Option<Verification>,
}

impl CommitRecord {
    /// The first line of the commit message.
    pub fn title(&self) -> &str {
        self.message.lines().next().unwrap_or_default()
    }
}

/// A closed pull request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequestRecord {
    /// The pull request number
    pub number: u64,

    /// The title of the pull request
    pub title: String,

    /// When the pull request was merged; `None` if it was closed without merging
    pub merged_at: Option<DateTime<Utc>>,

    /// When the pull request was closed
    pub closed_at: Option<DateTime<Utc>>,

    /// The SHA of the merge commit, if any
    pub merge_commit_sha: Option<String>,
}

impl PullRequestRecord {
    /// A pull request counts as merged when it carries a merge timestamp.
    pub fn is_merged(&self) -> bool {
        self.merged_at.is_some()
    }
}

/// A platform user account.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// The account login
    pub login: String,

    /// The display name configured on the profile
    pub name: Option<String>,

    /// The public email address configured on the profile
    pub email: Option<String>,
}

impl User {
    /// The strings this user can appear under in commit data: display name
    /// first, then login. Empty values are skipped.
    pub fn signatures(&self) -> Vec<String> {
        let mut signatures = Vec::new();
        if let Some(name) = self.name.as_deref().filter(|n| !n.is_empty()) {
            signatures.push(name.to_string());
        }

        if !self.login.is_empty() {
            signatures.push(self.login.clone());
        }

        signatures
    }
}
