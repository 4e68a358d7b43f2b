use super::*;
use serde_json::{from_str, to_string};

#[test]
fn test_commit_title_uses_first_line() {
    let commit = CommitRecord {
        sha: "1".to_string(),
        message: "feat: add report\n\nCo-authored-by: Bob <bob@example.com>".to_string(),
        ..Default::default()
    };

    assert_eq!(commit.title(), "feat: add report");
}

#[test]
fn test_commit_title_of_empty_message() {
    let commit = CommitRecord::default();

    assert_eq!(commit.title(), "");
}

#[test]
fn test_commit_round_trips_through_json() {
    let commit = CommitRecord {
        sha: "abc".to_string(),
        message: "msg".to_string(),
        author: Identity {
            login: Some("alice".to_string()),
            name: Some("Alice Example".to_string()),
            email: None,
        },
        committer: Identity::default(),
        verification: Some(Verification {
            verified: true,
            payload: Some("author Alice Example <a@example.com> 1 +0000".to_string()),
        }),
    };

    let json_str = to_string(&commit).expect("Failed to serialize CommitRecord");
    let parsed: CommitRecord = from_str(&json_str).expect("Failed to deserialize CommitRecord");

    assert_eq!(parsed, commit);
}

#[test]
fn test_identity_matches_login_or_name() {
    let identity = Identity {
        login: Some("alice".to_string()),
        name: Some("Alice Example".to_string()),
        email: Some("alice@example.com".to_string()),
    };

    assert!(identity.matches("alice"));
    assert!(identity.matches("Alice Example"));
    assert!(!identity.matches("alice@example.com"));
    assert!(!identity.matches("bob"));
}

#[test]
fn test_pull_request_merged_state() {
    let merged = PullRequestRecord {
        number: 1,
        merged_at: Some(Utc::now()),
        closed_at: Some(Utc::now()),
        ..Default::default()
    };
    let closed = PullRequestRecord {
        number: 2,
        closed_at: Some(Utc::now()),
        ..Default::default()
    };

    assert!(merged.is_merged());
    assert!(!closed.is_merged());
}

#[test]
fn test_user_signatures_name_then_login() {
    let user = User {
        login: "alice".to_string(),
        name: Some("Alice Example".to_string()),
        email: None,
    };

    assert_eq!(user.signatures(), vec!["Alice Example", "alice"]);
}

#[test]
fn test_user_signatures_skip_empty_name() {
    let user = User {
        login: "alice".to_string(),
        name: Some(String::new()),
        email: None,
    };

    assert_eq!(user.signatures(), vec!["alice"]);
}
