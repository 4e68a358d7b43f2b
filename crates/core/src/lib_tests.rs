use super::*;
use crate::config::Remote;
use crate::errors::PkupError;
use crate::test_utils::{commit, period, registry_with, MockRemote};
use crate::view::StaticView;
use chrono::TimeZone;
use pkup_developer_platforms::models::PullRequestRecord;
use std::fs;

fn config_with(repos: &[&str], reports: Vec<Report>) -> Config {
    Config {
        repos: repos
            .iter()
            .map(|name| Remote {
                name: name.to_string(),
                ..Default::default()
            })
            .collect(),
        reports,
        ..Default::default()
    }
}

fn report_for(usernames: &[&str], dir: &Path) -> Report {
    Report {
        signatures: usernames
            .iter()
            .map(|username| Signature {
                username: username.to_string(),
                enterprise_url: String::new(),
            })
            .collect(),
        output_dir: dir.display().to_string(),
        ..Default::default()
    }
}

fn shas(result: &ReportResult) -> Vec<&str> {
    result.contributions.iter().map(Contribution::sha).collect()
}

#[tokio::test]
async fn test_compose_report_saves_diffs_and_report() {
    let out = tempfile::tempdir().unwrap();
    let mock = Arc::new(
        MockRemote::new()
            .with_commits(
                "acme/widgets",
                "",
                vec![commit("c1", "alice"), commit("c2", "bob"), commit("c3", "alice")],
            )
            .with_diff("c1", "diff --git a/c1 b/c1")
            .with_user("alice", &["alice", "Alice Example"]),
    );
    let config = config_with(&["acme/widgets"], vec![report_for(&["alice"], out.path())]);
    let composer = Composer::new(config.clone(), registry_with(vec![("", mock.clone())]));
    let (since, until) = period();

    let results = composer
        .compose_report(&config.reports[0], since, until)
        .await
        .expect("report should be composed");

    assert_eq!(results.len(), 1);
    assert_eq!(shas(&results[0]), vec!["c1", "c3"]);
    assert_eq!(
        fs::read_to_string(out.path().join("acme_widgets_c1.diff")).unwrap(),
        "diff --git a/c1 b/c1"
    );
    // c3 has an empty diff: listed in the report, no file written
    assert!(!out.path().join("acme_widgets_c3.diff").exists());

    let report = fs::read_to_string(out.path().join(report::DEFAULT_REPORT_FILE)).unwrap();
    assert!(report.contains(
        "- feat: change c1 (acme_widgets_c1.diff)\n- feat: change c3 (acme_widgets_c3.diff)\n"
    ));
}

#[tokio::test]
async fn test_results_are_sorted_by_repository() {
    let out = tempfile::tempdir().unwrap();
    let mock = Arc::new(
        MockRemote::new()
            .with_commits("acme/zebra", "", vec![commit("z1", "alice")])
            .with_commits("acme/alpha", "", vec![commit("a1", "alice")])
            .with_user("alice", &["alice"]),
    );
    let config = config_with(
        &["acme/zebra", "acme/alpha"],
        vec![report_for(&["alice"], out.path())],
    );
    let composer = Composer::new(config.clone(), registry_with(vec![("", mock)]));
    let (since, until) = period();

    let results = composer
        .compose_report(&config.reports[0], since, until)
        .await
        .unwrap();

    let repos: Vec<&str> = results.iter().map(|r| r.repo.as_str()).collect();
    assert_eq!(repos, vec!["alpha", "zebra"]);
}

#[tokio::test]
async fn test_subjects_share_one_commit_listing() {
    let alice_out = tempfile::tempdir().unwrap();
    let bob_out = tempfile::tempdir().unwrap();
    let mock = Arc::new(
        MockRemote::new()
            .with_commits("acme/widgets", "", vec![commit("c1", "alice"), commit("c2", "bob")])
            .with_user("alice", &["alice"])
            .with_user("bob", &["bob"]),
    );
    let config = config_with(
        &["acme/widgets"],
        vec![
            report_for(&["alice"], alice_out.path()),
            report_for(&["bob"], bob_out.path()),
        ],
    );
    let composer = Composer::new(config.clone(), registry_with(vec![("", mock.clone())]));
    let (since, until) = period();

    let alice = composer
        .compose_report(&config.reports[0], since, until)
        .await
        .unwrap();
    let bob = composer
        .clone()
        .compose_report(&config.reports[1], since, until)
        .await
        .unwrap();

    assert_eq!(shas(&alice[0]), vec!["c1"]);
    assert_eq!(shas(&bob[0]), vec!["c2"]);
    assert_eq!(mock.call_count("list_commits"), 1);
    assert_eq!(mock.call_count("get_user_signatures"), 2);
}

#[tokio::test]
async fn test_failing_subject_does_not_stop_the_others() {
    let alice_out = tempfile::tempdir().unwrap();
    let bob_out = tempfile::tempdir().unwrap();
    let mock = Arc::new(
        MockRemote::new()
            .with_commits("acme/widgets", "", vec![commit("c1", "alice"), commit("c2", "bob")])
            .with_diff("c2", "diff c2")
            .with_user("bob", &["bob"])
            .failing_for("alice"),
    );
    let config = config_with(
        &["acme/widgets"],
        vec![
            report_for(&["alice"], alice_out.path()),
            report_for(&["bob"], bob_out.path()),
        ],
    );
    let composer = Composer::new(config, registry_with(vec![("", mock)]));
    let (since, until) = period();

    let mut view = StaticView::default();
    composer.spawn_reports(&mut view, since, until);
    let result = view.run().await;

    assert_eq!(result, Err(PkupError::TasksFailed(1)));
    assert!(bob_out.path().join(report::DEFAULT_REPORT_FILE).exists());
    assert!(bob_out.path().join("acme_widgets_c2.diff").exists());
    assert!(!alice_out.path().join(report::DEFAULT_REPORT_FILE).exists());
}

#[tokio::test]
async fn test_every_repository_failure_is_reported_and_no_report_is_written() {
    let out = tempfile::tempdir().unwrap();
    let mock = Arc::new(
        MockRemote::new()
            .with_commits("acme/widgets", "", vec![commit("c1", "alice")])
            .with_commits("acme/gadgets", "", vec![commit("c2", "alice")])
            .with_commits("acme/tools", "", vec![commit("c3", "alice")])
            .with_diff("c3", "diff c3")
            .with_user("alice", &["alice"])
            .failing_for("c1")
            .failing_for("c2"),
    );
    let config = config_with(
        &["acme/widgets", "acme/gadgets", "acme/tools"],
        vec![report_for(&["alice"], out.path())],
    );
    let composer = Composer::new(config.clone(), registry_with(vec![("", mock)]));
    let (since, until) = period();

    let result = composer.compose_report(&config.reports[0], since, until).await;

    match result {
        Err(PkupError::Aggregate(errors)) => {
            assert_eq!(errors.len(), 2);
            assert!(errors
                .iter()
                .all(|e| matches!(e, PkupError::Artifact { .. })));
        }
        other => panic!("expected aggregated failures, got {:?}", other),
    }
    assert!(!out.path().join(report::DEFAULT_REPORT_FILE).exists());
    // the healthy repository still saved its diff
    assert!(out.path().join("acme_tools_c3.diff").exists());
}

#[tokio::test]
async fn test_strict_listing_failure_fails_the_subject() {
    let out = tempfile::tempdir().unwrap();
    let mock = Arc::new(
        MockRemote::new()
            .with_user("alice", &["alice"])
            .failing_for("acme/widgets"),
    );
    let mut config = config_with(&["acme/widgets"], vec![report_for(&["alice"], out.path())]);
    config.strict = true;
    let composer = Composer::new(config.clone(), registry_with(vec![("", mock)]));
    let (since, until) = period();

    let result = composer.compose_report(&config.reports[0], since, until).await;

    assert!(matches!(result, Err(PkupError::Listing { target, .. }) if target == "acme/widgets"));
}

#[tokio::test]
async fn test_compose_report_renders_the_configured_template() {
    let out = tempfile::tempdir().unwrap();
    let templates = tempfile::tempdir().unwrap();
    let template = templates.path().join("summary.md");
    fs::write(&template, "# {{ employeeName }}\n{{ result }}").unwrap();

    let mock = Arc::new(
        MockRemote::new()
            .with_commits("acme/widgets", "", vec![commit("c1", "alice")])
            .with_user("alice", &["alice"]),
    );
    let mut report = report_for(&["alice"], out.path());
    report
        .extra_fields
        .insert("employeeName".to_string(), "Alice Example".to_string());
    let mut config = config_with(&["acme/widgets"], vec![report]);
    config.template = Some(template.display().to_string());
    let composer = Composer::new(config.clone(), registry_with(vec![("", mock)]));
    let (since, until) = period();

    composer
        .compose_report(&config.reports[0], since, until)
        .await
        .unwrap();

    let rendered = fs::read_to_string(out.path().join("summary.md")).unwrap();
    assert_eq!(
        rendered,
        "# Alice Example\n- feat: change c1 (acme_widgets_c1.diff)\n"
    );
    assert!(!out.path().join(report::DEFAULT_REPORT_FILE).exists());
}

#[tokio::test]
async fn test_pull_request_mode() {
    let out = tempfile::tempdir().unwrap();
    let merged = PullRequestRecord {
        number: 42,
        title: "Add the export command".to_string(),
        merged_at: Some(Utc.with_ymd_and_hms(2024, 2, 1, 10, 0, 0).unwrap()),
        closed_at: Some(Utc.with_ymd_and_hms(2024, 2, 1, 10, 0, 0).unwrap()),
        merge_commit_sha: Some("0123456789abcdef".to_string()),
    };
    let mock = Arc::new(
        MockRemote::new()
            .with_pull_requests("acme/widgets", vec![merged])
            .with_pull_request_commits("acme/widgets", 42, vec![commit("c1", "alice")])
            .with_diff("0123456789abcdef", "diff pr 42"),
    );
    let config = config_with(&["acme/widgets"], vec![report_for(&["alice"], out.path())]);
    let composer = Composer::new(config.clone(), registry_with(vec![("", mock.clone())]))
        .with_mode(Mode::PullRequests { with_closed: false });
    let (since, until) = period();

    let results = composer
        .compose_report(&config.reports[0], since, until)
        .await
        .unwrap();

    assert_eq!(shas(&results[0]), vec!["0123456789abcdef"]);
    assert_eq!(
        fs::read_to_string(out.path().join("acme_widgets_01234567.diff")).unwrap(),
        "diff pr 42"
    );
    let report = fs::read_to_string(out.path().join(report::DEFAULT_REPORT_FILE)).unwrap();
    assert!(report.contains("- Add the export command (acme_widgets_01234567.diff)\n"));
    assert_eq!(mock.call_count("list_commits"), 0);
    assert_eq!(mock.call_count("get_user_signatures"), 0);
}

#[tokio::test]
async fn test_pull_request_subjects_share_one_resolution() {
    let out_alice = tempfile::tempdir().unwrap();
    let out_bob = tempfile::tempdir().unwrap();
    let mock = Arc::new(
        MockRemote::new()
            .with_org("acme", &["widgets"])
            .with_branches("acme/widgets", &["main"]),
    );
    let config = Config {
        orgs: vec![Remote {
            name: "acme".to_string(),
            all_branches: true,
            ..Default::default()
        }],
        reports: vec![
            report_for(&["alice"], out_alice.path()),
            report_for(&["bob"], out_bob.path()),
        ],
        ..Default::default()
    };
    let composer = Composer::new(config.clone(), registry_with(vec![("", mock.clone())]))
        .with_mode(Mode::PullRequests { with_closed: true });
    let (since, until) = period();

    let (first, second) = tokio::join!(
        composer.compose_report(&config.reports[0], since, until),
        composer.compose_report(&config.reports[1], since, until),
    );

    assert!(first.is_ok());
    assert!(second.is_ok());
    assert_eq!(mock.call_count("list_repositories"), 1);
    assert_eq!(mock.call_count("list_branches"), 1);
    assert_eq!(mock.call_count("list_pull_requests"), 2);
}
