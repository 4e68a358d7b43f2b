use super::*;
use crate::report::Contribution;
use crate::test_utils::commit;

fn result_with(count: usize) -> TaskResult {
    Ok(vec![ReportResult {
        org: "acme".to_string(),
        repo: "widgets".to_string(),
        contributions: (0..count)
            .map(|i| Contribution::Commit(commit(&format!("sha{}", i), "alice")))
            .collect(),
    }])
}

#[test]
fn test_outcome_from_received() {
    assert_eq!(
        TaskOutcome::from_received("alice", Ok(result_with(3))),
        TaskOutcome::Found(3)
    );
    assert_eq!(
        TaskOutcome::from_received("alice", Ok(result_with(0))),
        TaskOutcome::Empty
    );
    assert_eq!(
        TaskOutcome::from_received("alice", Ok(Ok(Vec::new()))),
        TaskOutcome::Empty
    );
    assert_eq!(
        TaskOutcome::from_received("alice", Ok(Err(PkupError::Report("boom".to_string())))),
        TaskOutcome::Failed(PkupError::Report("boom".to_string()))
    );
}

#[test]
fn test_outcome_messages() {
    assert_eq!(TaskOutcome::Found(2).message("alice"), "found 2 contributions for 'alice'");
    assert_eq!(
        TaskOutcome::Empty.message("bob"),
        "skipping 'bob' no user activity detected"
    );
    assert_eq!(
        TaskOutcome::Failed(PkupError::TaskAborted("carol".to_string())).message("carol"),
        "'carol' failed: Task 'carol' stopped without a result"
    );
}

#[tokio::test]
async fn test_static_view_succeeds_when_every_task_succeeds() {
    let mut view = StaticView::default();
    for (name, count) in [("alice", 2), ("bob", 0)] {
        let (tx, rx) = task_channel();
        view.add(name.to_string(), rx);
        tokio::spawn(async move {
            let _ = tx.send(result_with(count));
        });
    }

    assert_eq!(view.run().await, Ok(()));
}

#[tokio::test]
async fn test_static_view_counts_failed_and_dropped_tasks() {
    let mut view = StaticView::default();

    let (ok_tx, ok_rx) = task_channel();
    let (err_tx, err_rx) = task_channel();
    let (dropped_tx, dropped_rx) = task_channel();
    view.add("alice".to_string(), ok_rx);
    view.add("bob".to_string(), err_rx);
    view.add("carol".to_string(), dropped_rx);

    let _ = ok_tx.send(result_with(1));
    let _ = err_tx.send(Err(PkupError::IdentityLookup {
        username: "bob".to_string(),
        message: "Not Found".to_string(),
    }));
    drop(dropped_tx);

    assert_eq!(view.run().await, Err(PkupError::TasksFailed(2)));
}

#[tokio::test]
async fn test_dynamic_view_reports_failures() {
    let mut view = DynamicView::with_draw_target(ProgressDrawTarget::hidden());

    let (ok_tx, ok_rx) = task_channel();
    let (err_tx, err_rx) = task_channel();
    view.add("alice".to_string(), ok_rx);
    view.add("bob".to_string(), err_rx);

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(10)).await;
        let _ = ok_tx.send(result_with(1));
        let _ = err_tx.send(Err(PkupError::Report("no template".to_string())));
    });

    assert_eq!(view.run().await, Err(PkupError::TasksFailed(1)));
}

#[tokio::test]
async fn test_view_without_tasks() {
    let mut view = DynamicView::with_draw_target(ProgressDrawTarget::hidden());

    assert_eq!(view.run().await, Ok(()));
    assert!(view.new_writer().write_all(b"hello\n").is_ok());
}
