//! Progress views for concurrently generated reports.
//!
//! Every report runs in its own task and delivers exactly one [`TaskResult`]
//! through a oneshot channel. A view is handed the receiving ends with
//! [`TaskView::add`] and waits for all of them in [`TaskView::run`].
//!
//! [`StaticView`] writes plain log events, which suits CI logs.
//! [`DynamicView`] shows one spinner per task.

use std::io::{self, Write};
use std::time::Duration;

use async_trait::async_trait;
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use tokio::sync::oneshot;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use crate::errors::PkupError;
use crate::report::ReportResult;

#[cfg(test)]
#[path = "view_tests.rs"]
mod tests;

/// What a report task delivers.
pub type TaskResult = Result<Vec<ReportResult>, PkupError>;

/// Receiving end of a report task.
pub type TaskHandle = oneshot::Receiver<TaskResult>;

/// Creates the sending and receiving ends for one task.
pub fn task_channel() -> (oneshot::Sender<TaskResult>, TaskHandle) {
    oneshot::channel()
}

/// How a task ended, as shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    /// The report lists this many contributions
    Found(usize),

    /// The subject has no contributions in the period
    Empty,
    Failed(PkupError),
}

impl TaskOutcome {
    fn from_received(name: &str, received: Result<TaskResult, oneshot::error::RecvError>) -> Self {
        match received {
            Ok(Ok(results)) => match results.iter().map(|r| r.contributions.len()).sum::<usize>() {
                0 => TaskOutcome::Empty,
                count => TaskOutcome::Found(count),
            },
            Ok(Err(e)) => TaskOutcome::Failed(e),
            Err(_) => TaskOutcome::Failed(PkupError::TaskAborted(name.to_string())),
        }
    }

    fn message(&self, name: &str) -> String {
        match self {
            TaskOutcome::Found(count) => format!("found {} contributions for '{}'", count, name),
            TaskOutcome::Empty => format!("skipping '{}' no user activity detected", name),
            TaskOutcome::Failed(e) => format!("'{}' failed: {}", name, e),
        }
    }
}

/// Displays the progress of report tasks.
#[async_trait]
pub trait TaskView: Send {
    /// Registers a task under the name it is displayed with.
    fn add(&mut self, name: String, handle: TaskHandle);

    /// Waits for every registered task. Fails with
    /// [`PkupError::TasksFailed`] when any task failed.
    async fn run(&mut self) -> Result<(), PkupError>;

    /// A writer whose output does not break the view's rendering.
    fn new_writer(&self) -> Box<dyn Write + Send>;
}

/// Returns the static view in CI mode and the spinner view otherwise.
pub fn new_view(ci: bool) -> Box<dyn TaskView> {
    if ci {
        Box::new(StaticView::default())
    } else {
        Box::new(DynamicView::new())
    }
}

/// Waits for all tasks, reporting each outcome in completion order.
/// Returns the number of failed tasks.
async fn wait_all<F>(tasks: Vec<(String, TaskHandle)>, mut on_done: F) -> usize
where
    F: FnMut(usize, &str, &TaskOutcome),
{
    let names: Vec<String> = tasks.iter().map(|(name, _)| name.clone()).collect();
    let mut pending = JoinSet::new();
    for (index, (_, handle)) in tasks.into_iter().enumerate() {
        pending.spawn(async move { (index, handle.await) });
    }

    let mut failed = 0;
    while let Some(joined) = pending.join_next().await {
        let Ok((index, received)) = joined else {
            failed += 1;
            continue;
        };

        let name = &names[index];
        let outcome = TaskOutcome::from_received(name, received);
        if matches!(outcome, TaskOutcome::Failed(_)) {
            failed += 1;
        }
        on_done(index, name, &outcome);
    }

    failed
}

fn failures_to_result(failed: usize) -> Result<(), PkupError> {
    if failed == 0 {
        Ok(())
    } else {
        Err(PkupError::TasksFailed(failed))
    }
}

/// Log based view.
#[derive(Debug, Default)]
pub struct StaticView {
    tasks: Vec<(String, TaskHandle)>,
}

#[async_trait]
impl TaskView for StaticView {
    fn add(&mut self, name: String, handle: TaskHandle) {
        self.tasks.push((name, handle));
    }

    async fn run(&mut self) -> Result<(), PkupError> {
        for (name, _) in &self.tasks {
            info!("Processing {}...", name);
        }

        let failed = wait_all(std::mem::take(&mut self.tasks), |_, name, outcome| {
            match outcome {
                TaskOutcome::Found(count) => info!(count, "{}", outcome.message(name)),
                TaskOutcome::Empty => warn!("{}", outcome.message(name)),
                TaskOutcome::Failed(_) => error!("{}", outcome.message(name)),
            }
        })
        .await;

        failures_to_result(failed)
    }

    fn new_writer(&self) -> Box<dyn Write + Send> {
        Box::new(io::stderr())
    }
}

/// Spinner based view.
#[derive(Debug)]
pub struct DynamicView {
    progress: MultiProgress,
    tasks: Vec<(String, TaskHandle)>,
}

impl Default for DynamicView {
    fn default() -> Self {
        Self::new()
    }
}

impl DynamicView {
    pub fn new() -> Self {
        Self::with_draw_target(ProgressDrawTarget::stderr())
    }

    pub fn with_draw_target(target: ProgressDrawTarget) -> Self {
        Self {
            progress: MultiProgress::with_draw_target(target),
            tasks: Vec::new(),
        }
    }

    fn spinner(&self, name: &str) -> ProgressBar {
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        let bar = self.progress.add(ProgressBar::new_spinner());
        bar.set_style(style);
        bar.set_message(format!("processing '{}'", name));
        bar.enable_steady_tick(Duration::from_millis(100));
        bar
    }
}

#[async_trait]
impl TaskView for DynamicView {
    fn add(&mut self, name: String, handle: TaskHandle) {
        self.tasks.push((name, handle));
    }

    async fn run(&mut self) -> Result<(), PkupError> {
        let bars: Vec<ProgressBar> = self.tasks.iter().map(|(name, _)| self.spinner(name)).collect();
        let done_style = ProgressStyle::with_template("{msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());

        let failed = wait_all(std::mem::take(&mut self.tasks), |index, name, outcome| {
            let symbol = match outcome {
                TaskOutcome::Found(_) => "✔",
                TaskOutcome::Empty => "!",
                TaskOutcome::Failed(_) => "✘",
            };
            let bar = &bars[index];
            bar.set_style(done_style.clone());
            bar.finish_with_message(format!("{} {}", symbol, outcome.message(name)));
        })
        .await;

        failures_to_result(failed)
    }

    fn new_writer(&self) -> Box<dyn Write + Send> {
        Box::new(ProgressWriter {
            progress: self.progress.clone(),
        })
    }
}

/// Prints above the spinners instead of through them.
///
/// A hidden progress target drops printed lines, so they go to standard
/// error instead.
struct ProgressWriter {
    progress: MultiProgress,
}

impl Write for ProgressWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.progress.is_hidden() {
            return io::stderr().write(buf);
        }

        let text = String::from_utf8_lossy(buf);
        for line in text.lines() {
            self.progress.println(line)?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
