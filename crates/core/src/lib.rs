//! # PKUP Core
//!
//! Aggregation engine that collects the commits a developer authored across
//! GitHub and GitHub Enterprise remotes for one reporting period, saves the
//! diff of every commit and renders a report per developer.
//!
//! A run goes through these stages:
//! - one client per referenced host is created ([`registry`])
//! - organizations are expanded into repositories ([`resolver`])
//! - the commits of every repository are listed once and shared ([`lister`])
//! - every report subject filters the shared listing with its own identities,
//!   saves the matching diffs and renders its report ([`Composer`])
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use pkup_core::config::load_config;
//! use pkup_core::period::current_period;
//! use pkup_core::registry::{GitHubClientFactory, RemoteRegistry};
//! use pkup_core::view::new_view;
//! use pkup_core::Composer;
//!
//! async fn compose() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = load_config(".pkupcompose.yaml")?;
//!     let tokens = |_: &str| std::env::var("GITHUB_TOKEN").ok();
//!     let registry = RemoteRegistry::build(&config, &GitHubClientFactory, &tokens)?;
//!
//!     let (since, until) = current_period(&chrono::Local::now());
//!     let composer = Composer::new(config, registry);
//!
//!     let mut view = new_view(true);
//!     composer.spawn_reports(view.as_mut(), since, until);
//!     view.run().await?;
//!     Ok(())
//! }
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Local, Utc};
use pkup_developer_platforms::authorship::filter_user_commits;
use pkup_developer_platforms::RemoteClient;
use tokio::task::JoinSet;
use tracing::{debug, info, instrument};

pub mod artifacts;
pub mod authors;
pub mod config;
pub mod errors;
pub mod lister;
pub mod period;
pub mod pull_requests;
pub mod registry;
pub mod report;
pub mod resolver;
pub mod view;

use artifacts::{sanitize_output_dir, save_diffs};
use authors::resolve_author_sets;
use config::{Config, Report, Signature};
use errors::PkupError;
use lister::CommitLister;
use pull_requests::collect_user_pull_requests;
use registry::RemoteRegistry;
use report::{render_to_dir, sort_results, Contribution, ReportResult, ReportValues};
use resolver::{RepoResolver, RepoTarget};
use view::{task_channel, TaskResult, TaskView};

#[cfg(test)]
mod test_utils;

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;

/// What a report is built from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Mode {
    /// Commits authored on the listed branches
    #[default]
    Commits,

    /// Pull requests merged in the period, and closed ones with `with_closed`
    PullRequests { with_closed: bool },
}

/// Builds the reports of a configuration.
///
/// A `Composer` is cheap to clone. Clones share the registry, the memoized
/// repository resolution and the memoized commit listing, so every report
/// subject of a run reads the same listing.
///
/// # Examples
///
/// ```rust,no_run
/// use pkup_core::{config::Config, registry::RemoteRegistry, Composer, Mode};
///
/// async fn example(config: Config, registry: RemoteRegistry) {
///     let (since, until) = pkup_core::period::current_period(&chrono::Utc::now());
///     let composer = Composer::new(config, registry)
///         .with_mode(Mode::PullRequests { with_closed: true });
///
///     for report in composer.config().reports.clone() {
///         match composer.compose_report(&report, since, until).await {
///             Ok(results) => println!("{}: {} repositories", report.display_name(), results.len()),
///             Err(e) => eprintln!("{}: {}", report.display_name(), e),
///         }
///     }
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Composer {
    config: Arc<Config>,
    registry: Arc<RemoteRegistry>,
    resolver: Arc<RepoResolver>,
    lister: Arc<CommitLister>,
    mode: Mode,
}

impl Composer {
    /// Creates a composer for `config` in commit mode.
    ///
    /// The commit listing is strict when the configuration says so.
    pub fn new(config: Config, registry: RemoteRegistry) -> Self {
        let resolver = Arc::new(RepoResolver::new());
        let lister = CommitLister::with_resolver(config.strict, resolver.clone());
        Self {
            config: Arc::new(config),
            registry: Arc::new(registry),
            resolver,
            lister: Arc::new(lister),
            mode: Mode::default(),
        }
    }

    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Starts one task per configured report and registers it with `view`.
    ///
    /// Tasks run independently: a failing subject does not stop the others.
    /// Every task delivers exactly one [`TaskResult`].
    pub fn spawn_reports(
        &self,
        view: &mut dyn TaskView,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) {
        for report in self.config.reports.iter().cloned() {
            let name = report.display_name();
            let (sender, handle) = task_channel();
            view.add(name.clone(), handle);

            let composer = self.clone();
            tokio::spawn(async move {
                debug!(user = name.as_str(), "Composing report");
                let result = composer.compose_report(&report, since, until).await;
                // the view may already be gone when the run is cancelled
                let _ = sender.send(result);
            });
        }
    }

    /// Collects the contributions of one subject, saves their diffs and
    /// renders the report.
    ///
    /// # Arguments
    ///
    /// * `report` - The subject and where its report goes
    /// * `since` - Start of the period
    /// * `until` - End of the period
    ///
    /// # Returns
    ///
    /// The per repository results the report was rendered from. When any
    /// repository fails, every failure is returned together and no report is
    /// rendered.
    #[instrument(skip(self, report), fields(user = %report.display_name(), mode = ?self.mode))]
    pub async fn compose_report(
        &self,
        report: &Report,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> TaskResult {
        let output_dir = sanitize_output_dir(&report.output_dir)?;

        let mut results = match self.mode {
            Mode::Commits => self.collect_commits(report, &output_dir, since, until).await?,
            Mode::PullRequests { with_closed } => {
                self.collect_pull_requests(report, &output_dir, since, until, with_closed)
                    .await?
            }
        };
        sort_results(&mut results);

        let values = ReportValues::new(
            &since.with_timezone(&Local),
            &until.with_timezone(&Local),
            &results,
            report.extra_fields.clone(),
        );
        let template = self.config.template.as_deref().map(Path::new);
        let written = render_to_dir(&output_dir, template, &values).await?;

        info!(
            path = %written.display(),
            contributions = values.result.len(),
            "Report written"
        );
        Ok(results)
    }

    async fn collect_commits(
        &self,
        report: &Report,
        output_dir: &Path,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<ReportResult>, PkupError> {
        let authors = resolve_author_sets(&report.signatures, &self.registry).await?;
        let listing = self
            .lister
            .list(&self.config, &self.registry, since, until)
            .await?;

        let mut tasks = JoinSet::new();
        for repo in listing.iter() {
            let commits = filter_user_commits(&repo.commits, authors.get(&repo.enterprise_url));
            let client = self.registry.require(&repo.enterprise_url)?;
            let (org, name) = (repo.org.clone(), repo.repo.clone());
            let dir = output_dir.to_path_buf();

            tasks.spawn(async move {
                let shas: Vec<String> = commits.iter().map(|c| c.sha.clone()).collect();
                let contributions = commits.into_iter().map(Contribution::Commit).collect();
                save_contributions(client, org, name, &shas, dir, contributions).await
            });
        }

        join_results(tasks).await
    }

    async fn collect_pull_requests(
        &self,
        report: &Report,
        output_dir: &Path,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
        with_closed: bool,
    ) -> Result<Vec<ReportResult>, PkupError> {
        let targets = self.resolver.resolve(&self.config, &self.registry).await?;

        let mut tasks = JoinSet::new();
        for target in targets.iter().cloned() {
            let usernames = usernames_on_host(&report.signatures, &target.enterprise_url);
            if usernames.is_empty() {
                continue;
            }

            let client = self.registry.require(&target.enterprise_url)?;
            let dir = output_dir.to_path_buf();
            tasks.spawn(async move {
                let contributions = user_pull_requests(
                    client.as_ref(),
                    &target,
                    &usernames,
                    since,
                    until,
                    with_closed,
                )
                .await?;
                let shas: Vec<String> = contributions
                    .iter()
                    .map(|c| c.sha().to_string())
                    .filter(|sha| !sha.is_empty())
                    .collect();
                save_contributions(client, target.org, target.repo, &shas, dir, contributions).await
            });
        }

        join_results(tasks).await
    }
}

fn usernames_on_host(signatures: &[Signature], enterprise_url: &str) -> Vec<String> {
    signatures
        .iter()
        .filter(|s| s.enterprise_url == enterprise_url)
        .map(|s| s.username.clone())
        .collect()
}

async fn user_pull_requests(
    client: &dyn RemoteClient,
    target: &RepoTarget,
    usernames: &[String],
    since: DateTime<Utc>,
    until: DateTime<Utc>,
    with_closed: bool,
) -> Result<Vec<Contribution>, PkupError> {
    let mut contributions: Vec<Contribution> = Vec::new();
    for username in usernames {
        let prs = collect_user_pull_requests(
            client,
            &target.org,
            &target.repo,
            username,
            since,
            until,
            with_closed,
        )
        .await
        .map_err(|e| PkupError::Listing {
            target: target.full_name(),
            message: e.to_string(),
        })?;

        for pr in prs {
            let seen = contributions.iter().any(|c| match c {
                Contribution::PullRequest(known) => known.number == pr.number,
                Contribution::Commit(_) => false,
            });
            if !seen {
                contributions.push(Contribution::PullRequest(pr));
            }
        }
    }

    Ok(contributions)
}

async fn save_contributions(
    client: Arc<dyn RemoteClient>,
    org: String,
    repo: String,
    shas: &[String],
    dir: PathBuf,
    contributions: Vec<Contribution>,
) -> Result<ReportResult, PkupError> {
    save_diffs(client.as_ref(), &org, &repo, shas, &dir).await?;
    Ok(ReportResult {
        org,
        repo,
        contributions,
    })
}

/// Waits for every repository task, accumulating the failures.
async fn join_results(
    mut tasks: JoinSet<Result<ReportResult, PkupError>>,
) -> Result<Vec<ReportResult>, PkupError> {
    let mut results = Vec::new();
    let mut errors = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(Ok(result)) => results.push(result),
            Ok(Err(e)) => errors.push(e),
            Err(e) => errors.push(PkupError::TaskAborted(e.to_string())),
        }
    }

    PkupError::from_errors(errors)?;
    Ok(results)
}
