use chrono::Local;
use clap::Args;
use pkup_core::config::{Config, Remote, Report, Signature};
use pkup_core::registry::{GitHubClientFactory, RemoteRegistry};
use pkup_core::{Composer, Mode};
use tracing::instrument;

use crate::commands::{resolve_period, run_reports};
use crate::errors::CliError;
use crate::logging::LogTarget;
use crate::token::CliTokens;

#[cfg(test)]
#[path = "gen_tests.rs"]
mod tests;

/// Arguments for the gen command
#[derive(Args, Debug, Default)]
pub struct GenArgs {
    /// User whose contributions are reported
    #[arg(short, long)]
    pub username: String,

    /// Organization whose repositories are scanned, can be repeated
    #[arg(long = "org")]
    pub orgs: Vec<String>,

    /// Repository (org/repo) to scan, can be repeated
    #[arg(long = "repo")]
    pub repos: Vec<String>,

    /// GitHub Enterprise Server address of the repositories and the user
    #[arg(long, default_value = "")]
    pub enterprise_url: String,

    /// Token for the host, overrides GITHUB_TOKEN and the keyring
    #[arg(long)]
    pub token: Option<String>,

    /// Directory receiving the diffs and the report
    #[arg(short, long, default_value = ".")]
    pub output: String,

    /// Report template file
    #[arg(long, visible_alias = "tmpl")]
    pub template: Option<String>,

    /// First day of the period (dd.mm.yyyy)
    #[arg(long)]
    pub since: Option<String>,

    /// Last day of the period (dd.mm.yyyy)
    #[arg(long)]
    pub until: Option<String>,

    /// Read commits from every branch instead of the default branch
    #[arg(long)]
    pub all_branches: bool,

    /// Report merged pull requests instead of commits
    #[arg(long)]
    pub pull_requests: bool,

    /// Also report pull requests closed without merging
    #[arg(long, requires = "pull_requests")]
    pub with_closed: bool,

    /// Print plain log lines instead of spinners
    #[arg(long)]
    pub ci: bool,
}

impl GenArgs {
    /// Builds the one-report configuration these arguments describe.
    pub fn to_config(&self) -> Result<Config, CliError> {
        if self.orgs.is_empty() && self.repos.is_empty() {
            return Err(CliError::InvalidArguments(
                "at least one --org or --repo is required".to_string(),
            ));
        }

        let remote = |name: &String| Remote {
            name: name.clone(),
            token: self.token.clone().unwrap_or_default(),
            enterprise_url: self.enterprise_url.clone(),
            all_branches: self.all_branches,
            ..Default::default()
        };

        let config = Config {
            template: self.template.clone(),
            orgs: self.orgs.iter().map(remote).collect(),
            repos: self.repos.iter().map(remote).collect(),
            reports: vec![Report {
                signatures: vec![Signature {
                    username: self.username.clone(),
                    enterprise_url: self.enterprise_url.clone(),
                }],
                output_dir: self.output.clone(),
                ..Default::default()
            }],
            ..Default::default()
        };

        config.validate()?;
        Ok(config)
    }

    /// Commit mode unless pull requests were asked for.
    pub fn mode(&self) -> Mode {
        if self.pull_requests {
            Mode::PullRequests {
                with_closed: self.with_closed,
            }
        } else {
            Mode::Commits
        }
    }
}

/// Execute the gen command
#[instrument(skip_all, fields(user = %args.username))]
pub async fn execute(args: GenArgs, log: &LogTarget) -> Result<(), CliError> {
    let config = args.to_config()?;
    let (since, until) = resolve_period(args.since.as_deref(), args.until.as_deref(), &Local::now())?;

    let tokens = CliTokens::from_env();
    let registry = RemoteRegistry::build(&config, &GitHubClientFactory, &tokens)?;

    let composer = Composer::new(config, registry).with_mode(args.mode());
    run_reports(composer, args.ci, since, until, &tokens, log).await
}
