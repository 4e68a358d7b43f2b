use std::path::PathBuf;

use chrono::Local;
use clap::Args;
use pkup_core::config::{load_config, DEFAULT_CONFIG_FILE};
use pkup_core::registry::{GitHubClientFactory, RemoteRegistry};
use pkup_core::Composer;
use tracing::{debug, instrument};

use crate::commands::{resolve_period, run_reports};
use crate::errors::CliError;
use crate::logging::LogTarget;
use crate::token::CliTokens;

/// Arguments for the compose command
#[derive(Args, Debug)]
pub struct ComposeArgs {
    /// Compose configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// First day of the period (dd.mm.yyyy), defaults to the current PKUP period
    #[arg(long)]
    pub since: Option<String>,

    /// Last day of the period (dd.mm.yyyy), defaults to the current PKUP period
    #[arg(long)]
    pub until: Option<String>,

    /// Print plain log lines instead of spinners
    #[arg(long)]
    pub ci: bool,

    /// Fail when the commits of a repository cannot be listed
    #[arg(long)]
    pub strict: bool,
}

/// Execute the compose command
#[instrument(skip_all, fields(config = %args.config.display()))]
pub async fn execute(args: ComposeArgs, log: &LogTarget) -> Result<(), CliError> {
    let mut config = load_config(&args.config)?;
    config.strict |= args.strict;
    if config.reports.is_empty() {
        return Err(CliError::ConfigError(format!(
            "'{}' does not define any reports",
            args.config.display()
        )));
    }

    let (since, until) = resolve_period(args.since.as_deref(), args.until.as_deref(), &Local::now())?;
    debug!(
        repos = config.repos.len(),
        orgs = config.orgs.len(),
        reports = config.reports.len(),
        "Loaded compose configuration"
    );

    let tokens = CliTokens::from_env();
    let registry = RemoteRegistry::build(&config, &GitHubClientFactory, &tokens)?;

    run_reports(Composer::new(config, registry), args.ci, since, until, &tokens, log).await
}
