//! # PKUP CLI
//!
//! Command-line interface for generating PKUP reports: the commits a
//! developer authored during the monthly reporting period, with one diff file
//! per commit and a rendered report.
//!
//! # Commands
//!
//! - `compose` - Generate every report of a compose configuration
//! - `gen` - Generate the report of a single user
//! - `auth` - Store GitHub tokens in the system keyring
//! - `version` - Print the version and look for a newer release
//!
//! # Examples
//!
//! ```bash
//! # Generate the reports configured in .pkupcompose.yaml
//! pkup compose
//!
//! # Generate a report for one user over an explicit period
//! pkup gen --username alice --org acme --since 19.01.2024 --until 18.02.2024
//!
//! # Store a token for a GitHub Enterprise Server
//! pkup auth github --enterprise-url https://github.corp.example.com
//! ```

#![deny(missing_docs)]
#![deny(clippy::missing_docs_in_private_items)]

use std::process::{ExitCode, Termination};

use clap::{ArgAction, Parser, Subcommand};
use tracing::{error, warn};

/// Command implementations for the CLI.
mod commands;

/// Error types specific to the CLI.
mod errors;

/// Log output routing.
mod logging;

/// Release advisory.
mod release;

/// Token lookup for the remote clients.
mod token;

use commands::{auth::AuthCommands, compose::ComposeArgs, gen::GenArgs, version::VersionArgs};
use errors::CliError;
use logging::LogTarget;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[cfg(test)]
#[path = "main_tests.rs"]
mod tests;

/// Environment variable holding a log filter directive
const LOG_ENV_VAR: &str = "PKUP_LOG";

/// Command-line interface structure for PKUP.
///
/// This struct defines the top-level CLI interface using clap's derive API.
/// It includes global options like verbose logging and the main command structure.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// The subcommand to execute
    #[command(subcommand)]
    command: Commands,
}

/// Available commands for the PKUP CLI.
#[derive(Subcommand)]
enum Commands {
    /// Generate the reports of a compose configuration
    Compose(ComposeArgs),

    /// Generate the report of a single user
    Gen(GenArgs),

    /// Authenticate with GitHub
    #[command(subcommand)]
    Auth(AuthCommands),

    /// Print version information
    Version(VersionArgs),
}

/// Log level used when `PKUP_LOG` is not set.
fn default_level(verbose: u8) -> &'static str {
    match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    }
}

/// Installs the log subscriber writing to `target`. `PKUP_LOG` wins over `-v`.
fn init_logging(verbose: u8, target: LogTarget) {
    let filter = EnvFilter::try_from_env(LOG_ENV_VAR)
        .unwrap_or_else(|_| EnvFilter::new(default_level(verbose)));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(target))
        .with(filter)
        .init();
}

/// Dispatches to the command handler.
async fn run(command: Commands, log: &LogTarget) -> Result<(), CliError> {
    match command {
        Commands::Compose(args) => commands::compose::execute(args, log).await,
        Commands::Gen(args) => commands::gen::execute(args, log).await,
        Commands::Auth(cmd) => commands::auth::execute(cmd).await,
        Commands::Version(args) => commands::version::execute(args).await,
    }
}

/// Main entry point for the PKUP CLI.
///
/// Initializes logging, parses the arguments and runs the command until it
/// finishes or the user presses Ctrl+C. Dropping the command on Ctrl+C aborts
/// its in-flight requests; files written so far stay on disk.
///
/// # Returns
///
/// Exit code 0 on success, otherwise the exit code of the [`CliError`].
#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let log = LogTarget::default();
    init_logging(cli.verbose, log.clone());

    let result = tokio::select! {
        result = run(cli.command, &log) => result,
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupted, stopping");
            Err(CliError::Cancelled)
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            e.report()
        }
    }
}
