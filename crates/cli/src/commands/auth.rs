use std::io::BufRead;

use anyhow::Context;
use clap::Subcommand;
use pkup_core::registry::host_name;
use tracing::{debug, info};

use crate::errors::CliError;
use crate::token::store_keyring_token;

#[cfg(test)]
#[path = "auth_tests.rs"]
mod tests;

/// Subcommands for the auth command
#[derive(Subcommand, Debug)]
pub enum AuthCommands {
    /// Store a GitHub personal access token in the system keyring
    #[command(name = "github")]
    GitHub {
        /// GitHub Enterprise Server address the token belongs to
        #[arg(long, default_value = "")]
        enterprise_url: String,

        /// Token to store; read from standard input when omitted
        #[arg(long)]
        token: Option<String>,
    },
}

/// Execute the auth command
pub async fn execute(cmd: AuthCommands) -> Result<(), CliError> {
    match cmd {
        AuthCommands::GitHub {
            enterprise_url,
            token,
        } => auth_github(&enterprise_url, token),
    }
}

/// Stores the token for `enterprise_url`.
fn auth_github(enterprise_url: &str, token: Option<String>) -> Result<(), CliError> {
    let host = host_name(enterprise_url);
    debug!(host = host, "Authenticating with GitHub");

    let token = match token {
        Some(token) => token,
        None => {
            println!("GitHub Personal Access Token Authentication ({})", host);
            println!("------------------------------------------");
            println!("Please provide your GitHub Personal Access Token:");

            read_token(&mut std::io::stdin().lock())?
        }
    };

    let token = token.trim();
    if token.is_empty() {
        return Err(CliError::AuthError("Token cannot be empty".to_string()));
    }

    store_keyring_token(enterprise_url, token)?;

    info!(host = host, "Stored the GitHub token in the keyring");
    println!("GitHub token for {} stored successfully!", host);
    Ok(())
}

/// Reads one line holding the token, without surrounding whitespace.
fn read_token(input: &mut impl BufRead) -> anyhow::Result<String> {
    let mut line = String::new();
    input
        .read_line(&mut line)
        .context("Failed to read the token from standard input")?;
    Ok(line.trim().to_string())
}
