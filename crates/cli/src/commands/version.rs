use clap::Args;
use pkup_core::registry::TokenProvider;

use crate::errors::CliError;
use crate::release::{
    is_outdated, latest_release, public_advisory_client, CURRENT_VERSION, UPSTREAM_ORG,
    UPSTREAM_REPO,
};
use crate::token::CliTokens;

/// Arguments for the version command
#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Look up the latest release as well
    #[arg(long)]
    pub check: bool,
}

/// Execute the version command
pub async fn execute(args: VersionArgs) -> Result<(), CliError> {
    println!("pkup {}", CURRENT_VERSION);
    if !args.check {
        return Ok(());
    }

    let client = public_advisory_client(CliTokens::from_env().token(""))
        .map_err(|e| CliError::NetworkError(e.to_string()))?;
    match latest_release(&client).await {
        Some(latest) if is_outdated(CURRENT_VERSION, &latest) => println!(
            "A new release is available: {} (https://github.com/{}/{}/releases/latest)",
            latest, UPSTREAM_ORG, UPSTREAM_REPO
        ),
        Some(_) => println!("This is the latest release"),
        None => println!("The latest release could not be determined"),
    }

    Ok(())
}
