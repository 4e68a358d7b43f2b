use chrono::{DateTime, TimeZone, Utc};
use pkup_core::period::{current_period, end_of_day, parse_date, start_of_day};
use pkup_core::view::new_view;
use pkup_core::registry::TokenProvider;
use pkup_core::Composer;
use tracing::{info, trace};

use crate::errors::CliError;
use crate::logging::{LogTarget, Redirected};
use crate::release::{check_for_update, public_advisory_client, CURRENT_VERSION};

/// Authentication commands for storing GitHub tokens
pub mod auth;
/// Report generation from a compose configuration
pub mod compose;
/// Report generation for a single user
pub mod gen;
/// Version information and release check
pub mod version;

#[cfg(test)]
#[path = "commands_tests.rs"]
mod tests;

/// Resolves the reporting period from the optional `dd.mm.yyyy` bounds.
///
/// A missing bound is taken from the current PKUP period. `until` covers the
/// whole given day.
pub fn resolve_period<Tz: TimeZone>(
    since: Option<&str>,
    until: Option<&str>,
    now: &DateTime<Tz>,
) -> Result<(DateTime<Utc>, DateTime<Utc>), CliError> {
    let tz = now.timezone();
    let (mut from, mut till) = current_period(now);

    if let Some(value) = since {
        from = start_of_day(&tz, parse_date(value)?);
    }
    if let Some(value) = until {
        till = end_of_day(&tz, parse_date(value)?);
    }

    if from >= till {
        return Err(CliError::InvalidArguments(format!(
            "the period start {} is not before its end {}",
            from, till
        )));
    }

    Ok((from, till))
}

/// Runs every report of `composer` and waits for them in the selected view.
///
/// Log lines are printed through the view while it runs. Outside CI the
/// release advisory runs alongside the reports.
pub async fn run_reports(
    composer: Composer,
    ci: bool,
    since: DateTime<Utc>,
    until: DateTime<Utc>,
    tokens: &dyn TokenProvider,
    log: &LogTarget,
) -> Result<(), CliError> {
    info!(
        since = %since,
        until = %until,
        reports = composer.config().reports.len(),
        "Generating reports"
    );

    let mut view = new_view(ci);
    let _redirected = Redirected::new(log, view.new_writer());
    composer.spawn_reports(view.as_mut(), since, until);

    let (result, _) = tokio::join!(view.run(), advise_update(ci, tokens));
    result?;
    Ok(())
}

/// Warns about a newer release outside of CI runs.
///
/// The lookup uses the public host token when one is known and gives up on
/// rate limits and slow answers.
pub async fn advise_update(ci: bool, tokens: &dyn TokenProvider) {
    if ci {
        return;
    }

    match public_advisory_client(tokens.token("")) {
        Ok(client) => {
            check_for_update(&client, CURRENT_VERSION).await;
        }
        Err(e) => trace!(error = %e, "Skipping the release check"),
    }
}
