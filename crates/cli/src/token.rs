//! Tokens for remotes that do not carry one in the configuration.
//!
//! The public host first uses `GITHUB_TOKEN`. Every host then falls back to
//! the system keyring, where `pkup auth github` stores one token per host.

use keyring::Entry;
use pkup_core::registry::{host_name, TokenProvider};
use tracing::trace;

use crate::errors::CliError;

#[cfg(test)]
#[path = "token_tests.rs"]
mod tests;

/// Keyring service the tokens are stored under
pub const KEY_RING_SERVICE_NAME: &str = "pkup";

/// Environment variable holding the public host token
pub const GITHUB_TOKEN_ENV: &str = "GITHUB_TOKEN";

/// Token provider used by the commands.
pub struct CliTokens {
    /// Token for the public host from the environment
    github_token: Option<String>,

    /// Lookup used for every host without an environment token
    keyring: Box<dyn TokenProvider>,
}

impl CliTokens {
    /// Creates a provider from an environment token and a fallback lookup.
    pub fn new(github_token: Option<String>, keyring: Box<dyn TokenProvider>) -> Self {
        Self {
            github_token: github_token.filter(|t| !t.is_empty()),
            keyring,
        }
    }

    /// Reads `GITHUB_TOKEN` and falls back to the system keyring.
    pub fn from_env() -> Self {
        Self::new(
            std::env::var(GITHUB_TOKEN_ENV).ok(),
            Box::new(read_keyring_token),
        )
    }
}

impl TokenProvider for CliTokens {
    fn token(&self, enterprise_url: &str) -> Option<String> {
        if enterprise_url.is_empty() {
            if let Some(token) = &self.github_token {
                return Some(token.clone());
            }
        }

        self.keyring.token(enterprise_url)
    }
}

/// Opens the keyring entry of a host.
fn keyring_entry(enterprise_url: &str) -> Result<Entry, keyring::Error> {
    Entry::new(KEY_RING_SERVICE_NAME, host_name(enterprise_url))
}

/// Reads the stored token of a host. A missing entry or an unavailable
/// keyring both mean no token.
pub fn read_keyring_token(enterprise_url: &str) -> Option<String> {
    match keyring_entry(enterprise_url).and_then(|entry| entry.get_password()) {
        Ok(token) => Some(token),
        Err(e) => {
            trace!(host = host_name(enterprise_url), error = %e, "No token in the keyring");
            None
        }
    }
}

/// Stores the token of a host, replacing an existing one.
pub fn store_keyring_token(enterprise_url: &str, token: &str) -> Result<(), CliError> {
    let entry = keyring_entry(enterprise_url).map_err(|e| {
        CliError::AuthError(format!("Failed to create an entry in the keyring: {}", e))
    })?;
    entry
        .set_password(token)
        .map_err(|e| CliError::AuthError(format!("Failed to save token to keyring: {}", e)))
}
