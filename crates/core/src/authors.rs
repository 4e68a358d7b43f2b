use std::collections::HashMap;

use tracing::{debug, instrument};

use crate::config::Signature;
use crate::errors::PkupError;
use crate::registry::{host_name, RemoteRegistry};

#[cfg(test)]
#[path = "authors_tests.rs"]
mod tests;

/// The identity strings of one report subject, per host.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthorSets {
    by_host: HashMap<String, Vec<String>>,
}

impl AuthorSets {
    /// Identities on `enterprise_url`; empty when the subject has none there.
    pub fn get(&self, enterprise_url: &str) -> &[String] {
        self.by_host
            .get(enterprise_url)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    fn extend(&mut self, enterprise_url: &str, identities: Vec<String>) {
        let set = self.by_host.entry(enterprise_url.to_string()).or_default();
        for identity in identities {
            if !set.contains(&identity) {
                set.push(identity);
            }
        }
    }
}

/// Looks up every signature of a subject once and groups the identities by host.
///
/// Signatures on a host without a client are skipped. A failed lookup fails
/// the subject.
#[instrument(skip(registry))]
pub async fn resolve_author_sets(
    signatures: &[Signature],
    registry: &RemoteRegistry,
) -> Result<AuthorSets, PkupError> {
    let mut sets = AuthorSets::default();
    for signature in signatures {
        let Some(client) = registry.get(&signature.enterprise_url) else {
            debug!(
                user = signature.username.as_str(),
                host = host_name(&signature.enterprise_url),
                "No client for the signature's host"
            );
            continue;
        };

        let identities = client
            .get_user_signatures(&signature.username)
            .await
            .map_err(|e| PkupError::IdentityLookup {
                username: signature.username.clone(),
                message: e.to_string(),
            })?;

        debug!(
            user = signature.username.as_str(),
            count = identities.len(),
            "Resolved user identities"
        );
        sets.extend(&signature.enterprise_url, identities);
    }

    Ok(sets)
}
