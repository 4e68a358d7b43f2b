//! One remote client per configured host.
//!
//! Repositories, organizations and report signatures all name the host they
//! live on through `enterpriseUrl` (empty for the public host). The registry
//! creates exactly one client per distinct host before any work is fanned out
//! and hands out shared references afterwards.

use std::collections::HashMap;
use std::sync::Arc;

use pkup_developer_platforms::github::GitHubClient;
use pkup_developer_platforms::RemoteClient;
use tracing::{debug, instrument};

use crate::config::Config;
use crate::errors::PkupError;

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;

/// Supplies the token for a host when the configuration does not carry one.
pub trait TokenProvider: Send + Sync {
    /// Returns the token for `enterprise_url` (`""` is the public host).
    fn token(&self, enterprise_url: &str) -> Option<String>;
}

impl<F> TokenProvider for F
where
    F: Fn(&str) -> Option<String> + Send + Sync,
{
    fn token(&self, enterprise_url: &str) -> Option<String> {
        self(enterprise_url)
    }
}

/// Creates the client for one host.
pub trait ClientFactory: Send + Sync {
    fn create(
        &self,
        enterprise_url: &str,
        token: Option<String>,
    ) -> Result<Arc<dyn RemoteClient>, PkupError>;
}

/// Builds [`GitHubClient`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct GitHubClientFactory;

impl ClientFactory for GitHubClientFactory {
    fn create(
        &self,
        enterprise_url: &str,
        token: Option<String>,
    ) -> Result<Arc<dyn RemoteClient>, PkupError> {
        let client = GitHubClient::new(token, enterprise_url).map_err(|e| PkupError::Client {
            host: host_name(enterprise_url).to_string(),
            message: e.to_string(),
        })?;
        Ok(Arc::new(client))
    }
}

/// Human readable name of a host key.
pub fn host_name(enterprise_url: &str) -> &str {
    if enterprise_url.is_empty() {
        "github.com"
    } else {
        enterprise_url
    }
}

/// Clients keyed by enterprise URL.
#[derive(Debug, Clone, Default)]
pub struct RemoteRegistry {
    clients: HashMap<String, Arc<dyn RemoteClient>>,
}

impl RemoteRegistry {
    /// Creates one client for every host the configuration references.
    ///
    /// A token written on a repository or organization entry is used for its
    /// host; the first entry carrying a token wins. Repositories are looked
    /// at before organizations. Hosts without a configured token ask
    /// `tokens`, and hosts that only appear in report signatures are created
    /// the same way.
    #[instrument(skip_all)]
    pub fn build(
        config: &Config,
        factory: &dyn ClientFactory,
        tokens: &dyn TokenProvider,
    ) -> Result<Self, PkupError> {
        let mut configured: HashMap<&str, &str> = HashMap::new();
        for remote in config.repos.iter().chain(config.orgs.iter()) {
            if !remote.token.is_empty() {
                configured
                    .entry(remote.enterprise_url.as_str())
                    .or_insert(remote.token.as_str());
            }
        }

        let mut clients = HashMap::new();
        for host in config.hosts() {
            let token = match configured.get(host.as_str()) {
                Some(token) => Some(token.to_string()),
                None => tokens.token(&host),
            };

            debug!(
                host = host_name(&host),
                authenticated = token.is_some(),
                "Creating remote client"
            );
            let client = factory.create(&host, token)?;
            clients.insert(host, client);
        }

        Ok(Self { clients })
    }

    /// Wraps already created clients.
    pub fn from_clients<I>(clients: I) -> Self
    where
        I: IntoIterator<Item = (String, Arc<dyn RemoteClient>)>,
    {
        Self {
            clients: clients.into_iter().collect(),
        }
    }

    /// The client for `enterprise_url`, if one was created.
    pub fn get(&self, enterprise_url: &str) -> Option<Arc<dyn RemoteClient>> {
        self.clients.get(enterprise_url).cloned()
    }

    /// Like [`RemoteRegistry::get`] but missing clients are an error.
    pub fn require(&self, enterprise_url: &str) -> Result<Arc<dyn RemoteClient>, PkupError> {
        self.get(enterprise_url)
            .ok_or_else(|| PkupError::MissingClient(host_name(enterprise_url).to_string()))
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}
