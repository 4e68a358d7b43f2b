//! Compose configuration.
//!
//! The configuration names the repositories and organizations to scan, the
//! people to report on and where their reports go. It is read from a YAML
//! file (`.pkupcompose.yaml` by default):
//!
//! ```yaml
//! template: ./report-template.txt
//! orgs:
//!   - name: acme
//!     allBranches: true
//!     uniqueOnly: true
//! repos:
//!   - name: acme/widgets
//!     branches: [main, release-1.x]
//!   - name: corp/platform
//!     enterpriseUrl: https://github.corp.example.com
//! reports:
//!   - signatures:
//!       - username: alice
//!       - username: alice-corp
//!         enterpriseUrl: https://github.corp.example.com
//!     outputDir: ./reports/alice
//!     extraFields:
//!       employeeName: Alice Example
//! ```
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use crate::errors::ConfigLoadError;

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;

/// Name of the configuration file looked up by default.
pub const DEFAULT_CONFIG_FILE: &str = ".pkupcompose.yaml";

/// A configured organization (`name: org`) or repository (`name: org/repo`).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Remote {
    /// `org` for organizations, `org/repo` for repositories
    pub name: String,

    /// Token for this remote; falls back to the token provider when empty
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub token: String,

    /// GitHub Enterprise Server address; empty means the public host
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub enterprise_url: String,

    /// Branches to read commits from; empty means the default branch
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub branches: Vec<String>,

    /// Read commits from every branch of the repository
    #[serde(default)]
    pub all_branches: bool,

    /// Drop commits seen on more than one branch
    #[serde(default)]
    pub unique_only: bool,
}

impl Remote {
    /// Splits an `org/repo` name. Returns `None` for anything else.
    pub fn org_and_repo(&self) -> Option<(&str, &str)> {
        match self.name.split_once('/') {
            Some((org, repo)) if !org.is_empty() && !repo.is_empty() && !repo.contains('/') => {
                Some((org, repo))
            }
            _ => None,
        }
    }
}

/// One identity of a report subject on one host.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Signature {
    pub username: String,

    /// Host the username belongs to; empty means the public host
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub enterprise_url: String,
}

/// One report subject and where its report goes.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    /// Identities of the subject, at most one lookup per host is made
    #[serde(default)]
    pub signatures: Vec<Signature>,

    /// Directory receiving diff files and the rendered report
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    /// Additional `{{ key }}` values for template reports
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra_fields: BTreeMap<String, String>,
}

fn default_output_dir() -> String {
    ".".to_string()
}

impl Report {
    /// Name the subject is shown under while its report is generated.
    pub fn display_name(&self) -> String {
        let names: Vec<&str> = self
            .signatures
            .iter()
            .map(|s| s.username.as_str())
            .collect();
        names.join(", ")
    }
}

/// Top-level compose configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Text template for the reports; the default text report is used when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,

    /// Fail the run when a repository's commits cannot be listed instead of
    /// reporting it with no commits
    #[serde(default)]
    pub strict: bool,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub orgs: Vec<Remote>,

    /// Explicit repositories; these win over repositories found in `orgs`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub repos: Vec<Remote>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reports: Vec<Report>,
}

impl Config {
    /// Parses and validates a YAML document.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigLoadError> {
        let config: Config = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks the structural rules serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigLoadError> {
        for org in &self.orgs {
            if org.name.is_empty() || org.name.contains('/') {
                return Err(ConfigLoadError::Invalid(format!(
                    "organization name '{}' must not be empty or contain '/'",
                    org.name
                )));
            }
        }

        for repo in &self.repos {
            if repo.org_and_repo().is_none() {
                return Err(ConfigLoadError::Invalid(format!(
                    "repository name '{}' must have the form <org>/<repo>",
                    repo.name
                )));
            }
        }

        for (index, report) in self.reports.iter().enumerate() {
            if report.signatures.is_empty() {
                return Err(ConfigLoadError::Invalid(format!(
                    "report #{} has no signatures",
                    index + 1
                )));
            }

            if let Some(empty) = report.signatures.iter().find(|s| s.username.is_empty()) {
                return Err(ConfigLoadError::Invalid(format!(
                    "report #{} has a signature without username (host '{}')",
                    index + 1,
                    empty.enterprise_url
                )));
            }
        }

        Ok(())
    }

    /// Every host referenced by the configuration, the public host as `""`.
    pub fn hosts(&self) -> BTreeSet<String> {
        self.repos
            .iter()
            .chain(self.orgs.iter())
            .map(|r| r.enterprise_url.clone())
            .chain(
                self.reports
                    .iter()
                    .flat_map(|r| r.signatures.iter().map(|s| s.enterprise_url.clone())),
            )
            .collect()
    }
}

/// Loads the compose configuration from a YAML file.
///
/// # Returns
///
/// * `Ok(Config)` if the file exists, parses, and passes validation
/// * `Err(ConfigLoadError)` if there is a problem
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigLoadError> {
    let path_ref = path.as_ref();
    let content = match fs::read_to_string(path_ref) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ConfigLoadError::NotFound(path_ref.display().to_string()));
        }
        Err(e) => return Err(ConfigLoadError::Io(e)),
    };

    Config::from_yaml(&content)
}
