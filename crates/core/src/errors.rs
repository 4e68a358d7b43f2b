use thiserror::Error;

#[cfg(test)]
#[path = "errors_tests.rs"]
mod tests;

/// Errors raised while reading the compose configuration file.
#[derive(Error, Debug)]
pub enum ConfigLoadError {
    #[error("Config file not found: {0}")]
    NotFound(String),

    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Errors produced by the aggregation engine.
///
/// Payloads are plain strings so the error can be cloned. The memoized commit
/// listing hands the same outcome to every report subject that asked for it,
/// including a failed one.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PkupError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to create a client for '{host}': {message}")]
    Client { host: String, message: String },

    #[error("No client is configured for '{0}'")]
    MissingClient(String),

    #[error("Failed to resolve repositories: {0}")]
    Resolution(String),

    #[error("Failed to list commits for '{target}': {message}")]
    Listing { target: String, message: String },

    #[error("Failed to look up user '{username}': {message}")]
    IdentityLookup { username: String, message: String },

    #[error("Failed to save '{path}': {message}")]
    Artifact { path: String, message: String },

    #[error("Failed to render report: {0}")]
    Report(String),

    #[error("Task '{0}' stopped without a result")]
    TaskAborted(String),

    #[error("{0} of the report tasks failed")]
    TasksFailed(usize),

    #[error("{}", aggregate_message(.0))]
    Aggregate(Vec<PkupError>),
}

fn aggregate_message(errors: &[PkupError]) -> String {
    let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
    format!("{} errors occurred: {}", errors.len(), messages.join("; "))
}

impl PkupError {
    /// Folds collected errors into one result.
    ///
    /// No errors is a success, a single error is returned as is, and several
    /// errors become [`PkupError::Aggregate`].
    pub fn from_errors(mut errors: Vec<PkupError>) -> Result<(), PkupError> {
        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(PkupError::Aggregate(errors)),
        }
    }
}
