//! Common error types for vcevidence.

use thiserror::Error;

/// Common error type for vcevidence operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Session acquisition failed. The only error that aborts a run.
    #[error("Connection to {target} failed: {reason}")]
    Connection { target: String, reason: String },

    #[error("Check {check} failed on {scope}: {reason}")]
    CheckEvaluation {
        check: String,
        scope: String,
        reason: String,
    },

    #[error("Export failed: {0}")]
    Export(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Schema validation failed: {0}")]
    Schema(String),
}

impl Error {
    /// Whether this error must terminate the run.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Connection { .. })
    }
}

/// Result type alias using common Error.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_connection_errors_are_fatal() {
        let connection = Error::Connection {
            target: "vc01".to_string(),
            reason: "refused".to_string(),
        };
        assert!(connection.is_fatal());
        assert!(!Error::Export("disk full".to_string()).is_fatal());
        assert!(!Error::CheckEvaluation {
            check: "host.ntp".to_string(),
            scope: "esx01".to_string(),
            reason: "timeout".to_string(),
        }
        .is_fatal());
    }

    #[test]
    fn test_connection_error_message() {
        let err = Error::Connection {
            target: "vc01.lab".to_string(),
            reason: "certificate rejected".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Connection to vc01.lab failed: certificate rejected"
        );
    }
}
