//! Error types for `meshbridge`
//!
//! Transient feed anomalies (idle bodies, HTML pages, malformed JSON) are
//! not errors and never appear here; see [`crate::alert::classifier`].
//! Everything below is either contained at a poll-cycle boundary or, during
//! setup, fatal.

use std::path::PathBuf;
use thiserror::Error;

// ============================================================================
// Exit Codes
// ============================================================================

/// Exit codes for `meshbridge` CLI operations.
///
/// These codes follow Unix conventions.
pub struct ExitCode;

impl ExitCode {
    /// Clean exit, including a graceful stop after one signal
    pub const SUCCESS: i32 = 0;

    /// Unclassified failure
    pub const ERROR: i32 = 1;

    /// Configuration error (unreadable file, invalid YAML, validation failure)
    pub const CONFIG_ERROR: i32 = 2;

    /// Local I/O failure outside the transport
    pub const IO_ERROR: i32 = 3;

    /// Transport error (channel not found, sink failure)
    pub const TRANSPORT_ERROR: i32 = 4;

    /// Feed fetch error (only fatal outside the polling loops)
    pub const FETCH_ERROR: i32 = 5;

    /// Forced exit on a second SIGINT
    pub const INTERRUPTED: i32 = 130;

    /// Forced exit on a second SIGTERM
    pub const TERMINATED: i32 = 143;
}

// ============================================================================
// Top-Level Error
// ============================================================================

/// Top-level error type for `meshbridge` operations.
///
/// Aggregates all domain-specific errors and maps them to exit codes.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Bad or unreadable configuration
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Transport sink or channel resolution error
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Feed retrieval error
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// Local I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl BridgeError {
    /// Maps the error to the process exit code.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) => ExitCode::CONFIG_ERROR,
            Self::Transport(_) => ExitCode::TRANSPORT_ERROR,
            Self::Fetch(_) => ExitCode::FETCH_ERROR,
            Self::Io(_) => ExitCode::IO_ERROR,
        }
    }
}

// ============================================================================
// Configuration Errors
// ============================================================================

/// Errors raised while turning YAML, environment and flags into a
/// [`crate::config::BridgeConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read
    #[error("cannot read {path}: {source}")]
    Read {
        /// Path to the configuration file
        path: PathBuf,
        /// Underlying I/O failure
        source: std::io::Error,
    },

    /// The file is too large or does not match the schema
    #[error("parse error in {path}: {message}")]
    Parse {
        /// Path to the configuration file
        path: PathBuf,
        /// Parser or size-limit message
        message: String,
    },

    /// One or more settings are unusable
    #[error("configuration invalid: {}", format_issues(.errors))]
    Validation {
        /// Every error found, in check order
        errors: Vec<ValidationIssue>,
    },

    /// A `${VAR:?msg}` reference names an unset variable
    #[error("environment variable '{var}' not set (referenced in {path})")]
    EnvVarNotSet {
        /// Variable name
        var: String,
        /// Configuration file that referenced it
        path: PathBuf,
    },

    /// A single setting has a value of the wrong shape
    #[error("invalid value for '{field}': got '{value}', expected {expected}")]
    InvalidValue {
        /// Dotted path of the offending field (e.g. `polling.alert_interval`)
        field: String,
        /// Value as written
        value: String,
        /// Human description of an acceptable value
        expected: String,
    },
}

fn format_issues(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

// ============================================================================
// Validation Types
// ============================================================================

/// One problem found by [`crate::config::Validator`].
#[derive(Debug, Clone)]
pub struct ValidationIssue {
    /// Dotted path to the problematic field (e.g. "polling.alert_interval")
    pub path: String,
    /// What is wrong
    pub message: String,
    /// Whether the problem blocks startup
    pub severity: Severity,
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let prefix = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(f, "{}: {} at {}", prefix, self.message, self.path)
    }
}

/// Whether a validation issue blocks startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Validation failure that prevents the configuration from being used
    Error,
    /// Potential issue that does not prevent the bridge from starting
    Warning,
}

// ============================================================================
// Fetch Errors
// ============================================================================

/// Feed retrieval errors.
///
/// Raised by [`crate::fetch::FeedFetcher`] implementations and contained at
/// the poll-cycle boundary.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Request did not complete within the configured timeout
    #[error("request timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// Connection or protocol failure
    #[error("network error: {0}")]
    Network(String),

    /// Non-2xx response
    #[error("unexpected HTTP status {0}")]
    HttpStatus(u16),

    /// Response body exceeded the configured size limit
    #[error("response body exceeds {limit} bytes")]
    BodyTooLarge {
        /// `feeds.max_body_bytes`
        limit: usize,
    },

    /// Body could not be read or decoded
    #[error("invalid response body: {0}")]
    Body(String),
}

// ============================================================================
// Transport Errors
// ============================================================================

/// Transport sink and channel resolution errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The named channel is not present in the channel table
    #[error("channel \u{201c}{0}\u{201d} not found")]
    ChannelNotFound(String),

    /// The sink rejected or failed to deliver a fragment
    #[error("send failed: {0}")]
    SendFailed(String),

    /// I/O error while writing a fragment
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Fragment serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

// ============================================================================
// Result Type Alias
// ============================================================================

/// Result type alias for `meshbridge` operations.
pub type Result<T> = std::result::Result<T, BridgeError>;

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(ExitCode::SUCCESS, 0);
        assert_eq!(ExitCode::ERROR, 1);
        assert_eq!(ExitCode::CONFIG_ERROR, 2);
        assert_eq!(ExitCode::IO_ERROR, 3);
        assert_eq!(ExitCode::TRANSPORT_ERROR, 4);
        assert_eq!(ExitCode::FETCH_ERROR, 5);
        assert_eq!(ExitCode::INTERRUPTED, 130);
        assert_eq!(ExitCode::TERMINATED, 143);
    }

    #[test]
    fn test_channel_not_found_exit_code() {
        let err: BridgeError = TransportError::ChannelNotFound("Alerts".to_string()).into();
        assert_eq!(err.exit_code(), ExitCode::TRANSPORT_ERROR);
        assert!(err.to_string().contains("Alerts"));
    }

    #[test]
    fn test_config_error_exit_code() {
        let err: BridgeError = ConfigError::InvalidValue {
            field: "transport.chunk_limit".to_string(),
            value: "0".to_string(),
            expected: "a positive byte count".to_string(),
        }
        .into();
        assert_eq!(err.exit_code(), ExitCode::CONFIG_ERROR);
    }

    #[test]
    fn test_fetch_error_exit_code() {
        let err: BridgeError = FetchError::HttpStatus(503).into();
        assert_eq!(err.exit_code(), ExitCode::FETCH_ERROR);
        assert_eq!(err.to_string(), "unexpected HTTP status 503");
    }

    #[test]
    fn test_io_error_exit_code() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "not found");
        let err: BridgeError = io_err.into();
        assert_eq!(err.exit_code(), ExitCode::IO_ERROR);
    }

    #[test]
    fn test_validation_issue_display() {
        let issue = ValidationIssue {
            path: "polling.alert_interval".to_string(),
            message: "must be greater than zero".to_string(),
            severity: Severity::Error,
        };
        assert_eq!(
            issue.to_string(),
            "error: must be greater than zero at polling.alert_interval"
        );
    }

    #[test]
    fn test_validation_error_lists_issues() {
        let err = ConfigError::Validation {
            errors: vec![
                ValidationIssue {
                    path: "feeds.alerts_url".to_string(),
                    message: "must not be empty".to_string(),
                    severity: Severity::Error,
                },
                ValidationIssue {
                    path: "transport.chunk_limit".to_string(),
                    message: "must be greater than zero".to_string(),
                    severity: Severity::Error,
                },
            ],
        };
        let text = err.to_string();
        assert!(text.contains("feeds.alerts_url"));
        assert!(text.contains("transport.chunk_limit"));
    }

    #[test]
    fn test_config_parse_error_display() {
        let err = ConfigError::Parse {
            path: PathBuf::from("bridge.yaml"),
            message: "unexpected token".to_string(),
        };
        assert!(err.to_string().contains("bridge.yaml"));
        assert!(err.to_string().contains("unexpected token"));
    }
}
