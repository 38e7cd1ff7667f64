//! Configuration validation.
//!
//! Runs on the fully resolved configuration (file, environment and
//! command-line overrides applied) and collects every problem rather than
//! stopping at the first.

use std::time::Duration;

use crate::config::schema::BridgeConfig;
use crate::error::{Severity, ValidationIssue};

/// News intervals shorter than this are allowed but flagged.
const MIN_SENSIBLE_NEWS_INTERVAL: Duration = Duration::from_secs(10);

/// Result of configuration validation.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// Validation errors (prevent startup).
    pub errors: Vec<ValidationIssue>,

    /// Validation warnings (informational).
    pub warnings: Vec<ValidationIssue>,
}

impl ValidationResult {
    /// Returns `true` if there are any errors.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Returns `true` if validation passed (no errors).
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Configuration validator.
#[derive(Debug, Default)]
pub struct Validator {
    errors: Vec<ValidationIssue>,
    warnings: Vec<ValidationIssue>,
}

impl Validator {
    /// Creates a new validator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates a configuration and returns every issue found.
    pub fn validate(&mut self, config: &BridgeConfig) -> ValidationResult {
        self.errors.clear();
        self.warnings.clear();

        self.validate_feeds(config);
        self.validate_polling(config);
        self.validate_transport(config);
        self.validate_time(config);

        ValidationResult {
            errors: std::mem::take(&mut self.errors),
            warnings: std::mem::take(&mut self.warnings),
        }
    }

    fn validate_feeds(&mut self, config: &BridgeConfig) {
        let feeds = &config.feeds;
        self.require_url("feeds.alerts_url", &feeds.alerts_url);
        if config.polling.news_enabled {
            self.require_url("feeds.news_url", &feeds.news_url);
        }
        self.require_nonzero("feeds.fetch_timeout", feeds.fetch_timeout);
        if feeds.max_body_bytes == 0 {
            self.add_error("feeds.max_body_bytes", "must be greater than zero");
        }
    }

    fn validate_polling(&mut self, config: &BridgeConfig) {
        let polling = &config.polling;
        self.require_nonzero("polling.alert_interval", polling.alert_interval);
        self.require_nonzero("polling.news_interval", polling.news_interval);
        if polling.news_enabled
            && !polling.news_interval.is_zero()
            && polling.news_interval < MIN_SENSIBLE_NEWS_INTERVAL
        {
            self.add_warning(
                "polling.news_interval",
                &format!(
                    "{} is an aggressive news poll rate",
                    humantime::format_duration(polling.news_interval)
                ),
            );
        }
    }

    fn validate_transport(&mut self, config: &BridgeConfig) {
        let transport = &config.transport;
        if transport.chunk_limit == 0 {
            self.add_error("transport.chunk_limit", "must be greater than zero");
        }
        if transport.channels.is_empty() {
            self.add_error("transport.channels", "at least one channel is required");
        }
        for (i, name) in transport.channels.iter().enumerate() {
            if name.trim().is_empty() {
                self.add_error(&format!("transport.channels[{i}]"), "name must not be empty");
            }
        }

        self.require_channel("transport.alerts_channel", &transport.alerts_channel, config);
        if config.polling.news_enabled {
            self.require_channel("transport.news_channel", &transport.news_channel, config);
            if transport.news_channel == transport.alerts_channel {
                self.add_warning(
                    "transport.news_channel",
                    "news shares the alerts channel; alerts may queue behind long news items",
                );
            }
        }
    }

    fn validate_time(&mut self, config: &BridgeConfig) {
        if let Err(e) = config.time.offset() {
            self.add_error("time.utc_offset", &e.to_string());
        }
    }

    fn require_url(&mut self, path: &str, url: &str) {
        let url = url.trim();
        if url.is_empty() {
            self.add_error(path, "must not be empty");
        } else if !(url.starts_with("http://") || url.starts_with("https://")) {
            self.add_error(path, &format!("'{url}' is not an http(s) URL"));
        }
    }

    fn require_nonzero(&mut self, path: &str, value: Duration) {
        if value.is_zero() {
            self.add_error(path, "must be greater than zero");
        }
    }

    fn require_channel(&mut self, path: &str, name: &str, config: &BridgeConfig) {
        if name.is_empty() {
            self.add_error(path, "must not be empty");
        } else if !config.transport.channels.iter().any(|c| c == name) {
            self.add_error(
                path,
                &format!("channel '{name}' is not listed in transport.channels"),
            );
        }
    }

    fn add_error(&mut self, path: &str, message: &str) {
        self.errors.push(ValidationIssue {
            path: path.to_string(),
            message: message.to_string(),
            severity: Severity::Error,
        });
    }

    fn add_warning(&mut self, path: &str, message: &str) {
        self.warnings.push(ValidationIssue {
            path: path.to_string(),
            message: message.to_string(),
            severity: Severity::Warning,
        });
    }
}
