//! Configuration schema.
//!
//! Every field has a default, so an empty file (or no file) yields a
//! working bridge pointed at the public alert and news feeds.

use std::str::FromStr;
use std::time::Duration;

use chrono::FixedOffset;
use serde::{Deserialize, Serialize};

use crate::chunk::DEFAULT_CHUNK_LIMIT;
use crate::error::ConfigError;
use crate::fetch::{DEFAULT_FETCH_TIMEOUT, DEFAULT_MAX_BODY_BYTES, DEFAULT_USER_AGENT};
use crate::message::Labels;
use crate::transport::DEFAULT_FRAGMENT_DELAY;

/// Default live alert feed.
pub const DEFAULT_ALERTS_URL: &str = "https://alarms.cloudt.info/api/alerts/live";

/// Default breaking-news RSS feed.
pub const DEFAULT_NEWS_URL: &str = "https://www.ynet.co.il/Integration/StoryRss1854.xml";

/// Default timestamp offset (Israel Daylight Time).
pub const DEFAULT_UTC_OFFSET: &str = "+03:00";

// ============================================================================
// Root
// ============================================================================

/// Complete bridge configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BridgeConfig {
    /// Feed endpoints and HTTP settings.
    pub feeds: FeedsConfig,
    /// Poll cadence.
    pub polling: PollingConfig,
    /// Channel table, chunking and pacing.
    pub transport: TransportConfig,
    /// Timestamp rendering.
    pub time: TimeConfig,
    /// Notification wording.
    pub labels: Labels,
}

// ============================================================================
// Sections
// ============================================================================

/// Feed endpoints and HTTP settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FeedsConfig {
    /// Live alert feed URL (JSON).
    pub alerts_url: String,
    /// News feed URL (RSS or Atom).
    pub news_url: String,
    /// `User-Agent` sent with every request.
    pub user_agent: String,
    /// Per-request timeout.
    #[serde(with = "duration_str")]
    pub fetch_timeout: Duration,
    /// Largest accepted response body in bytes.
    pub max_body_bytes: usize,
}

impl Default for FeedsConfig {
    fn default() -> Self {
        Self {
            alerts_url: DEFAULT_ALERTS_URL.to_string(),
            news_url: DEFAULT_NEWS_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

/// Poll cadence for both cycles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PollingConfig {
    /// Delay between alert polls.
    #[serde(with = "duration_str")]
    pub alert_interval: Duration,
    /// Delay between news polls.
    #[serde(with = "duration_str")]
    pub news_interval: Duration,
    /// Pause between consecutive news items within one poll.
    #[serde(with = "duration_str")]
    pub news_item_delay: Duration,
    /// Whether the news cycle runs at all.
    pub news_enabled: bool,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            alert_interval: Duration::from_secs(1),
            news_interval: Duration::from_secs(120),
            news_item_delay: Duration::from_secs(1),
            news_enabled: true,
        }
    }
}

/// Channel table, chunking and pacing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TransportConfig {
    /// Channel names in slot order; a channel's handle is its index.
    pub channels: Vec<String>,
    /// Channel carrying alert notifications.
    pub alerts_channel: String,
    /// Channel carrying news notifications.
    pub news_channel: String,
    /// Maximum fragment size in UTF-8 bytes.
    pub chunk_limit: usize,
    /// Pause after each fragment.
    #[serde(with = "duration_str")]
    pub fragment_delay: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            channels: vec!["Primary".into(), "Alerts".into(), "News".into()],
            alerts_channel: "Alerts".to_string(),
            news_channel: "News".to_string(),
            chunk_limit: DEFAULT_CHUNK_LIMIT,
            fragment_delay: DEFAULT_FRAGMENT_DELAY,
        }
    }
}

/// Timestamp rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TimeConfig {
    /// Fixed UTC offset such as `+03:00`.
    pub utc_offset: String,
}

impl Default for TimeConfig {
    fn default() -> Self {
        Self {
            utc_offset: DEFAULT_UTC_OFFSET.to_string(),
        }
    }
}

impl TimeConfig {
    /// Parses the configured offset.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if the offset is not `±HH:MM`.
    pub fn offset(&self) -> Result<FixedOffset, ConfigError> {
        FixedOffset::from_str(self.utc_offset.trim()).map_err(|_| ConfigError::InvalidValue {
            field: "time.utc_offset".to_string(),
            value: self.utc_offset.clone(),
            expected: "an offset like +03:00".to_string(),
        })
    }
}

// ============================================================================
// Duration (de)serialization
// ============================================================================

/// Serde adapter for human-readable durations (`"1s"`, `"2m"`, `"300ms"`).
pub mod duration_str {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    /// Serializes a duration as a humantime string.
    ///
    /// # Errors
    ///
    /// Propagates serializer errors.
    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&humantime::format_duration(*value))
    }

    /// Deserializes a humantime string.
    ///
    /// # Errors
    ///
    /// Returns a deserializer error when the string is not a duration.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let raw = String::deserialize(deserializer)?;
        humantime::parse_duration(raw.trim()).map_err(serde::de::Error::custom)
    }
}
