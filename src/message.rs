//! Notification wire formats.
//!
//! Existing mesh consumers parse these strings, so the layout and the
//! default label wording must stay exactly as rendered here.

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};

/// Timestamp layout used in every notification.
pub const TIMESTAMP_FORMAT: &str = "%d/%m/%Y %H:%M:%S";

/// Prefix for news notifications.
pub const NEWS_PREFIX: &str = "\u{1f4f0}";

/// Locale-specific words embedded in notifications.
///
/// Defaults are the Hebrew wording used by the upstream alert web app.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Labels {
    /// Label preceding the locations list.
    pub area: String,
    /// Label preceding the alert title.
    pub alert_type: String,
    /// Label preceding the timestamp.
    pub timestamp: String,
    /// Placeholder when an alert carries no locations.
    pub general: String,
    /// Alert type shown on manual test messages.
    pub manual_test: String,
    /// Title used for a new aircraft incursion that arrives without one.
    pub aircraft_intrusion: String,
}

impl Default for Labels {
    fn default() -> Self {
        Self {
            area: "איזור".to_string(),
            alert_type: "סוג ההתרעה".to_string(),
            timestamp: "חותמת זמן".to_string(),
            general: "כללי".to_string(),
            manual_test: "בדיקה ידנית".to_string(),
            aircraft_intrusion: "חדירת כלי טיס עוין".to_string(),
        }
    }
}

/// Produces notification timestamps in a fixed UTC offset.
#[derive(Debug, Clone, Copy)]
pub struct Timestamper {
    offset: FixedOffset,
}

impl Timestamper {
    /// Creates a timestamper for the given offset.
    #[must_use]
    pub const fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }

    /// Formats the current time.
    #[must_use]
    pub fn now(&self) -> String {
        self.format(Utc::now())
    }

    /// Formats `instant` in this timestamper's offset.
    #[must_use]
    pub fn format(&self, instant: DateTime<Utc>) -> String {
        instant
            .with_timezone(&self.offset)
            .format(TIMESTAMP_FORMAT)
            .to_string()
    }
}

/// Renders an alert notification.
///
/// `<glyph> <area>: <locations> | <type>: <title> | <timestamp>: <time>`
#[must_use]
pub fn format_alert(
    labels: &Labels,
    glyph: &str,
    title: &str,
    locations: &str,
    timestamp: &str,
) -> String {
    format!(
        "{glyph} {}: {locations} | {}: {title} | {}: {timestamp}",
        labels.area, labels.alert_type, labels.timestamp
    )
}

/// Renders the manual test notification sent from the CLI.
#[must_use]
pub fn format_test(labels: &Labels, areas: &str, timestamp: &str) -> String {
    format!(
        "{}: {areas} | {}: {} | {}: {timestamp}",
        labels.area, labels.alert_type, labels.manual_test, labels.timestamp
    )
}

/// Renders the messages for one news item.
///
/// The link is appended to the title when the combined text fits within
/// `limit` bytes; otherwise title and link go out as two messages.
#[must_use]
pub fn format_news(title: &str, link: &str, limit: usize) -> Vec<String> {
    let headline = format!("{NEWS_PREFIX} {title}");
    let combined = format!("{headline} | {link}");
    if combined.len() <= limit {
        vec![combined]
    } else {
        vec![headline, link.to_string()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn israel() -> Timestamper {
        Timestamper::new(FixedOffset::east_opt(3 * 3600).unwrap())
    }

    #[test]
    fn test_timestamp_uses_offset() {
        let instant = Utc.with_ymd_and_hms(2025, 6, 13, 22, 5, 9).unwrap();
        assert_eq!(israel().format(instant), "14/06/2025 01:05:09");
    }

    #[test]
    fn test_alert_format() {
        let msg = format_alert(
            &Labels::default(),
            "🚨",
            "ירי רקטות וטילים",
            "שדרות, נתיבות",
            "14/06/2025 01:05:09",
        );
        assert_eq!(
            msg,
            "🚨 איזור: שדרות, נתיבות | סוג ההתרעה: ירי רקטות וטילים | חותמת זמן: 14/06/2025 01:05:09"
        );
    }

    #[test]
    fn test_test_format() {
        let msg = format_test(&Labels::default(), "תל אביב", "01/01/2025 00:00:00");
        assert_eq!(
            msg,
            "איזור: תל אביב | סוג ההתרעה: בדיקה ידנית | חותמת זמן: 01/01/2025 00:00:00"
        );
    }

    #[test]
    fn test_news_fits_in_one_message() {
        let msgs = format_news("Headline", "https://example.com/a", 180);
        assert_eq!(msgs, vec!["📰 Headline | https://example.com/a"]);
    }

    #[test]
    fn test_news_split_when_too_long() {
        let link = format!("https://example.com/{}", "x".repeat(170));
        let msgs = format_news("Headline", &link, 180);
        assert_eq!(msgs, vec!["📰 Headline".to_string(), link]);
    }

    #[test]
    fn test_news_limit_counts_bytes() {
        // 10 Hebrew letters are 20 bytes.
        let title = "אבגדהוזחטי";
        let link = "https://e.co/1";
        let exact = format!("📰 {title} | {link}").len();
        assert_eq!(format_news(title, link, exact).len(), 1);
        assert_eq!(format_news(title, link, exact - 1).len(), 2);
    }
}
