//! Alert feed classification.
//!
//! Turns a raw feed body into zero or more [`AlertRecord`]s. The live feed
//! spends most of its time returning idle sentinels or an HTML error page,
//! and occasionally truncated JSON; all of those classify to an empty list
//! rather than an error.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};

/// Bodies the feed returns when there is nothing to report.
///
/// Compared after trimming whitespace and a leading byte-order mark.
const IDLE_SENTINELS: [&str; 4] = ["", r"\r\n", r#""\r\n""#, "OK"];

static HTML_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(?:<!doctype html>|<html)").expect("valid regex"));

/// A single normalized alert from one feed poll.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AlertRecord {
    /// Upstream category code (`cat`, else `category`, else 0).
    pub category: i64,
    /// Upstream alert identifier, used to tell aircraft incursions apart.
    pub id: Option<String>,
    /// Human-readable alert title.
    pub title: Option<String>,
    /// Area and location names covered by this alert.
    pub areas: Vec<String>,
}

impl AlertRecord {
    /// Builds a record from one JSON object of the feed.
    #[must_use]
    pub fn from_object(obj: &Map<String, Value>) -> Self {
        let category = obj
            .get("cat")
            .and_then(coerce_code)
            .or_else(|| obj.get("category").and_then(coerce_code))
            .unwrap_or(0);

        let id = match obj.get("id") {
            Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        };

        let title = match obj.get("title") {
            Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
            _ => None,
        };

        let areas = match obj.get("data") {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect(),
            Some(Value::String(s)) => vec![s.clone()],
            _ => Vec::new(),
        };

        Self {
            category,
            id,
            title,
            areas,
        }
    }
}

/// Coerces a JSON value into an integer category code.
///
/// Accepts integers, floats (truncated) and numeric strings.
fn coerce_code(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            #[allow(clippy::cast_possible_truncation)]
            n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)
        }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Strips surrounding whitespace and a leading byte-order mark.
#[must_use]
pub fn normalize_body(raw: &str) -> &str {
    raw.trim().trim_start_matches('\u{feff}').trim()
}

/// Returns `true` when the body is an idle sentinel or an HTML page.
#[must_use]
pub fn is_idle_body(raw: &str) -> bool {
    let body = normalize_body(raw);
    IDLE_SENTINELS.contains(&body) || HTML_RE.is_match(body)
}

/// Classifies a raw feed body into alert records.
///
/// A single object yields one record, an array yields one record per
/// object element, and anything else (idle sentinels, HTML, bare strings,
/// malformed JSON) yields an empty list.
#[must_use]
pub fn classify(raw: &str) -> Vec<AlertRecord> {
    if is_idle_body(raw) {
        return Vec::new();
    }

    let Ok(value) = serde_json::from_str::<Value>(normalize_body(raw)) else {
        tracing::debug!("alert feed body is not valid JSON, treating as idle");
        return Vec::new();
    };

    match value {
        Value::Object(obj) => vec![AlertRecord::from_object(&obj)],
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_object)
            .map(AlertRecord::from_object)
            .collect(),
        _ => Vec::new(),
    }
}

/// Joins the areas of every record whose category is in `categories`.
///
/// Returns `general` when no matching record carries any area, so a
/// notification never goes out with an empty location field.
#[must_use]
pub fn flattened_locations(records: &[AlertRecord], categories: &[i64], general: &str) -> String {
    let joined = records
        .iter()
        .filter(|r| categories.contains(&r.category))
        .flat_map(|r| r.areas.iter().map(String::as_str))
        .collect::<Vec<_>>()
        .join(", ");

    if joined.is_empty() {
        general.to_string()
    } else {
        joined
    }
}
