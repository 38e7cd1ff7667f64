//! News feed entry extraction.
//!
//! Pulls `(title, link)` pairs out of RSS 2.0 `<item>` and Atom `<entry>`
//! elements. Only those two fields matter to the bridge, so this is a
//! tolerant scanner rather than a validating XML parser: anything it cannot
//! make sense of is skipped.

use std::sync::LazyLock;

use regex::{Captures, Regex};

static ITEM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<item\b[^>]*>(.*?)</item>").expect("valid regex"));

static ENTRY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<entry\b[^>]*>(.*?)</entry>").expect("valid regex"));

static TITLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<title\b[^>]*>(.*?)</title>").expect("valid regex"));

static LINK_TEXT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<link(?:\s[^>]*)?>\s*(<!\[CDATA\[.*?\]\]>|[^<]*)\s*</link>")
        .expect("valid regex")
});

static LINK_TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<link\b([^>]*)>").expect("valid regex"));

static HREF_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?is)\bhref\s*=\s*["']([^"']*)["']"#).expect("valid regex"));

static REL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?is)\brel\s*=\s*["']([^"']*)["']"#).expect("valid regex"));

static CDATA_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<!\[CDATA\[(.*?)\]\]>").expect("valid regex"));

static ENTITY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&(#[xX][0-9a-fA-F]+|#[0-9]+|amp|lt|gt|quot|apos);").expect("valid regex")
});

/// One headline from the news feed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NewsEntry {
    /// Headline text.
    pub title: String,
    /// Canonical article URL; also the deduplication key.
    pub link: String,
}

impl NewsEntry {
    /// Creates an entry, trimming both fields.
    #[must_use]
    pub fn new(title: impl Into<String>, link: impl Into<String>) -> Self {
        Self {
            title: title.into().trim().to_string(),
            link: link.into().trim().to_string(),
        }
    }
}

/// Extracts entries in document order.
///
/// RSS items are used when present; otherwise Atom entries. Entries without
/// a link are kept with an empty link and filtered out downstream.
#[must_use]
pub fn parse_feed(xml: &str) -> Vec<NewsEntry> {
    let items: Vec<&str> = ITEM_RE
        .captures_iter(xml)
        .filter_map(|c| c.get(1).map(|m| m.as_str()))
        .collect();

    if !items.is_empty() {
        return items.into_iter().map(parse_rss_item).collect();
    }

    ENTRY_RE
        .captures_iter(xml)
        .filter_map(|c| c.get(1).map(|m| m.as_str()))
        .map(parse_atom_entry)
        .collect()
}

fn parse_rss_item(body: &str) -> NewsEntry {
    let title = capture_text(&TITLE_RE, body);
    let link = capture_text(&LINK_TEXT_RE, body);
    NewsEntry::new(title, link)
}

fn parse_atom_entry(body: &str) -> NewsEntry {
    let title = capture_text(&TITLE_RE, body);
    let link = LINK_TAG_RE
        .captures_iter(body)
        .filter_map(|c| c.get(1).map(|m| m.as_str()))
        .filter(|attrs| {
            REL_RE
                .captures(attrs)
                .and_then(|c| c.get(1))
                .is_none_or(|rel| rel.as_str().eq_ignore_ascii_case("alternate"))
        })
        .find_map(|attrs| HREF_RE.captures(attrs).and_then(|c| c.get(1)))
        .map(|m| decode_text(m.as_str()))
        .unwrap_or_default();
    NewsEntry::new(title, link)
}

fn capture_text(re: &Regex, body: &str) -> String {
    re.captures(body)
        .and_then(|c| c.get(1))
        .map(|m| decode_text(m.as_str()))
        .unwrap_or_default()
}

/// Unwraps CDATA sections and decodes XML entities outside them.
#[must_use]
pub fn decode_text(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut last = 0;
    for caps in CDATA_RE.captures_iter(raw) {
        let (Some(whole), Some(inner)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        out.push_str(&decode_entities(&raw[last..whole.start()]));
        out.push_str(inner.as_str());
        last = whole.end();
    }
    out.push_str(&decode_entities(&raw[last..]));
    out.trim().to_string()
}

fn decode_entities(s: &str) -> String {
    ENTITY_RE
        .replace_all(s, |caps: &Captures<'_>| {
            let name = &caps[1];
            match name {
                "amp" => "&".to_string(),
                "lt" => "<".to_string(),
                "gt" => ">".to_string(),
                "quot" => "\"".to_string(),
                "apos" => "'".to_string(),
                _ => numeric_entity(name).map_or_else(|| caps[0].to_string(), String::from),
            }
        })
        .into_owned()
}

fn numeric_entity(name: &str) -> Option<char> {
    let digits = name.strip_prefix('#')?;
    let code = match digits.strip_prefix(['x', 'X']) {
        Some(hex) => u32::from_str_radix(hex, 16).ok()?,
        None => digits.parse().ok()?,
    };
    char::from_u32(code)
}
