//! News path: feed parsing and deduplication.

pub mod dedup;
pub mod feed;

pub use dedup::NewsDeduplicator;
pub use feed::{NewsEntry, parse_feed};
