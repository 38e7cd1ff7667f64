//! Seen-link tracking for the news path.

use std::collections::HashSet;

use super::feed::NewsEntry;

/// Filters news entries down to ones not yet dispatched.
///
/// The seen set grows for the life of the process and is never pruned.
#[derive(Debug, Clone, Default)]
pub struct NewsDeduplicator {
    seen: HashSet<String>,
}

impl NewsDeduplicator {
    /// Creates an empty deduplicator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the entries still to dispatch, oldest first.
    ///
    /// Feeds list newest first, so entries are walked in reverse. Entries
    /// with an empty link, already seen links, and repeats within the same
    /// feed are dropped.
    #[must_use]
    pub fn pending<'a>(&self, entries: &'a [NewsEntry]) -> Vec<&'a NewsEntry> {
        let mut batch = HashSet::new();
        let mut pending = Vec::new();
        for entry in entries.iter().rev() {
            if entry.link.is_empty() || self.seen.contains(&entry.link) {
                continue;
            }
            if batch.insert(entry.link.as_str()) {
                pending.push(entry);
            }
        }
        pending
    }

    /// Records a link as dispatched.
    ///
    /// Returns `false` if it was already known.
    pub fn mark_seen(&mut self, link: &str) -> bool {
        self.seen.insert(link.to_string())
    }

    /// Number of links dispatched so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    /// Returns `true` if nothing has been dispatched yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
