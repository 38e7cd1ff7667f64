//! Word-safe message chunking.
//!
//! The mesh carries at most a couple of hundred bytes per packet, so every
//! message is split on whitespace into fragments whose UTF-8 length stays
//! within a limit. Words are never split; a single word longer than the
//! limit becomes its own oversized fragment.

use std::iter::Peekable;
use std::str::SplitWhitespace;

/// Default maximum fragment size in bytes.
pub const DEFAULT_CHUNK_LIMIT: usize = 180;

/// Splits messages into fragments of at most `limit` bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunker {
    limit: usize,
}

impl Chunker {
    /// Creates a chunker with the given byte limit.
    #[must_use]
    pub const fn new(limit: usize) -> Self {
        Self { limit }
    }

    /// Returns the byte limit.
    #[must_use]
    pub const fn limit(&self) -> usize {
        self.limit
    }

    /// Returns a lazy iterator over the fragments of `message`.
    ///
    /// The iterator is `Clone`, so a partially consumed sequence can be
    /// restarted from any point.
    #[must_use]
    pub fn chunks<'a>(&self, message: &'a str) -> Chunks<'a> {
        Chunks {
            words: message.split_whitespace().peekable(),
            limit: self.limit,
        }
    }
}

impl Default for Chunker {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK_LIMIT)
    }
}

/// Iterator returned by [`Chunker::chunks`].
#[derive(Debug, Clone)]
pub struct Chunks<'a> {
    words: Peekable<SplitWhitespace<'a>>,
    limit: usize,
}

impl Iterator for Chunks<'_> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        let mut fragment = self.words.next()?.to_string();
        while let Some(word) = self.words.peek() {
            if fragment.len() + 1 + word.len() > self.limit {
                break;
            }
            fragment.push(' ');
            fragment.push_str(word);
            self.words.next();
        }
        Some(fragment)
    }
}

impl std::iter::FusedIterator for Chunks<'_> {}

/// Convenience wrapper collecting all fragments.
#[must_use]
pub fn split_chunks(message: &str, limit: usize) -> Vec<String> {
    Chunker::new(limit).chunks(message).collect()
}
