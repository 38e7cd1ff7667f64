//! In-memory sink.
//!
//! Keeps every fragment it is given, for library embedders that inspect
//! output themselves and for the test suite.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use super::{ChannelId, Result, TransportSink};
use crate::error::TransportError;

/// Sink that records fragments instead of transmitting them.
#[derive(Debug, Default)]
pub struct RecordingSink {
    sent: Mutex<Vec<(ChannelId, String)>>,
    failing: AtomicBool,
}

impl RecordingSink {
    /// Creates an empty recording sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes subsequent sends fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Returns every fragment recorded so far, in send order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn sent(&self) -> Vec<(ChannelId, String)> {
        self.sent.lock().expect("recording sink lock poisoned").clone()
    }

    /// Returns the fragments recorded for one channel.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn fragments(&self, channel: ChannelId) -> Vec<String> {
        self.sent
            .lock()
            .expect("recording sink lock poisoned")
            .iter()
            .filter(|(c, _)| *c == channel)
            .map(|(_, text)| text.clone())
            .collect()
    }
}

#[async_trait::async_trait]
impl TransportSink for RecordingSink {
    async fn send(&self, channel: ChannelId, fragment: &str) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(TransportError::SendFailed("recording sink set to fail".into()));
        }
        self.sent
            .lock()
            .map_err(|_| TransportError::SendFailed("recording sink lock poisoned".into()))?
            .push((channel, fragment.to_string()));
        Ok(())
    }

    fn sink_type(&self) -> &'static str {
        "recording"
    }
}
