//! Serialized, paced message dispatch.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;

use super::{ChannelId, Result, TransportSink};
use crate::chunk::Chunker;
use crate::observability::metrics;

/// Default pause after each fragment.
pub const DEFAULT_FRAGMENT_DELAY: Duration = Duration::from_millis(300);

/// Chunks messages and hands fragments to the sink one at a time.
///
/// The gate is held for the whole message, including the pauses between
/// fragments, so concurrent callers never interleave fragments. The async
/// mutex is required because the lock is held across `.await` points.
pub struct Dispatcher {
    sink: Arc<dyn TransportSink>,
    chunker: Chunker,
    fragment_delay: Duration,
    gate: Mutex<()>,
}

impl Dispatcher {
    /// Creates a dispatcher over `sink`.
    #[must_use]
    pub fn new(sink: Arc<dyn TransportSink>, chunker: Chunker, fragment_delay: Duration) -> Self {
        Self {
            sink,
            chunker,
            fragment_delay,
            gate: Mutex::new(()),
        }
    }

    /// Returns the chunker's byte limit.
    #[must_use]
    pub const fn chunk_limit(&self) -> usize {
        self.chunker.limit()
    }

    /// Sends one logical message, returning the number of fragments sent.
    ///
    /// Dropping the returned future abandons the message mid-way; the gate
    /// is released and later messages are unaffected.
    ///
    /// # Errors
    ///
    /// Returns the sink's error for the first fragment that fails; the
    /// remaining fragments are not sent.
    pub async fn send(&self, channel: ChannelId, message: &str) -> Result<usize> {
        let _gate = self.gate.lock().await;
        tracing::info!(%channel, sink = self.sink.sink_type(), "TX \u{2192} {message}");

        let mut sent = 0;
        for fragment in self.chunker.chunks(message) {
            self.sink.send(channel, &fragment).await?;
            sent += 1;
            metrics::record_fragment_sent(fragment.len());
            if !self.fragment_delay.is_zero() {
                tokio::time::sleep(self.fragment_delay).await;
            }
        }
        Ok(sent)
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("sink", &self.sink.sink_type())
            .field("chunker", &self.chunker)
            .field("fragment_delay", &self.fragment_delay)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::RecordingSink;

    fn dispatcher(sink: &Arc<RecordingSink>, limit: usize, delay: Duration) -> Dispatcher {
        Dispatcher::new(
            Arc::clone(sink) as Arc<dyn TransportSink>,
            Chunker::new(limit),
            delay,
        )
    }

    #[tokio::test]
    async fn test_send_chunks_in_order() {
        let sink = Arc::new(RecordingSink::new());
        let d = dispatcher(&sink, 5, Duration::ZERO);
        let sent = d.send(ChannelId(1), "aa bb cc dd").await.unwrap();
        assert_eq!(sent, 2);
        assert_eq!(sink.fragments(ChannelId(1)), vec!["aa bb", "cc dd"]);
    }

    #[tokio::test]
    async fn test_failure_stops_message() {
        let sink = Arc::new(RecordingSink::new());
        sink.set_failing(true);
        let d = dispatcher(&sink, 5, Duration::ZERO);
        assert!(d.send(ChannelId(1), "aa bb cc dd").await.is_err());
        assert!(sink.sent().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_fragments_are_paced() {
        let sink = Arc::new(RecordingSink::new());
        let d = dispatcher(&sink, 2, Duration::from_millis(300));
        let start = tokio::time::Instant::now();
        d.send(ChannelId(0), "a b c").await.unwrap();
        assert_eq!(start.elapsed(), Duration::from_millis(900));
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_messages_do_not_interleave() {
        let sink = Arc::new(RecordingSink::new());
        let d = Arc::new(dispatcher(&sink, 1, Duration::from_millis(300)));

        let d1 = Arc::clone(&d);
        let d2 = Arc::clone(&d);
        let (a, b) = tokio::join!(
            async move { d1.send(ChannelId(1), "a1 a2 a3").await },
            async move { d2.send(ChannelId(2), "b1 b2 b3").await },
        );
        assert_eq!(a.unwrap(), 3);
        assert_eq!(b.unwrap(), 3);

        let texts: Vec<String> = sink.sent().into_iter().map(|(_, t)| t).collect();
        let first = &texts[0][..1];
        let expected_first: Vec<String> = (1..=3).map(|i| format!("{first}{i}")).collect();
        assert_eq!(&texts[..3], expected_first.as_slice());
    }
}
