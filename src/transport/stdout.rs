//! Line-oriented sink over stdout.
//!
//! Writes each fragment as one NDJSON object, `{"channel":1,"text":"..."}`,
//! so a separate radio gateway process (or a human) can consume the stream.

use std::pin::Pin;

use serde::Serialize;
use tokio::io::{AsyncWrite, AsyncWriteExt, BufWriter};
use tokio::sync::Mutex;

use super::{ChannelId, Result, TransportSink};

type BoxedWriter = Pin<Box<dyn AsyncWrite + Send>>;

#[derive(Serialize)]
struct Frame<'a> {
    channel: u32,
    text: &'a str,
}

/// NDJSON sink over stdout or any async writer.
///
/// The writer sits behind a `tokio::sync::Mutex` because the lock is held
/// across `.await` points.
pub struct StdoutSink {
    writer: Mutex<BufWriter<BoxedWriter>>,
}

impl StdoutSink {
    /// Creates a sink writing to the process's stdout.
    #[must_use]
    pub fn new() -> Self {
        Self::with_writer(tokio::io::stdout())
    }

    /// Creates a sink writing to an arbitrary async writer.
    #[must_use]
    pub fn with_writer<W>(writer: W) -> Self
    where
        W: AsyncWrite + Send + 'static,
    {
        Self {
            writer: Mutex::new(BufWriter::new(Box::pin(writer))),
        }
    }
}

impl Default for StdoutSink {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for StdoutSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StdoutSink").finish_non_exhaustive()
    }
}

#[async_trait::async_trait]
impl TransportSink for StdoutSink {
    async fn send(&self, channel: ChannelId, fragment: &str) -> Result<()> {
        let mut line = serde_json::to_vec(&Frame {
            channel: channel.0,
            text: fragment,
        })?;
        line.push(b'\n');

        let mut writer = self.writer.lock().await;
        writer.write_all(&line).await?;
        writer.flush().await?;
        drop(writer);
        tracing::debug!(%channel, bytes = fragment.len(), "fragment written");
        Ok(())
    }

    fn sink_type(&self) -> &'static str {
        "stdout"
    }
}
