//! Transport abstraction layer.
//!
//! The radio link itself lives outside this crate. The bridge only needs a
//! [`TransportSink`] that accepts one fragment for one logical channel, and a
//! [`ChannelResolver`] that maps human-readable channel names to the numeric
//! handles the sink understands. Outgoing messages go through a single
//! [`Dispatcher`] so fragments of two messages never interleave on the wire.

pub mod dispatcher;
pub mod recording;
pub mod stdout;

pub use dispatcher::{DEFAULT_FRAGMENT_DELAY, Dispatcher};
pub use recording::RecordingSink;
pub use stdout::StdoutSink;

use std::fmt;

use crate::error::TransportError;

/// Result type alias for transport operations.
pub type Result<T> = std::result::Result<T, TransportError>;

/// Numeric channel handle (slot index on the radio).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChannelId(pub u32);

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Async sink for transport-sized text fragments.
///
/// Implementations do not chunk or pace; [`Dispatcher`] does both and
/// guarantees only one `send` is in flight at a time.
#[async_trait::async_trait]
pub trait TransportSink: Send + Sync {
    /// Sends one fragment on the given channel. No acknowledgement is awaited.
    async fn send(&self, channel: ChannelId, fragment: &str) -> Result<()>;

    /// Returns the type of this sink for logging.
    fn sink_type(&self) -> &'static str;
}

/// Maps channel names to channel handles.
pub trait ChannelResolver: Send + Sync {
    /// Resolves `name` to a channel handle.
    ///
    /// # Errors
    ///
    /// Returns `TransportError::ChannelNotFound` if no channel carries `name`.
    fn resolve(&self, name: &str) -> Result<ChannelId>;
}

/// Ordered channel slot table; a channel's handle is its position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelTable {
    names: Vec<String>,
}

impl ChannelTable {
    /// Creates a table from slot names in slot order.
    #[must_use]
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns the slot names.
    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }
}

impl ChannelResolver for ChannelTable {
    fn resolve(&self, name: &str) -> Result<ChannelId> {
        self.names
            .iter()
            .position(|n| n == name)
            .and_then(|idx| u32::try_from(idx).ok())
            .map(ChannelId)
            .ok_or_else(|| TransportError::ChannelNotFound(name.to_string()))
    }
}
