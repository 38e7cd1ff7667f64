//! Prometheus metrics for the bridge.
//!
//! Every recording function is a no-op until [`init_metrics`] installs a
//! global recorder, so the poll cycles call them unconditionally.

use std::sync::atomic::{AtomicBool, Ordering};

use metrics::{counter, describe_counter, describe_gauge, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::alert::Phase;
use crate::error::BridgeError;

/// Guard to prevent double-initialization of the metrics recorder.
static METRICS_INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Feed label values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feed {
    /// Alert feed.
    Alerts,
    /// News feed.
    News,
}

impl Feed {
    /// Returns the label value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Alerts => "alerts",
            Self::News => "news",
        }
    }
}

/// Initializes the global metrics recorder.
///
/// When `port` is `Some`, a Prometheus HTTP listener is started on
/// `127.0.0.1:<port>`.  When `None`, the recorder is installed without
/// an HTTP endpoint.
///
/// # Errors
///
/// Returns `BridgeError::Io` if the recorder or HTTP listener cannot be
/// installed (e.g. port already in use).
pub fn init_metrics(port: Option<u16>) -> Result<(), BridgeError> {
    if METRICS_INITIALIZED.swap(true, Ordering::SeqCst) {
        tracing::debug!("metrics already initialized, skipping");
        return Ok(());
    }
    port.map_or_else(
        || PrometheusBuilder::new().install_recorder().map(|_| ()),
        |p| {
            PrometheusBuilder::new()
                .with_http_listener(([127, 0, 0, 1], p))
                .install()
        },
    )
    .map_err(|e| BridgeError::Io(std::io::Error::other(e.to_string())))?;

    describe_metrics();
    Ok(())
}

/// Registers metric descriptions with the global recorder.
fn describe_metrics() {
    describe_counter!("meshbridge_polls_total", "Feed polls attempted");
    describe_counter!("meshbridge_fetch_errors_total", "Feed polls that failed");
    describe_counter!(
        "meshbridge_idle_polls_total",
        "Alert polls that returned an idle or non-JSON body"
    );
    describe_counter!(
        "meshbridge_phase_transitions_total",
        "Alert phase transitions committed"
    );
    describe_gauge!(
        "meshbridge_current_phase",
        "Category code of the current alert phase"
    );
    describe_counter!(
        "meshbridge_notifications_total",
        "Logical notifications dispatched"
    );
    describe_counter!(
        "meshbridge_fragments_sent_total",
        "Transport fragments handed to the sink"
    );
    describe_counter!(
        "meshbridge_fragment_bytes_total",
        "Bytes handed to the sink"
    );
}

/// Records a poll attempt.
pub fn record_poll(feed: Feed) {
    counter!("meshbridge_polls_total", "feed" => feed.as_str()).increment(1);
}

/// Records a failed poll.
pub fn record_fetch_error(feed: Feed) {
    counter!("meshbridge_fetch_errors_total", "feed" => feed.as_str()).increment(1);
}

/// Records an idle alert poll.
pub fn record_idle_poll() {
    counter!("meshbridge_idle_polls_total").increment(1);
}

/// Records a committed phase transition and updates the phase gauge.
#[allow(clippy::cast_precision_loss)]
pub fn record_phase_transition(from: Phase, to: Phase) {
    counter!(
        "meshbridge_phase_transitions_total",
        "from" => from.as_str(),
        "to" => to.as_str()
    )
    .increment(1);
    gauge!("meshbridge_current_phase").set(to.code() as f64);
}

/// Records a dispatched notification (`transition`, `aircraft`, `news`, `test`).
pub fn record_notification(kind: &'static str) {
    counter!("meshbridge_notifications_total", "kind" => kind).increment(1);
}

/// Records one fragment handed to the sink.
pub fn record_fragment_sent(bytes: usize) {
    counter!("meshbridge_fragments_sent_total").increment(1);
    counter!("meshbridge_fragment_bytes_total").increment(bytes as u64);
}
