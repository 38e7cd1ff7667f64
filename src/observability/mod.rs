//! Observability module
//!
//! Logging and metrics infrastructure for monitoring the bridge.

pub mod logging;
pub mod metrics;

pub use logging::init_logging;
pub use metrics::init_metrics;
