//! Logging initialization.
//!
//! Log lines go to stderr so that stdout stays a clean fragment stream for
//! the radio gateway. `MESHBRIDGE_LOG_LEVEL` accepts any `tracing` filter
//! directive and replaces the `-v` mapping entirely.

use std::io::IsTerminal;

use tracing_subscriber::EnvFilter;

use crate::cli::args::{ColorChoice, LogFormat};

/// Environment variable overriding the verbosity flags.
pub const LOG_LEVEL_ENV: &str = "MESHBRIDGE_LOG_LEVEL";

/// HTTP stack targets that are capped at `warn` unless tracing everything.
const CHATTY_TARGETS: [&str; 3] = ["hyper_util", "reqwest", "rustls"];

/// Maps a verbosity level to the bridge's own log level.
///
/// The transmit log (`TX → ...`) is logged at `info`, so that is the
/// quietest level; `-v` is `debug` and `-vv` or more is `trace`.
#[must_use]
pub const fn verbosity_to_directive(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    }
}

/// Builds the filter for a verbosity level when no override is set.
///
/// Below `trace`, the HTTP client's own chatter is held back at `warn`.
fn default_filter(verbosity: u8) -> EnvFilter {
    let level = verbosity_to_directive(verbosity);
    let mut directives = vec![level.to_string()];
    if level != "trace" {
        directives.extend(CHATTY_TARGETS.iter().map(|t| format!("{t}=warn")));
    }
    EnvFilter::new(directives.join(","))
}

/// Decides whether to emit ANSI colors on stderr.
fn use_ansi(color: ColorChoice) -> bool {
    match color {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => {
            std::io::stderr().is_terminal() && std::env::var_os("NO_COLOR").is_none()
        }
    }
}

/// Installs the global tracing subscriber.
///
/// Safe to call more than once; later calls are ignored.
pub fn init_logging(format: LogFormat, verbosity: u8, color: ColorChoice) {
    let filter = EnvFilter::try_from_env(LOG_LEVEL_ENV).unwrap_or_else(|_| default_filter(verbosity));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(verbosity > 0)
        .with_writer(std::io::stderr);

    let installed = match format {
        LogFormat::Human => builder.with_ansi(use_ansi(color)).try_init(),
        LogFormat::Json => builder.json().with_current_span(false).try_init(),
    };
    if installed.is_err() {
        tracing::trace!("tracing subscriber already installed");
    }
}
