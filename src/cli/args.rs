//! CLI argument definitions.
//!
//! All Clap derive structs for `meshbridge` command-line parsing.

use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};

use crate::config::BridgeConfig;

// ============================================================================
// Root CLI
// ============================================================================

/// Relays civil-defense alerts and breaking news to a mesh radio network.
#[derive(Parser, Debug)]
#[command(name = "meshbridge", author, version, about)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v debug, -vv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output control.
    #[arg(long, default_value = "auto", global = true, env = "MESHBRIDGE_COLOR")]
    pub color: ColorChoice,

    /// Log output format.
    #[arg(
        long,
        default_value = "human",
        global = true,
        env = "MESHBRIDGE_LOG_FORMAT"
    )]
    pub log_format: LogFormat,
}

// ============================================================================
// Commands
// ============================================================================

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Poll the feeds and relay notifications until interrupted.
    Run(RunArgs),

    /// Load and validate configuration, then print it as YAML.
    Check(CheckArgs),

    /// Display version information.
    Version(VersionArgs),
}

/// Arguments for `run`.
#[derive(Args, Debug)]
#[command(group = clap::ArgGroup::new("manual_test").multiple(false))]
pub struct RunArgs {
    /// Path to YAML configuration file.
    #[arg(short, long, env = "MESHBRIDGE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Send a manual test notification for AREAS, then keep running.
    #[arg(long, value_name = "AREAS", group = "manual_test")]
    pub test: Option<String>,

    /// Send a manual test notification for AREAS, then exit.
    #[arg(long, value_name = "AREAS", group = "manual_test")]
    pub test_only: Option<String>,

    /// Disable the news cycle.
    #[arg(long)]
    pub no_news: bool,

    /// Expose Prometheus metrics on 127.0.0.1:PORT.
    #[arg(long, value_name = "PORT", env = "MESHBRIDGE_METRICS_PORT")]
    pub metrics_port: Option<u16>,

    /// Configuration overrides.
    #[command(flatten)]
    pub overrides: ConfigOverrides,
}

impl RunArgs {
    /// Returns the areas for the manual test message, if one was requested.
    #[must_use]
    pub fn test_areas(&self) -> Option<&str> {
        self.test.as_deref().or(self.test_only.as_deref())
    }
}

/// Arguments for `check`.
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Path to YAML configuration file.
    #[arg(short, long, env = "MESHBRIDGE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Configuration overrides.
    #[command(flatten)]
    pub overrides: ConfigOverrides,
}

/// Arguments for version display.
#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Output format.
    #[arg(short, long, default_value = "human")]
    pub format: OutputFormat,
}

// ============================================================================
// Overrides
// ============================================================================

/// Settings that take precedence over the configuration file.
#[derive(Args, Debug, Default, Clone)]
pub struct ConfigOverrides {
    /// Alert feed URL.
    #[arg(long, env = "MESHBRIDGE_ALERTS_URL")]
    pub alerts_url: Option<String>,

    /// News feed URL.
    #[arg(long, env = "MESHBRIDGE_NEWS_URL")]
    pub news_url: Option<String>,

    /// Channel name for alert notifications.
    #[arg(long, env = "MESHBRIDGE_ALERTS_CHANNEL")]
    pub alerts_channel: Option<String>,

    /// Channel name for news notifications.
    #[arg(long, env = "MESHBRIDGE_NEWS_CHANNEL")]
    pub news_channel: Option<String>,

    /// Delay between alert polls (e.g. `1s`, `500ms`).
    #[arg(long, env = "MESHBRIDGE_POLL_INTERVAL", value_parser = humantime::parse_duration)]
    pub poll_interval: Option<Duration>,

    /// Delay between news polls (e.g. `2m`).
    #[arg(long, env = "MESHBRIDGE_NEWS_INTERVAL", value_parser = humantime::parse_duration)]
    pub news_interval: Option<Duration>,
}

impl ConfigOverrides {
    /// Writes every set override into `config`.
    pub fn apply(&self, config: &mut BridgeConfig) {
        if let Some(url) = &self.alerts_url {
            config.feeds.alerts_url.clone_from(url);
        }
        if let Some(url) = &self.news_url {
            config.feeds.news_url.clone_from(url);
        }
        if let Some(name) = &self.alerts_channel {
            config.transport.alerts_channel.clone_from(name);
        }
        if let Some(name) = &self.news_channel {
            config.transport.news_channel.clone_from(name);
        }
        if let Some(interval) = self.poll_interval {
            config.polling.alert_interval = interval;
        }
        if let Some(interval) = self.news_interval {
            config.polling.news_interval = interval;
        }
    }
}

// ============================================================================
// CLI-Local Enums
// ============================================================================

/// Color output choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ColorChoice {
    /// Auto-detect terminal support.
    #[default]
    Auto,
    /// Always use color.
    Always,
    /// Never use color.
    Never,
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Human,
    /// One JSON object per line.
    Json,
}

/// Output format for informational commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text.
    #[default]
    Human,
    /// JSON.
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_run_defaults() {
        let cli = Cli::try_parse_from(["meshbridge", "run"]).unwrap();
        let Commands::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert!(args.test_areas().is_none());
        assert!(!args.no_news);
        assert_eq!(cli.verbose, 0);
        assert_eq!(cli.log_format, LogFormat::Human);
    }

    #[test]
    fn test_test_flags_are_exclusive() {
        let result =
            Cli::try_parse_from(["meshbridge", "run", "--test", "a", "--test-only", "b"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_test_only_areas() {
        let cli = Cli::try_parse_from(["meshbridge", "run", "--test-only", "חיפה"]).unwrap();
        let Commands::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.test_areas(), Some("חיפה"));
    }

    #[test]
    fn test_overrides_apply() {
        let cli = Cli::try_parse_from([
            "meshbridge",
            "-vv",
            "check",
            "--poll-interval",
            "500ms",
            "--news-channel",
            "Primary",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        let Commands::Check(args) = cli.command else {
            panic!("expected check");
        };

        let mut config = BridgeConfig::default();
        args.overrides.apply(&mut config);
        assert_eq!(config.polling.alert_interval, Duration::from_millis(500));
        assert_eq!(config.transport.news_channel, "Primary");
        assert_eq!(config.transport.alerts_channel, "Alerts");
    }

    #[test]
    fn test_bad_interval_rejected() {
        let result = Cli::try_parse_from(["meshbridge", "run", "--poll-interval", "often"]);
        assert!(result.is_err());
    }
}
