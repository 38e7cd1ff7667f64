//! Shared integration-test harness for running the `meshbridge` binary as a
//! child process and reading the fragments it writes to stdout.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::process::Output;
use std::time::Duration;

use serde_json::Value;
use tokio::io::{AsyncBufReadExt, BufReader, Lines};
use tokio::process::{Child, ChildStdout, Command};

/// Default timeout for reading a single fragment.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Environment variables that would leak into the child's configuration.
const ISOLATED_ENV: &[&str] = &[
    "MESHBRIDGE_CONFIG",
    "MESHBRIDGE_ALERTS_URL",
    "MESHBRIDGE_NEWS_URL",
    "MESHBRIDGE_ALERTS_CHANNEL",
    "MESHBRIDGE_NEWS_CHANNEL",
    "MESHBRIDGE_POLL_INTERVAL",
    "MESHBRIDGE_NEWS_INTERVAL",
    "MESHBRIDGE_METRICS_PORT",
    "MESHBRIDGE_LOG_LEVEL",
];

/// One fragment as written by the stdout sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    pub channel: u64,
    pub text: String,
}

/// A running `meshbridge run` process.
///
/// The child process is killed on drop via `kill_on_drop(true)`.
pub struct BridgeProcess {
    child: Child,
    lines: Lines<BufReader<ChildStdout>>,
}

impl BridgeProcess {
    /// Spawns `meshbridge --quiet run <args>`.
    #[allow(clippy::missing_panics_doc)]
    pub fn spawn(args: &[&str]) -> Self {
        let mut command = Command::new(env!("CARGO_BIN_EXE_meshbridge"));
        command
            .arg("--quiet")
            .arg("run")
            .args(args)
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::null())
            .kill_on_drop(true);
        for var in ISOLATED_ENV {
            command.env_remove(var);
        }
        let mut child = command.spawn().expect("failed to spawn meshbridge");
        let stdout = child.stdout.take().expect("stdout not captured");

        Self {
            child,
            lines: BufReader::new(stdout).lines(),
        }
    }

    /// Reads the next fragment from stdout.
    ///
    /// Panics on EOF, I/O error, or if nothing arrives within `timeout`.
    #[allow(clippy::missing_panics_doc)]
    pub async fn read_fragment(&mut self, timeout: Duration) -> Fragment {
        let line = tokio::time::timeout(timeout, self.lines.next_line())
            .await
            .expect("timed out waiting for a fragment")
            .expect("read error")
            .expect("unexpected EOF from meshbridge");
        let value: Value = serde_json::from_str(&line)
            .unwrap_or_else(|e| panic!("invalid JSON from meshbridge: {e}\nline: {line}"));
        Fragment {
            channel: value["channel"].as_u64().expect("channel field"),
            text: value["text"].as_str().expect("text field").to_string(),
        }
    }

    /// Reads fragments until one satisfies `predicate`.
    #[allow(clippy::missing_panics_doc)]
    pub async fn read_until(&mut self, predicate: impl Fn(&Fragment) -> bool) -> Fragment {
        loop {
            let fragment = self.read_fragment(DEFAULT_TIMEOUT).await;
            if predicate(&fragment) {
                return fragment;
            }
        }
    }

    /// Waits for the process to exit on its own.
    #[allow(clippy::missing_panics_doc)]
    pub async fn wait(mut self, timeout: Duration) -> std::process::ExitStatus {
        tokio::time::timeout(timeout, self.child.wait())
            .await
            .expect("meshbridge did not exit in time")
            .expect("failed to wait on meshbridge")
    }

    /// Kills the process.
    #[allow(clippy::missing_panics_doc)]
    pub async fn kill(mut self) {
        self.child.kill().await.expect("failed to kill meshbridge");
    }
}

/// Runs `meshbridge <args>` to completion and returns its output.
#[allow(clippy::missing_panics_doc)]
pub fn run_command(args: &[&str]) -> Output {
    let mut command = std::process::Command::new(env!("CARGO_BIN_EXE_meshbridge"));
    command.args(args);
    for var in ISOLATED_ENV {
        command.env_remove(var);
    }
    command.output().expect("failed to run meshbridge")
}

/// Returns the path to a test fixture.
#[must_use]
pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

/// Writes `yaml` to a temporary config file.
#[allow(clippy::missing_panics_doc)]
pub fn write_config(yaml: &str) -> tempfile::NamedTempFile {
    use std::io::Write;

    let mut file = tempfile::Builder::new()
        .suffix(".yaml")
        .tempfile()
        .expect("failed to create temp config");
    file.write_all(yaml.as_bytes())
        .expect("failed to write temp config");
    file
}

/// Returns `path` as a `&str`.
#[must_use]
pub fn path_str(path: &Path) -> &str {
    path.to_str().expect("non-UTF-8 path")
}
