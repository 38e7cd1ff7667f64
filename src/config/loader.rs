//! Configuration loading.
//!
//! Reads a YAML file, expands environment references in the raw text and
//! deserializes the result into a [`BridgeConfig`]. Validation is a
//! separate step (see [`super::validation`]) so that command-line
//! overrides can be applied in between.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::config::schema::BridgeConfig;
use crate::error::ConfigError;

/// Environment variable overriding the configuration size limit.
pub const MAX_CONFIG_SIZE_ENV: &str = "MESHBRIDGE_MAX_CONFIG_SIZE";

const DEFAULT_MAX_CONFIG_SIZE: u64 = 1024 * 1024;

/// `$$`, `${VAR}`, `${VAR:-default}` or `${VAR:?message}`.
static ENV_REF_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\$|\$\{([A-Za-z_][A-Za-z0-9_]*)(?::([-?])([^}]*))?\}")
        .expect("env reference regex is valid")
});

/// Result of loading a configuration file.
#[derive(Debug)]
pub struct LoadResult {
    /// The loaded configuration (not yet validated).
    pub config: BridgeConfig,

    /// Non-fatal problems encountered while loading.
    pub warnings: Vec<String>,
}

/// Loads bridge configuration files.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    max_config_size: u64,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self {
            max_config_size: env_or(MAX_CONFIG_SIZE_ENV, DEFAULT_MAX_CONFIG_SIZE),
        }
    }
}

impl ConfigLoader {
    /// Creates a loader with limits taken from the environment.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from `path`, or defaults when `path` is `None`.
    ///
    /// # Errors
    ///
    /// See [`Self::load`].
    pub fn load_or_default(&self, path: Option<&Path>) -> Result<LoadResult, ConfigError> {
        path.map_or_else(
            || {
                Ok(LoadResult {
                    config: BridgeConfig::default(),
                    warnings: Vec::new(),
                })
            },
            |p| self.load(p),
        )
    }

    /// Loads configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Read` if the file cannot be read,
    /// `ConfigError::Parse` if it is too large or not valid YAML for the
    /// schema, and `ConfigError::EnvVarNotSet` for a `${VAR:?msg}`
    /// reference to an unset variable.
    pub fn load(&self, path: &Path) -> Result<LoadResult, ConfigError> {
        let read_err = |source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        };
        let size = std::fs::metadata(path).map_err(read_err)?.len();
        if size > self.max_config_size {
            return Err(ConfigError::Parse {
                path: path.to_path_buf(),
                message: format!(
                    "file is {size} bytes, limit is {} (set {MAX_CONFIG_SIZE_ENV} to raise it)",
                    self.max_config_size
                ),
            });
        }
        let raw = std::fs::read_to_string(path).map_err(read_err)?;
        tracing::debug!(path = %path.display(), bytes = raw.len(), "loading configuration");
        Self::parse(&raw, path)
    }

    /// Parses configuration text. `source` is used in error messages.
    ///
    /// # Errors
    ///
    /// See [`Self::load`].
    pub fn parse(raw: &str, source: &Path) -> Result<LoadResult, ConfigError> {
        let mut warnings = Vec::new();
        let expanded = substitute_env(raw, source, &mut warnings)?;

        // serde_yaml rejects an empty document; treat it as "all defaults".
        if expanded.trim().is_empty() {
            return Ok(LoadResult {
                config: BridgeConfig::default(),
                warnings,
            });
        }

        let config = serde_yaml::from_str(&expanded).map_err(|e| ConfigError::Parse {
            path: source.to_path_buf(),
            message: e.to_string(),
        })?;
        Ok(LoadResult { config, warnings })
    }
}

/// Expands environment references in raw YAML text.
///
/// - `${VAR}` expands to the value, or to an empty string with a warning
/// - `${VAR:-default}` expands to `default` if unset
/// - `${VAR:?message}` fails if unset
/// - `$$` is a literal `$`
fn substitute_env(
    raw: &str,
    source: &Path,
    warnings: &mut Vec<String>,
) -> Result<String, ConfigError> {
    let mut out = String::with_capacity(raw.len());
    let mut last = 0;

    for caps in ENV_REF_RE.captures_iter(raw) {
        let whole = caps.get(0).map_or(0..0, |m| m.range());
        out.push_str(&raw[last..whole.start]);
        last = whole.end;
        out.push_str(&expand_one(&caps, source, warnings)?);
    }
    out.push_str(&raw[last..]);
    Ok(out)
}

fn expand_one(
    caps: &Captures<'_>,
    source: &Path,
    warnings: &mut Vec<String>,
) -> Result<String, ConfigError> {
    let Some(name) = caps.get(1).map(|m| m.as_str()) else {
        return Ok("$".to_string());
    };
    if let Ok(value) = std::env::var(name) {
        return Ok(value);
    }
    let operand = caps.get(3).map_or("", |m| m.as_str());
    match caps.get(2).map(|m| m.as_str()) {
        Some("-") => Ok(operand.to_string()),
        Some(_) => Err(ConfigError::EnvVarNotSet {
            var: name.to_string(),
            path: PathBuf::from(source),
        }),
        None => {
            warnings.push(format!(
                "environment variable '{name}' is not set, using empty string"
            ));
            Ok(String::new())
        }
    }
}

/// Reads a parseable value from the environment, falling back to `default`.
fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
