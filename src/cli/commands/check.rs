//! `check` command: load, validate and print the resolved configuration.

use crate::cli::args::CheckArgs;
use crate::error::{BridgeError, ConfigError};

/// Prints the resolved configuration as YAML on stdout.
///
/// # Errors
///
/// Returns a configuration error if loading or validation fails.
pub fn run(args: &CheckArgs) -> Result<(), BridgeError> {
    let config = super::load_config(args.config.as_deref(), &args.overrides)?;
    super::validate_config(&config)?;

    let yaml = serde_yaml::to_string(&config).map_err(|e| ConfigError::Parse {
        path: args.config.clone().unwrap_or_default(),
        message: e.to_string(),
    })?;
    print!("{yaml}");
    Ok(())
}
