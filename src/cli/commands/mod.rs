//! CLI command dispatch and handlers.
//!
//! Routes parsed CLI arguments to the appropriate command handler.

pub mod check;
pub mod run;
pub mod version;

use std::path::Path;

use tokio_util::sync::CancellationToken;

use crate::cli::args::{Cli, Commands, ConfigOverrides};
use crate::config::{self, BridgeConfig, ConfigLoader};
use crate::error::BridgeError;

/// Dispatch a parsed CLI invocation to the appropriate command handler.
///
/// # Errors
///
/// Returns an error if the dispatched command handler fails.
pub async fn dispatch(cli: Cli, cancel: CancellationToken) -> Result<(), BridgeError> {
    match cli.command {
        Commands::Run(args) => run::run(&args, cancel).await,
        Commands::Check(args) => check::run(&args),
        Commands::Version(args) => {
            version::run(&args);
            Ok(())
        }
    }
}

/// Loads the configuration file (or defaults) and applies overrides.
///
/// Loader warnings are logged; the result is not validated yet.
fn load_config(
    path: Option<&Path>,
    overrides: &ConfigOverrides,
) -> Result<BridgeConfig, BridgeError> {
    let loaded = ConfigLoader::new().load_or_default(path)?;
    for warning in &loaded.warnings {
        tracing::warn!("{warning}");
    }
    let mut config = loaded.config;
    overrides.apply(&mut config);
    Ok(config)
}

/// Validates `config`, logging warnings.
fn validate_config(config: &BridgeConfig) -> Result<(), BridgeError> {
    for warning in config::validate(config)? {
        tracing::warn!("{warning}");
    }
    Ok(())
}
