//! Configuration loading, schema and validation.

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{ConfigLoader, LoadResult};
pub use schema::{BridgeConfig, FeedsConfig, PollingConfig, TimeConfig, TransportConfig};
pub use validation::{ValidationResult, Validator};

use crate::error::{ConfigError, ValidationIssue};

/// Validates `config`, returning its warnings on success.
///
/// # Errors
///
/// Returns `ConfigError::Validation` listing every error found.
pub fn validate(config: &BridgeConfig) -> Result<Vec<ValidationIssue>, ConfigError> {
    let result = Validator::new().validate(config);
    if result.has_errors() {
        return Err(ConfigError::Validation {
            errors: result.errors,
        });
    }
    Ok(result.warnings)
}
