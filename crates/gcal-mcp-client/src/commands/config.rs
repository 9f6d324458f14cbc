//! Configuration commands.

use std::path::Path;

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::secret;

const MASK: &str = "********";

/// Dump the effective configuration to stdout.
pub fn dump(config: &ClientConfig, config_path: &Path) -> ClientResult<()> {
    println!("# config.toml ({})", config_path.display());
    println!("{}", render(config)?);
    Ok(())
}

/// Renders the configuration as TOML with plain-text secrets masked.
///
/// `pass::` and `env::` references are shown as written.
pub fn render(config: &ClientConfig) -> ClientResult<String> {
    let mut config = config.clone();
    if let Some(ref mut google) = config.google
        && let Some(ref mut secret) = google.client_secret
        && !secret::is_reference(secret)
    {
        *secret = MASK.to_string();
    }
    toml::to_string_pretty(&config)
        .map_err(|e| ClientError::config(format!("failed to serialize config: {}", e)))
}

/// Validate the configuration.
pub fn validate(config: &ClientConfig) -> ClientResult<()> {
    config.validate()?;
    if config.google.is_some() {
        println!("Google credentials are valid.");
    }
    println!("Configuration is valid.");
    Ok(())
}

/// Show the configuration file path.
pub fn path(config_path: &Path) -> ClientResult<()> {
    println!("config: {}", config_path.display());
    Ok(())
}
