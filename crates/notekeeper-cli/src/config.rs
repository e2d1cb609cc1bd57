//! Persistent client configuration file.

use std::path::{Path, PathBuf};

use notekeeper_core::ClientConfig;

use crate::error::CliError;

const CONFIG_FILE_NAME: &str = "config.json";

pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("notekeeper").join(CONFIG_FILE_NAME))
}

/// Read the config file at `path`; a missing file yields the defaults.
pub fn load_from_path(path: &Path) -> Result<ClientConfig, CliError> {
    if !path.exists() {
        return Ok(ClientConfig::default());
    }

    let raw = std::fs::read_to_string(path).map_err(|error| {
        CliError::Config(format!(
            "Failed to read config at {}: {error}",
            path.display()
        ))
    })?;
    ClientConfig::from_json(&raw).map_err(|error| {
        CliError::Config(format!("Failed to parse config at {}: {error}", path.display()))
    })
}

pub fn save_to_path(config: &ClientConfig, path: &Path) -> Result<(), CliError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|error| {
            CliError::Config(format!(
                "Failed to create config directory {}: {error}",
                parent.display()
            ))
        })?;
    }

    let serialized = serde_json::to_string_pretty(config)?;
    std::fs::write(path, serialized).map_err(|error| {
        CliError::Config(format!(
            "Failed to write config at {}: {error}",
            path.display()
        ))
    })
}

/// Config file contents with environment overrides applied.
pub fn resolve_client_config<F>(path: Option<&Path>, lookup: F) -> Result<ClientConfig, CliError>
where
    F: Fn(&str) -> Option<String>,
{
    let config = match path {
        Some(path) => load_from_path(path)?,
        None => ClientConfig::default(),
    };
    Ok(config.with_overrides(lookup)?)
}

/// Effective config for this process: file, then `NOTEKEEPER_*` variables.
pub fn load_client_config() -> Result<ClientConfig, CliError> {
    resolve_client_config(default_config_path().as_deref(), |key| {
        std::env::var(key).ok()
    })
}
