use notekeeper_core::util::normalize_text_option;
use notekeeper_core::ClientConfig;

use crate::cli::ConfigCommands;
use crate::config::{default_config_path, load_client_config, load_from_path, save_to_path};
use crate::error::CliError;

pub fn run_config(command: ConfigCommands) -> Result<(), CliError> {
    match command {
        ConfigCommands::Show => run_config_show(),
        ConfigCommands::Init {
            base_url,
            socket_url,
        } => run_config_init(base_url, socket_url),
    }
}

fn run_config_show() -> Result<(), CliError> {
    let config = load_client_config()?;
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}

fn run_config_init(
    base_url: Option<String>,
    socket_url: Option<String>,
) -> Result<(), CliError> {
    let path = default_config_path()
        .ok_or_else(|| CliError::Config("Failed to resolve config directory".to_string()))?;
    let existing = load_from_path(&path)?;
    let config = apply_endpoints(existing, base_url, socket_url)?;

    save_to_path(&config, &path)?;
    println!("Saved config to {}", path.display());
    Ok(())
}

/// Overlay explicitly given endpoints on `config` and validate the result.
pub fn apply_endpoints(
    mut config: ClientConfig,
    base_url: Option<String>,
    socket_url: Option<String>,
) -> Result<ClientConfig, CliError> {
    if let Some(base_url) = normalize_text_option(base_url) {
        config.base_url = base_url;
    }
    if let Some(socket_url) = normalize_text_option(socket_url) {
        config.socket_url = socket_url;
    }
    Ok(config.normalized()?)
}
