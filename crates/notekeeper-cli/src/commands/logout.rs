use notekeeper_core::storage::{KeyValueStore, SESSION_KEY};

use crate::commands::common::{open_client, open_store, Context};
use crate::config::load_client_config;
use crate::error::CliError;

pub async fn run_logout(context: &Context) -> Result<(), CliError> {
    let config = load_client_config()?;
    let store = open_store(&context.db_path).await?;
    let client = open_client(&config, &*store).await?;

    client.logout().await?;
    store.delete(SESSION_KEY).await?;
    println!("Logged out");
    Ok(())
}
