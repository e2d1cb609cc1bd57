use notekeeper_core::storage::KeyValueStore;

use crate::commands::common::{open_store, Context};
use crate::error::CliError;

pub async fn run_purge(context: &Context) -> Result<(), CliError> {
    let store = open_store(&context.db_path).await?;
    store.clear().await?;
    println!("Removed local notes and messages");
    Ok(())
}
