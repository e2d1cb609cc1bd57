use notekeeper_core::SyncOutcome;

use crate::commands::common::{open_synchronizer, Context};
use crate::error::CliError;

pub async fn run_sync(context: &Context) -> Result<(), CliError> {
    let synchronizer = open_synchronizer(context).await?;

    match synchronizer.sync_with_outcome().await {
        SyncOutcome::Synced => {
            let count = synchronizer.notes().list().await.len();
            println!("Sync completed ({count} notes)");
            Ok(())
        }
        SyncOutcome::Offline => {
            let pending = synchronizer.notes().pending_count().await;
            println!("Offline: {pending} pending change(s) kept for the next sync");
            Ok(())
        }
        SyncOutcome::Failed => Err(CliError::SyncFailed),
    }
}
