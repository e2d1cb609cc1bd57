//! NoteKeeper CLI - offline-first notes and realtime messages from the terminal

mod cli;
mod commands;
mod config;
mod error;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};
use crate::commands::add::run_add;
use crate::commands::common::{resolve_db_path, Context};
use crate::commands::config::run_config;
use crate::commands::delete::run_delete;
use crate::commands::edit::run_edit;
use crate::commands::list::run_list;
use crate::commands::logout::run_logout;
use crate::commands::messages::run_messages;
use crate::commands::purge::run_purge;
use crate::commands::sync::run_sync;
use crate::error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("notekeeper=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let context = Context {
        db_path: resolve_db_path(cli.db_path),
        offline: cli.offline,
    };

    match cli.command {
        Commands::Add { content } => run_add(&content, &context).await?,
        Commands::List { json } => run_list(json, &context).await?,
        Commands::Edit { id, content } => run_edit(&id, &content, &context).await?,
        Commands::Delete { id } => run_delete(&id, &context).await?,
        Commands::Sync => run_sync(&context).await?,
        Commands::Messages { command } => run_messages(command, &context).await?,
        Commands::Purge => run_purge(&context).await?,
        Commands::Logout => run_logout(&context).await?,
        Commands::Config { command } => run_config(command)?,
    }

    Ok(())
}
