use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "notekeeper")]
#[command(about = "Offline-first notes and messages from the command line")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Optional path to local database file
    #[arg(long, global = true, value_name = "PATH")]
    pub db_path: Option<PathBuf>,

    /// Treat the device as offline; note changes stay pending
    #[arg(long, global = true)]
    pub offline: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a new note
    #[command(alias = "new")]
    Add {
        /// Note content (read from stdin when omitted)
        content: Vec<String>,
    },
    /// List local notes with their sync status
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Replace the content of an existing note
    Edit {
        /// Server note ID
        id: String,
        /// New content (read from stdin when omitted)
        content: Vec<String>,
    },
    /// Delete an existing note
    Delete {
        /// Server note ID
        id: String,
    },
    /// Push pending note changes and refresh from the server
    Sync,
    /// Chat messages
    Messages {
        #[command(subcommand)]
        command: MessageCommands,
    },
    /// Remove every locally stored note and message
    Purge,
    /// End the server session
    Logout,
    /// Show or update client configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
pub enum MessageCommands {
    /// List stored messages
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Send a message over the realtime channel
    Send {
        /// Message content (read from stdin when omitted)
        content: Vec<String>,
    },
    /// Print incoming messages until interrupted
    Listen {
        /// Import server-side history before listening
        #[arg(long)]
        history: bool,
    },
    /// Import server-side message history
    History,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print the effective client configuration
    Show,
    /// Write endpoints to the config file
    Init {
        /// REST API root URL
        #[arg(long, value_name = "URL")]
        base_url: Option<String>,
        /// WebSocket endpoint URL
        #[arg(long, value_name = "URL")]
        socket_url: Option<String>,
    },
}
