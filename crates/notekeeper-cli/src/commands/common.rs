use std::env;
use std::io::{self, IsTerminal, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Local, Utc};
use notekeeper_core::connectivity::ConnectivityMonitor;
use notekeeper_core::realtime::WebSocketChannel;
use notekeeper_core::remote::NoteKeeperClient;
use notekeeper_core::storage::{KeyValueStore, LibSqlStore, SESSION_KEY};
use notekeeper_core::{
    ClientConfig, Message, MessageRepository, Note, NoteId, NoteRepository, NoteStatus,
    NotesSynchronizer, SyncOutcome,
};
use serde::Serialize;

use crate::config::load_client_config;
use crate::error::CliError;

const PREVIEW_CHARS: usize = 60;

/// Options shared by every command.
pub struct Context {
    pub db_path: PathBuf,
    pub offline: bool,
}

#[derive(Debug, Serialize)]
pub struct NoteListItem {
    pub id: Option<String>,
    pub status: String,
    pub preview: String,
    pub content: String,
}

pub fn note_to_list_item(note: &Note) -> NoteListItem {
    NoteListItem {
        id: note.id.as_ref().map(ToString::to_string),
        status: status_label(note).to_string(),
        preview: note.title_preview(PREVIEW_CHARS),
        content: note.content.clone(),
    }
}

pub fn format_note_lines(notes: &[Note]) -> Vec<String> {
    notes
        .iter()
        .map(|note| {
            let id = note.id.as_ref().map_or("-", NoteId::as_str);
            format!(
                "{id:<10} {:<9} {}",
                status_label(note),
                note.title_preview(PREVIEW_CHARS)
            )
        })
        .collect()
}

pub const fn status_label(note: &Note) -> &'static str {
    match note.status {
        NoteStatus::Synced => "synced",
        NoteStatus::PendingAdding => "adding",
        NoteStatus::PendingUpdating => "updating",
        NoteStatus::PendingDeleting => "deleting",
    }
}

pub fn format_message_line(message: &Message) -> String {
    let sender = if message.is_from_me { "me" } else { "them" };
    format!(
        "{} {sender:<4} {}",
        format_timestamp(message.timestamp),
        message.content
    )
}

pub fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp
        .with_timezone(&Local)
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}

pub const fn describe_outcome(outcome: SyncOutcome) -> &'static str {
    match outcome {
        SyncOutcome::Synced => "synced",
        SyncOutcome::Offline => "offline, will sync when back online",
        SyncOutcome::Failed => "sync failed, change kept locally",
    }
}

/// Join positional words, or read piped stdin when none were given.
pub fn resolve_content(content_parts: &[String]) -> Result<String, CliError> {
    let content = if content_parts.is_empty() {
        read_piped_stdin()?.unwrap_or_default()
    } else {
        content_parts.join(" ")
    };

    normalize_content(&content).ok_or(CliError::EmptyContent)
}

pub fn normalize_content(content: &str) -> Option<String> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

pub fn normalize_note_identifier(id: &str) -> Result<NoteId, CliError> {
    let trimmed = id.trim();
    if trimmed.is_empty() {
        return Err(CliError::EmptyNoteId);
    }
    Ok(NoteId::new(trimmed))
}

pub fn read_piped_stdin() -> Result<Option<String>, CliError> {
    let mut stdin = io::stdin();
    if stdin.is_terminal() {
        return Ok(None);
    }

    let mut input = String::new();
    stdin.read_to_string(&mut input)?;
    Ok(Some(input))
}

pub fn resolve_db_path(cli_db_path: Option<PathBuf>) -> PathBuf {
    cli_db_path
        .or_else(|| env::var_os("NOTEKEEPER_DB_PATH").map(PathBuf::from))
        .unwrap_or_else(default_db_path)
}

pub fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("notekeeper")
        .join("notekeeper.db")
}

pub async fn open_store(path: &Path) -> Result<Arc<LibSqlStore>, CliError> {
    Ok(Arc::new(LibSqlStore::open_path(path).await?))
}

/// Note repository loaded from the local database, without any network wiring.
pub async fn open_notes(path: &Path) -> Result<Arc<NoteRepository>, CliError> {
    load_notes(open_store(path).await?).await
}

async fn load_notes(store: Arc<LibSqlStore>) -> Result<Arc<NoteRepository>, CliError> {
    let notes = Arc::new(NoteRepository::new(store));
    notes.load().await?;
    Ok(notes)
}

/// API client carrying the session saved by an earlier run, if any.
pub async fn open_client(
    config: &ClientConfig,
    store: &dyn KeyValueStore,
) -> Result<NoteKeeperClient, CliError> {
    let session = store.get(SESSION_KEY).await?;
    Ok(NoteKeeperClient::with_session(config, session.as_deref())?)
}

/// Establish the API session and save its cookie for later runs.
///
/// Returns this client's identifier.
pub async fn login(
    client: &NoteKeeperClient,
    store: &dyn KeyValueStore,
) -> Result<String, CliError> {
    let identifier = client.identifier().await?.to_string();
    match client.session_cookie() {
        Some(cookie) => store.set(SESSION_KEY, &cookie).await?,
        None => tracing::debug!("Login did not set a session cookie"),
    }
    Ok(identifier)
}

pub async fn open_synchronizer(context: &Context) -> Result<NotesSynchronizer, CliError> {
    let config = load_client_config()?;
    let store = open_store(&context.db_path).await?;
    let notes = load_notes(store.clone()).await?;
    let client = open_client(&config, &*store).await?;

    if !context.offline {
        if let Err(error) = login(&client, &*store).await {
            tracing::warn!(%error, "Login failed; syncing with the saved session");
        }
    }

    let connectivity = Arc::new(ConnectivityMonitor::new(!context.offline));
    Ok(NotesSynchronizer::new(notes, Arc::new(client), connectivity))
}

/// Message repository plus the channel it forwards to.
///
/// The channel only connects once something is sent or a handler is attached.
pub struct MessageSession {
    pub config: ClientConfig,
    pub store: Arc<LibSqlStore>,
    pub channel: Arc<WebSocketChannel>,
    pub messages: Arc<MessageRepository>,
}

pub async fn open_messages(context: &Context) -> Result<MessageSession, CliError> {
    let config = load_client_config()?;
    let store = open_store(&context.db_path).await?;
    let channel = Arc::new(WebSocketChannel::new(&config));
    let messages = Arc::new(MessageRepository::new(store.clone(), channel.clone()));
    messages.load().await?;
    Ok(MessageSession {
        config,
        store,
        channel,
        messages,
    })
}
