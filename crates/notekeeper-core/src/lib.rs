//! notekeeper-core - Core library for NoteKeeper
//!
//! This crate contains the shared models, the local record store, the note and
//! message repositories, and the offline-first sync reconciler used by every
//! NoteKeeper front end.

pub mod config;
pub mod connectivity;
pub mod db;
pub mod error;
pub mod models;
pub mod realtime;
pub mod remote;
pub mod repository;
pub mod state;
pub mod storage;
pub mod sync;
pub mod util;

#[cfg(test)]
mod test_support;

pub use config::ClientConfig;
pub use error::{Error, Result};
pub use models::{IncomingMessage, Message, Note, NoteId, NoteStatus};
pub use repository::{MessageRepository, NoteRepository};
pub use state::SyncOutcome;
pub use sync::NotesSynchronizer;
