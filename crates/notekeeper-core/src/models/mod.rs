//! Data models for NoteKeeper

mod id;
mod message;
mod note;

pub use message::{IncomingMessage, Message, DUPLICATE_WINDOW_MS};
pub use note::{Note, NoteId, NoteStatus};
