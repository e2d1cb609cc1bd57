//! Repositories over the local record store

mod messages;
mod notes;

pub use messages::MessageRepository;
pub use notes::NoteRepository;
