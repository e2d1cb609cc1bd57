//! Note model

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

use super::id::{deserialize_id, deserialize_optional_id};

/// Server-assigned note identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct NoteId(String);

impl NoteId {
    /// Wrap a server identifier
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the string representation of this ID
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NoteId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for NoteId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl<'de> Deserialize<'de> for NoteId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserialize_id(deserializer).map(Self)
    }
}

/// Reconciliation marker carried by every locally stored note.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NoteStatus {
    /// Confirmed against the remote service
    #[default]
    Synced,
    /// Created locally, not yet created remotely
    PendingAdding,
    /// Edited locally, edit not yet pushed
    PendingUpdating,
    /// Deleted locally, still awaiting the remote delete
    PendingDeleting,
}

impl NoteStatus {
    pub const fn is_pending(self) -> bool {
        !matches!(self, Self::Synced)
    }
}

/// A note in the local collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    /// Server identifier, absent until the note has been created remotely
    #[serde(
        default,
        deserialize_with = "deserialize_note_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<NoteId>,
    /// Plain text content
    pub content: String,
    /// Pending-mutation marker; the server never sends one, so it defaults to synced
    #[serde(default)]
    pub status: NoteStatus,
}

fn deserialize_note_id<'de, D>(deserializer: D) -> Result<Option<NoteId>, D::Error>
where
    D: Deserializer<'de>,
{
    deserialize_optional_id(deserializer).map(|id| id.map(NoteId))
}

impl Note {
    /// A locally created note awaiting its remote creation
    #[must_use]
    pub fn pending(content: impl Into<String>) -> Self {
        Self {
            id: None,
            content: content.into(),
            status: NoteStatus::PendingAdding,
        }
    }

    /// A note as confirmed by the server
    #[must_use]
    pub fn synced(id: impl Into<NoteId>, content: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            content: content.into(),
            status: NoteStatus::Synced,
        }
    }

    /// Whether this note's id matches `id`
    pub fn has_id(&self, id: &NoteId) -> bool {
        self.id.as_ref() == Some(id)
    }

    pub const fn is_pending(&self) -> bool {
        self.status.is_pending()
    }

    /// Get first line as title preview, truncated to `max_len` characters
    #[must_use]
    pub fn title_preview(&self, max_len: usize) -> String {
        self.content
            .lines()
            .next()
            .unwrap_or("")
            .chars()
            .take(max_len)
            .collect()
    }
}
