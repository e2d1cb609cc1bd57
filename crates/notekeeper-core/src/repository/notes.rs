//! Note repository implementation

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::error::Result;
use crate::models::{Note, NoteId, NoteStatus};
use crate::storage::{get_json, set_json, KeyValueStore, NOTES_KEY};

/// In-memory view over the locally stored notes.
///
/// Every mutation is persisted before it becomes visible: the next state is
/// written to the store first and only installed in memory once the write
/// succeeded, so a returned call is never lost and a failed one changes
/// nothing.
pub struct NoteRepository {
    store: Arc<dyn KeyValueStore>,
    notes: Mutex<Vec<Note>>,
}

impl NoteRepository {
    /// Create an empty repository; call `load` to read persisted notes.
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            notes: Mutex::new(Vec::new()),
        }
    }

    /// Read the persisted collection into memory.
    pub async fn load(&self) -> Result<()> {
        let stored: Option<Vec<Note>> = get_json(self.store.as_ref(), NOTES_KEY).await?;
        let stored = stored.unwrap_or_default();
        tracing::debug!(count = stored.len(), "Loaded notes from local store");
        *self.notes.lock().await = stored;
        Ok(())
    }

    /// Current notes in insertion order.
    pub async fn list(&self) -> Vec<Note> {
        self.notes.lock().await.clone()
    }

    /// Get a note by id.
    pub async fn get(&self, id: &NoteId) -> Option<Note> {
        self.notes
            .lock()
            .await
            .iter()
            .find(|note| note.has_id(id))
            .cloned()
    }

    /// Number of notes awaiting reconciliation.
    pub async fn pending_count(&self) -> usize {
        self.notes
            .lock()
            .await
            .iter()
            .filter(|note| note.is_pending())
            .count()
    }

    /// Append a new note awaiting remote creation.
    pub async fn add(&self, content: &str) -> Result<Note> {
        self.push(content).await.map(|(_, note)| note)
    }

    /// `add`, also returning the note's position in the collection.
    pub(crate) async fn push(&self, content: &str) -> Result<(usize, Note)> {
        let note = Note::pending(content);
        let mut notes = self.notes.lock().await;
        let mut next = notes.clone();
        next.push(note.clone());
        let position = next.len() - 1;
        self.commit(&mut notes, next).await?;
        Ok((position, note))
    }

    /// Replace a note's content and mark it for a remote update.
    ///
    /// Unknown ids are ignored. A later edit overwrites an earlier pending one.
    pub async fn update(&self, id: &NoteId, content: &str) -> Result<()> {
        self.mark(id, |note| {
            note.content = content.to_string();
            note.status = NoteStatus::PendingUpdating;
        })
        .await
    }

    /// Mark a note for remote deletion; it stays listed until the remote
    /// delete succeeds. Unknown ids are ignored.
    pub async fn delete(&self, id: &NoteId) -> Result<()> {
        self.mark(id, |note| note.status = NoteStatus::PendingDeleting)
            .await
    }

    /// Replace the whole collection.
    pub async fn replace_all(&self, replacement: Vec<Note>) -> Result<()> {
        let mut notes = self.notes.lock().await;
        self.commit(&mut notes, replacement).await
    }

    /// Replace the collection, keeping pending notes that are not in
    /// `baseline` (changes made since `baseline` was read). Each baseline
    /// entry accounts for one current note.
    ///
    /// A kept note with an id takes the place of the replacement's copy.
    /// Returns how many notes were kept.
    pub async fn replace_preserving(
        &self,
        baseline: &[Note],
        replacement: Vec<Note>,
    ) -> Result<usize> {
        let mut notes = self.notes.lock().await;
        let mut next = replacement;
        let mut unmatched: Vec<&Note> = baseline.iter().collect();
        let mut kept = 0;

        for note in notes.iter() {
            if let Some(index) = unmatched.iter().position(|seen| *seen == note) {
                unmatched.swap_remove(index);
                continue;
            }
            if !note.is_pending() {
                continue;
            }
            let existing = note
                .id
                .as_ref()
                .and_then(|id| next.iter().position(|candidate| candidate.has_id(id)));
            match existing {
                Some(index) => next[index] = note.clone(),
                None => next.push(note.clone()),
            }
            kept += 1;
        }

        self.commit(&mut notes, next).await?;
        Ok(kept)
    }

    /// Remove every note.
    pub async fn clear(&self) -> Result<()> {
        self.replace_all(Vec::new()).await
    }

    async fn mark<F>(&self, id: &NoteId, apply: F) -> Result<()>
    where
        F: FnOnce(&mut Note) + Send,
    {
        let mut notes = self.notes.lock().await;
        let Some(index) = notes.iter().position(|note| note.has_id(id)) else {
            tracing::debug!(%id, "Ignoring mutation of unknown note");
            return Ok(());
        };

        let mut next = notes.clone();
        apply(&mut next[index]);
        self.commit(&mut notes, next).await
    }

    async fn commit(&self, current: &mut Vec<Note>, next: Vec<Note>) -> Result<()> {
        set_json(self.store.as_ref(), NOTES_KEY, &next).await?;
        *current = next;
        Ok(())
    }
}
