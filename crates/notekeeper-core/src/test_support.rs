//! In-memory fakes shared by unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::models::{IncomingMessage, Note, NoteId};
use crate::realtime::{InboundHandler, RealtimeChannel};
use crate::remote::RemoteNoteService;
use crate::storage::KeyValueStore;

/// Key-value store whose writes can be switched to fail.
#[derive(Default)]
pub struct FailingStore {
    entries: Mutex<HashMap<String, String>>,
    fail_writes: AtomicBool,
}

impl FailingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check_write(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Error::Database("disk full".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for FailingStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.lock().unwrap().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.check_write()?;
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.check_write()?;
        self.entries.lock().unwrap().remove(key);
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.check_write()?;
        self.entries.lock().unwrap().clear();
        Ok(())
    }
}

/// A call observed by `FakeRemote`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteCall {
    List,
    Create(String),
    Update(String, String),
    Delete(String),
}

#[derive(Default)]
struct RemoteState {
    notes: Vec<Note>,
    next_id: u64,
    calls: Vec<RemoteCall>,
    reject_update: Option<String>,
    fail_create: bool,
    empty_listing: bool,
}

/// Remote note service backed by a vector, recording every call.
#[derive(Default)]
pub struct FakeRemote {
    state: Mutex<RemoteState>,
    list_delay: Mutex<Option<Duration>>,
    active_lists: AtomicUsize,
    max_active_lists: AtomicUsize,
}

impl FakeRemote {
    pub fn new(next_id: u64) -> Self {
        let remote = Self::default();
        remote.state.lock().unwrap().next_id = next_id;
        remote
    }

    pub fn with_notes(next_id: u64, notes: Vec<Note>) -> Self {
        let remote = Self::new(next_id);
        remote.state.lock().unwrap().notes = notes;
        remote
    }

    pub fn notes(&self) -> Vec<Note> {
        self.state.lock().unwrap().notes.clone()
    }

    pub fn calls(&self) -> Vec<RemoteCall> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Answer `update_note` for `id` with `false`.
    pub fn reject_update(&self, id: &str) {
        self.state.lock().unwrap().reject_update = Some(id.to_string());
    }

    pub fn fail_create(&self) {
        self.state.lock().unwrap().fail_create = true;
    }

    /// Make `list_notes` answer without data.
    pub fn empty_listing(&self) {
        self.state.lock().unwrap().empty_listing = true;
    }

    /// Hold each `list_notes` call open for `delay`.
    pub fn slow_listing(&self, delay: Duration) {
        *self.list_delay.lock().unwrap() = Some(delay);
    }

    /// Highest number of `list_notes` calls that were in flight at once.
    pub fn max_concurrent_lists(&self) -> usize {
        self.max_active_lists.load(Ordering::SeqCst)
    }

    fn record(&self, call: RemoteCall) {
        self.state.lock().unwrap().calls.push(call);
    }
}

#[async_trait]
impl RemoteNoteService for FakeRemote {
    async fn list_notes(&self) -> Result<Option<Vec<Note>>> {
        self.record(RemoteCall::List);
        let active = self.active_lists.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active_lists.fetch_max(active, Ordering::SeqCst);

        let delay = *self.list_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.active_lists.fetch_sub(1, Ordering::SeqCst);

        let state = self.state.lock().unwrap();
        if state.empty_listing {
            return Ok(None);
        }
        Ok(Some(state.notes.clone()))
    }

    async fn create_note(&self, content: &str) -> Result<Note> {
        self.record(RemoteCall::Create(content.to_string()));
        let mut state = self.state.lock().unwrap();
        if state.fail_create {
            return Err(Error::Api("create failed (500)".to_string()));
        }
        let id = state.next_id.to_string();
        state.next_id += 1;
        let note = Note::synced(id, content);
        state.notes.push(note.clone());
        Ok(note)
    }

    async fn update_note(&self, note: &Note) -> Result<bool> {
        let id = note.id.as_ref().map(ToString::to_string).unwrap_or_default();
        self.record(RemoteCall::Update(id.clone(), note.content.clone()));
        let mut state = self.state.lock().unwrap();
        if state.reject_update.as_deref() == Some(id.as_str()) {
            return Ok(false);
        }
        let Some(stored) = state
            .notes
            .iter_mut()
            .find(|stored| stored.id.as_ref().map(NoteId::as_str) == Some(id.as_str()))
        else {
            return Ok(false);
        };
        stored.content.clone_from(&note.content);
        Ok(true)
    }

    async fn delete_note(&self, id: &NoteId) -> Result<bool> {
        self.record(RemoteCall::Delete(id.to_string()));
        let mut state = self.state.lock().unwrap();
        let before = state.notes.len();
        state.notes.retain(|note| !note.has_id(id));
        Ok(state.notes.len() < before)
    }
}

/// Realtime channel that records sends and lets tests push inbound messages.
#[derive(Default)]
pub struct RecordingChannel {
    sent: Mutex<Vec<String>>,
    handler: Mutex<Option<Arc<dyn InboundHandler>>>,
    fail_sends: AtomicBool,
}

impl RecordingChannel {
    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }

    pub fn fail_sends(&self, fail: bool) {
        self.fail_sends.store(fail, Ordering::SeqCst);
    }

    /// Hand `message` to the registered handler, as the receive loop would.
    pub async fn deliver(&self, message: IncomingMessage) {
        let handler = self.handler.lock().unwrap().clone();
        if let Some(handler) = handler {
            handler.handle(message).await;
        }
    }
}

#[async_trait]
impl RealtimeChannel for RecordingChannel {
    async fn send(&self, content: &str) -> Result<()> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(Error::Channel("not connected".to_string()));
        }
        self.sent.lock().unwrap().push(content.to_string());
        Ok(())
    }

    fn on_receive(&self, handler: Arc<dyn InboundHandler>) {
        *self.handler.lock().unwrap() = Some(handler);
    }
}
