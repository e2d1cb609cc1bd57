//! Offline-first note reconciliation.
//!
//! A pass drains pending local mutations against the remote service in three
//! ordered steps (creates, then updates, then deletes), each fanned out
//! concurrently, and finishes by adopting the server listing as local truth.
//! Passes never overlap: a trigger arriving mid-pass waits and then runs its
//! own pass. Local changes made through the synchronizer wait for a running
//! pass too; changes made directly on the repository while a pass runs stay
//! pending for the next one.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures_util::future::try_join_all;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, error, info, warn};

use crate::connectivity::Connectivity;
use crate::error::{Error, Result};
use crate::models::{Note, NoteId, NoteStatus};
use crate::remote::RemoteNoteService;
use crate::repository::NoteRepository;
use crate::state::SyncOutcome;

/// Reconciles the local note repository with the remote note service.
///
/// Cheap to clone; clones share the pass lock and the reconnect listener.
#[derive(Clone)]
pub struct NotesSynchronizer {
    notes: Arc<NoteRepository>,
    remote: Arc<dyn RemoteNoteService>,
    connectivity: Arc<dyn Connectivity>,
    pass_lock: Arc<Mutex<()>>,
    reconnect_pending: Arc<AtomicBool>,
}

impl NotesSynchronizer {
    pub fn new(
        notes: Arc<NoteRepository>,
        remote: Arc<dyn RemoteNoteService>,
        connectivity: Arc<dyn Connectivity>,
    ) -> Self {
        Self {
            notes,
            remote,
            connectivity,
            pass_lock: Arc::new(Mutex::new(())),
            reconnect_pending: Arc::new(AtomicBool::new(false)),
        }
    }

    /// The repository this synchronizer reconciles.
    pub const fn notes(&self) -> &Arc<NoteRepository> {
        &self.notes
    }

    /// Whether a retry is waiting for connectivity to return.
    pub fn reconnect_pending(&self) -> bool {
        self.reconnect_pending.load(Ordering::SeqCst)
    }

    /// Run one reconciliation pass; `true` when local state now mirrors the
    /// server. Never returns an error: failures are logged.
    pub async fn sync(&self) -> bool {
        self.sync_with_outcome().await.is_synced()
    }

    /// Like [`sync`](Self::sync), but tells an offline deferral apart from a
    /// failed pass.
    pub async fn sync_with_outcome(&self) -> SyncOutcome {
        if !self.connectivity.is_online() {
            self.schedule_retry_on_reconnect();
            return SyncOutcome::Offline;
        }

        let pass = self.pass_lock.lock().await;
        self.pass_locked(pass).await.0
    }

    /// Add a note locally, then try to reconcile.
    ///
    /// After a successful pass the returned note is the server's copy,
    /// carrying its id; otherwise it is the pending local note.
    pub async fn add(&self, content: &str) -> Result<(Note, SyncOutcome)> {
        let pass = self.pass_lock.lock().await;
        let (position, note) = self.notes.push(content).await?;
        let (outcome, report) = self.pass_locked(pass).await;

        let created = report.and_then(|report| {
            report
                .created
                .into_iter()
                .find_map(|(index, created)| (index == position).then_some(created))
        });
        Ok((created.unwrap_or(note), outcome))
    }

    /// Edit a note locally, then try to reconcile.
    pub async fn update(&self, id: &NoteId, content: &str) -> Result<SyncOutcome> {
        let pass = self.pass_lock.lock().await;
        self.notes.update(id, content).await?;
        Ok(self.pass_locked(pass).await.0)
    }

    /// Mark a note deleted locally, then try to reconcile.
    pub async fn delete(&self, id: &NoteId) -> Result<SyncOutcome> {
        let pass = self.pass_lock.lock().await;
        self.notes.delete(id).await?;
        Ok(self.pass_locked(pass).await.0)
    }

    fn schedule_retry_on_reconnect(&self) {
        if self.reconnect_pending.swap(true, Ordering::SeqCst) {
            debug!("Offline; sync already queued for reconnect");
            return;
        }

        warn!("Offline; sync deferred until connectivity returns");
        let synchronizer = self.clone();
        tokio::spawn(async move {
            synchronizer.connectivity.wait_until_online().await;
            synchronizer.reconnect_pending.store(false, Ordering::SeqCst);
            synchronizer.sync().await;
        });
    }

    /// Run a pass while holding `pass`, or defer it when offline.
    async fn pass_locked(
        &self,
        pass: MutexGuard<'_, ()>,
    ) -> (SyncOutcome, Option<PassReport>) {
        if !self.connectivity.is_online() {
            drop(pass);
            self.schedule_retry_on_reconnect();
            return (SyncOutcome::Offline, None);
        }

        info!("Starting notes sync");
        let result = self.run_pass().await;
        drop(pass);
        match result {
            Ok(report) => {
                info!(notes = report.notes, "Notes sync complete");
                (SyncOutcome::Synced, Some(report))
            }
            Err(error) => {
                error!(%error, "Notes sync failed");
                (SyncOutcome::Failed, None)
            }
        }
    }

    async fn run_pass(&self) -> Result<PassReport> {
        let snapshot = self.notes.list().await;
        let mut working = snapshot.clone();
        let server = self
            .remote
            .list_notes()
            .await?
            .ok_or_else(|| Error::Api("note listing returned no data".to_string()))?;
        debug!(local = working.len(), remote = server.len(), "Fetched snapshots");

        let pending = Pending::partition(&working);
        debug!(
            adds = pending.adds.len(),
            updates = pending.updates.len(),
            deletes = pending.deletes.len(),
            "Applying pending mutations"
        );

        let created = try_join_all(
            pending
                .adds
                .iter()
                .map(|&index| self.remote.create_note(&working[index].content)),
        )
        .await?;
        for &index in &pending.adds {
            working[index].status = NoteStatus::Synced;
        }

        try_join_all(pending.updates.iter().map(|&index| {
            let note = &working[index];
            async move {
                if self.remote.update_note(note).await? {
                    Ok(())
                } else {
                    Err(rejected("update", note))
                }
            }
        }))
        .await?;
        for &index in &pending.updates {
            working[index].status = NoteStatus::Synced;
        }

        try_join_all(pending.deletes.iter().map(|&index| {
            let note = &working[index];
            async move {
                let id = note.id.as_ref().ok_or_else(|| {
                    Error::InvalidInput("note marked for deletion has no id".to_string())
                })?;
                if self.remote.delete_note(id).await? {
                    Ok(())
                } else {
                    Err(rejected("delete", note))
                }
            }
        }))
        .await?;
        for &index in pending.deletes.iter().rev() {
            working.remove(index);
        }

        let kept = self.notes.replace_preserving(&snapshot, working).await?;
        if kept > 0 {
            debug!(kept, "Kept notes changed during the pass");
        }

        let server = self
            .remote
            .list_notes()
            .await?
            .ok_or_else(|| Error::Api("note listing returned no data".to_string()))?;
        let notes = server.len();
        self.notes.replace_preserving(&snapshot, server).await?;

        Ok(PassReport {
            notes,
            created: pending.adds.into_iter().zip(created).collect(),
        })
    }
}

/// Result of a completed pass.
#[derive(Debug)]
struct PassReport {
    /// Notes in the final server listing
    notes: usize,
    /// Snapshot position of each created note, with the server's copy
    created: Vec<(usize, Note)>,
}

/// Indices of pending notes in the working set, ascending.
#[derive(Debug, Default)]
struct Pending {
    adds: Vec<usize>,
    updates: Vec<usize>,
    deletes: Vec<usize>,
}

impl Pending {
    fn partition(notes: &[Note]) -> Self {
        let mut pending = Self::default();
        for (index, note) in notes.iter().enumerate() {
            match note.status {
                NoteStatus::PendingAdding => pending.adds.push(index),
                NoteStatus::PendingUpdating => pending.updates.push(index),
                NoteStatus::PendingDeleting => pending.deletes.push(index),
                NoteStatus::Synced => {}
            }
        }
        pending
    }
}

fn rejected(operation: &'static str, note: &Note) -> Error {
    Error::Rejected {
        operation,
        note_id: note.id.as_ref().map(ToString::to_string).unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connectivity::ConnectivityMonitor;
    use crate::storage::MemoryStore;
    use crate::test_support::{FakeRemote, RemoteCall};
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    struct Harness {
        remote: Arc<FakeRemote>,
        connectivity: Arc<ConnectivityMonitor>,
        sync: NotesSynchronizer,
    }

    impl Harness {
        fn new(remote: FakeRemote, online: bool) -> Self {
            let remote = Arc::new(remote);
            let connectivity = Arc::new(ConnectivityMonitor::new(online));
            let notes = Arc::new(NoteRepository::new(Arc::new(MemoryStore::new())));
            let sync = NotesSynchronizer::new(notes, remote.clone(), connectivity.clone());
            Self {
                remote,
                connectivity,
                sync,
            }
        }

        fn repo(&self) -> &NoteRepository {
            self.sync.notes()
        }

        fn list_calls(&self) -> usize {
            self.remote
                .calls()
                .iter()
                .filter(|call| **call == RemoteCall::List)
                .count()
        }
    }

    #[test]
    fn partition_groups_indices_by_status() {
        let mut deleting = Note::synced("3", "c");
        deleting.status = NoteStatus::PendingDeleting;
        let mut updating = Note::synced("2", "b");
        updating.status = NoteStatus::PendingUpdating;
        let notes = vec![
            Note::synced("1", "a"),
            deleting,
            Note::pending("new"),
            updating,
            Note::pending("newer"),
        ];

        let pending = Pending::partition(&notes);
        assert_eq!(pending.adds, vec![2, 4]);
        assert_eq!(pending.updates, vec![3]);
        assert_eq!(pending.deletes, vec![1]);
    }

    #[tokio::test]
    async fn successful_pass_converges_on_server_listing() {
        let harness = Harness::new(
            FakeRemote::with_notes(10, vec![Note::synced("1", "a"), Note::synced("2", "b")]),
            true,
        );
        let repo = harness.repo();
        repo.replace_all(harness.remote.notes()).await.unwrap();
        repo.update(&NoteId::new("1"), "a2").await.unwrap();
        repo.delete(&NoteId::new("2")).await.unwrap();
        repo.add("c").await.unwrap();

        assert!(harness.sync.sync().await);

        assert_eq!(repo.list().await, harness.remote.notes());
        assert_eq!(
            harness.remote.notes(),
            vec![Note::synced("1", "a2"), Note::synced("10", "c")]
        );
        assert_eq!(
            harness.remote.calls(),
            vec![
                RemoteCall::List,
                RemoteCall::Create("c".to_string()),
                RemoteCall::Update("1".to_string(), "a2".to_string()),
                RemoteCall::Delete("2".to_string()),
                RemoteCall::List,
            ]
        );
        assert_eq!(repo.pending_count().await, 0);
    }

    #[tokio::test]
    async fn buy_milk_round_trip() {
        let harness = Harness::new(FakeRemote::new(42), true);
        let id = NoteId::new("42");

        let (note, outcome) = harness.sync.add("buy milk").await.unwrap();
        assert_eq!(note, Note::synced("42", "buy milk"));
        assert_eq!(outcome, SyncOutcome::Synced);
        assert_eq!(
            harness.repo().list().await,
            vec![Note::synced("42", "buy milk")]
        );

        let outcome = harness.sync.update(&id, "buy oat milk").await.unwrap();
        assert_eq!(outcome, SyncOutcome::Synced);
        assert_eq!(
            harness.repo().list().await,
            vec![Note::synced("42", "buy oat milk")]
        );

        let outcome = harness.sync.delete(&id).await.unwrap();
        assert_eq!(outcome, SyncOutcome::Synced);
        assert!(harness.repo().list().await.is_empty());
        assert!(harness.remote.notes().is_empty());
    }

    #[tokio::test]
    async fn offline_defers_to_a_single_reconnect_pass() {
        let harness = Harness::new(FakeRemote::new(1), false);
        harness.repo().add("draft").await.unwrap();

        assert!(!harness.sync.sync().await);
        assert!(!harness.sync.sync().await);
        assert_eq!(
            harness.sync.sync_with_outcome().await,
            SyncOutcome::Offline
        );
        assert!(harness.sync.reconnect_pending());

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(harness.remote.calls().is_empty());

        harness.connectivity.set_online(true);
        tokio::time::timeout(Duration::from_secs(2), async {
            while harness.repo().pending_count().await > 0 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(!harness.sync.reconnect_pending());
        assert_eq!(harness.list_calls(), 2);
        assert_eq!(
            harness.repo().list().await,
            vec![Note::synced("1", "draft")]
        );
    }

    #[tokio::test]
    async fn rejected_update_aborts_before_deletes() {
        let harness = Harness::new(
            FakeRemote::with_notes(10, vec![Note::synced("1", "a"), Note::synced("2", "b")]),
            true,
        );
        harness.remote.reject_update("1");
        let repo = harness.repo();
        repo.replace_all(harness.remote.notes()).await.unwrap();
        repo.update(&NoteId::new("1"), "a2").await.unwrap();
        repo.delete(&NoteId::new("2")).await.unwrap();
        let before = repo.list().await;

        assert_eq!(harness.sync.sync_with_outcome().await, SyncOutcome::Failed);

        assert!(!harness
            .remote
            .calls()
            .iter()
            .any(|call| matches!(call, RemoteCall::Delete(_))));
        assert_eq!(repo.list().await, before);
        assert_eq!(harness.remote.notes().len(), 2);
    }

    #[tokio::test]
    async fn failed_create_aborts_the_pass() {
        let harness = Harness::new(FakeRemote::with_notes(1, vec![Note::synced("9", "x")]), true);
        harness.remote.fail_create();
        let repo = harness.repo();
        repo.replace_all(harness.remote.notes()).await.unwrap();
        repo.update(&NoteId::new("9"), "y").await.unwrap();
        repo.add("new").await.unwrap();

        assert!(!harness.sync.sync().await);
        assert!(!harness
            .remote
            .calls()
            .iter()
            .any(|call| matches!(call, RemoteCall::Update(..))));
        assert_eq!(repo.pending_count().await, 2);
    }

    #[tokio::test]
    async fn missing_listing_leaves_local_state_untouched() {
        let harness = Harness::new(FakeRemote::new(1), true);
        harness.remote.empty_listing();
        harness.repo().add("keep me").await.unwrap();

        assert!(!harness.sync.sync().await);
        assert_eq!(harness.remote.calls(), vec![RemoteCall::List]);
        assert_eq!(harness.repo().list().await, vec![Note::pending("keep me")]);
    }

    #[tokio::test]
    async fn overlapping_syncs_run_one_pass_at_a_time() {
        let harness = Harness::new(FakeRemote::new(1), true);
        harness.remote.slow_listing(Duration::from_millis(20));
        harness.repo().add("one").await.unwrap();
        let other = harness.sync.clone();

        let (first, second) = tokio::join!(harness.sync.sync(), other.sync());

        assert!(first && second);
        assert_eq!(harness.remote.max_concurrent_lists(), 1);
        assert_eq!(harness.list_calls(), 4);
        assert_eq!(harness.remote.notes(), vec![Note::synced("1", "one")]);
    }

    #[tokio::test]
    async fn add_returns_server_ids_for_repeated_content() {
        let harness = Harness::new(FakeRemote::new(42), true);

        let (first, _) = harness.sync.add("same").await.unwrap();
        let (second, _) = harness.sync.add("same").await.unwrap();

        assert_eq!(first.id, Some(NoteId::new("42")));
        assert_eq!(second.id, Some(NoteId::new("43")));
    }

    #[tokio::test]
    async fn offline_add_returns_pending_note() {
        let harness = Harness::new(FakeRemote::new(1), false);

        let (note, outcome) = harness.sync.add("later").await.unwrap();

        assert_eq!(note, Note::pending("later"));
        assert_eq!(outcome, SyncOutcome::Offline);
    }

    #[tokio::test]
    async fn add_during_running_pass_waits_and_reaches_server() {
        let harness = Harness::new(FakeRemote::new(1), true);
        harness.remote.slow_listing(Duration::from_millis(50));
        harness.repo().add("first").await.unwrap();
        let other = harness.sync.clone();

        let (synced, added) = tokio::join!(harness.sync.sync(), async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            other.add("second").await
        });

        assert!(synced);
        let (note, outcome) = added.unwrap();
        assert_eq!(outcome, SyncOutcome::Synced);
        assert_eq!(note, Note::synced("2", "second"));
        let expected = vec![Note::synced("1", "first"), Note::synced("2", "second")];
        assert_eq!(harness.remote.notes(), expected);
        assert_eq!(harness.repo().list().await, expected);
        assert_eq!(harness.remote.max_concurrent_lists(), 1);
    }

    #[tokio::test]
    async fn repository_changes_during_a_pass_stay_pending() {
        let harness = Harness::new(FakeRemote::with_notes(5, vec![Note::synced("1", "a")]), true);
        harness.remote.slow_listing(Duration::from_millis(50));
        let repo = harness.repo();
        repo.replace_all(harness.remote.notes()).await.unwrap();
        repo.add("first").await.unwrap();

        let (synced, ()) = tokio::join!(harness.sync.sync(), async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            repo.add("late").await.unwrap();
            repo.update(&NoteId::new("1"), "a2").await.unwrap();
        });

        assert!(synced);
        let mut edited = Note::synced("1", "a2");
        edited.status = NoteStatus::PendingUpdating;
        assert_eq!(
            repo.list().await,
            vec![edited, Note::synced("5", "first"), Note::pending("late")]
        );

        assert!(harness.sync.sync().await);
        assert_eq!(
            repo.list().await,
            vec![
                Note::synced("1", "a2"),
                Note::synced("5", "first"),
                Note::synced("6", "late"),
            ]
        );
        assert_eq!(repo.list().await, harness.remote.notes());
    }
}
