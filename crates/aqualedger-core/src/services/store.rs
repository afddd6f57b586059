//! Shared record store service used by every sync component.

use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{broadcast, Mutex};

use crate::db::{
    CatchFilter, CatchRepository, Database, LocalChange, RecordGuard, SqliteCatchRepository,
    SqliteSyncQueueRepository, StatusCounts, SyncQueueRepository,
};
use crate::models::{
    CatchId, CatchPatch, CatchRecord, NewCatch, OperationKind, OperationStatus, SyncOperation,
    SyncState, SyncStatus,
};
use crate::util::{Clock, SystemClock};
use crate::{Error, Result};

const EVENT_CAPACITY: usize = 256;

/// Change notification published after a write commits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "event", content = "id", rename_all = "snake_case")]
pub enum StoreEvent {
    Created(CatchId),
    Updated(CatchId),
}

impl StoreEvent {
    pub const fn catch_id(self) -> CatchId {
        match self {
            Self::Created(id) | Self::Updated(id) => id,
        }
    }
}

/// Thread-safe service for catch and sync queue operations.
///
/// Every component receives a clone of the same store; all reads and writes
/// go through one connection guarded by an async mutex, so each operation is
/// atomic with respect to a single record.
#[derive(Clone)]
pub struct RecordStore {
    db: Arc<Mutex<Option<Database>>>,
    db_path: Option<PathBuf>,
    events: broadcast::Sender<StoreEvent>,
    clock: Arc<dyn Clock>,
}

impl RecordStore {
    /// Open a store at the given filesystem path.
    pub async fn open(db_path: impl Into<PathBuf>) -> Result<Self> {
        let db_path = db_path.into();
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let db = Database::open(&db_path)?;
        tracing::debug!("Opened catch store at {}", db_path.display());
        Ok(Self::from_database(db, Some(db_path)))
    }

    /// Open an in-memory store (primarily for tests).
    pub async fn open_in_memory() -> Result<Self> {
        let db = Database::open_in_memory()?;
        Ok(Self::from_database(db, None))
    }

    fn from_database(db: Database, db_path: Option<PathBuf>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            db: Arc::new(Mutex::new(Some(db))),
            db_path,
            events,
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the clock used for bookkeeping timestamps.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Current time according to the store's clock (Unix ms).
    pub fn now(&self) -> i64 {
        self.clock.now_millis()
    }

    /// Close the underlying database; later calls fail.
    pub async fn close(&self) -> Result<()> {
        let db = self.db.lock().await.take();
        if let Some(db) = db {
            db.close()?;
            tracing::debug!("Closed catch store");
        }
        Ok(())
    }

    /// Path of the backing file, `None` for in-memory stores.
    pub fn path(&self) -> Option<&std::path::Path> {
        self.db_path.as_deref()
    }

    /// Subscribe to change notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    async fn with_db<T>(&self, op: impl FnOnce(&Database) -> Result<T>) -> Result<T> {
        let guard = self.db.lock().await;
        let db = guard
            .as_ref()
            .ok_or_else(|| Error::Database("record store is closed".into()))?;
        op(db)
    }

    fn publish(&self, event: StoreEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    /// Fetch a catch by id.
    pub async fn get(&self, id: CatchId) -> Result<Option<CatchRecord>> {
        self.with_db(|db| SqliteCatchRepository::new(db.connection()).get(id))
            .await
    }

    /// Fetch a catch by id, failing with `NotFound` when absent.
    pub async fn require(&self, id: CatchId) -> Result<CatchRecord> {
        self.get(id).await?.ok_or(Error::NotFound(id))
    }

    /// List catches matching `filter`.
    pub async fn list(&self, filter: &CatchFilter) -> Result<Vec<CatchRecord>> {
        self.with_db(|db| SqliteCatchRepository::new(db.connection()).list(filter))
            .await
    }

    /// List catches in one sync status, in store order.
    pub async fn list_by_status(&self, status: SyncStatus) -> Result<Vec<CatchRecord>> {
        self.list(&CatchFilter::with_status(status)).await
    }

    /// Catches logged for `species` at exactly `timestamp`.
    pub async fn find_by_species_and_time(
        &self,
        species: &str,
        timestamp: i64,
    ) -> Result<Vec<CatchRecord>> {
        self.with_db(|db| {
            SqliteCatchRepository::new(db.connection()).find_by_species_and_time(species, timestamp)
        })
        .await
    }

    /// Record counts per sync status.
    pub async fn count_by_status(&self) -> Result<StatusCounts> {
        self.with_db(|db| SqliteCatchRepository::new(db.connection()).count_by_status())
            .await
    }

    /// Create a catch in `pending`/`caught` and queue its upload.
    pub async fn create(&self, new: NewCatch) -> Result<CatchRecord> {
        let now = self.now();
        let record = self
            .with_db(|db| SqliteCatchRepository::new(db.connection()).create(&new, now))
            .await?;

        tracing::debug!("Created catch {} ({})", record.id, record.species);
        self.publish(StoreEvent::Created(record.id));
        Ok(record)
    }

    /// Apply a partial update without touching the sync queue.
    pub async fn update(&self, id: CatchId, patch: CatchPatch) -> Result<CatchRecord> {
        let record = self
            .with_db(|db| SqliteCatchRepository::new(db.connection()).update(id, patch))
            .await?;

        self.publish(StoreEvent::Updated(id));
        Ok(record)
    }

    /// Apply a partial update only if the record still matches `guard`.
    pub async fn update_if_unchanged(
        &self,
        id: CatchId,
        guard: RecordGuard,
        patch: CatchPatch,
    ) -> Result<Option<CatchRecord>> {
        let record = self
            .with_db(|db| {
                SqliteCatchRepository::new(db.connection()).update_if_unchanged(id, guard, patch)
            })
            .await?;

        if record.is_some() {
            self.publish(StoreEvent::Updated(id));
        }
        Ok(record)
    }

    /// Apply a local user mutation: bump `last_updated`, mark `pending`,
    /// queue an update.
    ///
    /// Records waiting on conflict resolution are refused.
    pub async fn record_local_change(&self, id: CatchId, patch: CatchPatch) -> Result<CatchRecord> {
        self.local_change(id, false, |_| Ok((patch, None)))
            .await
            .map(|(_, updated)| updated)
    }

    /// Same as [`Self::record_local_change`], storing `audit` with the queue entry.
    pub async fn record_audited_change(
        &self,
        id: CatchId,
        patch: CatchPatch,
        audit: serde_json::Value,
    ) -> Result<CatchRecord> {
        self.local_change(id, false, |_| Ok((patch, Some(audit))))
            .await
            .map(|(_, updated)| updated)
    }

    /// Local change derived from the record as stored, under the store lock.
    ///
    /// `build` sees the current record and returns the patch plus an optional
    /// audit payload, or an error that aborts the write. Returns the record
    /// before and after the change.
    pub(crate) async fn record_local_change_with<F>(
        &self,
        id: CatchId,
        build: F,
    ) -> Result<(CatchRecord, CatchRecord)>
    where
        F: FnOnce(&CatchRecord) -> Result<(CatchPatch, Option<serde_json::Value>)> + Send,
    {
        self.local_change(id, false, build).await
    }

    /// Re-queue a conflicted record with its local values.
    pub(crate) async fn requeue_conflict(&self, id: CatchId) -> Result<CatchRecord> {
        self.local_change(id, true, |_| Ok((CatchPatch::default(), None)))
            .await
            .map(|(_, updated)| updated)
    }

    async fn local_change<F>(
        &self,
        id: CatchId,
        resolving_conflict: bool,
        build: F,
    ) -> Result<(CatchRecord, CatchRecord)>
    where
        F: FnOnce(&CatchRecord) -> Result<(CatchPatch, Option<serde_json::Value>)> + Send,
    {
        let now = self.now();
        let (previous, record) = self
            .with_db(|db| {
                let repo = SqliteCatchRepository::new(db.connection());
                let current = repo.get(id)?.ok_or(Error::NotFound(id))?;
                let (patch, audit) = build(&current)?;
                match (current.sync_status(), resolving_conflict) {
                    (SyncStatus::Conflict, false) => return Err(Error::ConflictUnresolved(id)),
                    (status, true) if status != SyncStatus::Conflict => {
                        return Err(Error::NotInConflict(id));
                    }
                    _ => {}
                }

                // Strictly increasing so in-flight uploads notice the change
                let stamp = now.max(current.last_updated.saturating_add(1));
                let updated = repo.apply_local_change(
                    id,
                    LocalChange {
                        patch: CatchPatch {
                            last_updated: Some(stamp),
                            sync: Some(SyncState::Pending),
                            ..patch
                        },
                        kind: OperationKind::Update,
                        audit,
                    },
                )?;
                Ok((current, updated))
            })
            .await?;

        self.publish(StoreEvent::Updated(id));
        Ok((previous, record))
    }

    /// List sync queue entries oldest first.
    pub async fn list_operations(
        &self,
        status: Option<OperationStatus>,
        limit: usize,
    ) -> Result<Vec<SyncOperation>> {
        self.with_db(|db| SqliteSyncQueueRepository::new(db.connection()).list(status, limit))
            .await
    }

    /// Queue entries recorded for one catch.
    pub async fn operations_for(&self, id: CatchId) -> Result<Vec<SyncOperation>> {
        self.with_db(|db| SqliteSyncQueueRepository::new(db.connection()).list_for_catch(id))
            .await
    }

    /// Number of queue entries in `status`.
    pub async fn operation_count(&self, status: OperationStatus) -> Result<usize> {
        self.with_db(|db| SqliteSyncQueueRepository::new(db.connection()).count(status))
            .await
    }

    pub(crate) async fn begin_upload(&self, id: CatchId) -> Result<usize> {
        self.with_db(|db| SqliteSyncQueueRepository::new(db.connection()).begin_attempt(id))
            .await
    }

    pub(crate) async fn finish_upload(&self, id: CatchId, succeeded: bool) -> Result<usize> {
        self.with_db(|db| {
            SqliteSyncQueueRepository::new(db.connection()).finish_attempt(id, succeeded)
        })
        .await
    }
}
