//! Upload loop: pushes pending and failed records to the remote.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use serde::Serialize;

use super::remote::{RemoteCatalog, RemoteError};
use crate::db::{CatchFilter, RecordGuard};
use crate::models::{CatchId, CatchPatch, CatchRecord, SyncState, SyncStatus};
use crate::services::RecordStore;
use crate::Result;

pub const DEFAULT_UPLOAD_TIMEOUT: Duration = Duration::from_secs(10);

/// Outcome counts of one `process_queue` run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub synced: usize,
    pub errors: usize,
}

impl SyncReport {
    pub const fn is_empty(&self) -> bool {
        self.synced == 0 && self.errors == 0
    }
}

enum Outcome {
    Synced,
    Failed,
    /// Uploaded, but the record changed meanwhile; it stays pending.
    Superseded,
}

type ClaimSet = Arc<Mutex<HashSet<CatchId>>>;

/// Marks a record as in flight until dropped.
struct Claim {
    claims: ClaimSet,
    id: CatchId,
}

impl Claim {
    fn acquire(claims: &ClaimSet, id: CatchId) -> Option<Self> {
        let inserted = claims
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id);
        inserted.then(|| Self {
            claims: Arc::clone(claims),
            id,
        })
    }
}

impl Drop for Claim {
    fn drop(&mut self) {
        self.claims
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.id);
    }
}

/// Sync engine shared by the scheduler and manual `sync` calls.
///
/// Clones share the in-flight claim set, so overlapping runs never upload the
/// same record twice.
pub struct SyncEngine<R> {
    store: RecordStore,
    remote: Arc<R>,
    claims: ClaimSet,
    upload_timeout: Duration,
}

impl<R> Clone for SyncEngine<R> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            remote: Arc::clone(&self.remote),
            claims: Arc::clone(&self.claims),
            upload_timeout: self.upload_timeout,
        }
    }
}

impl<R: RemoteCatalog> SyncEngine<R> {
    pub fn new(store: RecordStore, remote: Arc<R>) -> Self {
        Self {
            store,
            remote,
            claims: Arc::default(),
            upload_timeout: DEFAULT_UPLOAD_TIMEOUT,
        }
    }

    #[must_use]
    pub const fn with_upload_timeout(mut self, upload_timeout: Duration) -> Self {
        self.upload_timeout = upload_timeout;
        self
    }

    pub const fn store(&self) -> &RecordStore {
        &self.store
    }

    pub fn remote(&self) -> &Arc<R> {
        &self.remote
    }

    /// Upload every `pending` or `error` record once.
    ///
    /// Upload failures are recorded on the record and counted in the report;
    /// only store failures are returned as errors.
    pub async fn process_queue(&self) -> Result<SyncReport> {
        let candidates = self
            .store
            .list(&CatchFilter::with_statuses(&[
                SyncStatus::Pending,
                SyncStatus::Error,
            ]))
            .await?;

        let mut report = SyncReport::default();
        if candidates.is_empty() {
            tracing::debug!("Sync queue is empty");
            return Ok(report);
        }

        for candidate in candidates {
            let Some(_claim) = Claim::acquire(&self.claims, candidate.id) else {
                tracing::debug!("Catch {} is already in flight, skipping", candidate.id);
                continue;
            };

            // Another run may have finished it between listing and claiming
            let Some(record) = self
                .store
                .get(candidate.id)
                .await?
                .filter(|record| record.sync_status().is_upload_eligible())
            else {
                continue;
            };

            match self.sync_record(record).await? {
                Outcome::Synced => report.synced += 1,
                Outcome::Failed => report.errors += 1,
                Outcome::Superseded => {}
            }
        }

        tracing::info!(
            "Sync run finished: {} synced, {} failed",
            report.synced,
            report.errors
        );
        Ok(report)
    }

    async fn sync_record(&self, record: CatchRecord) -> Result<Outcome> {
        let id = record.id;
        let guard = RecordGuard::from(&record);
        self.store.begin_upload(id).await?;

        let uploaded = tokio::time::timeout(self.upload_timeout, self.remote.upload(&record))
            .await
            .unwrap_or(Err(RemoteError::Timeout(self.upload_timeout)));

        match uploaded {
            Ok(()) => {
                let marked = self
                    .store
                    .update_if_unchanged(id, guard, CatchPatch::default().sync(SyncState::Synced))
                    .await?;
                self.store.finish_upload(id, true).await?;

                if marked.is_some() {
                    tracing::debug!("Catch {id} synced");
                    Ok(Outcome::Synced)
                } else {
                    tracing::debug!("Catch {id} changed during upload, leaving it pending");
                    Ok(Outcome::Superseded)
                }
            }
            Err(error) => {
                tracing::warn!("Upload failed for catch {id}: {error}");
                let marked = self
                    .store
                    .update_if_unchanged(id, guard, CatchPatch::default().sync(SyncState::Error))
                    .await?;
                self.store.finish_upload(id, false).await?;

                if marked.is_some() {
                    Ok(Outcome::Failed)
                } else {
                    tracing::debug!("Catch {id} changed during failed upload, leaving it pending");
                    Ok(Outcome::Superseded)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{InventoryStatus, NewCatch, OperationStatus};
    use crate::sync::fakes::FakeRemote;
    use pretty_assertions::assert_eq;

    async fn engine_with(remote: FakeRemote) -> (SyncEngine<FakeRemote>, RecordStore, Arc<FakeRemote>) {
        let store = RecordStore::open_in_memory().await.unwrap();
        let remote = Arc::new(remote);
        (
            SyncEngine::new(store.clone(), Arc::clone(&remote)),
            store,
            remote,
        )
    }

    #[tokio::test]
    async fn pending_record_is_synced() {
        let (engine, store, remote) = engine_with(FakeRemote::default()).await;
        let record = store.create(NewCatch::new("Mackerel", 3.2)).await.unwrap();

        let report = engine.process_queue().await.unwrap();
        assert_eq!(report, SyncReport { synced: 1, errors: 0 });

        let synced = store.require(record.id).await.unwrap();
        assert_eq!(synced.sync, SyncState::Synced);
        assert_eq!(remote.uploads(), vec![record.id]);

        let ops = store.operations_for(record.id).await.unwrap();
        assert_eq!(ops[0].status, OperationStatus::Completed);
        assert_eq!(ops[0].attempts, 1);
    }

    #[tokio::test]
    async fn empty_queue_reports_nothing_and_mutates_nothing() {
        let (engine, store, remote) = engine_with(FakeRemote::default()).await;
        let record = store.create(NewCatch::new("Cod", 1.0)).await.unwrap();
        engine.process_queue().await.unwrap();
        let before = store.require(record.id).await.unwrap();

        let report = engine.process_queue().await.unwrap();
        assert!(report.is_empty());
        assert_eq!(store.require(record.id).await.unwrap(), before);
        assert_eq!(remote.uploads().len(), 1);
    }

    #[tokio::test]
    async fn failed_upload_marks_error_and_is_retried() {
        let (engine, store, remote) = engine_with(FakeRemote::failing()).await;
        let record = store.create(NewCatch::new("Mackerel", 3.2)).await.unwrap();

        let report = engine.process_queue().await.unwrap();
        assert_eq!(report, SyncReport { synced: 0, errors: 1 });
        assert_eq!(
            store.require(record.id).await.unwrap().sync_status(),
            SyncStatus::Error
        );
        let ops = store.operations_for(record.id).await.unwrap();
        assert_eq!(ops[0].status, OperationStatus::Failed);

        remote.set_failing(false);
        let report = engine.process_queue().await.unwrap();
        assert_eq!(report, SyncReport { synced: 1, errors: 0 });
        assert_eq!(
            store.require(record.id).await.unwrap().sync_status(),
            SyncStatus::Synced
        );
        let ops = store.operations_for(record.id).await.unwrap();
        assert_eq!(ops[0].status, OperationStatus::Completed);
        assert_eq!(ops[0].attempts, 2);
    }

    #[tokio::test]
    async fn conflicted_records_are_not_uploaded() {
        let (engine, store, remote) = engine_with(FakeRemote::default()).await;
        let record = store.create(NewCatch::new("Cod", 1.0)).await.unwrap();
        store
            .update(
                record.id,
                CatchPatch::default().sync(SyncState::conflict(record.snapshot())),
            )
            .await
            .unwrap();

        assert!(engine.process_queue().await.unwrap().is_empty());
        assert!(remote.uploads().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn slow_upload_times_out_as_failure() {
        let (engine, store, _) =
            engine_with(FakeRemote::default().with_delay(Duration::from_secs(30))).await;
        let engine = engine.with_upload_timeout(Duration::from_secs(10));
        let record = store.create(NewCatch::new("Tuna", 20.0)).await.unwrap();

        let report = engine.process_queue().await.unwrap();
        assert_eq!(report, SyncReport { synced: 0, errors: 1 });
        assert_eq!(
            store.require(record.id).await.unwrap().sync_status(),
            SyncStatus::Error
        );
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_runs_never_double_count() {
        let (engine, store, remote) =
            engine_with(FakeRemote::default().with_delay(Duration::from_secs(1))).await;
        for species in ["Cod", "Bass", "Tuna"] {
            store.create(NewCatch::new(species, 1.0)).await.unwrap();
        }

        let other = engine.clone();
        let (first, second) = tokio::join!(engine.process_queue(), other.process_queue());
        let (first, second) = (first.unwrap(), second.unwrap());

        assert_eq!(first.synced + second.synced, 3);
        assert_eq!(first.errors + second.errors, 0);
        assert_eq!(remote.uploads().len(), 3);
    }

    #[tokio::test]
    async fn change_during_upload_stays_pending() {
        let (engine, store, remote) = engine_with(FakeRemote::gated()).await;
        let record = store.create(NewCatch::new("Mackerel", 3.2)).await.unwrap();

        let run = tokio::spawn({
            let engine = engine.clone();
            async move { engine.process_queue().await }
        });

        remote.upload_started().await;
        store
            .record_local_change(
                record.id,
                CatchPatch::default().inventory_status(InventoryStatus::OnIce),
            )
            .await
            .unwrap();
        remote.release_upload();

        let report = run.await.unwrap().unwrap();
        assert_eq!(report, SyncReport::default());

        let current = store.require(record.id).await.unwrap();
        assert_eq!(current.sync_status(), SyncStatus::Pending);
        assert_eq!(current.inventory_status, InventoryStatus::OnIce);

        // The newer version goes out on the next run
        remote.set_gated(false);
        let report = engine.process_queue().await.unwrap();
        assert_eq!(report.synced, 1);
    }

    #[tokio::test]
    async fn change_during_failed_upload_is_not_an_error() {
        let remote = FakeRemote::gated();
        remote.set_failing(true);
        let (engine, store, remote) = engine_with(remote).await;
        let record = store.create(NewCatch::new("Cod", 1.0)).await.unwrap();

        let run = tokio::spawn({
            let engine = engine.clone();
            async move { engine.process_queue().await }
        });

        remote.upload_started().await;
        store
            .record_local_change(record.id, CatchPatch::default().weight(1.4))
            .await
            .unwrap();
        remote.release_upload();

        let report = run.await.unwrap().unwrap();
        assert_eq!(report, SyncReport::default());

        let current = store.require(record.id).await.unwrap();
        assert_eq!(current.sync_status(), SyncStatus::Pending);
        assert_eq!(current.weight, 1.4);
    }
}
