//! Detects synced records whose remote copy has moved on.
//!
//! Every `synced` record is pulled and compared on the fields the remote owns
//! (species, weight, timestamp, inventory status). A record that differs is
//! parked in `conflict` with the remote snapshot attached, for the user to
//! resolve.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use super::engine::DEFAULT_UPLOAD_TIMEOUT;
use super::remote::{RemoteCatalog, RemoteError};
use crate::db::RecordGuard;
use crate::models::{CatchId, CatchPatch, CatchRecord, CatchSnapshot, SyncState, SyncStatus};
use crate::services::RecordStore;
use crate::Result;

/// Counts from one divergence scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DivergenceReport {
    pub checked: usize,
    pub flagged: usize,
    /// Synced locally but unknown to the remote
    pub missing: usize,
    pub failed: usize,
}

/// Result of comparing one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckOutcome {
    Matches,
    Flagged,
    Missing,
    /// The pull failed; the record is left alone
    Unreachable,
    /// The remote sent a version that could not be stored locally
    Invalid,
    /// Not `synced`, or changed locally while the pull was in flight
    Skipped,
}

/// Whether the remote snapshot disagrees with the local record.
pub fn diverges(local: &CatchRecord, remote: &CatchSnapshot) -> bool {
    local.species != remote.species
        || weights_differ(local.weight, remote.weight)
        || local.timestamp != remote.timestamp
        || local.inventory_status != remote.inventory_status
}

/// Weight comparison with float tolerance. NaN on either side differs.
pub fn weights_differ(local: f64, remote: f64) -> bool {
    local.is_nan() || remote.is_nan() || (local - remote).abs() > f64::EPSILON
}

pub struct DivergenceDetector<R> {
    store: RecordStore,
    remote: Arc<R>,
    pull_timeout: Duration,
}

impl<R> Clone for DivergenceDetector<R> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            remote: Arc::clone(&self.remote),
            pull_timeout: self.pull_timeout,
        }
    }
}

impl<R: RemoteCatalog> DivergenceDetector<R> {
    pub const fn new(store: RecordStore, remote: Arc<R>) -> Self {
        Self {
            store,
            remote,
            pull_timeout: DEFAULT_UPLOAD_TIMEOUT,
        }
    }

    #[must_use]
    pub const fn with_pull_timeout(mut self, pull_timeout: Duration) -> Self {
        self.pull_timeout = pull_timeout;
        self
    }

    /// Compare every `synced` record with the remote.
    pub async fn scan(&self) -> Result<DivergenceReport> {
        let candidates = self.store.list_by_status(SyncStatus::Synced).await?;
        let mut report = DivergenceReport::default();

        for record in candidates {
            report.checked += 1;
            match self.check_record(record).await? {
                CheckOutcome::Flagged => report.flagged += 1,
                CheckOutcome::Missing => report.missing += 1,
                CheckOutcome::Unreachable | CheckOutcome::Invalid => report.failed += 1,
                CheckOutcome::Matches | CheckOutcome::Skipped => {}
            }
        }

        if report.flagged > 0 {
            tracing::info!(
                "Divergence scan flagged {} of {} synced catches",
                report.flagged,
                report.checked
            );
        } else {
            tracing::debug!("Divergence scan checked {} catches", report.checked);
        }
        Ok(report)
    }

    /// Compare one record with the remote.
    pub async fn check(&self, id: CatchId) -> Result<CheckOutcome> {
        let record = self.store.require(id).await?;
        if record.sync_status() != SyncStatus::Synced {
            return Ok(CheckOutcome::Skipped);
        }
        self.check_record(record).await
    }

    async fn check_record(&self, record: CatchRecord) -> Result<CheckOutcome> {
        let id = record.id;
        let pulled = tokio::time::timeout(self.pull_timeout, self.remote.pull(id))
            .await
            .unwrap_or(Err(RemoteError::Timeout(self.pull_timeout)));

        let snapshot = match pulled {
            Ok(Some(snapshot)) => snapshot,
            Ok(None) => {
                tracing::debug!("Catch {id} is synced locally but missing remotely");
                return Ok(CheckOutcome::Missing);
            }
            Err(error) => {
                tracing::warn!("Could not pull catch {id}: {error}");
                return Ok(CheckOutcome::Unreachable);
            }
        };

        if !diverges(&record, &snapshot) {
            return Ok(CheckOutcome::Matches);
        }
        if let Err(error) = snapshot.validate() {
            tracing::warn!("Ignoring remote version of catch {id}: {error}");
            return Ok(CheckOutcome::Invalid);
        }

        let flagged = self
            .store
            .update_if_unchanged(
                id,
                RecordGuard::from(&record),
                CatchPatch::default().sync(SyncState::conflict(snapshot)),
            )
            .await?;

        if flagged.is_some() {
            tracing::info!("Catch {id} diverged from the remote, marked as conflict");
            Ok(CheckOutcome::Flagged)
        } else {
            Ok(CheckOutcome::Skipped)
        }
    }
}
