//! User-mediated conflict resolution.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::db::CatchFilter;
use crate::models::{CatchId, CatchPatch, CatchRecord, CatchSnapshot, SyncState, SyncStatus};
use crate::services::RecordStore;
use crate::{Error, Result};

/// Which version of a conflicted record survives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    /// Keep the local version and re-upload it
    KeepLocal,
    /// Adopt the server version as-is
    KeepRemote,
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::KeepLocal => "local",
            Self::KeepRemote => "remote",
        })
    }
}

impl FromStr for Resolution {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" | "keep_local" | "mine" => Ok(Self::KeepLocal),
            "remote" | "server" | "keep_remote" | "theirs" => Ok(Self::KeepRemote),
            other => Err(Error::InvalidInput(format!(
                "unknown resolution '{other}', expected 'local' or 'remote'"
            ))),
        }
    }
}

/// A conflicted record next to the competing server version.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConflictPair {
    pub local: CatchRecord,
    pub remote: CatchSnapshot,
}

#[derive(Clone)]
pub struct ConflictResolver {
    store: RecordStore,
}

impl ConflictResolver {
    pub const fn new(store: RecordStore) -> Self {
        Self { store }
    }

    /// Every record awaiting resolution, with its server version.
    pub async fn conflicts(&self) -> Result<Vec<ConflictPair>> {
        let records = self
            .store
            .list(&CatchFilter::with_status(SyncStatus::Conflict))
            .await?;

        Ok(records
            .into_iter()
            .filter_map(|local| {
                let remote = local.server_version()?.clone();
                Some(ConflictPair { local, remote })
            })
            .collect())
    }

    pub async fn resolve(&self, id: CatchId, resolution: Resolution) -> Result<CatchRecord> {
        let resolved = match resolution {
            Resolution::KeepLocal => self.store.requeue_conflict(id).await?,
            Resolution::KeepRemote => {
                let record = self.store.require(id).await?;
                let SyncState::Conflict(server) = record.sync.clone() else {
                    return Err(Error::NotInConflict(id));
                };
                server.validate().map_err(|error| {
                    Error::InvalidInput(format!(
                        "server version of catch {id} cannot be kept ({error}), keep the local version instead"
                    ))
                })?;
                let guard = (&record).into();
                self.store
                    .update_if_unchanged(id, guard, CatchPatch::adopt(*server, SyncState::Synced))
                    .await?
                    .ok_or(Error::NotInConflict(id))?
            }
        };

        tracing::info!("Resolved conflict on catch {id}: kept {resolution} version");
        Ok(resolved)
    }
}
