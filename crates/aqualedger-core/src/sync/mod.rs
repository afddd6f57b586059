//! Offline-first synchronization with the remote catalog.
//!
//! - [`SyncEngine`] uploads `pending`/`error` records.
//! - [`DivergenceDetector`] pulls `synced` records and flags remote drift as
//!   `conflict`.
//! - [`ConflictResolver`] lets the user keep the local or the remote version.
//! - [`SyncScheduler`] runs the engine on reconnect and on an interval.

mod divergence;
mod engine;
mod http;
mod remote;
mod resolution;
mod scheduler;
mod status;

pub use divergence::{
    diverges, weights_differ, CheckOutcome, DivergenceDetector, DivergenceReport,
};
pub use engine::{SyncEngine, SyncReport, DEFAULT_UPLOAD_TIMEOUT};
pub use http::HttpRemote;
pub use remote::{RemoteCatalog, RemoteError, RemoteResult};
pub use resolution::{ConflictPair, ConflictResolver, Resolution};
pub use scheduler::{Connectivity, SchedulerHandle, SchedulerState, SyncScheduler};
pub use status::{overall_status, SyncBadge};

#[cfg(test)]
pub(crate) mod fakes {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    use tokio::sync::Notify;

    use super::{RemoteCatalog, RemoteError, RemoteResult};
    use crate::models::{CatchId, CatchRecord, CatchSnapshot};

    /// In-memory remote that records uploads and serves stored snapshots.
    #[derive(Debug, Default)]
    pub struct FakeRemote {
        uploads: Mutex<Vec<CatchId>>,
        snapshots: Mutex<HashMap<CatchId, CatchSnapshot>>,
        failing: AtomicBool,
        failing_pulls: AtomicBool,
        gated: AtomicBool,
        delay: Option<Duration>,
        started: Notify,
        release: Notify,
    }

    impl FakeRemote {
        pub fn failing() -> Self {
            let remote = Self::default();
            remote.set_failing(true);
            remote
        }

        /// Uploads block until [`Self::release_upload`] is called.
        pub fn gated() -> Self {
            let remote = Self::default();
            remote.set_gated(true);
            remote
        }

        pub fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }

        pub fn set_failing(&self, failing: bool) {
            self.failing.store(failing, Ordering::SeqCst);
        }

        pub fn set_failing_pulls(&self, failing: bool) {
            self.failing_pulls.store(failing, Ordering::SeqCst);
        }

        pub fn set_gated(&self, gated: bool) {
            self.gated.store(gated, Ordering::SeqCst);
        }

        pub async fn upload_started(&self) {
            self.started.notified().await;
        }

        pub fn release_upload(&self) {
            self.release.notify_one();
        }

        pub fn put_snapshot(&self, id: CatchId, snapshot: CatchSnapshot) {
            self.snapshots.lock().unwrap().insert(id, snapshot);
        }

        pub fn uploads(&self) -> Vec<CatchId> {
            self.uploads.lock().unwrap().clone()
        }
    }

    impl RemoteCatalog for FakeRemote {
        async fn upload(&self, record: &CatchRecord) -> RemoteResult<()> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.gated.load(Ordering::SeqCst) {
                self.started.notify_one();
                self.release.notified().await;
            }
            if self.failing.load(Ordering::SeqCst) {
                return Err(RemoteError::Unavailable("remote is down".to_string()));
            }

            self.uploads.lock().unwrap().push(record.id);
            self.snapshots
                .lock()
                .unwrap()
                .insert(record.id, record.snapshot());
            Ok(())
        }

        async fn pull(&self, id: CatchId) -> RemoteResult<Option<CatchSnapshot>> {
            if self.failing_pulls.load(Ordering::SeqCst) {
                return Err(RemoteError::Unavailable("remote is down".to_string()));
            }
            Ok(self.snapshots.lock().unwrap().get(&id).cloned())
        }
    }
}
