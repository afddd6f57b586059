//! Remote catalog capability consumed by the sync engine and divergence detector.

use std::future::Future;
use std::sync::Arc;

use thiserror::Error;

use crate::models::{CatchId, CatchRecord, CatchSnapshot};

/// Failure talking to the remote catalog.
///
/// Always absorbed into per-record sync status; never fatal to a run.
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("Remote HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Remote rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("Remote did not answer within {0:?}")]
    Timeout(std::time::Duration),
    #[error("Remote unavailable: {0}")]
    Unavailable(String),
}

pub type RemoteResult<T> = Result<T, RemoteError>;

/// The server side of the catch catalog.
pub trait RemoteCatalog: Send + Sync {
    /// Push the record's current version.
    fn upload(&self, record: &CatchRecord) -> impl Future<Output = RemoteResult<()>> + Send;

    /// Fetch the remote's version of a record, `None` if it has none.
    fn pull(&self, id: CatchId) -> impl Future<Output = RemoteResult<Option<CatchSnapshot>>> + Send;
}

impl<R: RemoteCatalog> RemoteCatalog for Arc<R> {
    fn upload(&self, record: &CatchRecord) -> impl Future<Output = RemoteResult<()>> + Send {
        (**self).upload(record)
    }

    fn pull(&self, id: CatchId) -> impl Future<Output = RemoteResult<Option<CatchSnapshot>>> + Send {
        (**self).pull(id)
    }
}
