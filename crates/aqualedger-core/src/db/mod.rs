//! Database layer for AquaLedger

mod connection;
mod migrations;
mod queue_repository;
mod repository;

pub use connection::Database;
pub use queue_repository::{SqliteSyncQueueRepository, SyncQueueRepository};
pub use repository::{
    CatchFilter, CatchOrder, CatchRepository, LocalChange, RecordGuard, SqliteCatchRepository,
    StatusCounts,
};
