//! Data models for AquaLedger

mod catch;
mod status;
mod sync_operation;

pub use catch::{
    validate_species, validate_weight, CatchId, CatchPatch, CatchRecord, CatchSnapshot,
    Enrichment, NewCatch, SyncState,
};
pub use status::{InventoryStatus, ParsingStatus, SyncStatus};
pub use sync_operation::{OperationKind, OperationStatus, SyncOperation};
