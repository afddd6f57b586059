//! Error types for aqualedger-core

use thiserror::Error;

use crate::models::{CatchId, InventoryStatus};

/// Result type alias using aqualedger-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in aqualedger-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// `SQLite` error
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Catch not found
    #[error("Catch not found: {0}")]
    NotFound(CatchId),

    /// Lifecycle change outside the transition table
    #[error("Illegal inventory transition from {from} to {to}")]
    IllegalTransition {
        from: InventoryStatus,
        to: InventoryStatus,
    },

    /// Record is waiting for the user to pick a version
    #[error("Catch {0} has an unresolved sync conflict")]
    ConflictUnresolved(CatchId),

    /// Resolution requested for a record that is not in conflict
    #[error("Catch {0} is not in conflict")]
    NotInConflict(CatchId),

    /// Record changed underneath a read-modify-write
    #[error("Catch {0} changed while it was being updated")]
    ConcurrentModification(CatchId),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}
