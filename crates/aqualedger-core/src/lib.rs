//! aqualedger-core - Core library for AquaLedger
//!
//! This crate contains the catch models, the `SQLite` record store with its
//! outbound sync queue, the inventory lifecycle, and the offline-first sync
//! machinery (engine, divergence detection, conflict resolution, scheduler)
//! used by the AquaLedger interfaces.

pub mod config;
pub mod db;
pub mod enrichment;
pub mod error;
pub mod lifecycle;
pub mod models;
pub mod services;
pub mod sync;
pub mod util;

pub use error::{Error, Result};
pub use models::{CatchId, CatchRecord};
