//! Database migrations

use crate::error::Result;
use rusqlite::Connection;

/// Current schema version
const CURRENT_VERSION: i32 = 2;

/// Run all pending migrations
pub fn run(conn: &Connection) -> Result<()> {
    let version = get_version(conn)?;

    if version < 1 {
        migrate_v1(conn)?;
    }
    if version < 2 {
        migrate_v2(conn)?;
    }

    Ok(())
}

/// Get the current schema version
fn get_version(conn: &Connection) -> Result<i32> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version')",
        [],
        |row| row.get(0),
    )?;

    if !exists {
        return Ok(0);
    }

    let version = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |row| row.get(0),
    )?;

    Ok(version)
}

fn apply(conn: &Connection, version: i32, sql: &str) -> Result<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute_batch(sql)?;
    tx.execute(
        "INSERT INTO schema_version (version) VALUES (?1)",
        [version],
    )?;
    tx.commit()?;

    tracing::info!("Migrated database to version {version}");
    Ok(())
}

/// Migration to version 1: catches and the sync queue
fn migrate_v1(conn: &Connection) -> Result<()> {
    apply(
        conn,
        1,
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        );
        CREATE TABLE IF NOT EXISTS catches (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            species TEXT NOT NULL,
            weight REAL NOT NULL CHECK (weight >= 0),
            timestamp INTEGER NOT NULL,
            last_updated INTEGER NOT NULL,
            sync_status TEXT NOT NULL
                CHECK (sync_status IN ('pending', 'synced', 'error', 'conflict')),
            server_version TEXT,
            inventory_status TEXT NOT NULL DEFAULT 'caught'
                CHECK (inventory_status IN ('caught', 'on_ice', 'listed', 'sold')),
            CHECK ((sync_status = 'conflict') = (server_version IS NOT NULL))
        );
        CREATE INDEX IF NOT EXISTS idx_catches_species ON catches(species);
        CREATE INDEX IF NOT EXISTS idx_catches_timestamp ON catches(timestamp DESC);
        CREATE INDEX IF NOT EXISTS idx_catches_sync_status ON catches(sync_status);
        CREATE INDEX IF NOT EXISTS idx_catches_inventory_status ON catches(inventory_status);
        CREATE INDEX IF NOT EXISTS idx_catches_species_timestamp ON catches(species, timestamp);
        CREATE TABLE IF NOT EXISTS sync_queue (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            operation TEXT NOT NULL CHECK (operation IN ('create', 'update', 'delete')),
            catch_id INTEGER NOT NULL REFERENCES catches(id),
            payload TEXT NOT NULL,
            timestamp INTEGER NOT NULL,
            status TEXT NOT NULL DEFAULT 'pending',
            attempts INTEGER NOT NULL DEFAULT 0
        );
        CREATE INDEX IF NOT EXISTS idx_sync_queue_timestamp ON sync_queue(timestamp);
        CREATE INDEX IF NOT EXISTS idx_sync_queue_status ON sync_queue(status);
        CREATE INDEX IF NOT EXISTS idx_sync_queue_catch ON sync_queue(catch_id);",
    )
}

/// Migration to version 2: enrichment columns and `last_updated` ordering
fn migrate_v2(conn: &Connection) -> Result<()> {
    apply(
        conn,
        2,
        "ALTER TABLE catches ADD COLUMN parsing_status TEXT;
        ALTER TABLE catches ADD COLUMN ai_confidence REAL;
        ALTER TABLE catches ADD COLUMN score INTEGER;
        ALTER TABLE catches ADD COLUMN rationale TEXT;
        ALTER TABLE catches ADD COLUMN compliance_warning INTEGER;
        ALTER TABLE catches ADD COLUMN compliance_details TEXT;
        ALTER TABLE catches ADD COLUMN image_base64 TEXT;
        CREATE INDEX IF NOT EXISTS idx_catches_parsing_status ON catches(parsing_status);
        CREATE INDEX IF NOT EXISTS idx_catches_last_updated ON catches(last_updated);",
    )
}
