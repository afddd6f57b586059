//! Catch repository implementation

#![allow(clippy::cast_possible_wrap)] // SQLite uses i64 for LIMIT

use crate::error::{Error, Result};
use crate::models::{
    validate_species, validate_weight, CatchId, CatchPatch, CatchRecord, CatchSnapshot,
    Enrichment, InventoryStatus, NewCatch, OperationKind, SyncState, SyncStatus,
};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use serde::Serialize;

use super::queue_repository::insert_operation;

const CATCH_COLUMNS: &str = "id, species, weight, timestamp, last_updated, sync_status, \
     server_version, inventory_status, parsing_status, ai_confidence, score, rationale, \
     compliance_warning, compliance_details, image_base64";

/// Ordering for [`CatchFilter`] listings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CatchOrder {
    /// Insertion order (ascending id)
    #[default]
    StoreOrder,
    /// Newest catch first
    NewestFirst,
    /// Oldest local mutation first
    LeastRecentlyUpdated,
}

/// Predicate for listing catches
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatchFilter {
    /// Empty means any status
    pub statuses: Vec<SyncStatus>,
    pub inventory_status: Option<InventoryStatus>,
    /// Case-insensitive exact species match
    pub species: Option<String>,
    pub order: CatchOrder,
    pub limit: Option<usize>,
}

impl CatchFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn with_status(status: SyncStatus) -> Self {
        Self::with_statuses(&[status])
    }

    pub fn with_statuses(statuses: &[SyncStatus]) -> Self {
        Self {
            statuses: statuses.to_vec(),
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn inventory(mut self, status: InventoryStatus) -> Self {
        self.inventory_status = Some(status);
        self
    }

    #[must_use]
    pub fn species(mut self, species: impl Into<String>) -> Self {
        self.species = Some(species.into());
        self
    }

    #[must_use]
    pub const fn order(mut self, order: CatchOrder) -> Self {
        self.order = order;
        self
    }

    #[must_use]
    pub const fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Number of records per sync status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub pending: usize,
    pub synced: usize,
    pub error: usize,
    pub conflict: usize,
}

impl StatusCounts {
    pub const fn total(&self) -> usize {
        self.pending + self.synced + self.error + self.conflict
    }

    fn slot(&mut self, status: SyncStatus) -> &mut usize {
        match status {
            SyncStatus::Pending => &mut self.pending,
            SyncStatus::Synced => &mut self.synced,
            SyncStatus::Error => &mut self.error,
            SyncStatus::Conflict => &mut self.conflict,
        }
    }
}

/// Version markers a conditional update checks before writing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordGuard {
    pub last_updated: i64,
    pub sync_status: SyncStatus,
}

impl From<&CatchRecord> for RecordGuard {
    fn from(record: &CatchRecord) -> Self {
        Self {
            last_updated: record.last_updated,
            sync_status: record.sync_status(),
        }
    }
}

/// A local mutation to be uploaded, with the queue entry it produces
#[derive(Debug, Clone)]
pub struct LocalChange {
    pub patch: CatchPatch,
    pub kind: OperationKind,
    /// Extra payload fields stored with the queue entry
    pub audit: Option<serde_json::Value>,
}

/// Trait for catch storage operations
pub trait CatchRepository {
    /// Insert a catch (`pending`/`caught`) and queue its `create` operation
    fn create(&self, new: &NewCatch, now: i64) -> Result<CatchRecord>;

    /// Get a catch by ID
    fn get(&self, id: CatchId) -> Result<Option<CatchRecord>>;

    /// List catches matching `filter`
    fn list(&self, filter: &CatchFilter) -> Result<Vec<CatchRecord>>;

    /// Catches logged for `species` at exactly `timestamp`
    fn find_by_species_and_time(&self, species: &str, timestamp: i64)
        -> Result<Vec<CatchRecord>>;

    /// Apply a partial update
    fn update(&self, id: CatchId, patch: CatchPatch) -> Result<CatchRecord>;

    /// Apply a partial update only when the stored record still matches `guard`
    ///
    /// Returns `Ok(None)` when the record moved on in the meantime.
    fn update_if_unchanged(
        &self,
        id: CatchId,
        guard: RecordGuard,
        patch: CatchPatch,
    ) -> Result<Option<CatchRecord>>;

    /// Apply a local mutation and append its queue entry in one transaction
    fn apply_local_change(&self, id: CatchId, change: LocalChange) -> Result<CatchRecord>;

    /// Count records per sync status
    fn count_by_status(&self) -> Result<StatusCounts>;
}

/// `SQLite` implementation of `CatchRepository`
pub struct SqliteCatchRepository<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteCatchRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Parse a catch from a database row
    fn parse_catch(row: &rusqlite::Row<'_>) -> rusqlite::Result<CatchRecord> {
        let status: String = row.get(5)?;
        let status = status
            .parse::<SyncStatus>()
            .map_err(|error| conversion_error(5, error))?;
        let server_version: Option<String> = row.get(6)?;
        let sync = match (status, server_version) {
            (SyncStatus::Conflict, Some(raw)) => {
                let snapshot: CatchSnapshot =
                    serde_json::from_str(&raw).map_err(|error| conversion_error(6, error))?;
                SyncState::conflict(snapshot)
            }
            (SyncStatus::Conflict, None) => {
                return Err(conversion_error(
                    6,
                    Error::Database("conflict row without server version".into()),
                ));
            }
            (SyncStatus::Pending, _) => SyncState::Pending,
            (SyncStatus::Synced, _) => SyncState::Synced,
            (SyncStatus::Error, _) => SyncState::Error,
        };

        let inventory: String = row.get(7)?;
        let parsing_status: Option<String> = row.get(8)?;

        Ok(CatchRecord {
            id: CatchId::new(row.get(0)?),
            species: row.get(1)?,
            weight: row.get(2)?,
            timestamp: row.get(3)?,
            last_updated: row.get(4)?,
            sync,
            inventory_status: inventory
                .parse()
                .map_err(|error| conversion_error(7, error))?,
            enrichment: Enrichment {
                parsing_status: parsing_status
                    .map(|raw| raw.parse())
                    .transpose()
                    .map_err(|error| conversion_error(8, error))?,
                ai_confidence: row.get(9)?,
                score: row.get(10)?,
                rationale: row.get(11)?,
                compliance_warning: row.get(12)?,
                compliance_details: row.get(13)?,
                image_base64: row.get(14)?,
            },
        })
    }

    fn write(&self, record: &CatchRecord) -> Result<()> {
        let server_version = record
            .server_version()
            .map(serde_json::to_string)
            .transpose()?;
        let enrichment = &record.enrichment;

        self.conn.execute(
            "UPDATE catches SET
                species = ?1, weight = ?2, timestamp = ?3, last_updated = ?4,
                sync_status = ?5, server_version = ?6, inventory_status = ?7,
                parsing_status = ?8, ai_confidence = ?9, score = ?10, rationale = ?11,
                compliance_warning = ?12, compliance_details = ?13, image_base64 = ?14
             WHERE id = ?15",
            params![
                record.species,
                record.weight,
                record.timestamp,
                record.last_updated,
                record.sync_status().as_str(),
                server_version,
                record.inventory_status.as_str(),
                enrichment.parsing_status.map(|status| status.as_str()),
                enrichment.ai_confidence,
                enrichment.score,
                enrichment.rationale,
                enrichment.compliance_warning,
                enrichment.compliance_details,
                enrichment.image_base64,
                record.id.get(),
            ],
        )?;
        Ok(())
    }

    fn require(&self, id: CatchId) -> Result<CatchRecord> {
        self.get(id)?.ok_or(Error::NotFound(id))
    }

    fn patched(&self, id: CatchId, patch: CatchPatch) -> Result<CatchRecord> {
        patch.validate()?;
        let mut record = self.require(id)?;
        record.apply(patch);
        self.write(&record)?;
        Ok(record)
    }
}

impl CatchRepository for SqliteCatchRepository<'_> {
    fn create(&self, new: &NewCatch, now: i64) -> Result<CatchRecord> {
        validate_species(&new.species)?;
        validate_weight(new.weight)?;

        let timestamp = new.timestamp.unwrap_or(now);
        let enrichment = &new.enrichment;
        let tx = self.conn.unchecked_transaction()?;

        self.conn.execute(
            "INSERT INTO catches (
                species, weight, timestamp, last_updated, sync_status, inventory_status,
                parsing_status, ai_confidence, score, rationale, compliance_warning,
                compliance_details, image_base64
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            params![
                new.species.trim(),
                new.weight,
                timestamp,
                timestamp,
                SyncStatus::Pending.as_str(),
                InventoryStatus::Caught.as_str(),
                enrichment.parsing_status.map(|status| status.as_str()),
                enrichment.ai_confidence,
                enrichment.score,
                enrichment.rationale,
                enrichment.compliance_warning,
                enrichment.compliance_details,
                enrichment.image_base64,
            ],
        )?;

        let id = CatchId::new(self.conn.last_insert_rowid());
        let record = self.require(id)?;
        insert_operation(
            self.conn,
            OperationKind::Create,
            id,
            &serde_json::to_value(record.snapshot())?,
            now,
        )?;
        tx.commit()?;

        Ok(record)
    }

    fn get(&self, id: CatchId) -> Result<Option<CatchRecord>> {
        let record = self
            .conn
            .query_row(
                &format!("SELECT {CATCH_COLUMNS} FROM catches WHERE id = ?1"),
                params![id.get()],
                Self::parse_catch,
            )
            .optional()?;
        Ok(record)
    }

    fn list(&self, filter: &CatchFilter) -> Result<Vec<CatchRecord>> {
        let mut clauses = Vec::new();
        let mut values: Vec<Value> = Vec::new();

        if !filter.statuses.is_empty() {
            let placeholders = vec!["?"; filter.statuses.len()].join(", ");
            clauses.push(format!("sync_status IN ({placeholders})"));
            values.extend(
                filter
                    .statuses
                    .iter()
                    .map(|status| Value::Text(status.as_str().to_string())),
            );
        }
        if let Some(inventory) = filter.inventory_status {
            clauses.push("inventory_status = ?".to_string());
            values.push(Value::Text(inventory.as_str().to_string()));
        }
        if let Some(species) = &filter.species {
            clauses.push("species = ? COLLATE NOCASE".to_string());
            values.push(Value::Text(species.trim().to_string()));
        }

        let mut sql = format!("SELECT {CATCH_COLUMNS} FROM catches");
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(match filter.order {
            CatchOrder::StoreOrder => " ORDER BY id ASC",
            CatchOrder::NewestFirst => " ORDER BY timestamp DESC, id DESC",
            CatchOrder::LeastRecentlyUpdated => " ORDER BY last_updated ASC, id ASC",
        });
        if let Some(limit) = filter.limit {
            sql.push_str(" LIMIT ?");
            values.push(Value::Integer(limit as i64));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let records = stmt
            .query_map(params_from_iter(values), Self::parse_catch)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(records)
    }

    fn find_by_species_and_time(
        &self,
        species: &str,
        timestamp: i64,
    ) -> Result<Vec<CatchRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {CATCH_COLUMNS} FROM catches
             WHERE species = ?1 AND timestamp = ?2
             ORDER BY id ASC"
        ))?;

        let records = stmt
            .query_map(params![species.trim(), timestamp], Self::parse_catch)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(records)
    }

    fn update(&self, id: CatchId, patch: CatchPatch) -> Result<CatchRecord> {
        let tx = self.conn.unchecked_transaction()?;
        let record = self.patched(id, patch)?;
        tx.commit()?;
        Ok(record)
    }

    fn update_if_unchanged(
        &self,
        id: CatchId,
        guard: RecordGuard,
        patch: CatchPatch,
    ) -> Result<Option<CatchRecord>> {
        let tx = self.conn.unchecked_transaction()?;
        let current = self.require(id)?;
        if RecordGuard::from(&current) != guard {
            return Ok(None);
        }
        let record = self.patched(id, patch)?;
        tx.commit()?;
        Ok(Some(record))
    }

    fn apply_local_change(&self, id: CatchId, change: LocalChange) -> Result<CatchRecord> {
        let tx = self.conn.unchecked_transaction()?;
        let record = self.patched(id, change.patch)?;

        let mut payload = serde_json::to_value(record.snapshot())?;
        if let (Some(audit), Some(object)) = (change.audit, payload.as_object_mut()) {
            object.insert("audit".to_string(), audit);
        }
        insert_operation(self.conn, change.kind, id, &payload, record.last_updated)?;
        tx.commit()?;

        Ok(record)
    }

    fn count_by_status(&self) -> Result<StatusCounts> {
        let mut stmt = self
            .conn
            .prepare("SELECT sync_status, COUNT(*) FROM catches GROUP BY sync_status")?;
        let rows = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, usize>(1)?))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut counts = StatusCounts::default();
        for (status, count) in rows {
            *counts.slot(status.parse()?) += count;
        }
        Ok(counts)
    }
}

fn conversion_error<E>(column: usize, error: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(
        column,
        rusqlite::types::Type::Text,
        Box::new(error),
    )
}
