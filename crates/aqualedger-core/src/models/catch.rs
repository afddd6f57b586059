//! Catch record model

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::status::{InventoryStatus, ParsingStatus, SyncStatus};
use crate::error::{Error, Result};

/// Locally assigned catch identifier (`SQLite` rowid, never reused)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CatchId(i64);

impl CatchId {
    pub const fn new(raw: i64) -> Self {
        Self(raw)
    }

    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for CatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl FromStr for CatchId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim().trim_start_matches('#');
        trimmed
            .parse::<i64>()
            .ok()
            .filter(|raw| *raw > 0)
            .map(Self)
            .ok_or_else(|| Error::InvalidInput(format!("invalid catch id '{s}'")))
    }
}

/// Optional fields filled in by the analysis collaborator
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Enrichment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parsing_status: Option<ParsingStatus>,
    /// Parser/vision confidence in `0.0..=1.0`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_confidence: Option<f64>,
    /// Sustainability score in `0..=100`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compliance_warning: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compliance_details: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_base64: Option<String>,
}

impl Enrichment {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// A full copy of one version of a catch, without local bookkeeping.
///
/// This is what travels to and from the remote, and what a conflicted record
/// keeps as its competing server version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatchSnapshot {
    pub species: String,
    pub weight: f64,
    pub timestamp: i64,
    pub last_updated: i64,
    pub inventory_status: InventoryStatus,
    #[serde(default)]
    pub enrichment: Enrichment,
}

impl CatchSnapshot {
    /// Check the snapshot could be stored as a local record.
    pub fn validate(&self) -> Result<()> {
        validate_species(&self.species)?;
        validate_weight(self.weight)
    }
}

/// Sync state of a record.
///
/// The competing server version only exists inside `Conflict`, so a record can
/// never be in conflict without one, nor carry one in any other state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "server_version", rename_all = "snake_case")]
pub enum SyncState {
    Pending,
    Synced,
    Error,
    Conflict(Box<CatchSnapshot>),
}

impl SyncState {
    pub const fn status(&self) -> SyncStatus {
        match self {
            Self::Pending => SyncStatus::Pending,
            Self::Synced => SyncStatus::Synced,
            Self::Error => SyncStatus::Error,
            Self::Conflict(_) => SyncStatus::Conflict,
        }
    }

    pub fn server_version(&self) -> Option<&CatchSnapshot> {
        match self {
            Self::Conflict(snapshot) => Some(snapshot),
            _ => None,
        }
    }

    pub fn conflict(snapshot: CatchSnapshot) -> Self {
        Self::Conflict(Box::new(snapshot))
    }
}

/// A catch in the local store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatchRecord {
    pub id: CatchId,
    pub species: String,
    /// Kilograms
    pub weight: f64,
    /// Creation instant (Unix ms)
    pub timestamp: i64,
    /// Most recent local mutation (Unix ms)
    pub last_updated: i64,
    #[serde(flatten)]
    pub sync: SyncState,
    pub inventory_status: InventoryStatus,
    #[serde(default)]
    pub enrichment: Enrichment,
}

impl CatchRecord {
    pub const fn sync_status(&self) -> SyncStatus {
        self.sync.status()
    }

    pub fn server_version(&self) -> Option<&CatchSnapshot> {
        self.sync.server_version()
    }

    /// Copy of the record's own version, as it would be sent to the remote.
    pub fn snapshot(&self) -> CatchSnapshot {
        CatchSnapshot {
            species: self.species.clone(),
            weight: self.weight,
            timestamp: self.timestamp,
            last_updated: self.last_updated,
            inventory_status: self.inventory_status,
            enrichment: self.enrichment.clone(),
        }
    }

    /// Apply a partial update in place.
    pub fn apply(&mut self, patch: CatchPatch) {
        if let Some(species) = patch.species {
            self.species = species;
        }
        if let Some(weight) = patch.weight {
            self.weight = weight;
        }
        if let Some(timestamp) = patch.timestamp {
            self.timestamp = timestamp;
        }
        if let Some(last_updated) = patch.last_updated {
            self.last_updated = last_updated;
        }
        if let Some(sync) = patch.sync {
            self.sync = sync;
        }
        if let Some(inventory_status) = patch.inventory_status {
            self.inventory_status = inventory_status;
        }
        if let Some(enrichment) = patch.enrichment {
            self.enrichment = enrichment;
        }
    }
}

/// Input for creating a catch
#[derive(Debug, Clone, PartialEq)]
pub struct NewCatch {
    pub species: String,
    pub weight: f64,
    /// Defaults to "now" when absent
    pub timestamp: Option<i64>,
    pub enrichment: Enrichment,
}

impl NewCatch {
    pub fn new(species: impl Into<String>, weight: f64) -> Self {
        Self {
            species: species.into(),
            weight,
            timestamp: None,
            enrichment: Enrichment::default(),
        }
    }

    #[must_use]
    pub const fn at(mut self, timestamp: i64) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    #[must_use]
    pub fn with_enrichment(mut self, enrichment: Enrichment) -> Self {
        self.enrichment = enrichment;
        self
    }
}

/// Partial update; `None` fields are left untouched
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CatchPatch {
    pub species: Option<String>,
    pub weight: Option<f64>,
    pub timestamp: Option<i64>,
    pub last_updated: Option<i64>,
    pub sync: Option<SyncState>,
    pub inventory_status: Option<InventoryStatus>,
    pub enrichment: Option<Enrichment>,
}

impl CatchPatch {
    #[must_use]
    pub fn species(mut self, species: impl Into<String>) -> Self {
        self.species = Some(species.into());
        self
    }

    #[must_use]
    pub const fn weight(mut self, weight: f64) -> Self {
        self.weight = Some(weight);
        self
    }

    #[must_use]
    pub const fn last_updated(mut self, last_updated: i64) -> Self {
        self.last_updated = Some(last_updated);
        self
    }

    #[must_use]
    pub fn sync(mut self, sync: SyncState) -> Self {
        self.sync = Some(sync);
        self
    }

    #[must_use]
    pub const fn inventory_status(mut self, status: InventoryStatus) -> Self {
        self.inventory_status = Some(status);
        self
    }

    #[must_use]
    pub fn enrichment(mut self, enrichment: Enrichment) -> Self {
        self.enrichment = Some(enrichment);
        self
    }

    /// Patch that replaces every versioned field with `snapshot`.
    pub fn adopt(snapshot: CatchSnapshot, sync: SyncState) -> Self {
        Self {
            species: Some(snapshot.species),
            weight: Some(snapshot.weight),
            timestamp: Some(snapshot.timestamp),
            last_updated: Some(snapshot.last_updated),
            sync: Some(sync),
            inventory_status: Some(snapshot.inventory_status),
            enrichment: Some(snapshot.enrichment),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(species) = &self.species {
            validate_species(species)?;
        }
        if let Some(weight) = self.weight {
            validate_weight(weight)?;
        }
        Ok(())
    }
}

pub fn validate_species(species: &str) -> Result<()> {
    if species.trim().is_empty() {
        return Err(Error::InvalidInput("species cannot be empty".into()));
    }
    Ok(())
}

pub fn validate_weight(weight: f64) -> Result<()> {
    if !weight.is_finite() || weight < 0.0 {
        return Err(Error::InvalidInput(format!(
            "weight must be a non-negative number of kilograms, got {weight}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn record() -> CatchRecord {
        CatchRecord {
            id: CatchId::new(7),
            species: "Mackerel".to_string(),
            weight: 3.2,
            timestamp: 1_000,
            last_updated: 1_000,
            sync: SyncState::Pending,
            inventory_status: InventoryStatus::Caught,
            enrichment: Enrichment::default(),
        }
    }

    #[test]
    fn catch_id_parses_with_or_without_hash() {
        assert_eq!("#12".parse::<CatchId>().unwrap(), CatchId::new(12));
        assert_eq!("12".parse::<CatchId>().unwrap(), CatchId::new(12));
        assert!("0".parse::<CatchId>().is_err());
        assert!("abc".parse::<CatchId>().is_err());
    }

    #[test]
    fn server_version_exists_only_in_conflict() {
        let mut record = record();
        assert!(record.server_version().is_none());

        let remote = CatchSnapshot {
            weight: 3.52,
            ..record.snapshot()
        };
        record.sync = SyncState::conflict(remote.clone());
        assert_eq!(record.sync_status(), SyncStatus::Conflict);
        assert_eq!(record.server_version(), Some(&remote));
    }

    #[test]
    fn apply_only_touches_set_fields() {
        let mut record = record();
        record.apply(CatchPatch::default().weight(4.0));
        assert_eq!(record.weight, 4.0);
        assert_eq!(record.species, "Mackerel");
        assert_eq!(record.sync, SyncState::Pending);
    }

    #[test]
    fn adopt_replaces_every_versioned_field() {
        let mut record = record();
        let remote = CatchSnapshot {
            species: "Atlantic Mackerel".to_string(),
            weight: 3.52,
            timestamp: 900,
            last_updated: 2_000,
            inventory_status: InventoryStatus::OnIce,
            enrichment: Enrichment {
                score: Some(85),
                ..Enrichment::default()
            },
        };

        record.apply(CatchPatch::adopt(remote.clone(), SyncState::Synced));
        assert_eq!(record.snapshot(), remote);
        assert_eq!(record.sync, SyncState::Synced);
    }

    #[test]
    fn record_serializes_sync_state_inline() {
        let mut record = record();
        record.sync = SyncState::conflict(record.snapshot());
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["status"], "conflict");
        assert_eq!(value["server_version"]["species"], "Mackerel");

        let back: CatchRecord = serde_json::from_value(value).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn validation_rejects_negative_and_nan_weight() {
        assert!(validate_weight(0.0).is_ok());
        assert!(validate_weight(-0.5).is_err());
        assert!(validate_weight(f64::NAN).is_err());
        assert!(validate_species("  ").is_err());
    }
}
