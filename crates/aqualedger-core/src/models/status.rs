//! Status enums shared by catch records and the sync queue

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Whether a record's local state is known to be reflected at the remote.
///
/// This is the field-less discriminant of [`super::SyncState`]; it is what the
/// store indexes and filters on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    Pending,
    Synced,
    Error,
    Conflict,
}

impl SyncStatus {
    pub const ALL: [Self; 4] = [Self::Pending, Self::Synced, Self::Error, Self::Conflict];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Synced => "synced",
            Self::Error => "error",
            Self::Conflict => "conflict",
        }
    }

    /// Statuses the sync engine picks up on each run.
    pub const fn is_upload_eligible(self) -> bool {
        matches!(self, Self::Pending | Self::Error)
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyncStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "synced" => Ok(Self::Synced),
            "error" => Ok(Self::Error),
            "conflict" => Ok(Self::Conflict),
            other => Err(Error::InvalidInput(format!("unknown sync status '{other}'"))),
        }
    }
}

/// Physical/commercial stage of a catch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum InventoryStatus {
    #[default]
    Caught,
    OnIce,
    Listed,
    Sold,
}

impl InventoryStatus {
    pub const ALL: [Self; 4] = [Self::Caught, Self::OnIce, Self::Listed, Self::Sold];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Caught => "caught",
            Self::OnIce => "on_ice",
            Self::Listed => "listed",
            Self::Sold => "sold",
        }
    }

    /// Human readable label for listings.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Caught => "Fresh Catch",
            Self::OnIce => "On Ice / Storage",
            Self::Listed => "Listed for Sale",
            Self::Sold => "Sold",
        }
    }
}

impl fmt::Display for InventoryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InventoryStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "caught" => Ok(Self::Caught),
            "on_ice" => Ok(Self::OnIce),
            "listed" => Ok(Self::Listed),
            "sold" => Ok(Self::Sold),
            other => Err(Error::InvalidInput(format!(
                "unknown inventory status '{other}'"
            ))),
        }
    }
}

/// How the species/weight fields were obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParsingStatus {
    /// Fully parsed, no follow-up needed
    Clean,
    /// Incomplete, user should review
    Draft,
    /// Waiting on the analysis collaborator
    AiPending,
}

impl ParsingStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Clean => "clean",
            Self::Draft => "draft",
            Self::AiPending => "ai_pending",
        }
    }
}

impl FromStr for ParsingStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "clean" => Ok(Self::Clean),
            "draft" => Ok(Self::Draft),
            "ai_pending" => Ok(Self::AiPending),
            other => Err(Error::InvalidInput(format!(
                "unknown parsing status '{other}'"
            ))),
        }
    }
}
