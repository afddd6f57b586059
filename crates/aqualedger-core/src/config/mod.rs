//! Sync configuration.
//!
//! Settings come from an optional JSON file and are then overridden by
//! `AQUALEDGER_*` environment variables. Remote credentials may be set but are
//! never printed.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::util::{is_http_url, normalize_text_option};
use crate::{Error, Result};

pub const ENV_REMOTE_URL: &str = "AQUALEDGER_REMOTE_URL";
pub const ENV_REMOTE_TOKEN: &str = "AQUALEDGER_REMOTE_TOKEN";
pub const ENV_SYNC_INTERVAL_SECS: &str = "AQUALEDGER_SYNC_INTERVAL_SECS";

const DEFAULT_SYNC_INTERVAL_SECS: u64 = 30;
const DEFAULT_UPLOAD_TIMEOUT_SECS: u64 = 10;

#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields, default)]
pub struct SyncSettings {
    /// Period of background sync runs while online
    pub sync_interval_secs: u64,
    /// Deadline for a single upload or pull
    pub upload_timeout_secs: u64,
    /// Scan synced records for remote drift after each periodic run
    pub detect_divergence: bool,
    pub remote_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_token: Option<String>,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            sync_interval_secs: DEFAULT_SYNC_INTERVAL_SECS,
            upload_timeout_secs: DEFAULT_UPLOAD_TIMEOUT_SECS,
            detect_divergence: true,
            remote_url: None,
            remote_token: None,
        }
    }
}

impl std::fmt::Debug for SyncSettings {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("SyncSettings")
            .field("sync_interval_secs", &self.sync_interval_secs)
            .field("upload_timeout_secs", &self.upload_timeout_secs)
            .field("detect_divergence", &self.detect_divergence)
            .field("remote_url", &self.remote_url)
            .field("remote_token", &self.remote_token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl SyncSettings {
    /// Parse settings from JSON; missing fields take their defaults.
    pub fn from_json(payload: &str) -> Result<Self> {
        let settings: Self = serde_json::from_str(payload)
            .map_err(|error| Error::Config(format!("invalid settings JSON: {error}")))?;
        settings.validate()
    }

    /// Load settings from `path`, falling back to defaults when it does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(payload) => {
                tracing::debug!("Loaded sync settings from {}", path.display());
                Self::from_json(&payload)
            }
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No settings file at {}, using defaults", path.display());
                Ok(Self::default())
            }
            Err(error) => Err(error.into()),
        }
    }

    /// Apply `AQUALEDGER_*` overrides from the process environment.
    pub fn with_env_overrides(self) -> Result<Self> {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides using `lookup` in place of the process environment.
    pub fn with_overrides_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(url) = normalize_text_option(lookup(ENV_REMOTE_URL)) {
            self.remote_url = Some(url);
        }
        if let Some(token) = normalize_text_option(lookup(ENV_REMOTE_TOKEN)) {
            self.remote_token = Some(token);
        }
        if let Some(raw) = normalize_text_option(lookup(ENV_SYNC_INTERVAL_SECS)) {
            self.sync_interval_secs = raw.parse().map_err(|_| {
                Error::Config(format!(
                    "{ENV_SYNC_INTERVAL_SECS} must be a whole number of seconds, got '{raw}'"
                ))
            })?;
        }
        self.validate()
    }

    fn validate(mut self) -> Result<Self> {
        if self.sync_interval_secs == 0 {
            return Err(Error::Config("sync_interval_secs must be positive".into()));
        }
        if self.upload_timeout_secs == 0 {
            return Err(Error::Config("upload_timeout_secs must be positive".into()));
        }

        self.remote_url = normalize_text_option(self.remote_url.take());
        self.remote_token = normalize_text_option(self.remote_token.take());
        if let Some(url) = &self.remote_url {
            if !is_http_url(url) {
                return Err(Error::Config(
                    "remote_url must include http:// or https://".into(),
                ));
            }
        }
        Ok(self)
    }

    pub const fn sync_interval(&self) -> Duration {
        Duration::from_secs(self.sync_interval_secs)
    }

    pub const fn upload_timeout(&self) -> Duration {
        Duration::from_secs(self.upload_timeout_secs)
    }

    pub const fn has_remote(&self) -> bool {
        self.remote_url.is_some()
    }
}
