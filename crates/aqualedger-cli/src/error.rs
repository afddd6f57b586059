use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] aqualedger_core::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("No catch text provided")]
    EmptyText,
    #[error("Configuration error: {0}")]
    Config(String),
    #[error(
        "Sync is not configured. Set AQUALEDGER_REMOTE_URL or add remote_url to the settings file to enable `aqualedger sync`."
    )]
    SyncNotConfigured,
}
