use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use aqualedger_core::config::SyncSettings;
use aqualedger_core::models::{CatchRecord, CatchSnapshot, SyncOperation};
use aqualedger_core::services::RecordStore;
use aqualedger_core::sync::{
    weights_differ, ConflictPair, DivergenceReport, HttpRemote, SyncReport,
};
use serde::Serialize;

use crate::error::CliError;

pub const ENV_DB_PATH: &str = "AQUALEDGER_DB_PATH";
pub const ENV_CONFIG_PATH: &str = "AQUALEDGER_CONFIG";

#[derive(Debug, Serialize)]
pub struct CatchListItem {
    pub id: i64,
    pub species: String,
    pub weight_kg: f64,
    pub inventory_status: String,
    pub inventory_label: String,
    pub sync_status: String,
    pub timestamp: i64,
    pub last_updated: i64,
    pub relative_time: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parsing_status: Option<String>,
}

pub fn resolve_db_path(cli_db_path: Option<PathBuf>) -> Result<PathBuf, CliError> {
    match cli_db_path.or_else(|| env::var_os(ENV_DB_PATH).map(PathBuf::from)) {
        Some(path) => Ok(path),
        None => default_db_path(),
    }
}

pub fn default_db_path() -> Result<PathBuf, CliError> {
    dirs::data_dir()
        .map(|dir| dir.join("aqualedger").join("aqualedger.db"))
        .ok_or_else(|| CliError::Config("failed to resolve CLI data directory".into()))
}

/// Settings file location; `None` when no location can be determined.
pub fn resolve_config_path(cli_config: Option<PathBuf>) -> Option<PathBuf> {
    cli_config
        .or_else(|| env::var_os(ENV_CONFIG_PATH).map(PathBuf::from))
        .or_else(|| dirs::config_dir().map(|dir| dir.join("aqualedger").join("settings.json")))
}

pub fn load_settings(config_path: Option<&Path>) -> Result<SyncSettings, CliError> {
    let settings = match config_path {
        Some(path) => SyncSettings::load(path)?,
        None => SyncSettings::default(),
    };
    Ok(settings.with_env_overrides()?)
}

pub async fn open_store(path: &Path) -> Result<RecordStore, CliError> {
    Ok(RecordStore::open(path).await?)
}

pub fn build_remote(settings: &SyncSettings) -> Result<Arc<HttpRemote>, CliError> {
    let Some(url) = settings.remote_url.clone() else {
        return Err(CliError::SyncNotConfigured);
    };
    let remote = HttpRemote::new(url, settings.remote_token.clone())?;
    tracing::debug!("Using remote catalog at {}", remote.base_url());
    Ok(Arc::new(remote))
}

pub fn normalize_text(parts: &[String]) -> Option<String> {
    let joined = parts.join(" ");
    let trimmed = joined.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

pub fn catch_to_list_item(record: &CatchRecord, now_ms: i64) -> CatchListItem {
    CatchListItem {
        id: record.id.get(),
        species: record.species.clone(),
        weight_kg: record.weight,
        inventory_status: record.inventory_status.to_string(),
        inventory_label: record.inventory_status.label().to_string(),
        sync_status: record.sync_status().to_string(),
        timestamp: record.timestamp,
        last_updated: record.last_updated,
        relative_time: format_relative_time(record.timestamp, now_ms),
        score: record.enrichment.score,
        parsing_status: record
            .enrichment
            .parsing_status
            .map(|status| status.as_str().to_string()),
    }
}

pub fn format_catch_lines(records: &[CatchRecord], now_ms: i64) -> Vec<String> {
    records
        .iter()
        .map(|record| {
            let id = record.id.to_string();
            let species = truncate(&record.species, 24);
            let weight = format_weight(record.weight);
            let relative_time = format_relative_time(record.timestamp, now_ms);
            format!(
                "{id:<6}  {species:<24}  {weight:>10}  {:<7}  {:<8}  {relative_time}",
                record.inventory_status.as_str(),
                record.sync_status().as_str(),
            )
        })
        .collect()
}

pub fn format_catch_detail(record: &CatchRecord) -> Vec<String> {
    let mut lines = vec![
        format!("Catch {}", record.id),
        format!("  Species:    {}", record.species),
        format!("  Weight:     {}", format_weight(record.weight)),
        format!(
            "  Inventory:  {} ({})",
            record.inventory_status.label(),
            record.inventory_status
        ),
        format!("  Sync:       {}", record.sync_status()),
        format!("  Caught:     {}", format_timestamp(record.timestamp)),
        format!("  Updated:    {}", format_timestamp(record.last_updated)),
    ];

    let enrichment = &record.enrichment;
    if let Some(status) = enrichment.parsing_status {
        lines.push(format!("  Parsing:    {}", status.as_str()));
    }
    if let Some(score) = enrichment.score {
        lines.push(format!("  Score:      {score}/100"));
    }
    if let Some(rationale) = &enrichment.rationale {
        lines.push(format!("  Rationale:  {rationale}"));
    }
    if enrichment.compliance_warning == Some(true) {
        let details = enrichment
            .compliance_details
            .as_deref()
            .unwrap_or("possible regulatory concern");
        lines.push(format!("  Warning:    {details}"));
    }
    if let Some(server) = record.server_version() {
        lines.push("  Server version:".to_string());
        lines.extend(
            describe_differences(record, server)
                .into_iter()
                .map(|line| format!("    {line}")),
        );
    }
    lines
}

/// Fields where the server version differs, as `field: local -> remote`.
pub fn describe_differences(local: &CatchRecord, remote: &CatchSnapshot) -> Vec<String> {
    let mut differences = Vec::new();
    if local.species != remote.species {
        differences.push(format!("species: {} -> {}", local.species, remote.species));
    }
    if weights_differ(local.weight, remote.weight) {
        differences.push(format!(
            "weight: {} -> {}",
            format_weight(local.weight),
            format_weight(remote.weight)
        ));
    }
    if local.timestamp != remote.timestamp {
        differences.push(format!(
            "caught: {} -> {}",
            format_timestamp(local.timestamp),
            format_timestamp(remote.timestamp)
        ));
    }
    if local.inventory_status != remote.inventory_status {
        differences.push(format!(
            "inventory: {} -> {}",
            local.inventory_status, remote.inventory_status
        ));
    }
    if differences.is_empty() {
        differences.push("no differences in tracked fields".to_string());
    }
    differences
}

pub fn format_conflict_lines(conflicts: &[ConflictPair]) -> Vec<String> {
    conflicts
        .iter()
        .map(|pair| {
            format!(
                "{:<6}  {:<24}  {}",
                pair.local.id.to_string(),
                truncate(&pair.local.species, 24),
                describe_differences(&pair.local, &pair.remote).join("; ")
            )
        })
        .collect()
}

pub fn format_queue_lines(operations: &[SyncOperation]) -> Vec<String> {
    operations
        .iter()
        .map(|operation| {
            format!(
                "{}  {:<6}  {:<10}  catch={}  attempts={}",
                format_timestamp(operation.timestamp),
                operation.kind.as_str(),
                operation.status.as_str(),
                operation.catch_id,
                operation.attempts
            )
        })
        .collect()
}

pub fn format_sync_report(report: &SyncReport) -> String {
    if report.is_empty() {
        "Nothing to sync".to_string()
    } else if report.errors == 0 {
        format!("Synced {} catch(es)", report.synced)
    } else {
        format!(
            "Synced {} catch(es), {} failed (will retry)",
            report.synced, report.errors
        )
    }
}

pub fn format_divergence_report(report: &DivergenceReport) -> String {
    let mut summary = format!(
        "Checked {} synced catch(es): {} conflict(s) flagged",
        report.checked, report.flagged
    );
    if report.missing > 0 {
        summary.push_str(&format!(", {} missing on remote", report.missing));
    }
    if report.failed > 0 {
        summary.push_str(&format!(", {} could not be checked", report.failed));
    }
    summary
}

pub fn format_weight(kg: f64) -> String {
    format!("{kg:.2} kg")
}

pub fn format_timestamp(timestamp_ms: i64) -> String {
    chrono::DateTime::from_timestamp_millis(timestamp_ms).map_or_else(
        || timestamp_ms.to_string(),
        |date_time| date_time.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    )
}

pub fn format_relative_time(timestamp_ms: i64, now_ms: i64) -> String {
    let diff = now_ms.saturating_sub(timestamp_ms);
    let minute = 60_000;
    let hour = 60 * minute;
    let day = 24 * hour;
    let week = 7 * day;

    if diff < minute {
        "just now".to_string()
    } else if diff < hour {
        format!("{}m ago", diff / minute)
    } else if diff < day {
        format!("{}h ago", diff / hour)
    } else if diff < week {
        format!("{}d ago", diff / day)
    } else {
        format!("{}w ago", diff / week)
    }
}

fn truncate(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        value.to_string()
    } else {
        let mut truncated = value
            .chars()
            .take(max_chars.saturating_sub(3))
            .collect::<String>();
        truncated.push_str("...");
        truncated
    }
}
