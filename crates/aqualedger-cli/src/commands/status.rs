use std::path::Path;

use aqualedger_core::config::SyncSettings;
use aqualedger_core::db::StatusCounts;
use aqualedger_core::models::OperationStatus;
use aqualedger_core::sync::{overall_status, SyncBadge};
use serde::Serialize;

use crate::commands::common::open_store;
use crate::error::CliError;

#[derive(Debug, Serialize)]
pub struct StatusSummary {
    pub badge: SyncBadge,
    pub label: String,
    pub remote_configured: bool,
    pub counts: StatusCounts,
    pub queued_operations: usize,
}

pub async fn run_status(
    as_json: bool,
    settings: &SyncSettings,
    db_path: &Path,
) -> Result<(), CliError> {
    let store = open_store(db_path).await?;
    let counts = store.count_by_status().await?;
    let queued_operations = store.operation_count(OperationStatus::Pending).await?
        + store.operation_count(OperationStatus::Failed).await?;
    store.close().await?;

    let summary = summarize(settings.has_remote(), counts, queued_operations);
    if as_json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        for line in format_status_lines(&summary) {
            println!("{line}");
        }
    }
    Ok(())
}

/// A CLI invocation is never mid-sync, and without a remote it is offline.
pub fn summarize(
    remote_configured: bool,
    counts: StatusCounts,
    queued_operations: usize,
) -> StatusSummary {
    let badge = overall_status(remote_configured, false, &counts);
    StatusSummary {
        badge,
        label: badge.to_string(),
        remote_configured,
        counts,
        queued_operations,
    }
}

pub fn format_status_lines(summary: &StatusSummary) -> Vec<String> {
    let mut lines = vec![format!("Sync: {}", summary.label)];
    if !summary.remote_configured {
        lines.push("Remote: not configured".to_string());
    }
    let counts = &summary.counts;
    lines.push(format!(
        "Catches: {} total, {} synced, {} pending, {} error, {} conflict",
        counts.total(),
        counts.synced,
        counts.pending,
        counts.error,
        counts.conflict
    ));
    lines.push(format!("Queued operations: {}", summary.queued_operations));
    if counts.conflict > 0 {
        lines.push("Run `aqualedger sync conflicts` to review conflicts.".to_string());
    }
    lines
}
