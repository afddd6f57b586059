use std::path::{Path, PathBuf};

use aqualedger_core::config::SyncSettings;
use aqualedger_core::db::{CatchFilter, StatusCounts};
use aqualedger_core::models::{
    CatchPatch, InventoryStatus, NewCatch, ParsingStatus, SyncState, SyncStatus,
};
use aqualedger_core::services::RecordStore;
use aqualedger_core::sync::{DivergenceReport, Resolution, SyncBadge, SyncReport};
use aqualedger_core::{CatchId, Error};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

use crate::cli::CompletionShell;
use crate::commands::add::run_add;
use crate::commands::common::{
    describe_differences, format_conflict_lines, format_divergence_report, format_relative_time,
    format_sync_report, format_timestamp, format_weight, load_settings, normalize_text,
};
use crate::commands::completions::{completion_target, run_completions};
use crate::commands::log::run_log;
use crate::commands::status::{format_status_lines, summarize};
use crate::commands::sync::{run_sync, run_sync_conflicts, run_sync_resolve};
use crate::commands::transition::{run_transition, transition_hint};
use crate::error::CliError;

struct TestDb {
    _dir: TempDir,
    path: PathBuf,
}

fn test_db() -> TestDb {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("catches.db");
    TestDb { _dir: dir, path }
}

async fn open(path: &Path) -> RecordStore {
    RecordStore::open(path).await.unwrap()
}

async fn only_record(path: &Path) -> aqualedger_core::CatchRecord {
    let store = open(path).await;
    let mut records = store.list(&CatchFilter::all()).await.unwrap();
    store.close().await.unwrap();
    assert_eq!(records.len(), 1);
    records.remove(0)
}

#[test]
fn normalize_text_joins_and_rejects_empty() {
    let parts = vec!["  20kg".to_string(), "Tuna ".to_string()];
    assert_eq!(normalize_text(&parts), Some("20kg Tuna".to_string()));
    assert_eq!(normalize_text(&[" ".to_string()]), None);
    assert_eq!(normalize_text(&[]), None);
}

#[test]
fn format_relative_time_units() {
    let now = 1_000_000_000;
    assert_eq!(format_relative_time(now - 30_000, now), "just now");
    assert_eq!(format_relative_time(now - 120_000, now), "2m ago");
    assert_eq!(format_relative_time(now - 2 * 60 * 60_000, now), "2h ago");
    assert_eq!(format_relative_time(now - 3 * 24 * 60 * 60_000, now), "3d ago");
}

#[test]
fn format_timestamp_returns_utc_label() {
    assert_eq!(format_timestamp(0), "1970-01-01 00:00:00 UTC");
}

#[test]
fn format_weight_uses_two_decimals() {
    assert_eq!(format_weight(3.2), "3.20 kg");
    assert_eq!(format_weight(0.0), "0.00 kg");
}

#[test]
fn sync_report_summaries() {
    assert_eq!(format_sync_report(&SyncReport::default()), "Nothing to sync");
    assert_eq!(
        format_sync_report(&SyncReport {
            synced: 2,
            errors: 0
        }),
        "Synced 2 catch(es)"
    );
    assert_eq!(
        format_sync_report(&SyncReport {
            synced: 1,
            errors: 3
        }),
        "Synced 1 catch(es), 3 failed (will retry)"
    );
}

#[test]
fn divergence_summary_mentions_only_nonzero_extras() {
    let report = DivergenceReport {
        checked: 5,
        flagged: 1,
        missing: 0,
        failed: 2,
    };
    assert_eq!(
        format_divergence_report(&report),
        "Checked 5 synced catch(es): 1 conflict(s) flagged, 2 could not be checked"
    );
}

#[test]
fn status_without_remote_is_offline_or_pending() {
    let idle = summarize(false, StatusCounts::default(), 0);
    assert_eq!(idle.badge, SyncBadge::Offline);
    assert!(format_status_lines(&idle).contains(&"Remote: not configured".to_string()));

    let counts = StatusCounts {
        pending: 2,
        synced: 1,
        error: 1,
        conflict: 1,
    };
    let pending = summarize(false, counts, 3);
    assert_eq!(pending.badge, SyncBadge::Pending(2));
    assert_eq!(pending.label, "Pending (2)");

    let lines = format_status_lines(&pending);
    assert_eq!(lines[0], "Sync: Pending (2)");
    assert!(lines.contains(&"Catches: 5 total, 1 synced, 2 pending, 1 error, 1 conflict".to_string()));
    assert!(lines.iter().any(|line| line.contains("sync conflicts")));
}

#[test]
fn status_with_remote_prefers_errors() {
    let counts = StatusCounts {
        pending: 2,
        synced: 0,
        error: 1,
        conflict: 0,
    };
    assert_eq!(summarize(true, counts, 0).badge, SyncBadge::Error(1));
}

#[test]
fn transition_hint_lists_reachable_stages() {
    assert_eq!(
        transition_hint(InventoryStatus::Caught),
        "from 'caught' a catch can move to: on_ice, sold"
    );
    assert!(transition_hint(InventoryStatus::Sold).contains("final"));
}

#[test]
fn load_settings_reads_file_values() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("settings.json");
    std::fs::write(&path, r#"{"upload_timeout_secs": 4, "detect_divergence": false}"#).unwrap();

    let settings = load_settings(Some(&path)).unwrap();
    assert_eq!(settings.upload_timeout_secs, 4);
    assert!(!settings.detect_divergence);
}

#[test]
fn load_settings_rejects_invalid_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("settings.json");
    std::fs::write(&path, r#"{"sync_interval_secs": 0}"#).unwrap();

    assert!(matches!(
        load_settings(Some(&path)),
        Err(CliError::Core(Error::Config(_)))
    ));
}

#[tokio::test(flavor = "current_thread")]
async fn run_add_stores_pending_catch_with_score() {
    let db = test_db();

    run_add("Mackerel", 3.2, &db.path).await.unwrap();

    let record = only_record(&db.path).await;
    assert_eq!(record.species, "Mackerel");
    assert_eq!(record.weight, 3.2);
    assert_eq!(record.sync_status(), SyncStatus::Pending);
    assert_eq!(record.inventory_status, InventoryStatus::Caught);
    assert_eq!(record.enrichment.score, Some(85));
}

#[tokio::test(flavor = "current_thread")]
async fn run_add_rejects_negative_weight() {
    let db = test_db();

    let error = run_add("Tuna", -1.0, &db.path).await.unwrap_err();
    assert!(matches!(error, CliError::Core(Error::InvalidInput(_))));
}

#[tokio::test(flavor = "current_thread")]
async fn run_log_parses_free_text() {
    let db = test_db();

    run_log(&["20kg".to_string(), "Tuna".to_string()], &db.path)
        .await
        .unwrap();

    let record = only_record(&db.path).await;
    assert_eq!(record.species, "Tuna");
    assert_eq!(record.weight, 20.0);
    assert_eq!(record.enrichment.parsing_status, Some(ParsingStatus::Clean));
}

#[tokio::test(flavor = "current_thread")]
async fn run_log_without_weight_saves_draft() {
    let db = test_db();

    run_log(&["Just a fish".to_string()], &db.path).await.unwrap();

    let record = only_record(&db.path).await;
    assert_eq!(record.weight, 0.0);
    assert_eq!(record.enrichment.parsing_status, Some(ParsingStatus::Draft));
}

#[tokio::test(flavor = "current_thread")]
async fn run_log_rejects_empty_text() {
    let db = test_db();

    let error = run_log(&["   ".to_string()], &db.path).await.unwrap_err();
    assert!(matches!(error, CliError::EmptyText));
}

#[tokio::test(flavor = "current_thread")]
async fn run_transition_enforces_lifecycle_unless_forced() {
    let db = test_db();
    run_add("Cod", 4.0, &db.path).await.unwrap();
    let id = only_record(&db.path).await.id;

    let error = run_transition(id, InventoryStatus::Listed, None, &db.path)
        .await
        .unwrap_err();
    assert!(matches!(
        error,
        CliError::Core(Error::IllegalTransition {
            from: InventoryStatus::Caught,
            to: InventoryStatus::Listed
        })
    ));
    assert_eq!(only_record(&db.path).await.inventory_status, InventoryStatus::Caught);

    run_transition(id, InventoryStatus::OnIce, None, &db.path)
        .await
        .unwrap();
    assert_eq!(only_record(&db.path).await.inventory_status, InventoryStatus::OnIce);

    run_transition(id, InventoryStatus::Caught, Some("mislabelled crate"), &db.path)
        .await
        .unwrap();
    let record = only_record(&db.path).await;
    assert_eq!(record.inventory_status, InventoryStatus::Caught);
    assert_eq!(record.sync_status(), SyncStatus::Pending);
}

#[tokio::test(flavor = "current_thread")]
async fn run_transition_reports_missing_catch() {
    let db = test_db();

    let error = run_transition(CatchId::new(42), InventoryStatus::OnIce, None, &db.path)
        .await
        .unwrap_err();
    assert!(matches!(error, CliError::Core(Error::NotFound(_))));
}

#[tokio::test(flavor = "current_thread")]
async fn run_sync_requires_remote_configuration() {
    let db = test_db();

    let error = run_sync(false, &SyncSettings::default(), &db.path)
        .await
        .unwrap_err();
    assert!(matches!(error, CliError::SyncNotConfigured));
}

#[tokio::test(flavor = "current_thread")]
async fn conflicts_are_listed_and_resolved_from_the_cli() {
    let db = test_db();
    let store = open(&db.path).await;
    let record = store.create(NewCatch::new("Snapper", 2.0)).await.unwrap();
    let mut server = record.snapshot();
    server.weight = 2.4;
    server.inventory_status = InventoryStatus::OnIce;
    store
        .update(record.id, CatchPatch::default().sync(SyncState::conflict(server)))
        .await
        .unwrap();

    let conflicted = store.require(record.id).await.unwrap();
    let remote = conflicted.server_version().unwrap().clone();
    assert_eq!(
        describe_differences(&conflicted, &remote),
        vec![
            "weight: 2.00 kg -> 2.40 kg".to_string(),
            "inventory: caught -> on_ice".to_string()
        ]
    );
    let pairs = aqualedger_core::sync::ConflictResolver::new(store.clone())
        .conflicts()
        .await
        .unwrap();
    let lines = format_conflict_lines(&pairs);
    assert_eq!(lines.len(), 1);
    assert!(lines[0].starts_with("#1"));
    assert!(lines[0].contains("Snapper"));
    store.close().await.unwrap();

    run_sync_conflicts(true, &db.path).await.unwrap();
    run_sync_resolve(record.id, Resolution::KeepRemote, &db.path)
        .await
        .unwrap();

    let resolved = only_record(&db.path).await;
    assert_eq!(resolved.sync_status(), SyncStatus::Synced);
    assert_eq!(resolved.weight, 2.4);
    assert_eq!(resolved.inventory_status, InventoryStatus::OnIce);
}

#[tokio::test(flavor = "current_thread")]
async fn run_sync_resolve_rejects_records_not_in_conflict() {
    let db = test_db();
    run_add("Hake", 1.5, &db.path).await.unwrap();
    let id = only_record(&db.path).await.id;

    let error = run_sync_resolve(id, Resolution::KeepLocal, &db.path)
        .await
        .unwrap_err();
    assert!(matches!(error, CliError::Core(Error::NotInConflict(_))));
}

#[test]
fn run_completions_writes_into_directory() {
    let dir = TempDir::new().unwrap();

    run_completions(CompletionShell::Bash, Some(dir.path())).unwrap();

    let target = completion_target(CompletionShell::Bash, dir.path());
    assert_eq!(target, dir.path().join("aqualedger.bash"));
    let script = std::fs::read_to_string(&target).unwrap();
    assert!(script.contains("_aqualedger()"));
    assert!(script.contains("complete -F _aqualedger"));
}

#[test]
fn completion_target_keeps_explicit_file_path() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("custom.zsh");

    assert_eq!(completion_target(CompletionShell::Zsh, &file), file);
    assert_eq!(
        completion_target(CompletionShell::Zsh, dir.path()),
        dir.path().join("_aqualedger")
    );
}
