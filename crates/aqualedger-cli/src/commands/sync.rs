use std::path::Path;
use std::sync::Arc;

use aqualedger_core::config::SyncSettings;
use aqualedger_core::models::CatchId;
use aqualedger_core::services::RecordStore;
use aqualedger_core::sync::{
    Connectivity, ConflictResolver, DivergenceDetector, HttpRemote, Resolution, SyncEngine,
    SyncScheduler,
};
use tokio::sync::watch;

use crate::commands::common::{
    build_remote, format_conflict_lines, format_divergence_report, format_sync_report,
    format_timestamp, open_store,
};
use crate::error::CliError;

pub async fn run_sync(
    watch_mode: bool,
    settings: &SyncSettings,
    db_path: &Path,
) -> Result<(), CliError> {
    let remote = build_remote(settings)?;
    let store = open_store(db_path).await?;
    let engine = SyncEngine::new(store.clone(), Arc::clone(&remote))
        .with_upload_timeout(settings.upload_timeout());

    let report = engine.process_queue().await?;
    println!("{}", format_sync_report(&report));

    if watch_mode {
        let detector = detector(&store, remote, settings);
        watch_until_interrupted(engine, detector, settings).await?;
    }

    store.close().await?;
    Ok(())
}

async fn watch_until_interrupted(
    engine: SyncEngine<HttpRemote>,
    detector: DivergenceDetector<HttpRemote>,
    settings: &SyncSettings,
) -> Result<(), CliError> {
    // No platform reachability signal here; the interval keeps retrying.
    let (_connectivity, connectivity_rx) = watch::channel(Connectivity::Online);
    let handle = SyncScheduler::start(engine, Some(detector), settings, connectivity_rx);
    let mut updates = handle.subscribe();
    let mut seen_runs = 0;

    println!(
        "Watching for changes every {}s, press Ctrl-C to stop",
        settings.sync_interval_secs
    );

    loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                signal?;
                break;
            }
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = updates.borrow_and_update().clone();
                if state.runs == seen_runs {
                    continue;
                }
                seen_runs = state.runs;

                let at = state.last_run_at.map(format_timestamp).unwrap_or_default();
                if let Some(report) = &state.last_report {
                    println!("[{at}] {}", format_sync_report(report));
                }
                if let Some(divergence) = &state.last_divergence {
                    if divergence.flagged > 0 {
                        println!("[{at}] {}", format_divergence_report(divergence));
                    }
                }
            }
        }
    }

    handle.shutdown().await;
    Ok(())
}

pub async fn run_sync_detect(settings: &SyncSettings, db_path: &Path) -> Result<(), CliError> {
    let remote = build_remote(settings)?;
    let store = open_store(db_path).await?;

    let report = detector(&store, remote, settings).scan().await?;
    println!("{}", format_divergence_report(&report));

    store.close().await?;
    Ok(())
}

pub async fn run_sync_conflicts(as_json: bool, db_path: &Path) -> Result<(), CliError> {
    let store = open_store(db_path).await?;
    let conflicts = ConflictResolver::new(store.clone()).conflicts().await?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&conflicts)?);
    } else if conflicts.is_empty() {
        println!("No sync conflicts.");
    } else {
        for line in format_conflict_lines(&conflicts) {
            println!("{line}");
        }
    }

    store.close().await?;
    Ok(())
}

pub async fn run_sync_resolve(
    id: CatchId,
    keep: Resolution,
    db_path: &Path,
) -> Result<(), CliError> {
    let store = open_store(db_path).await?;
    let record = ConflictResolver::new(store.clone()).resolve(id, keep).await?;

    match keep {
        Resolution::KeepLocal => {
            println!("Kept local version of {}; queued for upload", record.id);
        }
        Resolution::KeepRemote => {
            println!("Adopted remote version of {}", record.id);
        }
    }

    store.close().await?;
    Ok(())
}

fn detector(
    store: &RecordStore,
    remote: Arc<HttpRemote>,
    settings: &SyncSettings,
) -> DivergenceDetector<HttpRemote> {
    DivergenceDetector::new(store.clone(), remote).with_pull_timeout(settings.upload_timeout())
}
