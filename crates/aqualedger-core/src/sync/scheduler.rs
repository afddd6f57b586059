//! Background sync loop driven by connectivity changes and a fixed interval.

use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use super::divergence::{DivergenceDetector, DivergenceReport};
use super::engine::{SyncEngine, SyncReport};
use super::remote::RemoteCatalog;
use crate::config::SyncSettings;

/// Network reachability as reported by the host platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Connectivity {
    Online,
    Offline,
}

impl Connectivity {
    pub const fn is_online(self) -> bool {
        matches!(self, Self::Online)
    }
}

/// Observable scheduler state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SchedulerState {
    pub is_online: bool,
    pub is_syncing: bool,
    pub last_report: Option<SyncReport>,
    pub last_divergence: Option<DivergenceReport>,
    /// Completion time of the last run (Unix ms, store clock)
    pub last_run_at: Option<i64>,
    /// Number of completed runs
    pub runs: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Trigger {
    Reconnected,
    Interval,
}

pub struct SyncScheduler<R> {
    engine: SyncEngine<R>,
    detector: Option<DivergenceDetector<R>>,
    state: watch::Sender<SchedulerState>,
}

/// Handle to a running scheduler; dropping it also stops the loop.
pub struct SchedulerHandle {
    state: watch::Receiver<SchedulerState>,
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    pub fn state(&self) -> SchedulerState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SchedulerState> {
        self.state.clone()
    }

    /// Stop scheduling; a run already in progress completes first.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        if let Err(error) = self.task.await {
            tracing::error!("Sync scheduler task failed: {error}");
        }
    }
}

impl<R: RemoteCatalog + 'static> SyncScheduler<R> {
    pub fn start(
        engine: SyncEngine<R>,
        detector: Option<DivergenceDetector<R>>,
        settings: &SyncSettings,
        connectivity: watch::Receiver<Connectivity>,
    ) -> SchedulerHandle {
        let interval = settings.sync_interval();
        let detector = detector.filter(|_| settings.detect_divergence);
        let (state, state_rx) = watch::channel(SchedulerState::default());
        let (shutdown, shutdown_rx) = watch::channel(false);

        let scheduler = Self {
            engine,
            detector,
            state,
        };
        let task = tokio::spawn(scheduler.run_loop(interval, connectivity, shutdown_rx));

        tracing::info!("Sync scheduler started, interval {}s", interval.as_secs());
        SchedulerHandle {
            state: state_rx,
            shutdown,
            task,
        }
    }

    async fn run_loop(
        self,
        interval: std::time::Duration,
        mut connectivity: watch::Receiver<Connectivity>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        let mut ticker = time::interval_at(Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut online = connectivity.borrow_and_update().is_online();
        let mut connectivity_open = true;
        self.state.send_modify(|state| state.is_online = online);

        loop {
            tokio::select! {
                biased;
                _ = shutdown.changed() => break,
                changed = connectivity.changed(), if connectivity_open => {
                    if changed.is_err() {
                        tracing::debug!("Connectivity source closed, keeping last known state");
                        connectivity_open = false;
                        continue;
                    }
                    let now_online = connectivity.borrow_and_update().is_online();
                    let reconnected = now_online && !online;
                    online = now_online;
                    self.state.send_modify(|state| state.is_online = online);

                    if reconnected {
                        tracing::info!("Back online, syncing now");
                        self.run_once(Trigger::Reconnected).await;
                        // Next interval run counts from the reconnect run
                        ticker.reset();
                    }
                }
                _ = ticker.tick() => {
                    if online {
                        self.run_once(Trigger::Interval).await;
                    }
                }
            }
        }

        tracing::info!("Sync scheduler stopped");
    }

    async fn run_once(&self, trigger: Trigger) {
        self.state.send_modify(|state| state.is_syncing = true);

        let report = match self.engine.process_queue().await {
            Ok(report) => Some(report),
            Err(error) => {
                tracing::error!("Sync run ({trigger:?}) failed: {error}");
                None
            }
        };

        let divergence = match (&self.detector, report, trigger) {
            (Some(detector), Some(_), Trigger::Interval) => match detector.scan().await {
                Ok(divergence) => Some(divergence),
                Err(error) => {
                    tracing::error!("Divergence scan failed: {error}");
                    None
                }
            },
            _ => None,
        };

        let finished_at = self.engine.store().now();
        self.state.send_modify(|state| {
            state.is_syncing = false;
            state.runs += 1;
            state.last_run_at = Some(finished_at);
            if report.is_some() {
                state.last_report = report;
            }
            if divergence.is_some() {
                state.last_divergence = divergence;
            }
        });
    }
}
