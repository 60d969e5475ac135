//! The sync engine: timer-driven polling of all active locations.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use parking_lot::Mutex;
use tokio::sync::Notify;
use tracing::{error, info, warn};

use skycast_provider::WeatherClient;
use skycast_store::{Location, LocationStore, SnapshotStore, StoredSnapshot};

use crate::error::SyncError;
use crate::stats::{StatsInner, SyncStatsSnapshot};

/// Periodic synchronization engine.
///
/// Constructed once at process start and shared by handle; holds its own
/// state instead of living in a global. `start`/`stop` are idempotent and
/// expected to be driven from the process lifecycle path.
pub struct SyncEngine {
    client: Arc<WeatherClient>,
    locations: LocationStore,
    snapshots: SnapshotStore,
    stats: Mutex<StatsInner>,
    running: AtomicBool,
    interval_minutes: Mutex<Option<u64>>,
    /// Shutdown handle for the armed timer task; `Some` while armed.
    /// Stopping signals the task instead of aborting it, so an
    /// in-flight cycle finishes and its tallies land.
    timer: Mutex<Option<Arc<Notify>>>,
    /// Re-entrancy guard: a tick that fires while the previous cycle is
    /// still running is skipped instead of overlapping it.
    cycle_in_progress: AtomicBool,
}

impl SyncEngine {
    pub fn new(
        client: Arc<WeatherClient>,
        locations: LocationStore,
        snapshots: SnapshotStore,
    ) -> Self {
        Self {
            client,
            locations,
            snapshots,
            stats: Mutex::new(StatsInner::default()),
            running: AtomicBool::new(false),
            interval_minutes: Mutex::new(None),
            timer: Mutex::new(None),
            cycle_in_progress: AtomicBool::new(false),
        }
    }

    /// Arm the repeating timer. Runs one cycle immediately, then every
    /// `interval_minutes`. A second call while running is a no-op.
    pub fn start(self: &Arc<Self>, interval_minutes: u64) {
        let mut timer = self.timer.lock();
        if timer.is_some() {
            info!("Sync engine is already running");
            return;
        }

        info!(
            "Starting sync engine with interval: {} minutes",
            interval_minutes
        );
        *self.interval_minutes.lock() = Some(interval_minutes);
        self.running.store(true, Ordering::SeqCst);

        let engine = Arc::clone(self);
        let period = Duration::from_secs(interval_minutes.max(1) * 60);
        let shutdown = Arc::new(Notify::new());
        let stop_signal = Arc::clone(&shutdown);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                tokio::select! {
                    biased;
                    // notify_one leaves a permit, so a stop that lands
                    // mid-cycle is picked up on the next iteration.
                    _ = stop_signal.notified() => break,
                    // The first tick completes immediately.
                    _ = ticker.tick() => {
                        engine.run_sync().await;
                        if let Err(e) = engine.snapshots.purge_expired() {
                            warn!("Snapshot retention sweep failed: {}", e);
                        }
                    }
                }
            }
        });
        *timer = Some(shutdown);
    }

    /// Disarm the timer. Idempotent; a cycle already in flight runs to
    /// completion.
    pub fn stop(&self) {
        let mut timer = self.timer.lock();
        if let Some(shutdown) = timer.take() {
            shutdown.notify_one();
        }
        *self.interval_minutes.lock() = None;
        self.running.store(false, Ordering::SeqCst);
        info!("Sync engine stopped");
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// One sync cycle over all active locations.
    ///
    /// Locations are processed strictly sequentially: the upstream API
    /// rate-limits aggressively, and serial fetches are the deliberate
    /// backpressure. A failure for one location is logged and tallied
    /// without aborting the rest of the cycle.
    pub async fn run_sync(&self) {
        if self
            .cycle_in_progress
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            warn!("Previous sync cycle still running; skipping this tick");
            return;
        }

        info!("Starting weather data sync");
        let started = Instant::now();
        self.stats.lock().total_syncs += 1;

        match self.locations.find_active() {
            Ok(active) => {
                info!("Found {} active location(s) to sync", active.len());

                let mut outcomes: Vec<(Location, Result<StoredSnapshot, SyncError>)> =
                    Vec::with_capacity(active.len());
                for location in active {
                    let outcome = self.fetch_and_save(&location).await;
                    if let Err(e) = &outcome {
                        warn!("Failed to sync location {}: {}", location.name, e);
                    }
                    outcomes.push((location, outcome));
                }

                let (succeeded, failed) =
                    outcomes.iter().fold((0u64, 0u64), |(ok, bad), (_, result)| {
                        if result.is_ok() {
                            (ok + 1, bad)
                        } else {
                            (ok, bad + 1)
                        }
                    });

                {
                    let mut stats = self.stats.lock();
                    stats.successful_syncs += succeeded;
                    stats.failed_syncs += failed;
                    stats.last_sync_time = Some(Utc::now());
                }

                info!(
                    "Sync completed in {} ms. Success: {}, Failed: {}",
                    started.elapsed().as_millis(),
                    succeeded,
                    failed
                );
            }
            Err(e) => {
                // Listing failed: the whole cycle counts as one failure
                // and no per-location work happens.
                error!("Sync run failed: {}", e);
                self.stats.lock().failed_syncs += 1;
            }
        }

        self.cycle_in_progress.store(false, Ordering::SeqCst);
    }

    /// On-demand refresh of exactly one location, independent of the
    /// timer. Does not count toward `totalSyncs`; errors surface to the
    /// caller instead of being downgraded to counters.
    pub async fn sync_single_location(&self, id: i64) -> Result<StoredSnapshot, SyncError> {
        let location = self
            .locations
            .find_by_id(id)?
            .ok_or(SyncError::LocationNotFound(id))?;
        self.fetch_and_save(&location).await
    }

    async fn fetch_and_save(&self, location: &Location) -> Result<StoredSnapshot, SyncError> {
        let weather = self
            .client
            .fetch_current_by_coords(location.latitude, location.longitude)
            .await?;
        Ok(self.snapshots.save(location.id, &weather)?)
    }

    /// Consistent read of the aggregate statistics.
    pub fn stats(&self) -> SyncStatsSnapshot {
        let inner = self.stats.lock();
        SyncStatsSnapshot {
            total_syncs: inner.total_syncs,
            successful_syncs: inner.successful_syncs,
            failed_syncs: inner.failed_syncs,
            last_sync_time: inner.last_sync_time,
            is_running: self.is_running(),
            interval_minutes: *self.interval_minutes.lock(),
        }
    }
}
