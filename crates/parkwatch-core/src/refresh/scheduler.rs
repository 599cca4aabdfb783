use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::fetcher::DataFetcher;
use crate::models::{AppConfig, ParkingLocation};

use super::{RefreshListener, RefreshState};

/// Shortest interval the timer will arm with. Shorter requests are raised
/// to this so a zero or tiny interval cannot spin the fetch loop.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(500);

fn clamp_interval(interval: Duration) -> Duration {
    if interval < MIN_POLL_INTERVAL {
        warn!(
            requested_ms = interval.as_millis() as u64,
            min_ms = MIN_POLL_INTERVAL.as_millis() as u64,
            "Refresh interval below minimum, clamping"
        );
        MIN_POLL_INTERVAL
    } else {
        interval
    }
}

/// Drives the fetcher on a fixed cadence.
///
/// The composing application owns the lifecycle: `start` once, `stop` when
/// done. Dropping the scheduler disarms its timer.
pub struct RefreshScheduler {
    shared: Arc<Shared>,
}

struct Shared {
    fetcher: Arc<DataFetcher>,
    inner: Mutex<Inner>,
}

struct Inner {
    state: RefreshState,
    interval: Duration,
    running: bool,
    listener: Option<Arc<dyn RefreshListener>>,
    timer: Option<JoinHandle<()>>,
    /// Bumped on every arm/disarm so a superseded timer never fires.
    timer_generation: u64,
    next_deadline: Option<Instant>,
    last_success: Option<Instant>,
}

impl Inner {
    fn disarm(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
        self.timer_generation += 1;
        self.next_deadline = None;
    }

    fn snapshot(&self) -> (Option<Arc<dyn RefreshListener>>, RefreshState) {
        (self.listener.clone(), self.state.clone())
    }
}

fn publish_state(listener: Option<Arc<dyn RefreshListener>>, state: &RefreshState) {
    if let Some(listener) = listener {
        listener.on_state_change(state);
    }
}

impl RefreshScheduler {
    pub fn new(fetcher: Arc<DataFetcher>, interval: Duration) -> Self {
        Self {
            shared: Arc::new(Shared {
                fetcher,
                inner: Mutex::new(Inner {
                    state: RefreshState::default(),
                    interval: clamp_interval(interval),
                    running: false,
                    listener: None,
                    timer: None,
                    timer_generation: 0,
                    next_deadline: None,
                    last_success: None,
                }),
            }),
        }
    }

    /// Register `listener`, run one cycle immediately, then keep polling.
    ///
    /// Calling `start` again before `stop` only logs a warning.
    pub async fn start(&self, listener: Arc<dyn RefreshListener>) {
        {
            let mut inner = self.shared.lock();
            if inner.running {
                warn!("Refresh scheduler already running, ignoring start");
                return;
            }
            inner.running = true;
            inner.listener = Some(listener);
            info!(interval_ms = inner.interval.as_millis() as u64, "Refresh scheduler started");
        }

        // If a manual cycle is already in flight it arms the timer when it
        // settles, since `running` is now set.
        self.shared.run_cycle(None).await;
    }

    /// Cancel future cycles. A cycle already in flight runs to completion.
    pub fn stop(&self) {
        let (listener, state) = {
            let mut inner = self.shared.lock();
            if !inner.running {
                return;
            }
            inner.running = false;
            inner.disarm();
            inner.state.next_refresh = None;
            inner.snapshot()
        };
        info!("Refresh scheduler stopped");
        publish_state(listener, &state);
    }

    /// Run a cycle now. Returns false without fetching if one is in flight.
    pub async fn refresh(&self) -> bool {
        self.shared.run_cycle(None).await
    }

    /// Change the polling interval. An armed timer restarts its countdown
    /// with the new interval. Values below `MIN_POLL_INTERVAL` are raised to it.
    pub fn set_refresh_interval(&self, interval: Duration) {
        let interval = clamp_interval(interval);
        let published = {
            let mut inner = self.shared.lock();
            inner.interval = interval;
            debug!(interval_ms = interval.as_millis() as u64, "Refresh interval updated");
            if inner.timer.is_some() {
                self.shared.arm(&mut inner);
                Some(inner.snapshot())
            } else {
                None
            }
        };
        if let Some((listener, state)) = published {
            publish_state(listener, &state);
        }
    }

    pub fn refresh_interval(&self) -> Duration {
        self.shared.lock().interval
    }

    /// Zero once the next cycle is due, or when none is scheduled.
    pub fn time_until_next_refresh(&self) -> Duration {
        self.shared
            .lock()
            .next_deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
            .unwrap_or(Duration::ZERO)
    }

    /// True while the last successful cycle is younger than the interval.
    pub fn is_data_fresh(&self) -> bool {
        let inner = self.shared.lock();
        inner
            .last_success
            .is_some_and(|at| at.elapsed() < inner.interval)
    }

    pub fn state(&self) -> RefreshState {
        self.shared.lock().state.clone()
    }

    pub fn is_running(&self) -> bool {
        self.shared.lock().running
    }
}

impl Drop for RefreshScheduler {
    fn drop(&mut self) {
        let mut inner = self.shared.lock();
        inner.running = false;
        inner.disarm();
    }
}

/// Clears the in-flight flag if a cycle future is dropped before settling.
struct InFlight<'a> {
    shared: &'a Shared,
    settled: bool,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if !self.settled {
            warn!("Refresh cycle cancelled before completion");
            self.shared.lock().state.is_refreshing = false;
        }
    }
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Schedule the next cycle `interval` from now, replacing any armed timer.
    fn arm(self: &Arc<Self>, inner: &mut Inner) {
        inner.disarm();
        let generation = inner.timer_generation;
        let deadline = Instant::now() + inner.interval;
        inner.next_deadline = Some(deadline);
        inner.state.next_refresh = chrono::Duration::from_std(inner.interval)
            .ok()
            .and_then(|interval| self.fetcher.now().checked_add_signed(interval));

        let shared = Arc::clone(self);
        inner.timer = Some(tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            shared.run_cycle(Some(generation)).await;
        }));
    }

    /// Run one cycle. `timer_generation` is set when the armed timer fires;
    /// the cycle is then dropped unless that timer is still current and the
    /// scheduler is running, checked under the same lock that marks the
    /// cycle in flight.
    async fn run_cycle(self: &Arc<Self>, timer_generation: Option<u64>) -> bool {
        let (listener, state) = {
            let mut inner = self.lock();
            if let Some(generation) = timer_generation {
                if inner.timer_generation != generation || !inner.running {
                    debug!("Timer superseded or scheduler stopped, skipping");
                    return false;
                }
                // Detach from the handle so stop() cannot abort this cycle
                inner.timer = None;
            }
            if inner.state.is_refreshing {
                debug!("Refresh already in progress, skipping");
                return false;
            }
            inner.state.is_refreshing = true;
            inner.state.error = None;
            inner.snapshot()
        };
        let mut in_flight = InFlight {
            shared: self,
            settled: false,
        };
        publish_state(listener, &state);

        let outcome = self.fetch_both().await;

        // Re-read: start() may have registered a listener mid-cycle
        let listener = self.lock().listener.clone();
        let error = match outcome {
            Ok((locations, config)) => {
                info!(
                    locations = locations.len(),
                    has_config = config.is_some(),
                    "Refresh cycle complete"
                );
                if let Some(ref listener) = listener {
                    listener.on_data_update(&locations);
                    listener.on_config_update(config.as_ref());
                }
                None
            }
            Err(message) => {
                error!(error = %message, "Refresh cycle failed");
                if let Some(ref listener) = listener {
                    listener.on_error(&message);
                }
                Some(message)
            }
        };

        let (listener, state) = {
            let mut inner = self.lock();
            inner.state.is_refreshing = false;
            if error.is_none() {
                inner.state.last_refresh = Some(self.fetcher.now());
                inner.last_success = Some(Instant::now());
            }
            inner.state.error = error;
            if inner.running {
                self.arm(&mut inner);
            }
            inner.snapshot()
        };
        in_flight.settled = true;
        publish_state(listener, &state);
        true
    }

    /// Both feeds are requested together. A panic in either fetch surfaces
    /// as an error message rather than tearing down the scheduler.
    async fn fetch_both(&self) -> Result<(Vec<ParkingLocation>, Option<AppConfig>), String> {
        let fetcher = Arc::clone(&self.fetcher);
        let locations = tokio::spawn(async move { fetcher.fetch_parking_locations().await });
        let fetcher = Arc::clone(&self.fetcher);
        let config = tokio::spawn(async move { fetcher.fetch_app_config().await });

        let (locations, config) = tokio::join!(locations, config);
        let locations = locations.map_err(|e| format!("Location fetch failed: {}", e))?;
        let config = config.map_err(|e| format!("Config fetch failed: {}", e))?;
        Ok((locations, config))
    }
}
