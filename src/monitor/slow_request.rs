//! Slow request detection.
//!
//! # Responsibilities
//! - Time the single tracked request between start and completion
//! - Run the confirm → publish → settle warning cycle on slow requests
//! - Refresh the home screen visibility signal when asked or while slow
//!
//! # Design Decisions
//! - One tracked request at a time; a start while one is tracked keeps the
//!   existing start time
//! - Success and failure are the same event for timing purposes
//! - The settling timer always clears the slow signal, even if another slow
//!   request is in flight by then
//! - Timer tasks only hold a weak reference, so dropping every monitor handle
//!   lets pending cycles die quietly

use arc_swap::ArcSwap;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use tokio::runtime::Handle;
use tokio::time::{self, Instant};

use crate::config::MonitorConfig;
use crate::monitor::cycle::{Phase, WarningCycle};
use crate::monitor::signal::Signal;
use crate::monitor::visibility::{self, HomeScreenContext, Visibility};
use crate::observability::metrics;

#[derive(Debug, Clone, Copy)]
struct TrackedRequest {
    started_at: Instant,
    generation: u64,
}

#[derive(Debug)]
struct MonitorState {
    tracked: Option<TrackedRequest>,
    next_generation: u64,
    cycle: WarningCycle,
    warnings_published: u64,
}

struct Inner {
    config: ArcSwap<MonitorConfig>,
    state: Mutex<MonitorState>,
    slow_network: Signal<bool>,
    home_visible: Signal<bool>,
    home_context: Mutex<Option<Arc<dyn HomeScreenContext>>>,
    last_visibility: Mutex<Visibility>,
}

/// Watches request timings and publishes a slow-network signal.
///
/// Cheap to clone; all clones share state. Hand one clone to the HTTP
/// pipeline (see [`SlowRequestLayer`](crate::http::SlowRequestLayer)) and keep
/// another for the GUI side.
#[derive(Clone)]
pub struct SlowRequestMonitor {
    inner: Arc<Inner>,
}

impl SlowRequestMonitor {
    pub fn new(config: MonitorConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                config: ArcSwap::from_pointee(config),
                state: Mutex::new(MonitorState {
                    tracked: None,
                    next_generation: 0,
                    cycle: WarningCycle::new(),
                    warnings_published: 0,
                }),
                slow_network: Signal::new(false),
                home_visible: Signal::new(false),
                home_context: Mutex::new(None),
                last_visibility: Mutex::new(Visibility::default()),
            }),
        }
    }

    /// Replace the configuration for all future measurements.
    ///
    /// A cycle already underway keeps the delays it was scheduled with.
    pub fn reconfigure(&self, config: MonitorConfig) {
        tracing::info!(
            threshold_ms = config.threshold_ms,
            confirmation_delay_ms = config.confirmation_delay_ms,
            settling_window_ms = config.settling_window_ms,
            "Slow request monitor reconfigured"
        );
        self.inner.config.store(Arc::new(config));
    }

    pub fn config(&self) -> MonitorConfig {
        MonitorConfig::clone(&self.inner.config.load())
    }

    pub fn threshold(&self) -> std::time::Duration {
        self.inner.config.load().threshold()
    }

    /// Slow-network signal; true while the warning should be shown.
    pub fn slow_network(&self) -> Signal<bool> {
        self.inner.slow_network.clone()
    }

    /// Home-screen-visible signal.
    pub fn home_visible(&self) -> Signal<bool> {
        self.inner.home_visible.clone()
    }

    /// Result of the most recent visibility probe.
    pub fn last_visibility(&self) -> Visibility {
        *lock(&self.inner.last_visibility)
    }

    pub fn set_home_screen_context(&self, context: Option<Arc<dyn HomeScreenContext>>) {
        *lock(&self.inner.home_context) = context;
    }

    /// Whether a request start time is currently recorded.
    pub fn is_tracking(&self) -> bool {
        self.inner.state().tracked.is_some()
    }

    /// Whether the slow warning is showing (settling window running).
    pub fn is_warning_visible(&self) -> bool {
        self.inner.state().cycle.is_warning()
    }

    pub fn phase(&self) -> Phase {
        self.inner.state().cycle.phase()
    }

    /// Number of warnings published since construction.
    pub fn warnings_published(&self) -> u64 {
        self.inner.state().warnings_published
    }

    /// Before-send hook.
    pub fn on_request_start(&self) {
        {
            let mut state = self.inner.state();
            if state.tracked.is_none() {
                state.next_generation += 1;
                state.tracked = Some(TrackedRequest {
                    started_at: Instant::now(),
                    generation: state.next_generation,
                });
                tracing::debug!(generation = state.next_generation, "Tracking request");
            }
        }
        self.check_slow_requests(false, false);
    }

    /// Success hook.
    pub fn on_response_received(&self) {
        metrics::record_request_outcome("success");
        self.check_slow_requests(true, false);
    }

    /// Failure hook. Timed exactly like a success.
    pub fn on_request_failed(&self) {
        metrics::record_request_outcome("failure");
        self.check_slow_requests(true, false);
    }

    /// Manual trigger for GUI events (tap, navigation change).
    pub fn refresh(&self) {
        self.check_slow_requests(false, true);
    }

    /// Compare the tracked request's elapsed time against the threshold.
    ///
    /// `request_finished` releases the tracked slot before anything else.
    /// `update_home_visibility` forces a visibility refresh regardless of the
    /// slow signal.
    pub fn check_slow_requests(&self, request_finished: bool, update_home_visibility: bool) {
        let captured = {
            let mut state = self.inner.state();
            let captured = state.tracked;
            if request_finished {
                state.tracked = None;
            }
            captured
        };

        if update_home_visibility {
            self.update_home_screen_visibility(true);
        }

        let Some(tracked) = captured else {
            return;
        };

        let elapsed = tracked.started_at.elapsed();
        if request_finished {
            tracing::debug!(
                generation = tracked.generation,
                elapsed_ms = elapsed.as_millis() as u64,
                "Tracked request finished"
            );
            metrics::record_request_duration(elapsed);
        }

        let started = elapsed > self.threshold() && Inner::begin_warning(&self.inner, tracked);

        if !started && update_home_visibility {
            self.update_home_screen_visibility(true);
        }
    }

    /// Recompute the home-visible signal if slow or forced; otherwise a no-op.
    ///
    /// Returns the probe result when a probe ran.
    pub fn update_home_screen_visibility(&self, force_refresh: bool) -> Option<Visibility> {
        self.inner.update_home_screen_visibility(force_refresh)
    }

    /// Cancel any pending cycle and clear the slow signal.
    pub fn shutdown(&self) {
        let mut state = self.inner.state();
        let left = state.cycle.cancel();
        if left != Phase::Idle {
            tracing::info!(phase = ?left, "Cancelled pending slow warning");
        }
        self.inner.slow_network.set(false);
        metrics::set_slow_network(false);
    }
}

impl std::fmt::Debug for SlowRequestMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlowRequestMonitor")
            .field("config", &self.config())
            .field("slow_network", &self.inner.slow_network.get())
            .field("home_visible", &self.inner.home_visible.get())
            .finish()
    }
}

impl Inner {
    fn state(&self) -> MutexGuard<'_, MonitorState> {
        lock(&self.state)
    }

    /// Start a warning cycle unless one is already running.
    fn begin_warning(this: &Arc<Self>, tracked: TrackedRequest) -> bool {
        let mut state = this.state();
        if state.cycle.is_active() {
            return false;
        }

        let Ok(runtime) = Handle::try_current() else {
            tracing::warn!("No async runtime available, slow warning not scheduled");
            return false;
        };

        let config = this.config.load_full();
        let epoch = state.cycle.begin(tracked.generation);
        tracing::debug!(epoch, generation = tracked.generation, "Slow request detected, confirming");

        let weak = Arc::downgrade(this);
        let timer = runtime.spawn(run_cycle(weak, epoch, config));
        state.cycle.attach_timer(epoch, timer);
        true
    }

    fn update_home_screen_visibility(&self, force_refresh: bool) -> Option<Visibility> {
        if !force_refresh && !self.slow_network.get() {
            tracing::trace!("Skipping home visibility refresh while not slow");
            return None;
        }

        let context = lock(&self.home_context).clone();
        let visibility = visibility::probe(context.as_deref());
        *lock(&self.last_visibility) = visibility;
        self.home_visible.set(visibility.is_visible());
        Some(visibility)
    }

    fn publish_warning(&self, epoch: u64) -> bool {
        if !self.state().cycle.is_current(epoch, Phase::Confirming) {
            return false;
        }

        // Probe outside the state lock; the context is foreign code.
        self.update_home_screen_visibility(true);

        let mut state = self.state();
        if !state.cycle.confirm(epoch) {
            return false;
        }
        state.warnings_published += 1;
        self.slow_network.set(true);
        metrics::record_warning();
        metrics::set_slow_network(true);
        tracing::info!(epoch, "Slow network warning published");
        true
    }

    fn settle_warning(&self, epoch: u64) {
        let mut state = self.state();
        let Some(trigger) = state.cycle.settle(epoch) else {
            return;
        };

        if state.tracked.map(|t| t.generation) == Some(trigger) {
            state.tracked = None;
        }
        self.slow_network.set(false);
        metrics::set_slow_network(false);
        tracing::info!(epoch, "Slow network warning settled");
    }
}

async fn run_cycle(inner: Weak<Inner>, epoch: u64, config: Arc<MonitorConfig>) {
    time::sleep(config.confirmation_delay()).await;
    let Some(strong) = inner.upgrade() else {
        return;
    };
    if !strong.publish_warning(epoch) {
        return;
    }
    drop(strong);

    time::sleep(config.settling_window()).await;
    if let Some(inner) = inner.upgrade() {
        inner.settle_warning(epoch);
    }
}

/// Lock, ignoring poisoning. No critical section here leaves state half-written.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
