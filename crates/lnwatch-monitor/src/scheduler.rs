//! Polling scheduler for a monitored node.
//!
//! [`MonitoringScheduler`] owns the repeating timer, the previous-snapshot
//! buffer and the published [`MonitoringState`]. One tick:
//!
//! 1. fetch every alert for the node (no severity filter)
//! 2. keep the actionable subset according to `alert_thresholds`
//! 3. count all fetched alerts by severity
//! 4. diff the actionable subset against the previous fetch
//! 5. dispatch notifications for new critical/warning alerts
//! 6. update the badge with `critical + warning`
//! 7. publish the new state and replace the snapshot buffer
//!
//! A failed fetch only records `monitoring_error` and `last_check`; the
//! snapshot buffer, counts and recent alerts keep their previous values.
//!
//! ## Lifecycle
//!
//! ```text
//! Idle --start_monitoring--> Monitoring   (immediate check, arm timer, attach listener)
//! Monitoring --stop_monitoring--> Idle    (abort timer, detach listener, zero badge)
//! Monitoring --interval change--> Monitoring (stop, then start)
//! Monitoring --visibility change--> Monitoring (re-arm timer at new period)
//! any --shutdown / drop--> Idle, permanently (badge zeroed)
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use lnwatch_monitor::{MonitoringOptions, MonitoringScheduler};
//! use lnwatch_monitor::platform::NoopPlatform;
//! use lnwatch_monitor::source::MockAlertSource;
//!
//! #[tokio::main]
//! async fn main() {
//!     let scheduler = MonitoringScheduler::new(
//!         Some("02b1fe65...".to_string()),
//!         Arc::new(MockAlertSource::new()),
//!         Arc::new(NoopPlatform),
//!         MonitoringOptions::default(),
//!     );
//!
//!     scheduler.start_monitoring().await;
//!     println!("{}", scheduler.state().summary());
//!     scheduler.shutdown().await;
//! }
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock, Weak};
use std::time::Duration;

use chrono::Utc;
use futures_util::future::join_all;
use lnwatch_core::{Alert, AlertCount, log_tick};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::classifier::{count_by_severity, filter_actionable};
use crate::config::{MonitoringOptions, OptionsUpdate};
use crate::diff::new_alerts;
use crate::dispatch::NotificationDispatcher;
use crate::platform::NotificationPlatform;
use crate::source::AlertSource;
use crate::state::{MAX_RECENT_ALERTS, MonitoringState};
use crate::visibility::{Visibility, VisibilityAdapter, effective_interval};

/// Background tasks and timer bookkeeping. Never held across an await.
#[derive(Default)]
struct Tasks {
    timer: Option<JoinHandle<()>>,
    listener: Option<JoinHandle<()>>,
    adapter: Option<VisibilityAdapter>,
    visibility: Visibility,
    period: Option<Duration>,
}

impl Tasks {
    fn abort_all(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
        if let Some(listener) = self.listener.take() {
            listener.abort();
        }
        self.period = None;
    }
}

struct SchedulerCore {
    entity_id: Option<String>,
    source: Arc<dyn AlertSource>,
    dispatcher: NotificationDispatcher,
    options: RwLock<MonitoringOptions>,
    /// Previous-snapshot buffer. Ticks hold this lock for their whole run,
    /// which is what keeps them from overlapping.
    previous: tokio::sync::Mutex<Vec<Alert>>,
    state: watch::Sender<MonitoringState>,
    /// Serializes start/stop/re-arm transitions.
    transition: tokio::sync::Mutex<()>,
    tasks: Mutex<Tasks>,
    closed: AtomicBool,
}

/// Polls the alert source for one node and drives notifications.
pub struct MonitoringScheduler {
    core: Arc<SchedulerCore>,
}

impl MonitoringScheduler {
    /// Create an idle scheduler.
    ///
    /// An absent or blank `entity_id` is allowed; monitoring simply never starts.
    pub fn new(
        entity_id: Option<String>,
        source: Arc<dyn AlertSource>,
        platform: Arc<dyn NotificationPlatform>,
        options: MonitoringOptions,
    ) -> Self {
        let entity_id = entity_id
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty());
        let (state, _) = watch::channel(MonitoringState::default());

        Self {
            core: Arc::new(SchedulerCore {
                entity_id,
                source,
                dispatcher: NotificationDispatcher::new(platform),
                options: RwLock::new(options),
                previous: tokio::sync::Mutex::new(Vec::new()),
                state,
                transition: tokio::sync::Mutex::new(()),
                tasks: Mutex::new(Tasks::default()),
                closed: AtomicBool::new(false),
            }),
        }
    }

    /// Follow host visibility through this adapter while monitoring.
    pub fn with_visibility(self, adapter: VisibilityAdapter) -> Self {
        {
            let mut tasks = self.core.tasks();
            tasks.visibility = adapter.current();
            tasks.adapter = Some(adapter);
        }
        self
    }

    /// Node being monitored, if any.
    pub fn entity_id(&self) -> Option<&str> {
        self.core.entity_id.as_deref()
    }

    /// Clone of the current state.
    pub fn state(&self) -> MonitoringState {
        self.core.state.borrow().clone()
    }

    /// Receiver that observes every published state.
    pub fn subscribe(&self) -> watch::Receiver<MonitoringState> {
        self.core.state.subscribe()
    }

    /// Current options.
    pub fn options(&self) -> MonitoringOptions {
        self.core.options()
    }

    /// Whether the monitoring lifecycle is active.
    pub fn is_monitoring(&self) -> bool {
        self.core.is_monitoring()
    }

    /// Period of the currently armed timer, if one is armed.
    pub fn effective_interval(&self) -> Option<Duration> {
        self.core.tasks().period
    }

    /// Last visibility reported to the scheduler.
    pub fn visibility(&self) -> Visibility {
        self.core.tasks().visibility
    }

    /// Start monitoring: one immediate check, then a repeating timer.
    ///
    /// No-op when already monitoring, when no node is set, when disabled or
    /// after [`shutdown`](Self::shutdown).
    pub async fn start_monitoring(&self) {
        let _transition = self.core.transition.lock().await;
        self.core.start_locked().await;
    }

    /// Stop monitoring: abort the timer, detach the visibility listener and
    /// zero the badge. Idempotent.
    pub async fn stop_monitoring(&self) {
        let _transition = self.core.transition.lock().await;
        self.core.stop_locked().await;
    }

    /// Run one check outside the timer cadence. The timer is not touched.
    pub async fn check_now(&self) {
        self.core.check().await;
    }

    /// Forget every alert seen so far.
    ///
    /// Counts and recent alerts are zeroed, the error is cleared, the badge is
    /// reset and the snapshot buffer emptied, so the next check reports every
    /// alert as new.
    pub async fn clear_alerts(&self) {
        let mut previous = self.core.previous.lock().await;
        if self.core.is_closed() {
            return;
        }
        previous.clear();
        self.core.state.send_modify(|state| {
            state.alert_count = AlertCount::zero();
            state.recent_alerts.clear();
            state.monitoring_error = None;
        });
        self.core.dispatcher.clear_badge().await;
        info!("Alerts cleared");
    }

    /// Merge a partial options update.
    ///
    /// A changed interval restarts monitoring so the new cadence applies
    /// immediately. Toggling `enabled` stops or starts monitoring.
    pub async fn update_options(&self, update: OptionsUpdate) {
        let _transition = self.core.transition.lock().await;

        let change = {
            let mut options = self.core.options.write().unwrap_or_else(|e| e.into_inner());
            options.apply(&update)
        };
        let enabled = self.core.options().enabled;
        let monitoring = self.core.is_monitoring();
        debug!(?change, enabled, monitoring, "Options updated");

        if monitoring && !enabled {
            self.core.stop_locked().await;
        } else if monitoring && change.interval_changed {
            info!(
                interval_ms = self.core.options().check_interval_ms,
                "Check interval changed; restarting"
            );
            self.core.stop_locked().await;
            self.core.start_locked().await;
        } else if !monitoring && enabled && change.enabled_changed {
            self.core.start_locked().await;
        }
    }

    /// Report a visibility transition and re-arm the timer for it.
    pub async fn handle_visibility(&self, visibility: Visibility) {
        self.core.handle_visibility(visibility).await;
    }

    /// Resolve notification permission now instead of on the first alert.
    pub async fn request_notification_permission(&self) -> bool {
        self.core.dispatcher.ensure_permission().await
    }

    /// Tear down: stop monitoring and refuse to start again.
    pub async fn shutdown(&self) {
        let _transition = self.core.transition.lock().await;
        self.core.closed.store(true, Ordering::SeqCst);
        self.core.stop_locked().await;
        info!("Monitoring scheduler shut down");
    }
}

impl Drop for MonitoringScheduler {
    fn drop(&mut self) {
        self.core.tasks().abort_all();
        if self.core.closed.swap(true, Ordering::SeqCst) {
            return;
        }

        // Badge reset needs the runtime; without one there is nothing to clear from.
        if let Ok(runtime) = tokio::runtime::Handle::try_current() {
            let core = Arc::clone(&self.core);
            runtime.spawn(async move {
                core.dispatcher.clear_badge().await;
            });
        }
    }
}

impl SchedulerCore {
    fn tasks(&self) -> MutexGuard<'_, Tasks> {
        self.tasks.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn options(&self) -> MonitoringOptions {
        self.options.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn is_monitoring(&self) -> bool {
        self.state.borrow().is_monitoring
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Caller holds the transition lock.
    async fn start_locked(self: &Arc<Self>) {
        if self.is_closed() {
            debug!("Scheduler shut down; not starting");
            return;
        }
        if self.is_monitoring() {
            debug!("Already monitoring");
            return;
        }
        let Some(entity_id) = self.entity_id.as_deref() else {
            debug!("No node configured; not starting");
            return;
        };
        let options = self.options();
        if !options.enabled {
            debug!("Monitoring disabled; not starting");
            return;
        }

        info!(
            node = entity_id,
            interval_ms = options.check_interval_ms,
            source = self.source.name(),
            platform = self.dispatcher.platform_name(),
            "Starting monitoring"
        );
        self.state.send_modify(|state| state.is_monitoring = true);

        self.check().await;
        self.attach_listener();
        self.arm_timer();
    }

    /// Caller holds the transition lock.
    async fn stop_locked(&self) {
        let (listener, had_timer) = {
            let mut tasks = self.tasks();
            (tasks.listener.take(), tasks.timer.is_some())
        };
        if let Some(listener) = listener {
            listener.abort();
            let _ = listener.await;
        }

        // Waits out an in-flight tick so nothing fires after we return.
        let _tick = self.previous.lock().await;
        self.disarm_timer().await;

        let stopped = self.state.send_if_modified(|state| {
            let changed = state.is_monitoring;
            state.is_monitoring = false;
            changed
        });
        self.dispatcher.clear_badge().await;

        if stopped || had_timer {
            info!(node = self.entity_id.as_deref().unwrap_or("-"), "Monitoring stopped");
        }
    }

    async fn handle_visibility(self: &Arc<Self>, visibility: Visibility) {
        let _transition = self.transition.lock().await;

        let previous = std::mem::replace(&mut self.tasks().visibility, visibility);
        if previous == visibility || !self.is_monitoring() {
            return;
        }

        {
            let _tick = self.previous.lock().await;
            self.disarm_timer().await;
        }
        self.arm_timer();
        info!(
            ?visibility,
            period = ?self.tasks().period,
            "Visibility changed; timer re-armed"
        );
    }

    fn attach_listener(self: &Arc<Self>) {
        let mut tasks = self.tasks();
        let Some(adapter) = tasks.adapter.clone() else {
            return;
        };
        tasks.visibility = adapter.current();

        let core = Arc::downgrade(self);
        tasks.listener = Some(adapter.attach(move |visibility| {
            let core = Weak::clone(&core);
            async move {
                if let Some(core) = core.upgrade() {
                    core.handle_visibility(visibility).await;
                }
            }
        }));
    }

    /// Arm the timer for the current options and visibility. The previous
    /// timer must already be disarmed.
    fn arm_timer(self: &Arc<Self>) {
        let base = self.options().check_interval();
        let mut tasks = self.tasks();
        tasks.period = effective_interval(base, tasks.visibility);

        match tasks.period {
            Some(period) => {
                tasks.timer = Some(tokio::spawn(run_timer(Arc::downgrade(self), period)));
                debug!(period_ms = period.as_millis() as u64, "Timer armed");
            }
            None => debug!("Check interval is zero; manual checks only"),
        }
    }

    /// Caller holds the snapshot lock, so the timer task is not mid-tick.
    async fn disarm_timer(&self) {
        let timer = {
            let mut tasks = self.tasks();
            tasks.period = None;
            tasks.timer.take()
        };
        if let Some(timer) = timer {
            timer.abort();
            let _ = timer.await;
        }
    }

    /// One tick.
    async fn check(&self) {
        let Some(entity_id) = self.entity_id.as_deref() else {
            return;
        };
        if !self.source.is_ready() {
            debug!(source = self.source.name(), "Alert source not ready; skipping check");
            return;
        }

        let mut previous = self.previous.lock().await;
        if self.is_closed() {
            debug!("Scheduler shut down; skipping check");
            return;
        }
        let options = self.options();

        let alerts = match self.source.fetch_alerts(entity_id, None).await {
            Ok(alerts) => alerts,
            Err(e) => {
                warn!(node = entity_id, error = %e, "Alert check failed");
                let message = e.to_string();
                self.state.send_modify(|state| {
                    state.monitoring_error = Some(message);
                    state.last_check = Some(Utc::now());
                });
                return;
            }
        };

        let actionable = filter_actionable(&alerts, &options.alert_thresholds);
        let alert_count = count_by_severity(&alerts);
        let fresh = new_alerts(&previous, &actionable);

        let channels = &options.notification_options;
        join_all(
            fresh
                .iter()
                .filter(|alert| alert.severity.should_notify())
                .map(|alert| self.dispatcher.dispatch(alert, channels)),
        )
        .await;

        if self.is_monitoring() {
            self.dispatcher
                .update_badge(alert_count.badge_value(), channels)
                .await;
        }

        log_tick!(
            node = entity_id,
            fetched = alerts.len(),
            actionable = actionable.len(),
            new = fresh.len()
        );

        let recent: Vec<Alert> = actionable.into_iter().take(MAX_RECENT_ALERTS).collect();
        self.state.send_modify(|state| {
            state.alert_count = alert_count;
            state.recent_alerts = recent;
            state.last_check = Some(Utc::now());
            state.monitoring_error = None;
        });
        *previous = alerts;
    }
}

async fn run_timer(core: Weak<SchedulerCore>, period: Duration) {
    let mut interval = tokio::time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        interval.tick().await;
        let Some(core) = core.upgrade() else {
            break;
        };
        core.check().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::RecordingPlatform;
    use crate::source::MockAlertSource;

    fn scheduler(entity: Option<&str>) -> (MonitoringScheduler, Arc<MockAlertSource>) {
        let source = Arc::new(MockAlertSource::new());
        let scheduler = MonitoringScheduler::new(
            entity.map(str::to_string),
            source.clone(),
            Arc::new(RecordingPlatform::new()),
            MonitoringOptions::default(),
        );
        (scheduler, source)
    }

    #[tokio::test(start_paused = true)]
    async fn test_blank_entity_never_starts() {
        let (scheduler, source) = scheduler(Some("   "));
        assert_eq!(scheduler.entity_id(), None);

        scheduler.start_monitoring().await;
        assert!(!scheduler.is_monitoring());
        assert_eq!(source.fetch_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_arms_timer_and_drop_aborts() {
        let (scheduler, source) = scheduler(Some("02ab"));
        scheduler.start_monitoring().await;
        assert_eq!(scheduler.effective_interval(), Some(Duration::from_secs(30)));
        assert_eq!(source.fetch_count(), 1);

        drop(scheduler);
        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(source.fetch_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_interval_is_manual_only() {
        let source = Arc::new(MockAlertSource::new());
        let scheduler = MonitoringScheduler::new(
            Some("02ab".into()),
            source.clone(),
            Arc::new(RecordingPlatform::new()),
            MonitoringOptions::default().with_interval_ms(0),
        );

        scheduler.start_monitoring().await;
        assert!(scheduler.is_monitoring());
        assert_eq!(scheduler.effective_interval(), None);

        tokio::time::sleep(Duration::from_secs(600)).await;
        assert_eq!(source.fetch_count(), 1);

        scheduler.check_now().await;
        assert_eq!(source.fetch_count(), 2);
    }
}
