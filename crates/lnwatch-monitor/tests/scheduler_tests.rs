//! End-to-end tests for the monitoring scheduler.
//!
//! These tests cover:
//! - Tick pipeline (classification, diffing, notification, badge, state)
//! - Failure handling and snapshot retention
//! - Timer cadence, visibility throttling and restarts
//! - Lifecycle transitions (start, stop, options updates, shutdown)
//!
//! All tests run on a paused clock; `tokio::time::sleep` advances it.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use lnwatch_core::{Alert, AlertCount, Severity};
use lnwatch_monitor::{
    AlertSource, AlertThresholds, MAX_RECENT_ALERTS, MockAlertSource, MonitoringOptions,
    MonitoringScheduler, MonitoringState, NotificationOptions, OptionsUpdate, Permission,
    PlatformCall, RecordingPlatform, SoundCue, Visibility, VisibilityAdapter,
};

const NODE: &str = "02b1fe652cfd3f3e4e3e8f0b2a1c9d8e7f6a5b4c3d2e1f0a9b8c7d6e5f4a3b2c1d";

struct Harness {
    scheduler: MonitoringScheduler,
    source: Arc<MockAlertSource>,
    platform: Arc<RecordingPlatform>,
}

fn harness_with(source: MockAlertSource, options: MonitoringOptions) -> Harness {
    let source = Arc::new(source);
    let platform = Arc::new(RecordingPlatform::new().with_permission(Permission::Granted));
    let scheduler = MonitoringScheduler::new(
        Some(NODE.to_string()),
        source.clone(),
        platform.clone(),
        options,
    );
    Harness {
        scheduler,
        source,
        platform,
    }
}

fn harness(options: MonitoringOptions) -> Harness {
    harness_with(MockAlertSource::new(), options)
}

fn critical(kind: &str) -> Alert {
    Alert::new(kind, Severity::Critical, format!("{} detected", kind))
        .with_action("Inspect the node")
}

fn warning(kind: &str) -> Alert {
    Alert::new(kind, Severity::Warning, format!("{} detected", kind))
}

fn info(kind: &str) -> Alert {
    Alert::new(kind, Severity::Info, format!("{} detected", kind))
}

fn shown_titles(platform: &RecordingPlatform) -> Vec<String> {
    platform
        .notifications()
        .into_iter()
        .map(|n| n.title)
        .collect()
}

// ============================================================
// Tick Pipeline
// ============================================================

#[tokio::test(start_paused = true)]
async fn test_first_check_classifies_and_notifies() {
    let h = harness(MonitoringOptions::default());
    h.source
        .push_alerts(vec![critical("channel_offline"), info("fee_update")]);

    h.scheduler.start_monitoring().await;

    let state = h.scheduler.state();
    assert!(state.is_monitoring);
    assert!(state.last_check.is_some());
    assert_eq!(state.monitoring_error, None);
    assert_eq!(
        state.alert_count,
        AlertCount {
            critical: 1,
            warning: 0,
            info: 1,
            total: 2
        }
    );
    assert_eq!(state.recent_alerts, vec![critical("channel_offline")]);

    assert_eq!(
        shown_titles(&h.platform),
        vec!["🚨 Critical Alert: channel_offline".to_string()]
    );
    assert_eq!(h.platform.sounds(), vec![SoundCue::Critical]);
    assert_eq!(h.platform.badge(), 1);
    assert_eq!(h.source.requests(), vec![(NODE.to_string(), None)]);
}

#[tokio::test(start_paused = true)]
async fn test_only_new_alerts_notify() {
    let h = harness(MonitoringOptions::default());
    h.source
        .push_alerts(vec![critical("channel_offline"), warning("low_liquidity")]);
    h.source.push_alerts(vec![
        critical("channel_offline"),
        warning("low_liquidity"),
        warning("peer_flapping"),
    ]);

    h.scheduler.start_monitoring().await;
    assert_eq!(h.platform.notifications().len(), 2);
    h.platform.reset_calls();

    tokio::time::sleep(Duration::from_secs(31)).await;

    assert_eq!(h.source.fetch_count(), 2);
    assert_eq!(
        shown_titles(&h.platform),
        vec!["⚠️ Warning: peer_flapping".to_string()]
    );
    let state = h.scheduler.state();
    assert_eq!(state.alert_count.total, 3);
    assert_eq!(state.recent_alerts.len(), 3);
    assert_eq!(h.platform.badge(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_unchanged_alerts_do_not_renotify() {
    let h = harness(MonitoringOptions::default());
    h.source.push_alerts(vec![critical("channel_offline")]);

    h.scheduler.start_monitoring().await;
    tokio::time::sleep(Duration::from_secs(95)).await;

    assert_eq!(h.source.fetch_count(), 4);
    assert_eq!(h.platform.notifications().len(), 1);
    assert_eq!(h.platform.sounds().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_info_never_notifies_even_when_actionable() {
    let options = MonitoringOptions::default()
        .with_thresholds(AlertThresholds::all());
    let h = harness(options);
    h.source.push_alerts(vec![info("fee_update")]);

    h.scheduler.start_monitoring().await;

    let state = h.scheduler.state();
    assert_eq!(state.recent_alerts, vec![info("fee_update")]);
    assert!(h.platform.notifications().is_empty());
    assert!(h.platform.sounds().is_empty());
    // Info does not count toward the badge
    assert_eq!(h.platform.badge(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_recent_alerts_capped() {
    let h = harness(MonitoringOptions::default());
    let alerts: Vec<Alert> = (0..15).map(|i| critical(&format!("htlc_stuck_{}", i))).collect();
    h.source.push_alerts(alerts.clone());

    h.scheduler.start_monitoring().await;

    let state = h.scheduler.state();
    assert_eq!(state.recent_alerts.len(), MAX_RECENT_ALERTS);
    assert_eq!(state.recent_alerts[..], alerts[..MAX_RECENT_ALERTS]);
    assert_eq!(state.alert_count.critical, 15);
    assert_eq!(h.platform.notifications().len(), 15);
    assert_eq!(h.platform.badge(), 15);
}

#[tokio::test(start_paused = true)]
async fn test_disabled_channels_are_silent() {
    let options = MonitoringOptions::default().with_notifications(NotificationOptions::silent());
    let h = harness(options);
    h.source.push_alerts(vec![critical("channel_offline")]);

    h.scheduler.start_monitoring().await;

    assert_eq!(h.scheduler.state().alert_count.critical, 1);
    assert!(h.platform.calls().is_empty());
}

// ============================================================
// Failures
// ============================================================

#[tokio::test(start_paused = true)]
async fn test_failed_check_keeps_previous_results() {
    let h = harness(MonitoringOptions::default());
    h.source.push_alerts(vec![critical("channel_offline")]);
    h.source.push_failure("connection refused");
    h.source
        .push_alerts(vec![critical("channel_offline"), warning("low_liquidity")]);

    h.scheduler.start_monitoring().await;
    let before = h.scheduler.state();

    tokio::time::sleep(Duration::from_secs(31)).await;
    let failed = h.scheduler.state();
    assert!(
        failed
            .monitoring_error
            .as_deref()
            .is_some_and(|e| e.contains("connection refused"))
    );
    assert!(failed.last_check >= before.last_check);
    assert_eq!(failed.alert_count, before.alert_count);
    assert_eq!(failed.recent_alerts, before.recent_alerts);
    assert!(failed.is_monitoring);

    h.platform.reset_calls();
    tokio::time::sleep(Duration::from_secs(30)).await;
    let recovered = h.scheduler.state();
    assert_eq!(recovered.monitoring_error, None);
    assert_eq!(recovered.alert_count.total, 2);
    // The snapshot survived the failure, so only the warning is new
    assert_eq!(
        shown_titles(&h.platform),
        vec!["⚠️ Warning: low_liquidity".to_string()]
    );
}

#[tokio::test(start_paused = true)]
async fn test_not_ready_source_is_skipped() {
    let h = harness(MonitoringOptions::default());
    h.source.set_ready(false);

    h.scheduler.start_monitoring().await;
    assert!(h.scheduler.is_monitoring());
    assert_eq!(h.source.fetch_count(), 0);
    assert_eq!(h.scheduler.state().last_check, None);

    h.source.set_ready(true);
    tokio::time::sleep(Duration::from_secs(31)).await;
    assert_eq!(h.source.fetch_count(), 1);
    assert!(h.scheduler.state().last_check.is_some());
}

// ============================================================
// Cadence
// ============================================================

#[tokio::test(start_paused = true)]
async fn test_timer_follows_interval() {
    let h = harness(MonitoringOptions::default().with_interval_ms(10_000));

    h.scheduler.start_monitoring().await;
    assert_eq!(h.source.fetch_count(), 1);

    tokio::time::sleep(Duration::from_secs(9)).await;
    assert_eq!(h.source.fetch_count(), 1);

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(h.source.fetch_count(), 2);

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(h.source.fetch_count(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_hidden_host_slows_polling() {
    let (visibility, adapter) = VisibilityAdapter::channel(Visibility::Visible);
    let h = harness(MonitoringOptions::default().with_interval_ms(10_000));
    let scheduler = h.scheduler.with_visibility(adapter);

    scheduler.start_monitoring().await;
    assert_eq!(scheduler.effective_interval(), Some(Duration::from_secs(10)));

    visibility.hide();
    tokio::time::sleep(Duration::from_millis(1)).await;
    assert_eq!(scheduler.visibility(), Visibility::Hidden);
    assert_eq!(scheduler.effective_interval(), Some(Duration::from_secs(60)));
    // Hiding re-arms the timer without an extra check
    assert_eq!(h.source.fetch_count(), 1);

    tokio::time::sleep(Duration::from_secs(55)).await;
    assert_eq!(h.source.fetch_count(), 1);

    tokio::time::sleep(Duration::from_secs(6)).await;
    assert_eq!(h.source.fetch_count(), 2);

    visibility.show();
    tokio::time::sleep(Duration::from_millis(1)).await;
    assert_eq!(scheduler.effective_interval(), Some(Duration::from_secs(10)));

    tokio::time::sleep(Duration::from_secs(11)).await;
    assert_eq!(h.source.fetch_count(), 3);
    // The configured interval itself never changes
    assert_eq!(scheduler.options().check_interval_ms, 10_000);
}

#[tokio::test(start_paused = true)]
async fn test_start_while_hidden_uses_slow_period() {
    let (_visibility, adapter) = VisibilityAdapter::channel(Visibility::Hidden);
    let h = harness(MonitoringOptions::default().with_interval_ms(45_000));
    let scheduler = h.scheduler.with_visibility(adapter);

    scheduler.start_monitoring().await;
    assert_eq!(scheduler.effective_interval(), Some(Duration::from_secs(90)));
}

#[tokio::test(start_paused = true)]
async fn test_interval_change_restarts_with_immediate_check() {
    let h = harness(MonitoringOptions::default());

    h.scheduler.start_monitoring().await;
    assert_eq!(h.source.fetch_count(), 1);

    h.scheduler
        .update_options(OptionsUpdate::interval_ms(5_000))
        .await;
    assert!(h.scheduler.is_monitoring());
    assert_eq!(h.source.fetch_count(), 2);
    assert_eq!(h.scheduler.effective_interval(), Some(Duration::from_secs(5)));

    tokio::time::sleep(Duration::from_secs(6)).await;
    assert_eq!(h.source.fetch_count(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_threshold_update_does_not_restart() {
    let h = harness(MonitoringOptions::default());
    h.scheduler.start_monitoring().await;

    h.scheduler
        .update_options(OptionsUpdate {
            alert_thresholds: Some(AlertThresholds::all()),
            ..Default::default()
        })
        .await;

    assert_eq!(h.source.fetch_count(), 1);
    assert!(h.scheduler.options().alert_thresholds.info);
}

struct SlowSource {
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    calls: AtomicUsize,
}

#[async_trait]
impl AlertSource for SlowSource {
    async fn fetch_alerts(
        &self,
        _entity_id: &str,
        _severity: Option<Severity>,
    ) -> lnwatch_monitor::Result<Vec<Alert>> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        self.calls.fetch_add(1, Ordering::SeqCst);

        tokio::time::sleep(Duration::from_secs(2)).await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(vec![critical("channel_offline")])
    }

    fn name(&self) -> &str {
        "slow"
    }
}

#[tokio::test(start_paused = true)]
async fn test_checks_never_overlap() {
    let source = Arc::new(SlowSource {
        in_flight: AtomicUsize::new(0),
        max_in_flight: AtomicUsize::new(0),
        calls: AtomicUsize::new(0),
    });
    let platform = Arc::new(RecordingPlatform::new().with_permission(Permission::Granted));
    let scheduler = MonitoringScheduler::new(
        Some(NODE.to_string()),
        source.clone(),
        platform.clone(),
        MonitoringOptions::default().with_interval_ms(1_000),
    );

    scheduler.start_monitoring().await;
    tokio::join!(
        scheduler.check_now(),
        scheduler.check_now(),
        tokio::time::sleep(Duration::from_secs(10)),
    );

    assert!(source.calls.load(Ordering::SeqCst) >= 3);
    assert_eq!(source.max_in_flight.load(Ordering::SeqCst), 1);
    // Serialized ticks see the same alert only once
    assert_eq!(platform.notifications().len(), 1);
}

// ============================================================
// Lifecycle
// ============================================================

#[tokio::test(start_paused = true)]
async fn test_stop_halts_all_activity() {
    let options = MonitoringOptions::default().with_notifications(NotificationOptions {
        push: false,
        ..Default::default()
    });
    let h = harness(options);
    h.source.push_alerts(vec![critical("channel_offline")]);

    h.scheduler.start_monitoring().await;
    tokio::time::sleep(Duration::from_secs(31)).await;
    assert_eq!(h.source.fetch_count(), 2);
    assert_eq!(h.platform.badge(), 1);

    h.scheduler.stop_monitoring().await;
    assert!(!h.scheduler.is_monitoring());
    assert_eq!(h.scheduler.effective_interval(), None);
    assert_eq!(h.platform.badge(), 0);

    h.platform.reset_calls();
    tokio::time::sleep(Duration::from_secs(300)).await;
    assert_eq!(h.source.fetch_count(), 2);
    assert!(h.platform.calls().is_empty());

    // Idempotent
    h.scheduler.stop_monitoring().await;
    assert!(!h.scheduler.is_monitoring());
}

#[tokio::test(start_paused = true)]
async fn test_stop_waits_for_in_flight_check() {
    let h = harness_with(
        MockAlertSource::new().with_delay(Duration::from_secs(5)),
        MonitoringOptions::default().with_interval_ms(10_000),
    );

    h.scheduler.start_monitoring().await;
    assert_eq!(h.source.fetch_count(), 1);

    // Timer fires at 15s and the fetch runs until 20s
    tokio::time::sleep(Duration::from_secs(11)).await;
    assert_eq!(h.source.fetch_count(), 2);

    h.scheduler.stop_monitoring().await;
    assert!(!h.scheduler.is_monitoring());
    assert_eq!(h.platform.badge(), 0);

    h.platform.reset_calls();
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(h.source.fetch_count(), 2);
    assert!(h.platform.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_start_is_idempotent() {
    let h = harness(MonitoringOptions::default());

    h.scheduler.start_monitoring().await;
    h.scheduler.start_monitoring().await;
    assert_eq!(h.source.fetch_count(), 1);

    tokio::time::sleep(Duration::from_secs(31)).await;
    assert_eq!(h.source.fetch_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_missing_node_never_monitors() {
    let source = Arc::new(MockAlertSource::new());
    let platform = Arc::new(RecordingPlatform::new());
    let scheduler =
        MonitoringScheduler::new(None, source.clone(), platform.clone(), Default::default());

    scheduler.start_monitoring().await;
    scheduler.check_now().await;
    tokio::time::sleep(Duration::from_secs(120)).await;

    assert!(!scheduler.is_monitoring());
    assert_eq!(source.fetch_count(), 0);
    assert_eq!(scheduler.state(), MonitoringState::default());
}

#[tokio::test(start_paused = true)]
async fn test_disabled_options_block_start() {
    let h = harness(MonitoringOptions::default().with_enabled(false));

    h.scheduler.start_monitoring().await;
    assert!(!h.scheduler.is_monitoring());
    assert_eq!(h.source.fetch_count(), 0);

    h.scheduler.update_options(OptionsUpdate::enabled(true)).await;
    assert!(h.scheduler.is_monitoring());
    assert_eq!(h.source.fetch_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_disabling_stops_monitoring() {
    let h = harness(MonitoringOptions::default());
    h.source.push_alerts(vec![critical("channel_offline")]);

    h.scheduler.start_monitoring().await;
    assert_eq!(h.platform.badge(), 1);

    h.scheduler.update_options(OptionsUpdate::enabled(false)).await;
    assert!(!h.scheduler.is_monitoring());
    assert_eq!(h.platform.badge(), 0);

    tokio::time::sleep(Duration::from_secs(120)).await;
    assert_eq!(h.source.fetch_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_clear_alerts_resets_baseline() {
    let h = harness(MonitoringOptions::default());
    h.source
        .push_alerts(vec![critical("channel_offline"), warning("low_liquidity")]);

    h.scheduler.start_monitoring().await;
    h.scheduler.check_now().await;
    assert_eq!(h.platform.notifications().len(), 2);

    h.scheduler.clear_alerts().await;
    let state = h.scheduler.state();
    assert_eq!(state.alert_count, AlertCount::zero());
    assert!(state.recent_alerts.is_empty());
    assert_eq!(state.monitoring_error, None);
    assert_eq!(h.platform.badge(), 0);
    assert!(state.is_monitoring);

    h.scheduler.check_now().await;
    assert_eq!(h.platform.notifications().len(), 4);
    assert_eq!(h.scheduler.state().alert_count.total, 2);
}

#[tokio::test(start_paused = true)]
async fn test_manual_check_while_idle_leaves_badge() {
    let h = harness(MonitoringOptions::default());
    h.source.push_alerts(vec![critical("channel_offline")]);

    h.scheduler.check_now().await;

    let state = h.scheduler.state();
    assert!(!state.is_monitoring);
    assert_eq!(state.alert_count.critical, 1);
    assert_eq!(h.platform.notifications().len(), 1);
    assert!(
        !h.platform
            .calls()
            .iter()
            .any(|c| matches!(c, PlatformCall::Badge(_)))
    );
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_is_final() {
    let h = harness(MonitoringOptions::default());

    h.scheduler.start_monitoring().await;
    h.scheduler.shutdown().await;
    assert!(!h.scheduler.is_monitoring());

    h.scheduler.start_monitoring().await;
    assert!(!h.scheduler.is_monitoring());
    assert_eq!(h.source.fetch_count(), 1);

    h.source.push_alerts(vec![critical("channel_offline")]);
    h.platform.reset_calls();
    let before = h.scheduler.state();

    h.scheduler.check_now().await;
    h.scheduler.clear_alerts().await;
    tokio::time::sleep(Duration::from_secs(120)).await;

    assert_eq!(h.source.fetch_count(), 1);
    assert!(h.platform.calls().is_empty());
    assert_eq!(h.scheduler.state(), before);
}

#[tokio::test(start_paused = true)]
async fn test_drop_zeroes_badge() {
    let h = harness(MonitoringOptions::default());
    h.source.push_alerts(vec![critical("channel_offline")]);

    h.scheduler.start_monitoring().await;
    assert_eq!(h.platform.badge(), 1);

    drop(h.scheduler);
    tokio::time::sleep(Duration::from_millis(1)).await;

    assert_eq!(h.platform.badge(), 0);
    tokio::time::sleep(Duration::from_secs(120)).await;
    assert_eq!(h.source.fetch_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_subscribers_observe_updates() {
    let h = harness(MonitoringOptions::default());
    let mut rx = h.scheduler.subscribe();
    h.source.push_alerts(vec![warning("low_liquidity")]);

    h.scheduler.start_monitoring().await;
    assert!(rx.has_changed().unwrap());
    {
        let state = rx.borrow_and_update();
        assert!(state.is_monitoring);
        assert_eq!(state.alert_count.warning, 1);
    }

    h.scheduler.stop_monitoring().await;
    rx.changed().await.unwrap();
    assert!(!rx.borrow().is_monitoring);
}

#[tokio::test(start_paused = true)]
async fn test_permission_prompt_up_front() {
    let source = Arc::new(MockAlertSource::new());
    let platform = Arc::new(RecordingPlatform::new());
    let scheduler = MonitoringScheduler::new(
        Some(NODE.to_string()),
        source.clone(),
        platform.clone(),
        MonitoringOptions::default(),
    );

    assert!(scheduler.request_notification_permission().await);
    source.push_alerts(vec![critical("channel_offline")]);
    scheduler.start_monitoring().await;

    assert_eq!(platform.permission_requests(), 1);
    assert_eq!(platform.notifications().len(), 1);
}
