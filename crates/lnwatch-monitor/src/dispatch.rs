//! Notification dispatch for newly-appeared alerts.
//!
//! Three side-effect channels, each gated by its own [`NotificationOptions`]
//! flag and each best-effort:
//!
//! - **Push**: system notification, shown once permission is granted.
//!   Permission is asked for at most once per runtime; a denial is final.
//! - **Sound**: severity-specific cue at [`SOUND_VOLUME`].
//! - **Badge**: application badge set to the unresolved high-severity count.
//!
//! A failing channel is logged and skipped; it never stops the others and
//! never reaches the scheduler.

use std::sync::Arc;

use lnwatch_core::{Alert, Severity, log_alert_event};
use tokio::sync::Mutex;
use tracing::debug;

use crate::config::NotificationOptions;
use crate::error::{MonitorError, Result};
use crate::platform::{
    NOTIFICATION_AUTO_DISMISS, Notification, NotificationId, NotificationPlatform, Permission,
    SOUND_VOLUME, SoundCue,
};

/// Cached outcome of the permission flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PermissionCache {
    Unknown,
    Granted,
    Denied,
}

/// Fans newly-appeared alerts out to the platform's side-effect channels.
pub struct NotificationDispatcher {
    platform: Arc<dyn NotificationPlatform>,
    permission: Mutex<PermissionCache>,
}

impl NotificationDispatcher {
    /// Create a dispatcher over a platform.
    pub fn new(platform: Arc<dyn NotificationPlatform>) -> Self {
        Self {
            platform,
            permission: Mutex::new(PermissionCache::Unknown),
        }
    }

    /// Platform name for logging.
    pub fn platform_name(&self) -> &str {
        self.platform.name()
    }

    /// Resolve notification permission, prompting the user at most once.
    ///
    /// Returns true when notifications may be shown.
    pub async fn ensure_permission(&self) -> bool {
        let mut cache = self.permission.lock().await;
        match *cache {
            PermissionCache::Granted => return true,
            PermissionCache::Denied => return false,
            PermissionCache::Unknown => {}
        }

        let resolved = match self.platform.permission().await {
            Permission::Default => match self.platform.request_permission().await {
                Ok(permission) => permission,
                Err(e) => {
                    debug!("Notification permission request failed: {}", e);
                    Permission::Denied
                }
            },
            decided => decided,
        };

        // A prompt the user dismissed counts as a refusal; we do not ask twice.
        *cache = if resolved == Permission::Granted {
            PermissionCache::Granted
        } else {
            PermissionCache::Denied
        };
        debug!(granted = (*cache == PermissionCache::Granted), "Notification permission resolved");
        *cache == PermissionCache::Granted
    }

    /// Run the push and sound channels for one new alert.
    pub async fn dispatch(&self, alert: &Alert, channels: &NotificationOptions) {
        let push = async {
            if channels.push {
                if let Err(e) = self.show(alert).await {
                    debug!(alert_type = %alert.kind, "Notification skipped: {}", e);
                }
            }
        };

        let sound = async {
            if channels.sound {
                let cue = SoundCue::for_severity(alert.severity);
                if let Err(e) = self.platform.play_sound(cue, SOUND_VOLUME).await {
                    debug!(alert_type = %alert.kind, "Sound cue skipped: {}", e);
                }
            }
        };

        tokio::join!(push, sound);
        log_alert_event!(alert.kind.as_str(), "dispatched", severity = alert.severity.as_str());
    }

    /// Set the badge to `count`, or clear it when `count` is zero.
    pub async fn update_badge(&self, count: usize, channels: &NotificationOptions) {
        if !channels.badge {
            return;
        }
        let result = if count == 0 {
            self.platform.clear_badge().await
        } else {
            self.platform.set_badge(count).await
        };
        if let Err(e) = result {
            debug!(count, "Badge update skipped: {}", e);
        }
    }

    /// Reset the badge to zero regardless of channel settings.
    pub async fn clear_badge(&self) {
        if let Err(e) = self.platform.clear_badge().await {
            debug!("Badge clear skipped: {}", e);
        }
    }

    async fn show(&self, alert: &Alert) -> Result<NotificationId> {
        if !self.ensure_permission().await {
            return Err(MonitorError::PermissionDenied);
        }

        let notification = build_notification(alert);
        let id = self.platform.show_notification(&notification).await?;

        let platform = Arc::clone(&self.platform);
        let dismiss_after = notification.auto_dismiss;
        tokio::spawn(async move {
            tokio::time::sleep(dismiss_after).await;
            if let Err(e) = platform.close_notification(id).await {
                debug!(id, "Auto-dismiss failed: {}", e);
            }
        });

        Ok(id)
    }
}

/// Title prefix for a severity.
pub fn title_prefix(severity: Severity) -> String {
    let label = match severity {
        Severity::Critical => "Critical Alert",
        Severity::Warning => "Warning",
        Severity::Info => "Info",
    };
    format!("{} {}", severity.icon(), label)
}

/// Build the system notification for an alert.
pub fn build_notification(alert: &Alert) -> Notification {
    let body = if alert.suggested_action.is_empty() {
        alert.message.clone()
    } else {
        format!(
            "{}\n\nSuggested action: {}",
            alert.message, alert.suggested_action
        )
    };

    Notification {
        title: format!("{}: {}", title_prefix(alert.severity), alert.kind),
        body,
        tag: format!("lnwatch-{}", alert.kind),
        severity: alert.severity,
        auto_dismiss: NOTIFICATION_AUTO_DISMISS,
        focus_on_click: true,
    }
}
