//! Platform capabilities used by the notification dispatcher.
//!
//! [`NotificationPlatform`] hides the host's notification, audio and badge
//! primitives so the scheduling and diffing logic can run anywhere.
//!
//! ## Implementations
//!
//! - [`NoopPlatform`] - every capability unsupported; the fallback
//! - [`RecordingPlatform`] - records calls, injects failures; for tests

use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use lnwatch_core::Severity;

use crate::error::{MonitorError, Result};

/// How long a notification stays up before it is closed automatically.
pub const NOTIFICATION_AUTO_DISMISS: Duration = Duration::from_secs(10);

/// Playback volume for audio cues.
pub const SOUND_VOLUME: f32 = 0.5;

/// Notification permission as reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    /// User has not decided yet
    Default,
    /// Notifications allowed
    Granted,
    /// Notifications refused
    Denied,
}

/// Identifier of a displayed notification.
pub type NotificationId = u64;

/// A system notification ready for display.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub title: String,
    pub body: String,
    /// Replaces an earlier notification with the same tag
    pub tag: String,
    pub severity: Severity,
    /// Closed automatically after this long
    pub auto_dismiss: Duration,
    /// Clicking the notification brings the host to the foreground
    pub focus_on_click: bool,
}

/// A severity-specific audio cue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoundCue {
    Critical,
    Warning,
    Info,
}

impl SoundCue {
    /// Cue for a severity.
    pub fn for_severity(severity: Severity) -> Self {
        match severity {
            Severity::Critical => SoundCue::Critical,
            Severity::Warning => SoundCue::Warning,
            Severity::Info => SoundCue::Info,
        }
    }

    /// Asset path of the sound file.
    pub fn asset(&self) -> &'static str {
        match self {
            SoundCue::Critical => "sounds/critical-alert.mp3",
            SoundCue::Warning => "sounds/warning-alert.mp3",
            SoundCue::Info => "sounds/info-alert.mp3",
        }
    }
}

/// Host platform primitives for notifications, audio and badges.
///
/// Every method may fail; callers treat failures as "no-op for that channel".
#[async_trait]
pub trait NotificationPlatform: Send + Sync {
    /// Current notification permission, without prompting.
    async fn permission(&self) -> Permission;

    /// Prompt the user for notification permission.
    async fn request_permission(&self) -> Result<Permission>;

    /// Display a notification.
    async fn show_notification(&self, notification: &Notification) -> Result<NotificationId>;

    /// Close a displayed notification. Closing an already-closed one is not an error.
    async fn close_notification(&self, id: NotificationId) -> Result<()>;

    /// Play an audio cue at the given volume (0.0 - 1.0).
    async fn play_sound(&self, cue: SoundCue, volume: f32) -> Result<()>;

    /// Set the application badge to `count`.
    async fn set_badge(&self, count: usize) -> Result<()>;

    /// Remove the application badge.
    async fn clear_badge(&self) -> Result<()>;

    /// Platform name for logging.
    fn name(&self) -> &str;
}

// ============ No-op Platform ============

/// Platform with no notification capabilities at all.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopPlatform;

#[async_trait]
impl NotificationPlatform for NoopPlatform {
    async fn permission(&self) -> Permission {
        Permission::Denied
    }

    async fn request_permission(&self) -> Result<Permission> {
        Err(MonitorError::Unsupported("notifications"))
    }

    async fn show_notification(&self, _notification: &Notification) -> Result<NotificationId> {
        Err(MonitorError::Unsupported("notifications"))
    }

    async fn close_notification(&self, _id: NotificationId) -> Result<()> {
        Ok(())
    }

    async fn play_sound(&self, _cue: SoundCue, _volume: f32) -> Result<()> {
        Err(MonitorError::Unsupported("audio"))
    }

    async fn set_badge(&self, _count: usize) -> Result<()> {
        Err(MonitorError::Unsupported("badge"))
    }

    async fn clear_badge(&self) -> Result<()> {
        Err(MonitorError::Unsupported("badge"))
    }

    fn name(&self) -> &str {
        "noop"
    }
}

// ============ Recording Platform ============

/// A call made against a [`RecordingPlatform`].
#[derive(Debug, Clone, PartialEq)]
pub enum PlatformCall {
    PermissionRequested,
    Shown(Notification),
    Closed(NotificationId),
    Sound(SoundCue, f32),
    Badge(usize),
    BadgeCleared,
}

#[derive(Debug)]
struct RecordingState {
    permission: Permission,
    /// Answer given when permission is requested
    grant_on_request: bool,
    fail_notifications: bool,
    fail_sound: bool,
    fail_badge: bool,
    calls: Vec<PlatformCall>,
    badge: usize,
}

/// Platform that records every call.
///
/// Permission starts at [`Permission::Default`] and a request grants it unless
/// configured otherwise. Each channel can be made to fail.
#[derive(Debug)]
pub struct RecordingPlatform {
    state: Mutex<RecordingState>,
    next_id: AtomicU64,
}

impl RecordingPlatform {
    /// Create a recording platform that grants permission on request.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(RecordingState {
                permission: Permission::Default,
                grant_on_request: true,
                fail_notifications: false,
                fail_sound: false,
                fail_badge: false,
                calls: Vec::new(),
                badge: 0,
            }),
            next_id: AtomicU64::new(1),
        }
    }

    fn state(&self) -> std::sync::MutexGuard<'_, RecordingState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Set the current permission.
    pub fn with_permission(self, permission: Permission) -> Self {
        self.state().permission = permission;
        self
    }

    /// Deny permission when it is requested.
    pub fn denying_requests(self) -> Self {
        self.state().grant_on_request = false;
        self
    }

    /// Make notification display fail.
    pub fn failing_notifications(self) -> Self {
        self.state().fail_notifications = true;
        self
    }

    /// Make sound playback fail.
    pub fn failing_sound(self) -> Self {
        self.state().fail_sound = true;
        self
    }

    /// Make badge updates fail.
    pub fn failing_badge(self) -> Self {
        self.state().fail_badge = true;
        self
    }

    /// All calls so far, in order.
    pub fn calls(&self) -> Vec<PlatformCall> {
        self.state().calls.clone()
    }

    /// Notifications shown so far.
    pub fn notifications(&self) -> Vec<Notification> {
        self.state()
            .calls
            .iter()
            .filter_map(|call| match call {
                PlatformCall::Shown(n) => Some(n.clone()),
                _ => None,
            })
            .collect()
    }

    /// Sound cues played so far.
    pub fn sounds(&self) -> Vec<SoundCue> {
        self.state()
            .calls
            .iter()
            .filter_map(|call| match call {
                PlatformCall::Sound(cue, _) => Some(*cue),
                _ => None,
            })
            .collect()
    }

    /// Number of permission prompts so far.
    pub fn permission_requests(&self) -> usize {
        self.state()
            .calls
            .iter()
            .filter(|call| matches!(call, PlatformCall::PermissionRequested))
            .count()
    }

    /// Current badge value.
    pub fn badge(&self) -> usize {
        self.state().badge
    }

    /// Forget recorded calls.
    pub fn reset_calls(&self) {
        self.state().calls.clear();
    }
}

impl Default for RecordingPlatform {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NotificationPlatform for RecordingPlatform {
    async fn permission(&self) -> Permission {
        self.state().permission
    }

    async fn request_permission(&self) -> Result<Permission> {
        let mut state = self.state();
        state.calls.push(PlatformCall::PermissionRequested);
        state.permission = if state.grant_on_request {
            Permission::Granted
        } else {
            Permission::Denied
        };
        Ok(state.permission)
    }

    async fn show_notification(&self, notification: &Notification) -> Result<NotificationId> {
        let mut state = self.state();
        if state.fail_notifications {
            return Err(MonitorError::Platform("notification display failed".into()));
        }
        state.calls.push(PlatformCall::Shown(notification.clone()));
        Ok(self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    async fn close_notification(&self, id: NotificationId) -> Result<()> {
        self.state().calls.push(PlatformCall::Closed(id));
        Ok(())
    }

    async fn play_sound(&self, cue: SoundCue, volume: f32) -> Result<()> {
        let mut state = self.state();
        if state.fail_sound {
            return Err(MonitorError::PlaybackFailed("autoplay blocked".into()));
        }
        state.calls.push(PlatformCall::Sound(cue, volume));
        Ok(())
    }

    async fn set_badge(&self, count: usize) -> Result<()> {
        let mut state = self.state();
        if state.fail_badge {
            return Err(MonitorError::Unsupported("badge"));
        }
        state.badge = count;
        state.calls.push(PlatformCall::Badge(count));
        Ok(())
    }

    async fn clear_badge(&self) -> Result<()> {
        let mut state = self.state();
        if state.fail_badge {
            return Err(MonitorError::Unsupported("badge"));
        }
        state.badge = 0;
        state.calls.push(PlatformCall::BadgeCleared);
        Ok(())
    }

    fn name(&self) -> &str {
        "recording"
    }
}
