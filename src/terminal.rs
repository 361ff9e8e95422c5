//! Terminal implementation of the notification platform.
//!
//! Notifications are printed to stderr, sound cues ring the terminal bell and
//! the badge count is shown in the terminal title.

use std::io::{IsTerminal, Write};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::Local;
use lnwatch_monitor::platform::{
    Notification, NotificationId, NotificationPlatform, Permission, SoundCue,
};
use lnwatch_monitor::Result;
use tracing::{debug, info};

/// Terminal-backed platform. Permission is always granted.
#[derive(Debug)]
pub struct TerminalPlatform {
    next_id: AtomicU64,
    badge: AtomicUsize,
    interactive: bool,
}

impl TerminalPlatform {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            badge: AtomicUsize::new(0),
            interactive: std::io::stderr().is_terminal(),
        }
    }

    /// Current badge value.
    pub fn badge(&self) -> usize {
        self.badge.load(Ordering::SeqCst)
    }

    fn set_title(&self, title: &str) {
        if self.interactive {
            let mut stderr = std::io::stderr();
            let _ = write!(stderr, "\x1b]0;{}\x07", title);
            let _ = stderr.flush();
        }
    }
}

impl Default for TerminalPlatform {
    fn default() -> Self {
        Self::new()
    }
}

/// Render a notification as a block of terminal text.
pub fn render(notification: &Notification) -> String {
    format!(
        "[{}] {}\n{}",
        Local::now().format("%H:%M:%S"),
        notification.title,
        notification.body
    )
}

#[async_trait]
impl NotificationPlatform for TerminalPlatform {
    async fn permission(&self) -> Permission {
        Permission::Granted
    }

    async fn request_permission(&self) -> Result<Permission> {
        Ok(Permission::Granted)
    }

    async fn show_notification(&self, notification: &Notification) -> Result<NotificationId> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        eprintln!("\n{}\n", render(notification));
        debug!(id, tag = %notification.tag, "Notification shown");
        Ok(id)
    }

    async fn close_notification(&self, id: NotificationId) -> Result<()> {
        debug!(id, "Notification dismissed");
        Ok(())
    }

    async fn play_sound(&self, cue: SoundCue, volume: f32) -> Result<()> {
        if self.interactive {
            let mut stderr = std::io::stderr();
            let _ = stderr.write_all(b"\x07");
            let _ = stderr.flush();
        }
        debug!(asset = cue.asset(), volume, "Sound cue played");
        Ok(())
    }

    async fn set_badge(&self, count: usize) -> Result<()> {
        let previous = self.badge.swap(count, Ordering::SeqCst);
        if previous != count {
            info!(count, "Badge updated");
            self.set_title(&format!("lnwatch ({})", count));
        }
        Ok(())
    }

    async fn clear_badge(&self) -> Result<()> {
        if self.badge.swap(0, Ordering::SeqCst) != 0 {
            info!("Badge cleared");
            self.set_title("lnwatch");
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "terminal"
    }
}
