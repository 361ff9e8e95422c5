//! Host visibility tracking.
//!
//! While the host is hidden the scheduler polls at twice its configured
//! interval, never more often than once a minute. Visibility only changes the
//! armed timer; it never touches `MonitoringOptions::check_interval_ms`.

use std::future::Future;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

/// Floor for the polling period while hidden.
pub const HIDDEN_MIN_INTERVAL: Duration = Duration::from_secs(60);

/// Whether the host is currently in front of the user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Visibility {
    #[default]
    Visible,
    Hidden,
}

/// Polling period for a base interval and visibility. `None` means no timer.
pub fn effective_interval(base: Duration, visibility: Visibility) -> Option<Duration> {
    if base.is_zero() {
        return None;
    }
    Some(match visibility {
        Visibility::Visible => base,
        Visibility::Hidden => base.saturating_mul(2).max(HIDDEN_MIN_INTERVAL),
    })
}

/// Host-side handle used to report visibility transitions.
#[derive(Debug, Clone)]
pub struct VisibilitySender {
    tx: watch::Sender<Visibility>,
}

impl VisibilitySender {
    /// Report the current visibility. Repeating the current value is ignored.
    pub fn set(&self, visibility: Visibility) {
        self.tx.send_if_modified(|current| {
            if *current == visibility {
                false
            } else {
                *current = visibility;
                true
            }
        });
    }

    /// Report that the host went to the background.
    pub fn hide(&self) {
        self.set(Visibility::Hidden);
    }

    /// Report that the host came back to the foreground.
    pub fn show(&self) {
        self.set(Visibility::Visible);
    }
}

/// Observes visibility transitions on behalf of the scheduler.
#[derive(Debug, Clone)]
pub struct VisibilityAdapter {
    rx: watch::Receiver<Visibility>,
}

impl VisibilityAdapter {
    /// Create a linked sender/adapter pair.
    pub fn channel(initial: Visibility) -> (VisibilitySender, Self) {
        let (tx, rx) = watch::channel(initial);
        (VisibilitySender { tx }, Self { rx })
    }

    /// Visibility right now.
    pub fn current(&self) -> Visibility {
        *self.rx.borrow()
    }

    /// Start a listener that calls `on_change` for every transition.
    ///
    /// The listener ends when the sender is dropped or the handle is aborted.
    /// Only transitions after this call are reported.
    pub fn attach<F, Fut>(&self, on_change: F) -> JoinHandle<()>
    where
        F: Fn(Visibility) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut rx = self.rx.clone();
        rx.borrow_and_update();

        tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                let visibility = *rx.borrow_and_update();
                debug!(?visibility, "Visibility changed");
                on_change(visibility).await;
            }
            debug!("Visibility sender dropped; listener finished");
        })
    }
}
