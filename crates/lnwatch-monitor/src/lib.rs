//! # lnwatch-monitor
//!
//! Background alert monitoring for a Lightning node.
//!
//! This crate provides:
//! - [`MonitoringScheduler`] - Polls the alert source and publishes [`MonitoringState`]
//! - [`AlertSource`] - Trait for alert backends ([`HttpAlertSource`], [`MockAlertSource`])
//! - [`NotificationPlatform`] - Trait for notification, audio and badge primitives
//! - [`NotificationDispatcher`] - Fans new alerts out to the platform channels
//! - [`VisibilityAdapter`] - Slows polling while the host is hidden
//!
//! ## Pure Building Blocks
//!
//! - [`filter_actionable`] / [`count_by_severity`] - severity classification
//! - [`new_alerts`] - set difference against the previous fetch
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use lnwatch_monitor::{
//!     AppConfig, HttpAlertSource, MonitoringScheduler, NoopPlatform, Visibility,
//!     VisibilityAdapter,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AppConfig::load_default()?;
//!     let source = HttpAlertSource::from_config(&config.source)?;
//!     let (visibility, adapter) = VisibilityAdapter::channel(Visibility::Visible);
//!
//!     let scheduler = MonitoringScheduler::new(
//!         config.node_pubkey.clone(),
//!         Arc::new(source),
//!         Arc::new(NoopPlatform),
//!         config.monitoring.clone(),
//!     )
//!     .with_visibility(adapter);
//!
//!     scheduler.start_monitoring().await;
//!     visibility.hide();
//!     Ok(())
//! }
//! ```

pub mod classifier;
pub mod config;
pub mod diff;
pub mod dispatch;
pub mod error;
pub mod platform;
pub mod scheduler;
pub mod source;
pub mod state;
pub mod visibility;

// Re-export main types
pub use classifier::{count_by_severity, filter_actionable};
pub use config::{
    AlertThresholds, AppConfig, MonitoringOptions, NotificationOptions, OptionsChange,
    OptionsUpdate, SourceConfig,
};
pub use diff::new_alerts;
pub use dispatch::NotificationDispatcher;
pub use error::{MonitorError, Result};
pub use platform::{
    Notification, NotificationId, NotificationPlatform, NoopPlatform, Permission, PlatformCall,
    RecordingPlatform, SoundCue,
};
pub use scheduler::MonitoringScheduler;
pub use source::{AlertSource, HttpAlertSource, MockAlertSource};
pub use state::{MAX_RECENT_ALERTS, MonitoringState};
pub use visibility::{Visibility, VisibilityAdapter, VisibilitySender, effective_interval};
