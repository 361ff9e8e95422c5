//! Configuration for monitoring, the alert source and the host application.
//!
//! The YAML file at `~/.lnwatch/config.yaml` maps onto [`AppConfig`]:
//!
//! ```yaml
//! node_pubkey: 02b1fe652cfd3f3e4e3e8f0b2a1c9d8e7f6a5b4c3d2e1f0a9b8c7d6e5f4a3b2c1d
//! source:
//!   base_url: http://127.0.0.1:8080
//!   timeout_secs: 15
//! monitoring:
//!   enabled: true
//!   check_interval_ms: 30000
//!   alert_thresholds: { critical: true, warning: true, info: false }
//!   notification_options: { push: true, sound: true, badge: false }
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use lnwatch_core::{Result, Severity, WatchError};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Default polling period (30 seconds).
pub const DEFAULT_CHECK_INTERVAL_MS: u64 = 30_000;

/// Smallest non-zero polling period accepted from configuration.
pub const MIN_CHECK_INTERVAL_MS: u64 = 1_000;

/// Default alert service request timeout.
pub const DEFAULT_SOURCE_TIMEOUT_SECS: u64 = 15;

/// Length of a hex-encoded compressed secp256k1 public key.
pub const NODE_PUBKEY_LEN: usize = 66;

/// Which severities are actionable (filtered into `recent_alerts` and
/// eligible for notification).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertThresholds {
    pub critical: bool,
    pub warning: bool,
    pub info: bool,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            critical: true,
            warning: true,
            info: false,
        }
    }
}

impl AlertThresholds {
    /// Everything is actionable.
    pub fn all() -> Self {
        Self {
            critical: true,
            warning: true,
            info: true,
        }
    }

    /// Whether alerts of this severity are actionable.
    pub fn allows(&self, severity: Severity) -> bool {
        match severity {
            Severity::Critical => self.critical,
            Severity::Warning => self.warning,
            Severity::Info => self.info,
        }
    }
}

/// Which side-effect channels are active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationOptions {
    /// System notifications
    pub push: bool,
    /// Audio cues
    pub sound: bool,
    /// Application badge counter
    pub badge: bool,
}

impl Default for NotificationOptions {
    fn default() -> Self {
        Self {
            push: true,
            sound: true,
            badge: true,
        }
    }
}

impl NotificationOptions {
    /// Every channel switched off.
    pub fn silent() -> Self {
        Self {
            push: false,
            sound: false,
            badge: false,
        }
    }
}

/// Monitoring configuration, updatable at runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitoringOptions {
    /// Master on/off switch
    pub enabled: bool,
    /// Base polling period in milliseconds; 0 disables the timer
    pub check_interval_ms: u64,
    /// Actionable severities
    pub alert_thresholds: AlertThresholds,
    /// Active side-effect channels
    pub notification_options: NotificationOptions,
}

impl Default for MonitoringOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            check_interval_ms: DEFAULT_CHECK_INTERVAL_MS,
            alert_thresholds: AlertThresholds::default(),
            notification_options: NotificationOptions::default(),
        }
    }
}

impl MonitoringOptions {
    /// Base polling period.
    pub fn check_interval(&self) -> Duration {
        Duration::from_millis(self.check_interval_ms)
    }

    /// Set the polling period.
    pub fn with_interval_ms(mut self, check_interval_ms: u64) -> Self {
        self.check_interval_ms = check_interval_ms;
        self
    }

    /// Set the actionable severities.
    pub fn with_thresholds(mut self, thresholds: AlertThresholds) -> Self {
        self.alert_thresholds = thresholds;
        self
    }

    /// Set the active side-effect channels.
    pub fn with_notifications(mut self, notifications: NotificationOptions) -> Self {
        self.notification_options = notifications;
        self
    }

    /// Set the master switch.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Merge a partial update into these options.
    pub fn apply(&mut self, update: &OptionsUpdate) -> OptionsChange {
        let before = self.clone();

        if let Some(enabled) = update.enabled {
            self.enabled = enabled;
        }
        if let Some(ms) = update.check_interval_ms {
            self.check_interval_ms = ms;
        }
        if let Some(thresholds) = update.alert_thresholds {
            self.alert_thresholds = thresholds;
        }
        if let Some(notifications) = update.notification_options {
            self.notification_options = notifications;
        }

        OptionsChange {
            interval_changed: before.check_interval_ms != self.check_interval_ms,
            enabled_changed: before.enabled != self.enabled,
        }
    }

    /// Validate option values.
    pub fn validate(&self) -> Result<()> {
        if self.check_interval_ms != 0 && self.check_interval_ms < MIN_CHECK_INTERVAL_MS {
            return Err(WatchError::validation(format!(
                "check_interval_ms must be 0 or at least {} (got {})",
                MIN_CHECK_INTERVAL_MS, self.check_interval_ms
            )));
        }
        Ok(())
    }
}

/// Partial update for [`MonitoringOptions`]; `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptionsUpdate {
    pub enabled: Option<bool>,
    pub check_interval_ms: Option<u64>,
    pub alert_thresholds: Option<AlertThresholds>,
    pub notification_options: Option<NotificationOptions>,
}

impl OptionsUpdate {
    /// Update only the polling period.
    pub fn interval_ms(check_interval_ms: u64) -> Self {
        Self {
            check_interval_ms: Some(check_interval_ms),
            ..Default::default()
        }
    }

    /// Update only the master switch.
    pub fn enabled(enabled: bool) -> Self {
        Self {
            enabled: Some(enabled),
            ..Default::default()
        }
    }
}

/// What an [`OptionsUpdate`] changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OptionsChange {
    pub interval_changed: bool,
    pub enabled_changed: bool,
}

/// Alert service connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Base URL of the alert service
    pub base_url: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Environment variable holding a bearer token, if the service needs one
    pub api_key_env: Option<String>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8080".to_string(),
            timeout_secs: DEFAULT_SOURCE_TIMEOUT_SECS,
            api_key_env: None,
        }
    }
}

impl SourceConfig {
    /// Set a custom base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }
}

/// Top-level lnwatch configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Node to monitor (hex public key)
    pub node_pubkey: Option<String>,
    /// Alert service settings
    pub source: SourceConfig,
    /// Monitoring options
    pub monitoring: MonitoringOptions,
}

/// Default config file path: `~/.lnwatch/config.yaml`.
pub fn config_path() -> Result<PathBuf> {
    Ok(lnwatch_core::logging::lnwatch_home()?.join("config.yaml"))
}

impl AppConfig {
    /// Load from the default path, falling back to defaults when the file
    /// does not exist.
    pub fn load_default() -> Result<Self> {
        let path = config_path()?;
        if !path.exists() {
            debug!("Config file does not exist: {:?}", path);
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    /// Load from an explicit path; the file must exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                WatchError::config_not_found_with_source(path, e)
            } else {
                WatchError::io("reading config", path, e)
            }
        })?;

        let config = Self::parse(&content)
            .map_err(|e| WatchError::config_invalid(path, e.to_string()))?;
        config.validate()?;
        debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    /// Parse configuration from a YAML string.
    pub fn parse(content: &str) -> std::result::Result<Self, serde_yaml::Error> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if let Some(pubkey) = &self.node_pubkey {
            if !is_valid_pubkey(pubkey) {
                return Err(WatchError::validation(format!(
                    "node_pubkey must be {} hex characters (got {:?})",
                    NODE_PUBKEY_LEN, pubkey
                )));
            }
        }
        self.monitoring.validate()
    }
}

/// Check the shape of a hex-encoded node public key.
pub fn is_valid_pubkey(pubkey: &str) -> bool {
    pubkey.len() == NODE_PUBKEY_LEN && pubkey.bytes().all(|b| b.is_ascii_hexdigit())
}
