//! Alert data model shared across lnwatch crates.
//!
//! Alerts arrive from the alert service as JSON with camelCase field names:
//!
//! ```json
//! {
//!   "type": "channel_offline",
//!   "severity": "critical",
//!   "message": "Channel 812x1x0 has been offline for 3 hours",
//!   "channelRef": "812x1x0",
//!   "suggestedAction": "Check the peer's connectivity"
//! }
//! ```

use serde::{Deserialize, Serialize};

/// Alert severity level, ordered by urgency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational
    Info = 0,
    /// Degraded condition worth a look
    Warning = 1,
    /// Needs attention now
    Critical = 2,
}

impl Severity {
    /// All severities, most urgent first.
    pub const ALL: [Severity; 3] = [Severity::Critical, Severity::Warning, Severity::Info];

    /// Get the icon for this severity level.
    pub fn icon(&self) -> &'static str {
        match self {
            Severity::Info => "ℹ️",
            Severity::Warning => "⚠️",
            Severity::Critical => "🚨",
        }
    }

    /// Lowercase name, as used on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Critical => "critical",
        }
    }

    /// Whether a newly-appeared alert of this severity raises a notification.
    pub fn should_notify(&self) -> bool {
        matches!(self, Severity::Critical | Severity::Warning)
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "info" => Ok(Severity::Info),
            "warning" => Ok(Severity::Warning),
            "critical" => Ok(Severity::Critical),
            other => Err(format!("unknown severity: {other}")),
        }
    }
}

/// A condition report about the monitored node. Immutable once received.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    /// Categorical tag identifying the alert's origin/class
    #[serde(rename = "type")]
    pub kind: String,
    /// Urgency
    pub severity: Severity,
    /// Human-readable description
    pub message: String,
    /// Resource (usually a payment channel) the alert concerns
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_ref: Option<String>,
    /// Remediation hint
    #[serde(default)]
    pub suggested_action: String,
}

/// Structural identity of an alert: `(type, message, channelRef)`.
pub type AlertKey<'a> = (&'a str, &'a str, Option<&'a str>);

impl Alert {
    /// Create a new alert without a channel reference.
    pub fn new(kind: impl Into<String>, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            severity,
            message: message.into(),
            channel_ref: None,
            suggested_action: String::new(),
        }
    }

    /// Attach the channel this alert concerns.
    pub fn with_channel(mut self, channel_ref: impl Into<String>) -> Self {
        self.channel_ref = Some(channel_ref.into());
        self
    }

    /// Attach a remediation hint.
    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.suggested_action = action.into();
        self
    }

    /// Identity key used to tell a recurring alert from a new one.
    ///
    /// Severity and suggested action are not part of the key.
    pub fn key(&self) -> AlertKey<'_> {
        (&self.kind, &self.message, self.channel_ref.as_deref())
    }

    /// Format for display in one line.
    pub fn format_compact(&self) -> String {
        match &self.channel_ref {
            Some(channel) => format!(
                "{} [{}] {} ({})",
                self.severity.icon(),
                self.kind,
                self.message,
                channel
            ),
            None => format!("{} [{}] {}", self.severity.icon(), self.kind, self.message),
        }
    }
}

/// Per-severity tally of an alert set.
///
/// `total` always equals `critical + warning + info`; the only way to build a
/// non-zero count is through [`AlertCount::record`] or `FromIterator`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertCount {
    pub critical: usize,
    pub warning: usize,
    pub info: usize,
    pub total: usize,
}

impl AlertCount {
    /// All-zero count.
    pub fn zero() -> Self {
        Self::default()
    }

    /// Add one alert of the given severity.
    pub fn record(&mut self, severity: Severity) {
        match severity {
            Severity::Critical => self.critical += 1,
            Severity::Warning => self.warning += 1,
            Severity::Info => self.info += 1,
        }
        self.total += 1;
    }

    /// Count for a single severity.
    pub fn get(&self, severity: Severity) -> usize {
        match severity {
            Severity::Critical => self.critical,
            Severity::Warning => self.warning,
            Severity::Info => self.info,
        }
    }

    /// Value shown on the application badge: unresolved high-severity alerts.
    pub fn badge_value(&self) -> usize {
        self.critical + self.warning
    }
}

impl<'a> FromIterator<&'a Alert> for AlertCount {
    fn from_iter<I: IntoIterator<Item = &'a Alert>>(iter: I) -> Self {
        let mut count = AlertCount::zero();
        for alert in iter {
            count.record(alert.severity);
        }
        count
    }
}
