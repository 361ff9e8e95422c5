//! Externally observable monitoring state.

use chrono::{DateTime, Utc};
use lnwatch_core::{Alert, AlertCount};
use serde::{Deserialize, Serialize};

/// Maximum number of actionable alerts kept in [`MonitoringState::recent_alerts`].
pub const MAX_RECENT_ALERTS: usize = 10;

/// Snapshot of the monitor, published once per tick.
///
/// Only the scheduler writes this; hosts receive clones.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MonitoringState {
    /// Whether the polling timer lifecycle is active
    pub is_monitoring: bool,
    /// When the last check finished, successful or not
    pub last_check: Option<DateTime<Utc>>,
    /// Tally over the full, unfiltered result of the last successful fetch
    pub alert_count: AlertCount,
    /// Most recent actionable alerts, at most [`MAX_RECENT_ALERTS`]
    pub recent_alerts: Vec<Alert>,
    /// Last fetch error; cleared by the next successful check
    pub monitoring_error: Option<String>,
}

impl MonitoringState {
    /// Whether any critical alert is currently reported.
    pub fn has_critical(&self) -> bool {
        self.alert_count.critical > 0
    }

    /// One-line status summary for logs and terminals.
    pub fn summary(&self) -> String {
        let status = if self.is_monitoring { "monitoring" } else { "idle" };
        let last = self
            .last_check
            .map(|t| t.format("%H:%M:%S").to_string())
            .unwrap_or_else(|| "never".to_string());
        let mut line = format!(
            "{} | last check {} | {} critical, {} warning, {} info ({} total)",
            status,
            last,
            self.alert_count.critical,
            self.alert_count.warning,
            self.alert_count.info,
            self.alert_count.total
        );
        if let Some(error) = &self.monitoring_error {
            line.push_str(&format!(" | error: {}", error));
        }
        line
    }
}
