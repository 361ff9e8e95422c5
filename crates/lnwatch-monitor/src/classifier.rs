//! Severity filtering and counting.

use lnwatch_core::{Alert, AlertCount};

use crate::config::AlertThresholds;

/// Keep the alerts whose severity is enabled in `thresholds`, preserving order.
pub fn filter_actionable(alerts: &[Alert], thresholds: &AlertThresholds) -> Vec<Alert> {
    alerts
        .iter()
        .filter(|alert| thresholds.allows(alert.severity))
        .cloned()
        .collect()
}

/// Tally alerts by severity. Always called on the complete fetched set.
pub fn count_by_severity(alerts: &[Alert]) -> AlertCount {
    alerts.iter().collect()
}
