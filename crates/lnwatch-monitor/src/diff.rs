//! New-alert detection between two fetches.
//!
//! An alert is new when no alert in the previous snapshot shares its
//! `(type, message, channelRef)` key. Severity changes alone do not make an
//! alert new.

use std::collections::HashSet;

use lnwatch_core::Alert;

/// Alerts in `current` whose key does not appear in `previous`, in `current` order.
pub fn new_alerts(previous: &[Alert], current: &[Alert]) -> Vec<Alert> {
    let seen: HashSet<_> = previous.iter().map(Alert::key).collect();

    current
        .iter()
        .filter(|alert| !seen.contains(&alert.key()))
        .cloned()
        .collect()
}
