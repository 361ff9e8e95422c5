//! Error types for the monitoring subsystem.

use thiserror::Error;

/// Monitoring errors.
///
/// Two families live here: alert-source failures, which the scheduler records
/// in `MonitoringState::monitoring_error`, and platform side-effect failures,
/// which the dispatcher logs and swallows.
#[derive(Debug, Error)]
pub enum MonitorError {
    // ============ Alert source ============
    /// Alert source is not ready to serve requests
    #[error("Alert source not ready: {0}")]
    SourceNotReady(String),

    /// Alert service failed (transient, next tick may succeed)
    #[error("Alert service unavailable (transient): {0}")]
    SourceTransient(String),

    /// Alert service rejected the request
    #[error("Alert service error: {0}")]
    SourceApi(String),

    /// Alert service does not know the node
    #[error("Node not found by alert service: {0}")]
    EntityNotFound(String),

    /// Network timeout
    #[error("Network timeout after {0}s: {1}")]
    Timeout(u64, String),

    /// Connection failed
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// HTTP request error
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    // ============ Platform side effects ============
    /// Notification permission was denied
    #[error("Notification permission denied")]
    PermissionDenied,

    /// Platform does not support this capability
    #[error("Unsupported on this platform: {0}")]
    Unsupported(&'static str),

    /// Audio playback was rejected
    #[error("Sound playback failed: {0}")]
    PlaybackFailed(String),

    /// Any other platform failure
    #[error("Platform error: {0}")]
    Platform(String),
}

impl MonitorError {
    /// Check if the next tick is likely to succeed without intervention.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            MonitorError::SourceTransient(_)
                | MonitorError::Timeout(_, _)
                | MonitorError::ConnectionFailed(_)
                | MonitorError::SourceNotReady(_)
        )
    }

    /// Check if this error is a network-related error.
    pub fn is_network_error(&self) -> bool {
        matches!(
            self,
            MonitorError::SourceTransient(_)
                | MonitorError::Timeout(_, _)
                | MonitorError::ConnectionFailed(_)
                | MonitorError::HttpError(_)
        )
    }

    /// Check if this error came from a notification side-effect channel.
    pub fn is_side_effect(&self) -> bool {
        matches!(
            self,
            MonitorError::PermissionDenied
                | MonitorError::Unsupported(_)
                | MonitorError::PlaybackFailed(_)
                | MonitorError::Platform(_)
        )
    }

    /// Get a user-friendly error message for a status banner.
    pub fn friendly_message(&self) -> String {
        match self {
            MonitorError::SourceTransient(msg) => {
                format!("Alert service temporarily unavailable: {}. Retrying.", msg)
            }
            MonitorError::Timeout(secs, _) => {
                format!("Alert check timed out after {}s. Retrying.", secs)
            }
            MonitorError::ConnectionFailed(msg) => {
                format!("Cannot reach alert service: {}. Check your network.", msg)
            }
            MonitorError::EntityNotFound(node) => {
                format!("The alert service does not know node {}", node)
            }
            MonitorError::HttpError(e) if e.is_timeout() => {
                "Alert check timed out. Retrying.".to_string()
            }
            MonitorError::HttpError(e) if e.is_connect() => {
                "Cannot reach alert service. Check your network.".to_string()
            }
            _ => format!("Error: {}", self),
        }
    }

    /// Classify an HTTP status code into the appropriate error.
    pub fn from_http_status(status: u16, body: &str) -> Self {
        match status {
            408 => MonitorError::Timeout(0, "Request timeout".to_string()),
            429 | 500 | 502 | 503 | 504 => {
                MonitorError::SourceTransient(format!("Server error ({}): {}", status, body))
            }
            401 | 403 => {
                MonitorError::SourceApi(format!("Authentication error ({}): {}", status, body))
            }
            _ => MonitorError::SourceApi(format!("HTTP {}: {}", status, body)),
        }
    }
}

/// Result type for monitoring operations.
pub type Result<T> = std::result::Result<T, MonitorError>;
