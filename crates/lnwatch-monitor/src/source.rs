//! Alert sources.
//!
//! [`AlertSource`] abstracts the external alert service that analyses a node
//! and reports its current alerts.
//!
//! ## Implementations
//!
//! - [`HttpAlertSource`] - the alert service over HTTP (reqwest)
//! - [`MockAlertSource`] - scripted responses for tests and demos
//!
//! ## Example
//!
//! ```no_run
//! use lnwatch_monitor::config::SourceConfig;
//! use lnwatch_monitor::source::{AlertSource, HttpAlertSource};
//!
//! # async fn example() -> lnwatch_monitor::Result<()> {
//! let source = HttpAlertSource::from_config(&SourceConfig::default())?;
//! let alerts = source.fetch_alerts("02b1fe65...", None).await?;
//! println!("{} alerts", alerts.len());
//! # Ok(())
//! # }
//! ```

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use lnwatch_core::{Alert, Severity};
use serde::Deserialize;
use tracing::debug;

use crate::config::SourceConfig;
use crate::error::{MonitorError, Result};

/// The external alert-generating service.
#[async_trait]
pub trait AlertSource: Send + Sync {
    /// Fetch the current alerts for a node, optionally restricted to one severity.
    async fn fetch_alerts(&self, entity_id: &str, severity: Option<Severity>) -> Result<Vec<Alert>>;

    /// Whether the source can serve requests yet. Ticks are skipped while not ready.
    fn is_ready(&self) -> bool {
        true
    }

    /// Source name for logging.
    fn name(&self) -> &str;
}

/// Response body: either a bare array or `{"alerts": [...]}`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum AlertsPayload {
    List(Vec<Alert>),
    Envelope { alerts: Vec<Alert> },
}

impl AlertsPayload {
    fn into_alerts(self) -> Vec<Alert> {
        match self {
            AlertsPayload::List(alerts) => alerts,
            AlertsPayload::Envelope { alerts } => alerts,
        }
    }
}

/// Alert service client over HTTP.
///
/// Requests `GET {base_url}/api/nodes/{pubkey}/alerts[?severity=...]`.
pub struct HttpAlertSource {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    timeout_secs: u64,
}

impl HttpAlertSource {
    /// Create a client from config, reading the bearer token from the
    /// configured environment variable if one is named.
    pub fn from_config(config: &SourceConfig) -> Result<Self> {
        let api_key = match &config.api_key_env {
            Some(var) => Some(std::env::var(var).map_err(|_| {
                MonitorError::SourceNotReady(format!("{} environment variable not set", var))
            })?),
            None => None,
        };
        Self::build(config, api_key)
    }

    /// Create a client with an explicit bearer token.
    pub fn with_api_key(config: &SourceConfig, api_key: impl Into<String>) -> Result<Self> {
        Self::build(config, Some(api_key.into()))
    }

    fn build(config: &SourceConfig, api_key: Option<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| MonitorError::Platform(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            timeout_secs: config.timeout_secs,
        })
    }

    /// URL of the alert listing for a node.
    pub fn alerts_url(&self, entity_id: &str) -> String {
        format!("{}/api/nodes/{}/alerts", self.base_url, entity_id)
    }

    fn classify_send_error(&self, err: reqwest::Error) -> MonitorError {
        if err.is_timeout() {
            MonitorError::Timeout(self.timeout_secs, err.to_string())
        } else if err.is_connect() {
            MonitorError::ConnectionFailed(err.to_string())
        } else {
            MonitorError::HttpError(err)
        }
    }
}

#[async_trait]
impl AlertSource for HttpAlertSource {
    async fn fetch_alerts(&self, entity_id: &str, severity: Option<Severity>) -> Result<Vec<Alert>> {
        let url = self.alerts_url(entity_id);
        debug!(%url, ?severity, "Fetching alerts");

        let mut request = self.client.get(&url);
        if let Some(severity) = severity {
            request = request.query(&[("severity", severity.as_str())]);
        }
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| self.classify_send_error(e))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(MonitorError::EntityNotFound(entity_id.to_string()));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MonitorError::from_http_status(status.as_u16(), &body));
        }

        let body = response.text().await?;
        let payload: AlertsPayload = serde_json::from_str(&body)?;
        Ok(payload.into_alerts())
    }

    fn name(&self) -> &str {
        "http"
    }
}

// ============ Mock Source ============

#[derive(Debug, Clone)]
enum MockResponse {
    Alerts(Vec<Alert>),
    Failure(String),
}

/// Scripted alert source.
///
/// Responses are served in the order they were pushed; once the script runs
/// out the last response repeats. With nothing scripted it reports no alerts.
/// Failures surface as [`MonitorError::ConnectionFailed`].
#[derive(Debug)]
pub struct MockAlertSource {
    script: Mutex<VecDeque<MockResponse>>,
    last: Mutex<Option<MockResponse>>,
    requests: Mutex<Vec<(String, Option<Severity>)>>,
    ready: AtomicBool,
    calls: AtomicUsize,
    delay: Duration,
}

impl MockAlertSource {
    /// Create an empty, ready mock source.
    pub fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            last: Mutex::new(None),
            requests: Mutex::new(Vec::new()),
            ready: AtomicBool::new(true),
            calls: AtomicUsize::new(0),
            delay: Duration::ZERO,
        }
    }

    /// Delay every response (simulated network latency).
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Queue a successful response.
    pub fn push_alerts(&self, alerts: Vec<Alert>) {
        self.push(MockResponse::Alerts(alerts));
    }

    /// Queue a failed response.
    pub fn push_failure(&self, message: impl Into<String>) {
        self.push(MockResponse::Failure(message.into()));
    }

    fn push(&self, response: MockResponse) {
        self.script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(response);
    }

    /// Toggle readiness.
    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::SeqCst);
    }

    /// Number of fetches served so far.
    pub fn fetch_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Every `(entity_id, severity)` pair requested so far.
    pub fn requests(&self) -> Vec<(String, Option<Severity>)> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn next_response(&self) -> Option<MockResponse> {
        let next = self
            .script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front();
        let mut last = self.last.lock().unwrap_or_else(|e| e.into_inner());
        match next {
            Some(response) => {
                *last = Some(response.clone());
                Some(response)
            }
            None => last.clone(),
        }
    }
}

impl Default for MockAlertSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AlertSource for MockAlertSource {
    async fn fetch_alerts(&self, entity_id: &str, severity: Option<Severity>) -> Result<Vec<Alert>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((entity_id.to_string(), severity));

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        match self.next_response() {
            Some(MockResponse::Alerts(alerts)) => Ok(alerts),
            Some(MockResponse::Failure(message)) => Err(MonitorError::ConnectionFailed(message)),
            None => Ok(Vec::new()),
        }
    }

    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    fn name(&self) -> &str {
        "mock"
    }
}
