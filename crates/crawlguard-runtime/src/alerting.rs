//! [`AlertSender`] – operator notifications to a webhook sink.
//!
//! Delivery is an HTTP `POST` of a JSON payload.  A 2xx response is success;
//! anything else, or a transport error, is retried with linear backoff
//! (`backoff * attempt`, attempts numbered from 1).
//!
//! # Rate limiting
//!
//! A [`RateLimitRecord`] holds the time of the last *successful* send.  A send
//! attempted within the window after it returns `false` without touching the
//! network.  The record's lock is held from the window check until the
//! outcome is recorded, so two concurrent senders can never both pass the
//! check.  When a state path is configured the record is also persisted, and
//! a restarted watchdog honours the window of its predecessor.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use crawlguard_types::GuardError;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

// ─────────────────────────────────────────────────────────────────────────────
// Transport
// ─────────────────────────────────────────────────────────────────────────────

/// Status and body returned by the sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkResponse {
    pub status: u16,
    pub body: String,
}

impl SinkResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Outbound leg of an alert.  Implementations make exactly one attempt per
/// call; retrying is the sender's job.
#[async_trait]
pub trait AlertTransport: Send + Sync {
    /// # Errors
    ///
    /// [`GuardError::AlertDelivery`] when no response was received.
    async fn post(
        &self,
        url: &str,
        payload: &serde_json::Value,
    ) -> Result<SinkResponse, GuardError>;
}

/// `reqwest` implementation of [`AlertTransport`].
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Build a transport whose requests give up after `timeout`.
    ///
    /// # Errors
    ///
    /// [`GuardError::Config`] if the HTTP client cannot be constructed.
    pub fn new(timeout: Duration) -> Result<Self, GuardError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GuardError::Config(format!("failed to build alert HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl AlertTransport for HttpTransport {
    async fn post(
        &self,
        url: &str,
        payload: &serde_json::Value,
    ) -> Result<SinkResponse, GuardError> {
        let response = self
            .client
            .post(url)
            .json(payload)
            .send()
            .await
            .map_err(|e| GuardError::AlertDelivery(e.to_string()))?;
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        Ok(SinkResponse { status, body })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Rate-limit record
// ─────────────────────────────────────────────────────────────────────────────

/// Process-wide "last alert sent" timestamp.
pub struct RateLimitRecord {
    window: Duration,
    last_sent: Mutex<Option<DateTime<Utc>>>,
    path: Option<PathBuf>,
}

impl RateLimitRecord {
    /// In-memory record with the given suppression window.
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_sent: Mutex::new(None),
            path: None,
        }
    }

    /// Record persisted at `path`.  An existing record file is loaded; a
    /// missing, unreadable, or corrupt one counts as "no prior alert".
    pub fn persisted(window: Duration, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let last_sent = read_record(&path);
        Self {
            window,
            last_sent: Mutex::new(last_sent),
            path: Some(path),
        }
    }

    /// Seed the record with a previous successful send.
    pub fn with_last_sent(mut self, at: DateTime<Utc>) -> Self {
        self.last_sent = Mutex::new(Some(at));
        self
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub async fn last_sent(&self) -> Option<DateTime<Utc>> {
        *self.last_sent.lock().await
    }
}

fn read_record(path: &Path) -> Option<DateTime<Utc>> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to read alert rate-limit record");
            return None;
        }
    };
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    // Older records hold fractional unix seconds.
    if let Some(ts) = raw
        .parse::<f64>()
        .ok()
        .filter(|s| s.is_finite())
        .and_then(|s| Utc.timestamp_millis_opt((s * 1000.0) as i64).single())
    {
        return Some(ts);
    }
    warn!(path = %path.display(), "corrupt alert rate-limit record; ignoring it");
    None
}

fn within_window(last: DateTime<Utc>, now: DateTime<Utc>, window: Duration) -> bool {
    match (now - last).to_std() {
        Ok(elapsed) => elapsed < window,
        // A record from the future is treated as just sent.
        Err(_) => true,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// AlertSender
// ─────────────────────────────────────────────────────────────────────────────

/// Rate-limited, retrying webhook client.  Share it behind an `Arc`.
pub struct AlertSender {
    transport: Box<dyn AlertTransport>,
    record: RateLimitRecord,
}

impl AlertSender {
    pub fn new(transport: Box<dyn AlertTransport>, record: RateLimitRecord) -> Self {
        Self { transport, record }
    }

    pub fn record(&self) -> &RateLimitRecord {
        &self.record
    }

    /// Deliver `payload` to `sink`, making at most `retries` attempts.
    ///
    /// Returns `true` on the first 2xx response.  Returns `false` when
    /// suppressed by the rate limit or when every attempt failed.  Never
    /// returns an error: all failures are logged here.
    pub async fn send(
        &self,
        sink: &str,
        payload: &serde_json::Value,
        retries: u32,
        backoff: Duration,
    ) -> bool {
        let mut last_sent = self.record.last_sent.lock().await;

        if let Some(last) = *last_sent
            && within_window(last, Utc::now(), self.record.window)
        {
            info!(last_sent = %last, "alert rate limit in effect; skipping alert");
            return false;
        }

        for attempt in 1..=retries {
            match self.transport.post(sink, payload).await {
                Ok(response) if response.is_success() => {
                    info!(attempt, status = response.status, "alert sent");
                    let now = Utc::now();
                    *last_sent = Some(now);
                    self.persist(now);
                    return true;
                }
                Ok(response) => warn!(
                    attempt,
                    status = response.status,
                    body = %response.body,
                    "alert rejected by sink"
                ),
                Err(e) => warn!(attempt, error = %e, "alert delivery failed"),
            }

            if attempt < retries {
                tokio::time::sleep(retry_delay(backoff, attempt)).await;
            }
        }

        error!(retries, "all alert attempts failed");
        false
    }

    fn persist(&self, at: DateTime<Utc>) {
        let Some(path) = &self.record.path else {
            return;
        };
        match fs::write(path, at.to_rfc3339()) {
            Ok(()) => debug!(path = %path.display(), "alert rate-limit record updated"),
            Err(e) => {
                error!(path = %path.display(), error = %e, "failed to write alert rate-limit record")
            }
        }
    }
}

/// Linear backoff before the retry that follows `attempt`, saturating at
/// `Duration::MAX`.
fn retry_delay(backoff: Duration, attempt: u32) -> Duration {
    backoff.saturating_mul(attempt)
}
