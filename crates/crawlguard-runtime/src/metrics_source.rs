//! Metrics collaborator boundary.
//!
//! The watchdog consumes snapshots; it does not sample anything itself.
//! [`HttpMetricsSource`] scrapes a text exposition endpoint (`name value`
//! lines, Prometheus style) and [`parse_exposition`] flattens it into a
//! [`MetricsSnapshot`].

use std::time::Duration;

use async_trait::async_trait;
use crawlguard_types::{GuardError, MetricsSnapshot};
use tracing::debug;

/// Anything that can produce the current metrics snapshot.
#[async_trait]
pub trait MetricsSource: Send + Sync {
    /// # Errors
    ///
    /// [`GuardError::MetricsFetch`] when no snapshot could be obtained.
    async fn fetch(&self) -> Result<MetricsSnapshot, GuardError>;
}

/// Scrapes a metrics endpoint over HTTP.
pub struct HttpMetricsSource {
    url: String,
    client: reqwest::Client,
}

impl HttpMetricsSource {
    /// # Errors
    ///
    /// [`GuardError::Config`] if the HTTP client cannot be constructed.
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, GuardError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GuardError::Config(format!("failed to build metrics HTTP client: {e}")))?;
        Ok(Self {
            url: url.into(),
            client,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl MetricsSource for HttpMetricsSource {
    async fn fetch(&self) -> Result<MetricsSnapshot, GuardError> {
        let fetch_err = |e: reqwest::Error| GuardError::MetricsFetch(format!("{}: {e}", self.url));
        let text = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(fetch_err)?
            .error_for_status()
            .map_err(fetch_err)?
            .text()
            .await
            .map_err(fetch_err)?;
        Ok(parse_exposition(&text))
    }
}

/// Flatten a text exposition into one value per metric name.
///
/// Comment and blank lines are skipped, label sets are dropped, trailing
/// timestamps are ignored, and when a name occurs more than once the last
/// sample wins.  Malformed lines are skipped.
pub fn parse_exposition(text: &str) -> MetricsSnapshot {
    let mut snapshot = MetricsSnapshot::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        match parse_sample(line) {
            Some((name, value)) => {
                snapshot.insert(name.to_string(), value);
            }
            None => debug!(line, "skipping malformed exposition line"),
        }
    }
    snapshot
}

fn parse_sample(line: &str) -> Option<(&str, f64)> {
    let name_end = line
        .find(|c: char| c == '{' || c.is_whitespace())
        .unwrap_or(line.len());
    let name = &line[..name_end];
    if name.is_empty() {
        return None;
    }

    let mut rest = &line[name_end..];
    if rest.starts_with('{') {
        rest = &rest[label_block_len(rest)?..];
    }

    let value = rest.split_whitespace().next()?;
    value.parse::<f64>().ok().map(|v| (name, v))
}

// Length of a `{...}` label block, honouring quoted values and escapes.
fn label_block_len(s: &str) -> Option<usize> {
    let mut in_quotes = false;
    let mut escaped = false;
    for (i, c) in s.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' if in_quotes => escaped = true,
            '"' => in_quotes = !in_quotes,
            '}' if !in_quotes => return Some(i + 1),
            _ => {}
        }
    }
    None
}
