//! `crawlguard-runtime` – Watchdog runtime
//!
//! Everything with side effects lives here: scraping metrics, dispatching
//! enforcement actions, delivering operator alerts, and the loop that ties
//! them together.
//!
//! - [`metrics_source`] – [`MetricsSource`][metrics_source::MetricsSource]
//!   and the Prometheus text-exposition scraper.
//! - [`dispatcher`] – [`EnforcementDispatcher`][dispatcher::EnforcementDispatcher]:
//!   runs action lists against the effectors in `crawlguard-hal`.
//! - [`alerting`] – [`AlertSender`][alerting::AlertSender]: rate-limited,
//!   retrying webhook delivery.
//! - [`watchdog`] – [`WatchdogLoop`][watchdog::WatchdogLoop]: fetch,
//!   evaluate, enforce, alert, sleep.
//! - [`telemetry`] – `tracing` subscriber and optional OTLP export.

pub mod alerting;
pub mod dispatcher;
pub mod metrics_source;
pub mod telemetry;
pub mod watchdog;

#[cfg(test)]
mod test_support;

pub use alerting::{AlertSender, AlertTransport, HttpTransport, RateLimitRecord, SinkResponse};
pub use dispatcher::EnforcementDispatcher;
pub use metrics_source::{HttpMetricsSource, MetricsSource, parse_exposition};
pub use watchdog::{AlertRoute, CycleReport, OperatorAlert, RuleDispatch, WatchdogConfig, WatchdogLoop};
