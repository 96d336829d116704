//! [`WatchdogLoop`] – the safety control loop.
//!
//! Each cycle:
//!
//! 1. **Fetch** – pull a [`MetricsSnapshot`] from the [`MetricsSource`].  A
//!    failed fetch is logged and the cycle is skipped; the loop never exits
//!    because the collector is down.
//! 2. **Evaluate** – run the snapshot through the [`RulesEngine`].
//! 3. **Enforce** – dispatch each triggered rule's actions, rule by rule, in
//!    declaration order.  Dispatch runs on the blocking pool because effectors
//!    may shell out to the service manager.
//! 4. **Alert** – for every `alert_operator` action, and for every rule whose
//!    enforcement partly failed, queue an [`OperatorAlert`] on the
//!    [`AlertSender`].  Alerts are delivered by background tasks so a slow
//!    sink never delays the next cycle.
//! 5. **Sleep** – wait for the poll interval or a shutdown signal.
//!
//! Shutdown is only observed between cycles; an in-progress dispatch always
//! completes.  Queued alerts are awaited before [`WatchdogLoop::run`]
//! returns.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use crawlguard_kernel::{Rule, RulesEngine};
use crawlguard_types::{
    ActionOutcome, ActionSpec, EnforcementAction, GuardError, MetricsSnapshot, Severity,
    TriggeredRule,
};
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::alerting::AlertSender;
use crate::dispatcher::EnforcementDispatcher;
use crate::metrics_source::MetricsSource;

// ─────────────────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Loop tunables.
#[derive(Debug, Clone)]
pub struct WatchdogConfig {
    pub poll_interval: Duration,
    /// Passed to every dispatch.  `true` unless enforcement was explicitly
    /// enabled by the operator.
    pub dry_run: bool,
    /// How long shutdown waits for an alert still being delivered.
    pub alert_drain_timeout: Duration,
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            dry_run: true,
            alert_drain_timeout: Duration::from_secs(10),
        }
    }
}

/// Where and how operator alerts are delivered.
#[derive(Clone)]
pub struct AlertRoute {
    pub sender: Arc<AlertSender>,
    pub sink: String,
    pub retries: u32,
    pub backoff: Duration,
}

// ─────────────────────────────────────────────────────────────────────────────
// Reports and payloads
// ─────────────────────────────────────────────────────────────────────────────

/// JSON body posted to the alert sink.
#[derive(Debug, Clone, Serialize)]
pub struct OperatorAlert {
    pub id: Uuid,
    pub rule_id: String,
    pub severity: Severity,
    pub description: String,
    pub message: String,
    /// Actions of this rule that did not succeed, in dispatch order.
    pub failed_actions: Vec<String>,
    pub timestamp: DateTime<Utc>,
    pub dry_run: bool,
}

/// Outcomes of one triggered rule.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleDispatch {
    pub rule_id: String,
    pub outcomes: Vec<ActionOutcome>,
}

/// What one cycle did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CycleReport {
    pub dispatches: Vec<RuleDispatch>,
    pub alerts_queued: usize,
}

// ─────────────────────────────────────────────────────────────────────────────
// WatchdogLoop
// ─────────────────────────────────────────────────────────────────────────────

pub struct WatchdogLoop {
    engine: RulesEngine,
    source: Box<dyn MetricsSource>,
    dispatcher: Arc<EnforcementDispatcher>,
    alerts: Option<AlertRoute>,
    config: WatchdogConfig,
    in_flight: JoinSet<bool>,
}

impl WatchdogLoop {
    pub fn new(
        engine: RulesEngine,
        source: Box<dyn MetricsSource>,
        dispatcher: EnforcementDispatcher,
        config: WatchdogConfig,
    ) -> Self {
        Self {
            engine,
            source,
            dispatcher: Arc::new(dispatcher),
            alerts: None,
            config,
            in_flight: JoinSet::new(),
        }
    }

    /// Deliver operator alerts through `route`.  Without a route, alerts are
    /// only logged by the dispatcher.
    pub fn with_alerts(mut self, route: AlertRoute) -> Self {
        self.alerts = Some(route);
        self
    }

    pub fn engine(&self) -> &RulesEngine {
        &self.engine
    }

    /// Fetch one snapshot and act on it.
    ///
    /// # Errors
    ///
    /// Only a failed fetch, which the caller is expected to log and
    /// survive.
    pub async fn run_cycle(&mut self) -> Result<CycleReport, GuardError> {
        let snapshot = self.source.fetch().await?;
        Ok(self.evaluate_and_enforce(&snapshot, Utc::now()).await)
    }

    /// Evaluate `snapshot` taken at `timestamp`, dispatch every triggered
    /// rule, and queue the resulting alerts.
    pub async fn evaluate_and_enforce(
        &mut self,
        snapshot: &MetricsSnapshot,
        timestamp: DateTime<Utc>,
    ) -> CycleReport {
        let mut report = CycleReport::default();

        for fired in self.engine.evaluate(snapshot, timestamp) {
            let identifiers: Vec<&str> = fired.actions.iter().map(|a| a.identifier()).collect();
            info!(rule_id = %fired.rule_id, actions = ?identifiers, "rule triggered");

            let outcomes = self.dispatch(&fired).await;

            let dry_run = self.config.dry_run;
            let alert = self
                .engine
                .rule(&fired.rule_id)
                .and_then(|rule| operator_alert(rule, &fired, &outcomes, timestamp, dry_run));
            if let Some(alert) = alert
                && self.queue_alert(&alert)
            {
                report.alerts_queued += 1;
            }

            report.dispatches.push(RuleDispatch {
                rule_id: fired.rule_id,
                outcomes,
            });
        }

        report
    }

    async fn dispatch(&self, fired: &TriggeredRule) -> Vec<ActionOutcome> {
        let dispatcher = Arc::clone(&self.dispatcher);
        let actions = fired.actions.clone();
        let dry_run = self.config.dry_run;

        match tokio::task::spawn_blocking(move || dispatcher.dispatch(&actions, dry_run)).await {
            Ok(outcomes) => outcomes,
            Err(e) => {
                error!(rule_id = %fired.rule_id, error = %e, "dispatch task failed");
                fired
                    .actions
                    .iter()
                    .map(|a| ActionOutcome::new(a.identifier(), false))
                    .collect()
            }
        }
    }

    // At most one delivery in flight; alerts raised meanwhile are dropped.
    fn queue_alert(&mut self, alert: &OperatorAlert) -> bool {
        let Some(route) = self.alerts.clone() else {
            debug!(rule_id = %alert.rule_id, "no alert sink configured; alert only logged");
            return false;
        };
        self.reap_alerts();
        if !self.in_flight.is_empty() {
            warn!(
                rule_id = %alert.rule_id,
                message = %alert.message,
                "previous alert still being delivered; alert dropped"
            );
            return false;
        }
        let payload = match serde_json::to_value(alert) {
            Ok(payload) => payload,
            Err(e) => {
                error!(rule_id = %alert.rule_id, error = %e, "failed to encode alert");
                return false;
            }
        };
        self.in_flight.spawn(async move {
            route
                .sender
                .send(&route.sink, &payload, route.retries, route.backoff)
                .await
        });
        true
    }

    /// Collect finished alert tasks without waiting.
    fn reap_alerts(&mut self) {
        while let Some(done) = self.in_flight.try_join_next() {
            if let Err(e) = done {
                error!(error = %e, "alert task failed");
            }
        }
    }

    /// Wait for queued alerts, at most `alert_drain_timeout`; whatever is
    /// still pending then is aborted.  Returns how many were delivered.
    pub async fn drain_alerts(&mut self) -> usize {
        let deadline = tokio::time::Instant::now() + self.config.alert_drain_timeout;
        let mut delivered = 0;
        loop {
            match tokio::time::timeout_at(deadline, self.in_flight.join_next()).await {
                Ok(Some(Ok(true))) => delivered += 1,
                Ok(Some(Ok(false))) => {}
                Ok(Some(Err(e))) => error!(error = %e, "alert task failed"),
                Ok(None) => break,
                Err(_) => {
                    warn!(
                        pending = self.in_flight.len(),
                        "alert delivery still running at shutdown; abandoning it"
                    );
                    self.in_flight.shutdown().await;
                    break;
                }
            }
        }
        delivered
    }

    /// Run until `shutdown` carries `true` or its sender is dropped.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!(
            rules = self.engine.rules().len(),
            interval_secs = self.config.poll_interval.as_secs_f64(),
            dry_run = self.config.dry_run,
            "watchdog started"
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            match self.run_cycle().await {
                Ok(report) => debug!(
                    triggered = report.dispatches.len(),
                    armed = self.engine.armed_count(),
                    alerts = report.alerts_queued,
                    "cycle complete"
                ),
                Err(e) => warn!(error = %e, "metrics fetch failed; retrying next cycle"),
            }
            self.reap_alerts();

            tokio::select! {
                _ = tokio::time::sleep(self.config.poll_interval) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        let delivered = self.drain_alerts().await;
        info!(delivered, "watchdog stopped");
    }
}

// One alert per triggered rule, owed when the rule asks for one or when any
// of its actions failed.  Failures ride in the same payload so the rate limit
// can never deliver the rule's message while suppressing the failure.
fn operator_alert(
    rule: &Rule,
    fired: &TriggeredRule,
    outcomes: &[ActionOutcome],
    timestamp: DateTime<Utc>,
    dry_run: bool,
) -> Option<OperatorAlert> {
    let fallback = if rule.description.is_empty() {
        rule.id.as_str()
    } else {
        rule.description.as_str()
    };

    let requested: Vec<&str> = fired
        .actions
        .iter()
        .filter_map(|spec| match spec {
            ActionSpec::Known(EnforcementAction::AlertOperator { message }) => {
                Some(message.as_deref().filter(|m| !m.is_empty()).unwrap_or(fallback))
            }
            _ => None,
        })
        .collect();
    let failed_actions: Vec<String> = outcomes
        .iter()
        .filter(|o| !o.succeeded)
        .map(|o| o.action.clone())
        .collect();

    let message = match (requested.is_empty(), failed_actions.is_empty()) {
        (true, true) => return None,
        (false, true) => requested.join("; "),
        (false, false) => format!(
            "{} (failed actions: {})",
            requested.join("; "),
            failed_actions.join(", ")
        ),
        (true, false) => format!(
            "enforcement failed for rule {}: {}",
            rule.id,
            failed_actions.join(", ")
        ),
    };

    Some(OperatorAlert {
        id: Uuid::new_v4(),
        rule_id: rule.id.clone(),
        severity: rule.severity,
        description: rule.description.clone(),
        message,
        failed_actions,
        timestamp,
        dry_run,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerting::{AlertTransport, RateLimitRecord, SinkResponse};
    use async_trait::async_trait;
    use crawlguard_hal::{ActuatorBank, FlagFile, SimMotionController, SimServiceManager};
    use crawlguard_kernel::parse_rules;
    use std::collections::VecDeque;
    use std::path::Path;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const RULES: &str = r#"
- id: safety/collision-imminent
  severity: critical
  description: Obstacle closer than 10 cm
  trigger: { metric: ultrasonic_distance_m, condition: "< 0.1" }
  enforcement_action: [stop_actuators, alert_operator]

- id: safety/overtemp
  severity: high
  description: CPU above 85 °C
  trigger: { metric: cpu_temp_celsius, condition: "> 85", duration_seconds: 10 }
  enforcement_action:
    - throttle_workload
    - alert_operator: CPU running hot

- id: privacy/no-raw-frame-upload
  severity: medium
  description: Raw frames stay on the robot
  trigger: { metric: camera_raw_upload_attempt, condition: ">= 1" }
  enforcement_action: [block_upload, shred_sd_card]
"#;

    /// Pops scripted snapshots; an empty script is an outage.
    struct ScriptedSource {
        script: Mutex<VecDeque<MetricsSnapshot>>,
        fetches: Arc<AtomicUsize>,
        repeat_last: bool,
    }

    impl ScriptedSource {
        fn new(script: Vec<MetricsSnapshot>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                fetches: Arc::new(AtomicUsize::new(0)),
                repeat_last: false,
            }
        }
    }

    #[async_trait]
    impl MetricsSource for ScriptedSource {
        async fn fetch(&self) -> Result<MetricsSnapshot, GuardError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            let mut script = self.script.lock().unwrap();
            let next = if self.repeat_last && script.len() == 1 {
                script.front().cloned()
            } else {
                script.pop_front()
            };
            next.ok_or_else(|| GuardError::MetricsFetch("collector offline".into()))
        }
    }

    /// Slow sink that never accepts anything.
    struct StallingSink;

    #[async_trait]
    impl AlertTransport for StallingSink {
        async fn post(
            &self,
            _url: &str,
            _payload: &serde_json::Value,
        ) -> Result<SinkResponse, GuardError> {
            tokio::time::sleep(Duration::from_millis(50)).await;
            Ok(SinkResponse {
                status: 503,
                body: "busy".to_string(),
            })
        }
    }

    #[derive(Clone, Default)]
    struct CapturingSink {
        payloads: Arc<Mutex<Vec<serde_json::Value>>>,
    }

    #[async_trait]
    impl AlertTransport for CapturingSink {
        async fn post(
            &self,
            _url: &str,
            payload: &serde_json::Value,
        ) -> Result<SinkResponse, GuardError> {
            self.payloads.lock().unwrap().push(payload.clone());
            Ok(SinkResponse {
                status: 200,
                body: String::new(),
            })
        }
    }

    fn snap(metric: &str, value: f64) -> MetricsSnapshot {
        MetricsSnapshot::from([(metric.to_string(), value)])
    }

    fn dispatcher(dir: &Path, motors: SimMotionController) -> EnforcementDispatcher {
        EnforcementDispatcher::new(
            ActuatorBank::new().with(Box::new(motors)),
            Box::new(SimServiceManager::failing()),
            FlagFile::new("throttle", dir.join("throttle")),
            FlagFile::new("upload_block", dir.join("upload")),
        )
    }

    fn watchdog_with(
        dir: &Path,
        source: ScriptedSource,
        motors: SimMotionController,
        config: WatchdogConfig,
    ) -> WatchdogLoop {
        let engine = RulesEngine::new(parse_rules(RULES, Path::new("test.yaml")).unwrap());
        WatchdogLoop::new(engine, Box::new(source), dispatcher(dir, motors), config)
    }

    fn watchdog(
        dir: &Path,
        source: ScriptedSource,
        motors: SimMotionController,
        dry_run: bool,
    ) -> WatchdogLoop {
        let config = WatchdogConfig {
            poll_interval: Duration::from_millis(5),
            dry_run,
            ..WatchdogConfig::default()
        };
        watchdog_with(dir, source, motors, config)
    }

    fn route_through(transport: Box<dyn AlertTransport>, window: Duration) -> AlertRoute {
        AlertRoute {
            sender: Arc::new(AlertSender::new(transport, RateLimitRecord::new(window))),
            sink: "http://operator.example/hook".to_string(),
            retries: 3,
            backoff: Duration::from_millis(10),
        }
    }

    fn route(sink: &CapturingSink) -> AlertRoute {
        route_through(Box::new(sink.clone()), Duration::ZERO)
    }

    #[tokio::test]
    async fn fetch_failure_is_reported_and_next_cycle_proceeds() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let source = ScriptedSource::new(vec![]);
        let mut wd = watchdog(dir.path(), source, SimMotionController::new("m"), true);
        assert!(matches!(
            wd.run_cycle().await,
            Err(GuardError::MetricsFetch(_))
        ));
    }

    #[tokio::test]
    async fn collision_in_dry_run_touches_nothing() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let motors = SimMotionController::new("m");
        let source = ScriptedSource::new(vec![snap("ultrasonic_distance_m", 0.05)]);
        let mut wd = watchdog(dir.path(), source, motors.clone(), true);

        let report = wd.run_cycle().await.unwrap();
        assert_eq!(report.dispatches.len(), 1);
        assert_eq!(
            report.dispatches[0].outcomes,
            vec![
                ActionOutcome::new("stop_actuators", true),
                ActionOutcome::new("alert_operator", true),
            ]
        );
        assert_eq!(motors.halt_count(), 0);
        // No sink configured.
        assert_eq!(report.alerts_queued, 0);
    }

    #[tokio::test]
    async fn collision_with_enforcement_halts_motors() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let motors = SimMotionController::new("m");
        let source = ScriptedSource::new(vec![snap("ultrasonic_distance_m", 0.05)]);
        let mut wd = watchdog(dir.path(), source, motors.clone(), false);

        wd.run_cycle().await.unwrap();
        assert_eq!(motors.halt_count(), 1);
    }

    #[tokio::test]
    async fn alert_operator_sends_payload_with_rule_context() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let sink = CapturingSink::default();
        let source = ScriptedSource::new(vec![snap("ultrasonic_distance_m", 0.05)]);
        let mut wd = watchdog(dir.path(), source, SimMotionController::new("m"), true)
            .with_alerts(route(&sink));

        let report = wd.run_cycle().await.unwrap();
        assert_eq!(report.alerts_queued, 1);
        assert_eq!(wd.drain_alerts().await, 1);

        let payloads = sink.payloads.lock().unwrap();
        assert_eq!(payloads.len(), 1);
        assert_eq!(payloads[0]["rule_id"], "safety/collision-imminent");
        assert_eq!(payloads[0]["severity"], "critical");
        assert_eq!(payloads[0]["message"], "Obstacle closer than 10 cm");
        assert_eq!(payloads[0]["dry_run"], true);
    }

    #[tokio::test]
    async fn alert_param_overrides_description() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let sink = CapturingSink::default();
        let t0 = Utc::now();
        let source = ScriptedSource::new(vec![]);
        let mut wd = watchdog(dir.path(), source, SimMotionController::new("m"), false)
            .with_alerts(route(&sink));

        let hot = snap("cpu_temp_celsius", 90.0);
        assert!(wd.evaluate_and_enforce(&hot, t0).await.dispatches.is_empty());
        let report = wd
            .evaluate_and_enforce(&hot, t0 + chrono::Duration::seconds(11))
            .await;
        assert_eq!(report.dispatches[0].rule_id, "safety/overtemp");
        wd.drain_alerts().await;

        let payloads = sink.payloads.lock().unwrap();
        assert_eq!(payloads[0]["message"], "CPU running hot");
    }

    #[tokio::test]
    async fn failed_enforcement_escalates_to_operator() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let sink = CapturingSink::default();
        let source = ScriptedSource::new(vec![snap("camera_raw_upload_attempt", 1.0)]);
        let mut wd = watchdog(dir.path(), source, SimMotionController::new("m"), false)
            .with_alerts(route(&sink));

        let report = wd.run_cycle().await.unwrap();
        assert_eq!(
            report.dispatches[0].outcomes,
            vec![
                ActionOutcome::new("block_upload", true),
                ActionOutcome::new("shred_sd_card", false),
            ]
        );
        assert_eq!(report.alerts_queued, 1);
        wd.drain_alerts().await;

        let payloads = sink.payloads.lock().unwrap();
        let message = payloads[0]["message"].as_str().unwrap();
        assert!(message.contains("shred_sd_card"));
        assert_eq!(payloads[0]["failed_actions"], serde_json::json!(["shred_sd_card"]));
    }

    #[tokio::test]
    async fn failure_is_reported_with_the_rules_own_alert_under_rate_limit() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let sink = CapturingSink::default();
        let source = ScriptedSource::new(vec![snap("ultrasonic_distance_m", 0.05)]);
        let mut wd = watchdog(dir.path(), source, SimMotionController::failing("m"), false)
            .with_alerts(route_through(Box::new(sink.clone()), Duration::from_secs(10)));

        let report = wd.run_cycle().await.unwrap();
        assert_eq!(
            report.dispatches[0].outcomes,
            vec![
                ActionOutcome::new("stop_actuators", false),
                ActionOutcome::new("alert_operator", true),
            ]
        );
        assert_eq!(report.alerts_queued, 1);
        assert_eq!(wd.drain_alerts().await, 1);

        let payloads = sink.payloads.lock().unwrap();
        assert_eq!(payloads.len(), 1);
        assert_eq!(
            payloads[0]["message"],
            "Obstacle closer than 10 cm (failed actions: stop_actuators)"
        );
        assert_eq!(payloads[0]["failed_actions"], serde_json::json!(["stop_actuators"]));
    }

    #[tokio::test]
    async fn unreachable_sink_holds_at_most_one_delivery() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let config = WatchdogConfig {
            alert_drain_timeout: Duration::from_millis(20),
            ..WatchdogConfig::default()
        };
        let mut wd = watchdog_with(
            dir.path(),
            ScriptedSource::new(vec![]),
            SimMotionController::new("m"),
            config,
        )
        .with_alerts(route_through(Box::new(StallingSink), Duration::ZERO));

        let t0 = Utc::now();
        let close = snap("ultrasonic_distance_m", 0.05);
        for i in 0..50 {
            let at = t0 + chrono::Duration::milliseconds(i);
            wd.evaluate_and_enforce(&close, at).await;
            assert!(wd.in_flight.len() <= 1);
        }

        let started = std::time::Instant::now();
        assert_eq!(wd.drain_alerts().await, 0);
        assert!(started.elapsed() < Duration::from_secs(1));
        assert!(wd.in_flight.is_empty());
    }

    #[tokio::test]
    async fn run_survives_outages_and_stops_on_signal() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let source = ScriptedSource::new(vec![snap("cpu_temp_celsius", 20.0)]);
        let fetches = Arc::clone(&source.fetches);
        let wd = watchdog(dir.path(), source, SimMotionController::new("m"), true);

        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(wd.run(rx));

        // First fetch succeeds, every later one is an outage.
        tokio::time::sleep(Duration::from_millis(60)).await;
        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("watchdog must stop after shutdown")
            .unwrap();
        assert!(fetches.load(Ordering::SeqCst) >= 2);
    }

    #[tokio::test]
    async fn run_stops_when_shutdown_sender_is_dropped() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let mut source = ScriptedSource::new(vec![snap("cpu_temp_celsius", 20.0)]);
        source.repeat_last = true;
        let wd = watchdog(dir.path(), source, SimMotionController::new("m"), true);

        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(wd.run(rx));
        drop(tx);
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("watchdog must stop when the signal source goes away")
            .unwrap();
    }

    fn single_rule(yaml: &str) -> (Rule, TriggeredRule) {
        let rule = parse_rules(yaml, Path::new("x.yaml")).unwrap().remove(0);
        let fired = TriggeredRule {
            rule_id: rule.id.clone(),
            actions: rule.enforcement_action.clone(),
        };
        (rule, fired)
    }

    #[test]
    fn alert_message_falls_back_to_rule_id() {
        let (rule, fired) = single_rule(
            r#"
- id: ops/ping
  severity: low
  description: ""
  trigger: { metric: m, condition: "> 0" }
  enforcement_action: [alert_operator]
"#,
        );
        let outcomes = vec![ActionOutcome::new("alert_operator", true)];
        let alert = operator_alert(&rule, &fired, &outcomes, Utc::now(), true).unwrap();
        assert_eq!(alert.message, "ops/ping");
        assert!(alert.failed_actions.is_empty());
    }

    #[test]
    fn no_alert_when_not_requested_and_nothing_failed() {
        let (rule, fired) = single_rule(
            r#"
- id: ops/throttle
  severity: low
  description: Throttle only
  trigger: { metric: m, condition: "> 0" }
  enforcement_action: [throttle_workload]
"#,
        );
        let outcomes = vec![ActionOutcome::new("throttle_workload", true)];
        assert!(operator_alert(&rule, &fired, &outcomes, Utc::now(), false).is_none());
    }
}
