//! Subcommand implementations.

use std::sync::Arc;

use chrono::Utc;
use colored::Colorize;
use crawlguard_hal::{ActuatorBank, FlagFile, Systemctl};
use crawlguard_kernel::{RuleDocument, RulesEngine};
use crawlguard_runtime::{
    AlertRoute, AlertSender, CycleReport, EnforcementDispatcher, HttpMetricsSource, HttpTransport,
    RateLimitRecord, WatchdogConfig, WatchdogLoop,
};
use crawlguard_types::{ActionSpec, MetricsSnapshot};
use tokio::sync::watch;
use tracing::{info, warn};

use crate::config::Config;

/// How a subcommand failed; decides the exit code.
#[derive(Debug)]
pub enum CliError {
    /// Bad config or rules.  Exit code 2.
    Config(String),
    /// Anything else.  Exit code 1.
    Runtime(String),
}

/// Parse a `--metric name=value` argument.
pub fn parse_metric(arg: &str) -> Result<(String, f64), String> {
    let (name, value) = arg
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got '{arg}'"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("missing metric name in '{arg}'"));
    }
    let value = value
        .trim()
        .parse::<f64>()
        .map_err(|e| format!("invalid value for '{name}': {e}"))?;
    Ok((name.to_string(), value))
}

// ─────────────────────────────────────────────────────────────────────────────
// run
// ─────────────────────────────────────────────────────────────────────────────

pub fn run(cfg: &Config, enforce: bool, once: bool) -> Result<(), CliError> {
    let engine = load_engine(cfg)?;
    let dry_run = cfg.dry_run && !enforce;

    let source = HttpMetricsSource::new(cfg.metrics_url.clone(), cfg.http_timeout())
        .map_err(|e| CliError::Runtime(e.to_string()))?;
    let alerts = alert_route(cfg)?;
    let actuators = actuator_bank();

    println!("  Rules:     {}", engine.rules().len().to_string().bold());
    if actuators.is_empty() {
        println!(
            "  Actuators: {}",
            format!("none registered; stop_actuators stops {}", cfg.motion_service).dimmed()
        );
    } else {
        println!("  Actuators: {}", actuators.len().to_string().bold());
    }
    println!("  Metrics:   {}", cfg.metrics_url.dimmed());
    println!(
        "  Alerts:    {}",
        cfg.alert_webhook_url
            .as_deref()
            .map(|u| u.normal())
            .unwrap_or_else(|| "log only".dimmed())
    );
    if dry_run {
        println!("  Mode:      {}", "DRY-RUN (actions are simulated)".yellow().bold());
    } else {
        println!("  Mode:      {}", "ENFORCING".red().bold());
    }
    println!();

    let mut watchdog = WatchdogLoop::new(
        engine,
        Box::new(source),
        dispatcher(cfg, actuators),
        WatchdogConfig {
            poll_interval: cfg.poll_interval(),
            dry_run,
            ..WatchdogConfig::default()
        },
    );
    if let Some(route) = alerts {
        watchdog = watchdog.with_alerts(route);
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| CliError::Runtime(format!("failed to start async runtime: {e}")))?;

    if once {
        return runtime.block_on(async move {
            let report = watchdog
                .run_cycle()
                .await
                .map_err(|e| CliError::Runtime(e.to_string()))?;
            print_report(&report);
            let delivered = watchdog.drain_alerts().await;
            info!(delivered, "single cycle complete");
            Ok(())
        });
    }

    let (stop_tx, stop_rx) = watch::channel(false);
    if let Err(e) = ctrlc::set_handler(move || {
        println!();
        println!(
            "{}",
            "⚠  Shutdown requested – finishing the current cycle …".yellow().bold()
        );
        let _ = stop_tx.send(true);
    }) {
        warn!(error = %e, "failed to install signal handler; stop the process with SIGKILL");
    }

    runtime.block_on(watchdog.run(stop_rx));
    println!("{}", "  ✓ Watchdog stopped.".green());
    Ok(())
}

/// Motion drivers linked into this binary.  None are, so `stop_actuators`
/// falls back to stopping the motion service.  A driver crate registers its
/// controllers here.
fn actuator_bank() -> ActuatorBank {
    ActuatorBank::new()
}

fn dispatcher(cfg: &Config, actuators: ActuatorBank) -> EnforcementDispatcher {
    EnforcementDispatcher::new(
        actuators,
        Box::new(Systemctl::new()),
        FlagFile::new("throttle", cfg.throttle_flag_path.clone()),
        FlagFile::new("upload_block", cfg.upload_block_flag_path.clone()),
    )
    .with_motion_service(cfg.motion_service.clone())
    .with_default_restart_agent(cfg.default_restart_agent.clone())
}

fn alert_route(cfg: &Config) -> Result<Option<AlertRoute>, CliError> {
    let Some(sink) = cfg.alert_webhook_url.clone() else {
        return Ok(None);
    };
    let transport =
        HttpTransport::new(cfg.http_timeout()).map_err(|e| CliError::Runtime(e.to_string()))?;
    let record = match &cfg.alert_state_path {
        Some(path) => RateLimitRecord::persisted(cfg.alert_rate_limit(), path.clone()),
        None => RateLimitRecord::new(cfg.alert_rate_limit()),
    };
    Ok(Some(AlertRoute {
        sender: Arc::new(AlertSender::new(Box::new(transport), record)),
        sink,
        retries: cfg.alert_retries,
        backoff: cfg.alert_backoff(),
    }))
}

fn print_report(report: &CycleReport) {
    if report.dispatches.is_empty() {
        println!("  {}", "No rules triggered.".green());
        return;
    }
    for dispatch in &report.dispatches {
        println!("  {} {}", "▶".red().bold(), dispatch.rule_id.bold());
        for outcome in &dispatch.outcomes {
            let mark = if outcome.succeeded {
                "✓".green()
            } else {
                "✗".red()
            };
            println!("      {mark} {}", outcome.action);
        }
    }
    if report.alerts_queued > 0 {
        println!("  {} alert(s) queued", report.alerts_queued);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// check
// ─────────────────────────────────────────────────────────────────────────────

pub fn check(cfg: &Config, metrics: Vec<(String, f64)>) -> Result<(), CliError> {
    let mut engine = load_engine(cfg)?;
    let snapshot: MetricsSnapshot = metrics.into_iter().collect();

    let fired = engine.evaluate(&snapshot, Utc::now());
    let dispatcher = dispatcher(cfg, actuator_bank());

    let mut dispatches = Vec::with_capacity(fired.len());
    for rule in fired {
        let outcomes = dispatcher.dispatch(&rule.actions, true);
        dispatches.push(crawlguard_runtime::RuleDispatch {
            rule_id: rule.rule_id,
            outcomes,
        });
    }
    print_report(&CycleReport {
        dispatches,
        alerts_queued: 0,
    });

    for rule in engine.rules() {
        if engine.armed_since(&rule.id).is_some() {
            println!(
                "  {} {} armed; fires after the condition holds for {}s",
                "…".yellow(),
                rule.id,
                rule.trigger.duration.as_secs_f64()
            );
        }
    }
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// validate / schema
// ─────────────────────────────────────────────────────────────────────────────

pub fn validate(cfg: &Config) -> Result<(), CliError> {
    let engine = load_engine(cfg)?;
    let mut unknown = 0usize;

    for rule in engine.rules() {
        let actions: Vec<String> = rule
            .enforcement_action
            .iter()
            .map(|spec| match spec {
                ActionSpec::Known(_) => spec.identifier().to_string(),
                ActionSpec::Unknown { identifier, .. } => {
                    unknown += 1;
                    format!("{}?", identifier).yellow().to_string()
                }
            })
            .collect();
        println!(
            "  {:<36} {:<9} {} {}{}  → {}",
            rule.id.bold(),
            rule.severity,
            rule.trigger.metric,
            rule.trigger.condition,
            if rule.is_duration_gated() {
                format!(" for {}s", rule.trigger.duration.as_secs_f64())
            } else {
                String::new()
            },
            actions.join(", ")
        );
    }

    println!();
    println!(
        "  {} {} rule(s) loaded",
        "✓".green().bold(),
        engine.rules().len()
    );
    if unknown > 0 {
        println!(
            "  {} {} unknown action(s) will fail at dispatch",
            "!".yellow().bold(),
            unknown
        );
    }
    Ok(())
}

pub fn schema() -> Result<(), CliError> {
    let schema = schemars::schema_for!(Vec<RuleDocument>);
    let text = serde_json::to_string_pretty(&schema)
        .map_err(|e| CliError::Runtime(format!("failed to encode schema: {e}")))?;
    println!("{text}");
    Ok(())
}

fn load_engine(cfg: &Config) -> Result<RulesEngine, CliError> {
    RulesEngine::from_sources(cfg.rule_sources.as_slice()).map_err(|e| CliError::Config(e.to_string()))
}
