use std::collections::HashMap;
use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One point-in-time reading of every exported metric, keyed by metric name.
///
/// Metrics that no rule references are carried along and ignored.
pub type MetricsSnapshot = HashMap<String, f64>;

/// Operator-facing severity of a safety rule.
///
/// Informational only: severity never changes evaluation or dispatch order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Low => write!(f, "low"),
            Severity::Medium => write!(f, "medium"),
            Severity::High => write!(f, "high"),
            Severity::Critical => write!(f, "critical"),
        }
    }
}

/// Closed set of enforcement effects the dispatcher knows how to perform.
///
/// Adding a variant forces every `match` in the dispatcher to handle it, so a
/// new action cannot be declared without an effector behind it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", content = "param", rename_all = "snake_case")]
pub enum EnforcementAction {
    /// Halt all motion on the robot.
    StopActuators,
    /// Raise the shared throttle flag polled by cooperating workloads.
    ThrottleWorkload,
    /// Notify a human operator. `message` overrides the default text.
    AlertOperator { message: Option<String> },
    /// Restart a degraded agent service. `agent` overrides the default unit.
    RestartAgent { agent: Option<String> },
    /// Raise the shared flag that blocks raw camera frame uploads.
    BlockUpload,
}

impl EnforcementAction {
    /// Canonical identifier as written in rule files.
    pub fn identifier(&self) -> &'static str {
        match self {
            EnforcementAction::StopActuators => "stop_actuators",
            EnforcementAction::ThrottleWorkload => "throttle_workload",
            EnforcementAction::AlertOperator { .. } => "alert_operator",
            EnforcementAction::RestartAgent { .. } => "restart_agent",
            EnforcementAction::BlockUpload => "block_upload",
        }
    }

    /// Resolve an identifier (and its optional parameter) against the action
    /// table.  Legacy identifiers from older rule files are accepted as
    /// aliases.  Returns `None` for identifiers outside the table.
    pub fn from_identifier(identifier: &str, param: Option<String>) -> Option<Self> {
        let action = match identifier {
            "stop_actuators" | "stop_motors" => EnforcementAction::StopActuators,
            "throttle_workload" | "throttle_cpu_tasks" => EnforcementAction::ThrottleWorkload,
            "alert_operator" => EnforcementAction::AlertOperator { message: param },
            "restart_agent" | "attempt_restart_agent" => {
                EnforcementAction::RestartAgent { agent: param }
            }
            "block_upload" => EnforcementAction::BlockUpload,
            _ => return None,
        };
        Some(action)
    }
}

/// One entry of a rule's `enforcement_action` list, resolved at load time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionSpec {
    Known(EnforcementAction),
    /// An identifier missing from the action table.  Kept so the dispatcher
    /// can report it as a failed action instead of dropping it silently.
    Unknown {
        identifier: String,
        param: Option<String>,
    },
}

impl ActionSpec {
    pub fn parse(identifier: &str, param: Option<String>) -> Self {
        match EnforcementAction::from_identifier(identifier, param.clone()) {
            Some(action) => ActionSpec::Known(action),
            None => ActionSpec::Unknown {
                identifier: identifier.to_string(),
                param,
            },
        }
    }

    pub fn identifier(&self) -> &str {
        match self {
            ActionSpec::Known(action) => action.identifier(),
            ActionSpec::Unknown { identifier, .. } => identifier,
        }
    }
}

impl From<EnforcementAction> for ActionSpec {
    fn from(action: EnforcementAction) -> Self {
        ActionSpec::Known(action)
    }
}

/// A rule whose trigger fired during one evaluation, with the actions to run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggeredRule {
    pub rule_id: String,
    pub actions: Vec<ActionSpec>,
}

/// Result of dispatching one action spec.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionOutcome {
    pub action: String,
    pub succeeded: bool,
}

impl ActionOutcome {
    pub fn new(action: impl Into<String>, succeeded: bool) -> Self {
        Self {
            action: action.into(),
            succeeded,
        }
    }
}

/// Workspace-wide error type.
///
/// Only [`GuardError::Config`] is fatal; every other variant is recovered
/// locally by the watchdog.
#[derive(Error, Debug, Serialize, Deserialize)]
pub enum GuardError {
    #[error("Configuration Error: {0}")]
    Config(String),

    #[error("Metrics Fetch Failed: {0}")]
    MetricsFetch(String),

    #[error("Effector Fault on {component}: {details}")]
    EffectorFault { component: String, details: String },

    #[error("Alert Delivery Failed: {0}")]
    AlertDelivery(String),
}
