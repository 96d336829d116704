//! [`Rule`] – one declarative safety rule.
//!
//! Rules are read from YAML as a [`RuleDocument`] and converted into a
//! validated [`Rule`] by [`Rule::from_document`].  Conversion is where every
//! configuration error is caught: a condition string that does not parse, a
//! negative duration, or a malformed action entry all reject the rule instead
//! of leaving a rule behind that can never match.
//!
//! ```yaml
//! - id: safety/battery-low
//!   severity: critical
//!   description: Battery voltage below safe operating level
//!   trigger:
//!     metric: battery_voltage_volts
//!     condition: "< 6.0"
//!     duration_seconds: 15
//!   enforcement_action:
//!     - stop_actuators
//!     - alert_operator: "Battery critically low"
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crawlguard_types::{ActionSpec, Severity};
use schemars::JsonSchema;
use serde::Deserialize;
use thiserror::Error;

// ────────────────────────────────────────────────────────────────────────────
// Errors
// ────────────────────────────────────────────────────────────────────────────

/// Reasons a [`RuleDocument`] is rejected.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RuleError {
    #[error("field `{0}` must not be empty")]
    EmptyField(&'static str),

    #[error("invalid condition {condition:?}: {reason}")]
    InvalidCondition { condition: String, reason: String },

    #[error("duration_seconds must be a finite, non-negative number (got {0})")]
    InvalidDuration(f64),

    #[error("malformed enforcement action: {0}")]
    MalformedAction(String),
}

// ────────────────────────────────────────────────────────────────────────────
// Condition
// ────────────────────────────────────────────────────────────────────────────

/// Comparison operator of a trigger condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparator {
    Greater,
    Less,
    GreaterOrEqual,
    LessOrEqual,
    Equal,
    NotEqual,
}

impl Comparator {
    pub fn symbol(&self) -> &'static str {
        match self {
            Comparator::Greater => ">",
            Comparator::Less => "<",
            Comparator::GreaterOrEqual => ">=",
            Comparator::LessOrEqual => "<=",
            Comparator::Equal => "==",
            Comparator::NotEqual => "!=",
        }
    }

    pub fn apply(&self, value: f64, threshold: f64) -> bool {
        match self {
            Comparator::Greater => value > threshold,
            Comparator::Less => value < threshold,
            Comparator::GreaterOrEqual => value >= threshold,
            Comparator::LessOrEqual => value <= threshold,
            Comparator::Equal => value == threshold,
            Comparator::NotEqual => value != threshold,
        }
    }
}

impl FromStr for Comparator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            ">" => Ok(Comparator::Greater),
            "<" => Ok(Comparator::Less),
            ">=" => Ok(Comparator::GreaterOrEqual),
            "<=" => Ok(Comparator::LessOrEqual),
            "==" => Ok(Comparator::Equal),
            "!=" => Ok(Comparator::NotEqual),
            other => Err(format!("unsupported operator {other:?}")),
        }
    }
}

/// A parsed `<operator> <threshold>` condition such as `< 6.0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Condition {
    pub comparator: Comparator,
    pub threshold: f64,
}

impl Condition {
    /// Return `true` when `value` satisfies the condition.
    pub fn matches(&self, value: f64) -> bool {
        self.comparator.apply(value, self.threshold)
    }
}

impl FromStr for Condition {
    type Err = RuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: String| RuleError::InvalidCondition {
            condition: s.to_string(),
            reason,
        };

        let parts: Vec<&str> = s.split_whitespace().collect();
        let [op, threshold] = parts.as_slice() else {
            return Err(invalid(format!(
                "expected `<operator> <threshold>`, found {} token(s)",
                parts.len()
            )));
        };
        let comparator = op.parse::<Comparator>().map_err(invalid)?;
        let threshold = threshold
            .parse::<f64>()
            .map_err(|_| invalid(format!("threshold {threshold:?} is not a number")))?;
        if !threshold.is_finite() {
            return Err(invalid(format!("threshold {threshold} is not finite")));
        }
        Ok(Condition {
            comparator,
            threshold,
        })
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.comparator.symbol(), self.threshold)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Declarative documents (YAML shape)
// ────────────────────────────────────────────────────────────────────────────

/// A rule record exactly as written in a rule file.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct RuleDocument {
    /// Globally unique rule identifier, e.g. `safety/battery-low`.
    pub id: String,
    pub severity: Severity,
    pub description: String,
    pub trigger: TriggerDocument,
    /// Ordered list of actions to run when the rule fires.
    pub enforcement_action: Vec<ActionDocument>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct TriggerDocument {
    /// Metric name looked up in each snapshot.
    pub metric: String,
    /// `<operator> <threshold>`, operator one of `> < >= <= == !=`.
    pub condition: String,
    /// How long the condition must hold before the rule fires; 0 fires
    /// on every matching evaluation.
    #[serde(default)]
    pub duration_seconds: f64,
}

/// One `enforcement_action` entry: a bare identifier or `{identifier: param}`.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum ActionDocument {
    Bare(String),
    WithParam(BTreeMap<String, Option<ParamValue>>),
}

/// Scalar action parameter.  Numbers and booleans are carried as text.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum ParamValue {
    Text(String),
    Number(f64),
    Flag(bool),
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Text(s) => write!(f, "{s}"),
            ParamValue::Number(n) => write!(f, "{n}"),
            ParamValue::Flag(b) => write!(f, "{b}"),
        }
    }
}

impl ActionDocument {
    fn resolve(self) -> Result<ActionSpec, RuleError> {
        match self {
            ActionDocument::Bare(identifier) => {
                if identifier.trim().is_empty() {
                    return Err(RuleError::MalformedAction(
                        "empty action identifier".to_string(),
                    ));
                }
                Ok(ActionSpec::parse(identifier.trim(), None))
            }
            ActionDocument::WithParam(map) => {
                if map.len() != 1 {
                    return Err(RuleError::MalformedAction(format!(
                        "expected exactly one `identifier: param` pair, found {}",
                        map.len()
                    )));
                }
                let Some((identifier, param)) = map.into_iter().next() else {
                    return Err(RuleError::MalformedAction("empty action map".to_string()));
                };
                Ok(ActionSpec::parse(
                    identifier.trim(),
                    param.map(|p| p.to_string()),
                ))
            }
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Rule
// ────────────────────────────────────────────────────────────────────────────

/// What a rule watches and for how long.
#[derive(Debug, Clone, PartialEq)]
pub struct Trigger {
    pub metric: String,
    pub condition: Condition,
    /// Zero means the rule fires on every evaluation where the condition
    /// holds, with no hysteresis.
    pub duration: Duration,
}

/// A validated safety rule.  Immutable after load.
#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    pub id: String,
    pub severity: Severity,
    pub description: String,
    pub trigger: Trigger,
    pub enforcement_action: Vec<ActionSpec>,
}

impl Rule {
    /// Validate a [`RuleDocument`] into a [`Rule`].
    ///
    /// # Errors
    ///
    /// Returns a [`RuleError`] for an empty id or metric, a condition that
    /// does not parse, a negative or non-finite duration, or a malformed
    /// action entry.
    pub fn from_document(doc: RuleDocument) -> Result<Self, RuleError> {
        if doc.id.trim().is_empty() {
            return Err(RuleError::EmptyField("id"));
        }
        if doc.trigger.metric.trim().is_empty() {
            return Err(RuleError::EmptyField("trigger.metric"));
        }
        let condition: Condition = doc.trigger.condition.parse()?;
        let duration = Duration::try_from_secs_f64(doc.trigger.duration_seconds)
            .map_err(|_| RuleError::InvalidDuration(doc.trigger.duration_seconds))?;
        let enforcement_action = doc
            .enforcement_action
            .into_iter()
            .map(ActionDocument::resolve)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Rule {
            id: doc.id.trim().to_string(),
            severity: doc.severity,
            description: doc.description,
            trigger: Trigger {
                metric: doc.trigger.metric.trim().to_string(),
                condition,
                duration,
            },
            enforcement_action,
        })
    }

    /// `true` when the rule must hold for a window before it fires.
    pub fn is_duration_gated(&self) -> bool {
        !self.trigger.duration.is_zero()
    }
}
