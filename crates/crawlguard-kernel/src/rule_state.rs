//! [`RuleStateTracker`] – per-rule duration-window state.
//!
//! Only duration-gated rules ever hold state.  A rule is *armed* from the
//! first evaluation where its condition holds until the first evaluation
//! where it does not.  Firing never disarms a rule, so an armed rule keeps
//! firing on every evaluation for as long as the hazard persists.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

/// Mutable evaluation state of a single rule.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RuleEvaluationState {
    /// Set while the condition has been continuously true since this instant.
    pub armed_since: Option<DateTime<Utc>>,
}

/// Owned map of [`RuleEvaluationState`] keyed by rule id.
///
/// Each [`RulesEngine`][crate::rules_engine::RulesEngine] owns its own
/// tracker, so independent engines never observe each other's windows.
#[derive(Debug, Default)]
pub struct RuleStateTracker {
    states: HashMap<String, RuleEvaluationState>,
}

impl RuleStateTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// The instant `rule_id` was armed, if it is armed.
    pub fn armed_since(&self, rule_id: &str) -> Option<DateTime<Utc>> {
        self.states.get(rule_id).and_then(|s| s.armed_since)
    }

    /// Arm `rule_id` at `timestamp` unless it is already armed.
    ///
    /// Returns the effective arming instant (the existing one when the rule
    /// was already armed).
    pub fn arm(&mut self, rule_id: &str, timestamp: DateTime<Utc>) -> DateTime<Utc> {
        let state = self.states.entry(rule_id.to_string()).or_default();
        *state.armed_since.get_or_insert(timestamp)
    }

    /// Clear the window of `rule_id`.  Returns `true` if it was armed.
    pub fn disarm(&mut self, rule_id: &str) -> bool {
        self.states
            .get_mut(rule_id)
            .and_then(|s| s.armed_since.take())
            .is_some()
    }

    /// Number of rules currently armed.
    pub fn armed_count(&self) -> usize {
        self.states
            .values()
            .filter(|s| s.armed_since.is_some())
            .count()
    }
}
