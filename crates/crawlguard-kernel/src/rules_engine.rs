//! [`RulesEngine`] – evaluates metric snapshots against the loaded rule set.
//!
//! For every rule, in rule-set order:
//!
//! 1. The rule's metric is absent from the snapshot → skipped, state untouched.
//! 2. The condition is false → the rule is disarmed, nothing is emitted.
//! 3. The condition is true and the rule has no duration → emitted.
//! 4. The condition is true and the rule is duration-gated:
//!    - not armed → armed at this timestamp, nothing emitted;
//!    - armed for at least the duration → emitted (and stays armed, so it
//!      re-fires on every following evaluation while the condition holds);
//!    - armed for less → nothing emitted.
//!
//! Duration gating only rejects transient spikes.  Deduplicating the physical
//! effect of a repeated action is the dispatcher's job, not the engine's.
//!
//! # Example
//!
//! ```
//! use chrono::{Duration, Utc};
//! use crawlguard_kernel::loader::parse_rules;
//! use crawlguard_kernel::RulesEngine;
//! use crawlguard_types::MetricsSnapshot;
//!
//! let rules = parse_rules(r#"
//! - id: safety/overtemp
//!   severity: high
//!   description: CPU running hot
//!   trigger: { metric: cpu_temp_celsius, condition: "> 85", duration_seconds: 10 }
//!   enforcement_action: [throttle_workload]
//! "#, std::path::Path::new("inline")).unwrap();
//! let mut engine = RulesEngine::new(rules);
//!
//! let t0 = Utc::now();
//! let hot = MetricsSnapshot::from([("cpu_temp_celsius".to_string(), 86.0)]);
//! assert!(engine.evaluate(&hot, t0).is_empty());
//! assert_eq!(engine.evaluate(&hot, t0 + Duration::seconds(11)).len(), 1);
//! ```

use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use crawlguard_types::{MetricsSnapshot, TriggeredRule};
use tracing::debug;

use crate::loader::{load_rules, RuleLoadError};
use crate::rule::Rule;
use crate::rule_state::RuleStateTracker;

/// Owns a rule set and the duration-window state of each rule.
#[derive(Debug, Default)]
pub struct RulesEngine {
    rules: Vec<Rule>,
    tracker: RuleStateTracker,
}

impl RulesEngine {
    /// Build an engine over `rules`.  An empty rule set is allowed and
    /// simply never fires.
    pub fn new(rules: Vec<Rule>) -> Self {
        Self {
            rules,
            tracker: RuleStateTracker::new(),
        }
    }

    /// Load rules from files or directories and build an engine.
    ///
    /// # Errors
    ///
    /// Propagates every [`RuleLoadError`], and returns
    /// [`RuleLoadError::NoRules`] when the sources hold no rule at all.
    pub fn from_sources<P: AsRef<Path>>(sources: &[P]) -> Result<Self, RuleLoadError> {
        let rules = load_rules(sources)?;
        if rules.is_empty() {
            let sources = sources
                .iter()
                .map(|p| p.as_ref().display().to_string())
                .collect::<Vec<_>>()
                .join(", ");
            return Err(RuleLoadError::NoRules { sources });
        }
        Ok(Self::new(rules))
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Look up a rule by id.
    pub fn rule(&self, rule_id: &str) -> Option<&Rule> {
        self.rules.iter().find(|r| r.id == rule_id)
    }

    /// The instant `rule_id` was armed, if its window is open.
    pub fn armed_since(&self, rule_id: &str) -> Option<DateTime<Utc>> {
        self.tracker.armed_since(rule_id)
    }

    /// Number of duration-gated rules currently inside their window.
    pub fn armed_count(&self) -> usize {
        self.tracker.armed_count()
    }

    /// Evaluate `snapshot`, taken at `timestamp`, against every rule.
    ///
    /// Returns one [`TriggeredRule`] per firing rule, in rule-set order.
    pub fn evaluate(
        &mut self,
        snapshot: &MetricsSnapshot,
        timestamp: DateTime<Utc>,
    ) -> Vec<TriggeredRule> {
        let mut triggered = Vec::new();

        for rule in &self.rules {
            let Some(&value) = snapshot.get(&rule.trigger.metric) else {
                continue;
            };

            if !rule.trigger.condition.matches(value) {
                if self.tracker.disarm(&rule.id) {
                    debug!(rule_id = %rule.id, value, "condition cleared; window reset");
                }
                continue;
            }

            if !rule.is_duration_gated() {
                triggered.push(fire(rule));
                continue;
            }

            match self.tracker.armed_since(&rule.id) {
                None => {
                    self.tracker.arm(&rule.id, timestamp);
                    debug!(
                        rule_id = %rule.id,
                        value,
                        window_secs = rule.trigger.duration.as_secs_f64(),
                        "condition holds; window opened"
                    );
                }
                Some(since) if elapsed(since, timestamp) >= rule.trigger.duration => {
                    triggered.push(fire(rule));
                }
                Some(_) => {}
            }
        }

        triggered
    }
}

fn fire(rule: &Rule) -> TriggeredRule {
    TriggeredRule {
        rule_id: rule.id.clone(),
        actions: rule.enforcement_action.clone(),
    }
}

// A timestamp earlier than the arming instant counts as no time elapsed.
fn elapsed(since: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    (now - since).to_std().unwrap_or(Duration::ZERO)
}
