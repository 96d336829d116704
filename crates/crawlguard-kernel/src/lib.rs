//! `crawlguard-kernel` – Safety Rules
//!
//! The part of CrawlGuard that decides *whether* to act.  It never touches
//! hardware; it turns metric snapshots into lists of actions.
//!
//! # Modules
//!
//! - [`rule`] – [`Rule`][rule::Rule]: one declarative safety rule, parsed
//!   and validated from its YAML [`RuleDocument`][rule::RuleDocument].
//! - [`rule_state`] – [`RuleStateTracker`][rule_state::RuleStateTracker]:
//!   per-rule duration windows, owned by a single engine.
//! - [`rules_engine`] – [`RulesEngine`][rules_engine::RulesEngine]:
//!   evaluates a [`MetricsSnapshot`][crawlguard_types::MetricsSnapshot] into
//!   zero or more [`TriggeredRule`][crawlguard_types::TriggeredRule]s.
//! - [`loader`] – reads rule files and directories; every error is fatal.

pub mod loader;
pub mod rule;
pub mod rule_state;
pub mod rules_engine;

pub use loader::{load_rules, parse_rules, RuleLoadError};
pub use rule::{Comparator, Condition, Rule, RuleDocument, RuleError, Trigger};
pub use rule_state::{RuleEvaluationState, RuleStateTracker};
pub use rules_engine::RulesEngine;
