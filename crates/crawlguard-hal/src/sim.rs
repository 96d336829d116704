//! In-process stand-ins for running CrawlGuard without hardware or systemd.
//!
//! Both types are cheap to clone; clones share their recorded history, so a
//! test can keep one handle and give the other to the dispatcher.
//!
//! ```rust
//! use crawlguard_hal::{ActuatorBank, SimMotionController};
//!
//! let motors = SimMotionController::new("drive_motors");
//! let bank = ActuatorBank::new().with(Box::new(motors.clone()));
//! bank.halt_all().expect("sim halt must succeed");
//! assert_eq!(motors.halt_count(), 1);
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crawlguard_types::GuardError;

use crate::motion::MotionController;
use crate::service::{validate_unit_name, ServiceManager};

// ────────────────────────────────────────────────────────────────────────────
// Simulated motion controller
// ────────────────────────────────────────────────────────────────────────────

/// A simulated motion driver that counts halt commands.
#[derive(Debug, Clone)]
pub struct SimMotionController {
    id: String,
    halts: Arc<AtomicUsize>,
    fail: bool,
}

impl SimMotionController {
    /// A controller whose halts always succeed.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            halts: Arc::new(AtomicUsize::new(0)),
            fail: false,
        }
    }

    /// A controller that is unreachable: every halt fails.
    pub fn failing(id: impl Into<String>) -> Self {
        Self {
            fail: true,
            ..Self::new(id)
        }
    }

    /// Number of successful halts.
    pub fn halt_count(&self) -> usize {
        self.halts.load(Ordering::SeqCst)
    }
}

impl MotionController for SimMotionController {
    fn id(&self) -> &str {
        &self.id
    }

    fn halt(&self) -> Result<(), GuardError> {
        if self.fail {
            return Err(GuardError::EffectorFault {
                component: self.id.clone(),
                details: "simulated controller unreachable".to_string(),
            });
        }
        self.halts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Simulated service manager
// ────────────────────────────────────────────────────────────────────────────

/// A simulated service manager that records `(verb, unit)` calls.
#[derive(Debug, Clone, Default)]
pub struct SimServiceManager {
    calls: Arc<Mutex<Vec<(String, String)>>>,
    fail: bool,
}

impl SimServiceManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// A service manager whose every call fails (after being recorded).
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Every call made so far, in order.
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    fn record(&self, verb: &str, unit: &str) -> Result<(), GuardError> {
        validate_unit_name(unit)?;
        if let Ok(mut calls) = self.calls.lock() {
            calls.push((verb.to_string(), unit.to_string()));
        }
        if self.fail {
            return Err(GuardError::EffectorFault {
                component: unit.to_string(),
                details: format!("simulated {verb} failure"),
            });
        }
        Ok(())
    }
}

impl ServiceManager for SimServiceManager {
    fn stop(&self, unit: &str) -> Result<(), GuardError> {
        self.record("stop", unit)
    }

    fn restart(&self, unit: &str) -> Result<(), GuardError> {
        self.record("restart", unit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_halt_history() {
        let a = SimMotionController::new("motors");
        let b = a.clone();
        b.halt().unwrap();
        assert_eq!(a.halt_count(), 1);
    }

    #[test]
    fn failing_controller_never_counts() {
        let c = SimMotionController::failing("motors");
        assert!(c.halt().is_err());
        assert_eq!(c.halt_count(), 0);
    }

    #[test]
    fn service_manager_records_calls_in_order() {
        let sm = SimServiceManager::new();
        sm.stop("picrawler.service").unwrap();
        sm.restart("vision.service").unwrap();
        assert_eq!(
            sm.calls(),
            vec![
                ("stop".to_string(), "picrawler.service".to_string()),
                ("restart".to_string(), "vision.service".to_string()),
            ]
        );
    }

    #[test]
    fn service_manager_applies_name_validation() {
        let sm = SimServiceManager::new();
        assert!(sm.restart("--now").is_err());
        assert!(sm.calls().is_empty());
    }

    #[test]
    fn failing_service_manager_records_then_fails() {
        let sm = SimServiceManager::failing();
        assert!(sm.stop("picrawler.service").is_err());
        assert_eq!(sm.calls().len(), 1);
    }
}
