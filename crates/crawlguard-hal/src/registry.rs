//! [`ActuatorBank`] – every registered [`MotionController`], halted as one.
//!
//! An emergency halt is attempted on **every** controller even when an
//! earlier one fails; a motor left running because its neighbour faulted is
//! the outcome a halt exists to prevent.

use std::collections::BTreeMap;

use crawlguard_types::GuardError;
use tracing::{info, warn};

use crate::motion::MotionController;

/// Registry of motion drivers keyed by id.
#[derive(Default)]
pub struct ActuatorBank {
    controllers: BTreeMap<String, Box<dyn MotionController>>,
}

impl ActuatorBank {
    /// Create an empty bank.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a controller.  Any previously registered driver with the
    /// same `id` is replaced.
    pub fn register(&mut self, controller: Box<dyn MotionController>) {
        self.controllers
            .insert(controller.id().to_string(), controller);
    }

    /// Builder-style [`register`][Self::register].
    pub fn with(mut self, controller: Box<dyn MotionController>) -> Self {
        self.register(controller);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.controllers.is_empty()
    }

    pub fn len(&self) -> usize {
        self.controllers.len()
    }

    /// Halt every registered controller.
    ///
    /// # Errors
    ///
    /// Returns [`GuardError::EffectorFault`] when the bank is empty or when
    /// at least one controller failed to halt.
    pub fn halt_all(&self) -> Result<(), GuardError> {
        if self.is_empty() {
            return Err(GuardError::EffectorFault {
                component: "actuators".to_string(),
                details: "no motion controller registered".to_string(),
            });
        }

        let mut failed = Vec::new();
        for (id, controller) in &self.controllers {
            match controller.halt() {
                Ok(()) => info!(controller = %id, "motion halted"),
                Err(e) => {
                    warn!(controller = %id, error = %e, "halt failed");
                    failed.push(id.clone());
                }
            }
        }

        if failed.is_empty() {
            Ok(())
        } else {
            Err(GuardError::EffectorFault {
                component: "actuators".to_string(),
                details: format!("failed to halt: {}", failed.join(", ")),
            })
        }
    }
}
