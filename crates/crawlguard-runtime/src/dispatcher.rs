//! [`EnforcementDispatcher`] – turns action specs into effects.
//!
//! Every spec in a batch is attempted, in order, and yields exactly one
//! [`ActionOutcome`].  Nothing a handler does (an error, or even a panic in a
//! driver) can stop the rest of the batch.
//!
//! # Dry-run
//!
//! `dry_run = true` is the default posture.  In dry-run no handler runs:
//! every known action is logged and reported as succeeded, every unknown
//! action is reported as failed.  The flag is a parameter of
//! [`EnforcementDispatcher::dispatch`] only; nothing in a rule can change it.
//!
//! # Handlers
//!
//! | Action | Effect |
//! |---|---|
//! | `stop_actuators` | [`ActuatorBank::halt_all`], falling back to stopping the motion service |
//! | `throttle_workload` | raise the throttle [`FlagFile`] |
//! | `alert_operator` | log the message; delivery belongs to the alert sender |
//! | `restart_agent` | [`ServiceManager::restart`] on the named (or default) agent |
//! | `block_upload` | raise the upload-block [`FlagFile`] |

use std::panic::{catch_unwind, AssertUnwindSafe};

use crawlguard_hal::{ActuatorBank, FlagFile, ServiceManager};
use crawlguard_types::{ActionOutcome, ActionSpec, EnforcementAction, GuardError};
use tracing::{debug, info, warn};

/// Message used by `alert_operator` when the rule gives none.
pub const DEFAULT_ALERT_MESSAGE: &str = "Alert from rules engine";

/// Default systemd unit that drives the motors and hosts the agents.
pub const DEFAULT_ROBOT_SERVICE: &str = "picrawler.service";

pub struct EnforcementDispatcher {
    actuators: ActuatorBank,
    services: Box<dyn ServiceManager>,
    throttle_flag: FlagFile,
    upload_block_flag: FlagFile,
    motion_service: String,
    default_restart_agent: String,
}

impl EnforcementDispatcher {
    pub fn new(
        actuators: ActuatorBank,
        services: Box<dyn ServiceManager>,
        throttle_flag: FlagFile,
        upload_block_flag: FlagFile,
    ) -> Self {
        Self {
            actuators,
            services,
            throttle_flag,
            upload_block_flag,
            motion_service: DEFAULT_ROBOT_SERVICE.to_string(),
            default_restart_agent: DEFAULT_ROBOT_SERVICE.to_string(),
        }
    }

    /// Service stopped when no motion controller can be halted directly.
    pub fn with_motion_service(mut self, unit: impl Into<String>) -> Self {
        self.motion_service = unit.into();
        self
    }

    /// Agent restarted by a `restart_agent` action that names none.
    pub fn with_default_restart_agent(mut self, unit: impl Into<String>) -> Self {
        self.default_restart_agent = unit.into();
        self
    }

    /// Dispatch `actions` in order, returning one outcome per input.
    pub fn dispatch(&self, actions: &[ActionSpec], dry_run: bool) -> Vec<ActionOutcome> {
        let outcomes: Vec<ActionOutcome> = actions
            .iter()
            .map(|spec| self.dispatch_one(spec, dry_run))
            .collect();

        let failed = outcomes.iter().filter(|o| !o.succeeded).count();
        info!(
            dry_run,
            total = outcomes.len(),
            failed,
            "enforcement batch dispatched"
        );
        outcomes
    }

    fn dispatch_one(&self, spec: &ActionSpec, dry_run: bool) -> ActionOutcome {
        let action = match spec {
            ActionSpec::Known(action) => action,
            ActionSpec::Unknown { identifier, .. } => {
                warn!(action = %identifier, "unknown enforcement action");
                return ActionOutcome::new(identifier.clone(), false);
            }
        };
        let name = action.identifier();

        if dry_run {
            if let EnforcementAction::AlertOperator { message } = action {
                warn!(
                    message = message.as_deref().unwrap_or(DEFAULT_ALERT_MESSAGE),
                    "ALERT OPERATOR (dry-run)"
                );
            }
            info!(action = name, "dry-run: action simulated");
            return ActionOutcome::new(name, true);
        }

        let result = catch_unwind(AssertUnwindSafe(|| self.perform(action))).unwrap_or_else(|_| {
            Err(GuardError::EffectorFault {
                component: name.to_string(),
                details: "handler panicked".to_string(),
            })
        });

        match result {
            Ok(()) => {
                info!(action = name, "action succeeded");
                ActionOutcome::new(name, true)
            }
            Err(e) => {
                warn!(action = name, error = %e, "action failed");
                ActionOutcome::new(name, false)
            }
        }
    }

    fn perform(&self, action: &EnforcementAction) -> Result<(), GuardError> {
        match action {
            EnforcementAction::StopActuators => self.stop_actuators(),
            EnforcementAction::ThrottleWorkload => self.throttle_flag.raise(),
            EnforcementAction::AlertOperator { message } => {
                warn!(
                    message = message.as_deref().unwrap_or(DEFAULT_ALERT_MESSAGE),
                    "ALERT OPERATOR"
                );
                Ok(())
            }
            EnforcementAction::RestartAgent { agent } => {
                let unit = agent.as_deref().unwrap_or(&self.default_restart_agent);
                self.services.restart(unit)
            }
            EnforcementAction::BlockUpload => self.upload_block_flag.raise(),
        }
    }

    // Hardware first; the service manager only when the hardware path fails.
    fn stop_actuators(&self) -> Result<(), GuardError> {
        match self.actuators.halt_all() {
            Ok(()) => Ok(()),
            Err(hw_err) => {
                debug!(error = %hw_err, unit = %self.motion_service, "falling back to service stop");
                self.services.stop(&self.motion_service).map_err(|svc_err| {
                    GuardError::EffectorFault {
                        component: "stop_actuators".to_string(),
                        details: format!("hardware: {hw_err}; service: {svc_err}"),
                    }
                })
            }
        }
    }
}
