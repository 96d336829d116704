//! [`ServiceManager`] – host service control used as an effector.
//!
//! Two dispatcher paths end here: the `stop_actuators` fallback (stop the
//! service that drives the motors when the motion controllers cannot be
//! reached) and `restart_agent`.

use std::path::PathBuf;
use std::process::Command;

use crawlguard_types::GuardError;
use tracing::info;

/// Stop or restart host services by name.
pub trait ServiceManager: Send + Sync {
    /// # Errors
    ///
    /// [`GuardError::EffectorFault`] when the service could not be stopped.
    fn stop(&self, unit: &str) -> Result<(), GuardError>;

    /// # Errors
    ///
    /// [`GuardError::EffectorFault`] when the service could not be restarted.
    fn restart(&self, unit: &str) -> Result<(), GuardError>;
}

/// Reject service names that could be read as options or contain shell
/// metacharacters.  Unit names come from rule files, so they are untrusted.
///
/// Accepts ASCII alphanumerics and `@ . _ : -`, and no leading `-`.
pub fn validate_unit_name(unit: &str) -> Result<(), GuardError> {
    let valid = !unit.is_empty()
        && !unit.starts_with('-')
        && unit
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '@' | '.' | '_' | ':' | '-'));
    if valid {
        Ok(())
    } else {
        Err(GuardError::EffectorFault {
            component: "service_manager".to_string(),
            details: format!("refusing invalid unit name {unit:?}"),
        })
    }
}

/// systemd implementation of [`ServiceManager`] that shells out to
/// `systemctl`.
#[derive(Debug, Clone)]
pub struct Systemctl {
    program: PathBuf,
}

impl Default for Systemctl {
    fn default() -> Self {
        Self {
            program: PathBuf::from("systemctl"),
        }
    }
}

impl Systemctl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a different executable in place of `systemctl`.
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn run(&self, verb: &str, unit: &str) -> Result<(), GuardError> {
        validate_unit_name(unit)?;
        let fault = |details: String| GuardError::EffectorFault {
            component: unit.to_string(),
            details,
        };

        let status = Command::new(&self.program)
            .arg(verb)
            .arg(unit)
            .status()
            .map_err(|e| fault(format!("failed to run {}: {e}", self.program.display())))?;

        if status.success() {
            info!(unit, verb, "service command succeeded");
            Ok(())
        } else {
            Err(fault(format!(
                "{} {verb} {unit} exited with {status}",
                self.program.display()
            )))
        }
    }
}

impl ServiceManager for Systemctl {
    fn stop(&self, unit: &str) -> Result<(), GuardError> {
        self.run("stop", unit)
    }

    fn restart(&self, unit: &str) -> Result<(), GuardError> {
        self.run("restart", unit)
    }
}
