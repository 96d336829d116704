//! Generic `MotionController` trait for motor drivers, servo boards, and any
//! other hardware that can move the robot.
//!
//! Drivers implement this trait and register themselves with an
//! [`ActuatorBank`][crate::registry::ActuatorBank].  The dispatcher only ever
//! talks to the bank, so drivers can be swapped without touching rules.

use crawlguard_types::GuardError;

/// Hardware that can bring robot motion to a stop.
pub trait MotionController: Send + Sync {
    /// Stable identifier for this driver, e.g. `"drive_motors"` or
    /// `"leg_servos"`.
    fn id(&self) -> &str;

    /// Command the hardware to stop moving and hold.
    ///
    /// # Errors
    ///
    /// Returns [`GuardError::EffectorFault`] when the hardware cannot be
    /// reached or rejects the command.
    fn halt(&self) -> Result<(), GuardError>;
}
