//! `crawlguard-hal` – Effector boundaries
//!
//! Everything the enforcement dispatcher can physically touch, each behind a
//! narrow interface so the dispatcher can be exercised against mocks.
//!
//! - [`motion`] – [`MotionController`][motion::MotionController]: a driver
//!   that can bring robot motion to a halt.
//! - [`registry`] – [`ActuatorBank`][registry::ActuatorBank]: every
//!   registered motion controller, halted together.
//! - [`service`] – [`ServiceManager`][service::ServiceManager]: stop and
//!   restart host services; [`Systemctl`][service::Systemctl] is the systemd
//!   implementation.
//! - [`flag`] – [`FlagFile`][flag::FlagFile]: shared on/off indicators that
//!   cooperating workloads poll (throttle, upload block).
//! - [`sim`] – in-process stand-ins for running without hardware.

pub mod flag;
pub mod motion;
pub mod registry;
pub mod service;
pub mod sim;

pub use flag::FlagFile;
pub use motion::MotionController;
pub use registry::ActuatorBank;
pub use service::{validate_unit_name, ServiceManager, Systemctl};
pub use sim::{SimMotionController, SimServiceManager};
