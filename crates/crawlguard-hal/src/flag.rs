//! [`FlagFile`] – a discrete on/off indicator shared through the filesystem.
//!
//! Cooperating workloads poll the flag: the camera uploader checks the
//! upload-block flag, heavy planners check the throttle flag.  Raising a flag
//! writes `1`.  Clearing it is left to whoever resolves the condition.

use std::fs;
use std::path::{Path, PathBuf};

use crawlguard_types::GuardError;

#[derive(Debug, Clone)]
pub struct FlagFile {
    name: String,
    path: PathBuf,
}

impl FlagFile {
    /// `name` identifies the flag in faults and logs.
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Set the flag.
    ///
    /// # Errors
    ///
    /// [`GuardError::EffectorFault`] when the file cannot be written.
    pub fn raise(&self) -> Result<(), GuardError> {
        fs::write(&self.path, b"1").map_err(|e| self.fault(e))
    }

    pub fn is_raised(&self) -> bool {
        fs::read_to_string(&self.path).is_ok_and(|s| s.trim() == "1")
    }

    fn fault(&self, e: std::io::Error) -> GuardError {
        GuardError::EffectorFault {
            component: self.name.clone(),
            details: format!("{}: {e}", self.path.display()),
        }
    }
}
