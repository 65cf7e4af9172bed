//! Manual kill switch for automation scripts
//!
//! Dropping a sentinel file on disk stops every non-critical script that
//! constructs an API client. Critical callers ignore it.

use std::path::{Path, PathBuf};

use tracing::warn;

use crate::{Error, Result};

/// Sentinel path used when none is configured
pub const DEFAULT_KILL_SWITCH: &str = "./KILL_AUTOMATION.SIGNAL";

/// Sentinel file whose existence halts non-critical work
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KillSwitch {
    path: PathBuf,
}

impl KillSwitch {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Is the sentinel file present?
    pub fn is_engaged(&self) -> bool {
        self.path.exists()
    }

    /// Fail if the switch is engaged and the caller is not critical
    pub fn check(&self, critical: bool) -> Result<()> {
        if critical || !self.is_engaged() {
            return Ok(());
        }

        warn!(path = %self.path.display(), "Kill switch activated, refusing to continue");
        Err(Error::KillSwitchEngaged(self.path.display().to_string()))
    }
}

impl Default for KillSwitch {
    fn default() -> Self {
        Self::new(DEFAULT_KILL_SWITCH)
    }
}
