//! Local command execution

use std::ffi::OsStr;
use std::process::ExitStatus;

use tracing::{debug, instrument};

use crate::{Error, Result};

/// Captured result of a finished command
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub status: ExitStatus,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status.success()
    }
}

/// Local command executor
///
/// A non-zero exit status is reported through [`CommandOutput::status`], not
/// as an error; only failing to start the process is an error.
#[derive(Debug, Clone, Default)]
pub struct CommandRunner;

impl CommandRunner {
    pub fn new() -> Self {
        Self
    }

    /// Execute a program with arguments
    ///
    /// # Arguments
    ///
    /// * `cmd` - Program followed by its arguments
    #[instrument(skip(self, cmd))]
    pub async fn run<S: AsRef<OsStr>>(&self, cmd: &[S]) -> Result<CommandOutput> {
        let (program, args) = cmd
            .split_first()
            .ok_or_else(|| Error::CommandError("Empty command".into()))?;

        debug!(
            program = %program.as_ref().to_string_lossy(),
            args = args.len(),
            "Executing command"
        );

        let output = tokio::process::Command::new(program)
            .args(args)
            .output()
            .await
            .map_err(|e| Error::CommandError(format!("Failed to execute: {}", e)))?;

        Ok(Self::capture(output))
    }

    /// Execute a command line through `sh -c`
    #[instrument(skip(self))]
    pub async fn shell(&self, command: &str) -> Result<CommandOutput> {
        debug!(command = %command, "Executing through shell");

        let output = tokio::process::Command::new("sh")
            .arg("-c")
            .arg(command)
            .output()
            .await
            .map_err(|e| Error::CommandError(format!("Failed to execute: {}", e)))?;

        Ok(Self::capture(output))
    }

    fn capture(output: std::process::Output) -> CommandOutput {
        CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            status: output.status,
        }
    }
}
