//! Subprocess runner for orchestra scripts.
//!
//! Scripts are launched argv-style through their interpreter (`bash`,
//! `python3`) or directly for native executables. Nothing is ever passed
//! through a shell command string.

use std::process::{Command as StdCommand, Stdio};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::process::Command;
use tracing::{debug, info, instrument};

use super::ScriptRunner;
use crate::domain::{ExecutionResult, ProcessHandle, ScriptDescriptor};
use crate::error::{OrchestraError, Result};

#[cfg(windows)]
const DETACHED_PROCESS: u32 = 0x0000_0008;
#[cfg(windows)]
const CREATE_NEW_PROCESS_GROUP: u32 = 0x0000_0200;

/// Runs scripts as child processes
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner {
    /// Upper bound for synchronous runs
    timeout: Option<Duration>,
}

impl ProcessRunner {
    /// Create a runner without a timeout
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a runner that kills synchronous runs after `timeout`
    pub fn with_timeout(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }

    /// Build the argv for a script: `[interpreter] <path> args...`
    fn build_command(script: &ScriptDescriptor, args: &[String]) -> StdCommand {
        let mut cmd = match script.interpreter.program() {
            Some(program) => {
                let mut cmd = StdCommand::new(program);
                cmd.arg(&script.executable_path);
                cmd
            }
            None => StdCommand::new(&script.executable_path),
        };
        cmd.args(args);
        cmd
    }

    fn exec_failure(script: &ScriptDescriptor, exit_code: Option<i32>, stderr: String) -> OrchestraError {
        OrchestraError::ExecutionFailed {
            script: script.file_name(),
            exit_code,
            stderr,
        }
    }
}

#[async_trait]
impl ScriptRunner for ProcessRunner {
    fn name(&self) -> &str {
        "process"
    }

    #[instrument(skip(self, script, args), fields(script = %script.logical_name))]
    async fn run_sync(&self, script: &ScriptDescriptor, args: &[String]) -> Result<ExecutionResult> {
        let mut cmd = Command::from(Self::build_command(script, args));
        // The child is killed if the wait below is abandoned on timeout.
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        debug!(interpreter = %script.interpreter, ?args, "Running script");
        let child = cmd
            .spawn()
            .map_err(|e| Self::exec_failure(script, None, e.to_string()))?;

        let output = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, child.wait_with_output())
                .await
                .map_err(|_| OrchestraError::TimedOut {
                    script: script.file_name(),
                    seconds: limit.as_secs(),
                })?,
            None => child.wait_with_output().await,
        }
        .map_err(|e| Self::exec_failure(script, None, e.to_string()))?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if !output.status.success() {
            return Err(Self::exec_failure(script, output.status.code(), stderr));
        }

        debug!(stdout_bytes = stdout.len(), stderr_bytes = stderr.len(), "Script finished");
        Ok(ExecutionResult {
            stdout,
            stderr,
            exit_succeeded: true,
        })
    }

    #[instrument(skip(self, script, args), fields(script = %script.logical_name))]
    async fn run_async(&self, script: &ScriptDescriptor, args: &[String]) -> Result<ProcessHandle> {
        let mut std_cmd = Self::build_command(script, args);
        std_cmd
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            std_cmd.process_group(0);
        }
        #[cfg(windows)]
        {
            use std::os::windows::process::CommandExt;
            std_cmd.creation_flags(DETACHED_PROCESS | CREATE_NEW_PROCESS_GROUP);
        }

        let child = Command::from(std_cmd)
            .spawn()
            .map_err(|source| OrchestraError::SpawnFailed {
                script: script.file_name(),
                source,
            })?;

        let pid = child.id().ok_or_else(|| OrchestraError::SpawnFailed {
            script: script.file_name(),
            source: std::io::Error::new(
                std::io::ErrorKind::Other,
                "process exited before its id could be read",
            ),
        })?;

        // Dropping the handle leaves the child running; tokio reaps it once it exits.
        drop(child);

        info!(pid, "Script started asynchronously");
        Ok(ProcessHandle {
            pid,
            started_at: Utc::now(),
        })
    }
}
