//! Results of running a script.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Payload reported when a script succeeds without writing any output
pub const DEFAULT_SUCCESS_MESSAGE: &str = "Script executed successfully";

/// Captured output of a synchronous run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_succeeded: bool,
}

impl ExecutionResult {
    /// stdout if non-empty, else stderr, else a generic success message.
    ///
    /// Scripts are inconsistent about which stream carries their payload.
    pub fn payload(&self) -> &str {
        if !self.stdout.is_empty() {
            &self.stdout
        } else if !self.stderr.is_empty() {
            &self.stderr
        } else {
            DEFAULT_SUCCESS_MESSAGE
        }
    }

    /// stderr, or `None` when the script wrote nothing to it
    pub fn error_text(&self) -> Option<&str> {
        if self.stderr.is_empty() {
            None
        } else {
            Some(&self.stderr)
        }
    }
}

/// Launch confirmation for a detached script
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessHandle {
    pub pid: u32,
    pub started_at: DateTime<Utc>,
}

/// A script execution in either mode.
///
/// `Async` only confirms the launch: completion and exit status are never observed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Execution {
    Sync(ExecutionResult),
    Async(ProcessHandle),
}

impl Execution {
    pub fn is_async(&self) -> bool {
        matches!(self, Self::Async(_))
    }

    /// Human-readable summary for the given script file
    pub fn summary(&self, file_name: &str) -> String {
        match self {
            Self::Sync(result) => result.payload().to_string(),
            Self::Async(handle) => format!(
                "Script {} started asynchronously with PID: {}",
                file_name, handle.pid
            ),
        }
    }
}
