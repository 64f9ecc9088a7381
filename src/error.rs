//! Error taxonomy for orchestra operations.
//!
//! Every failing operation returns an [`OrchestraError`]; hosts that need a
//! serializable form convert it into a [`Failure`] (kind + message).

use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

/// Errors surfaced by orchestra operations
#[derive(Debug, Error)]
pub enum OrchestraError {
    #[error("Script not found: {name} (looked for {})", .path.display())]
    ScriptNotFound { name: String, path: PathBuf },

    #[error("Script '{script}' failed{}: {}", exit_suffix(.exit_code), .stderr.trim())]
    ExecutionFailed {
        script: String,
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("Script '{script}' timed out after {seconds}s")]
    TimedOut { script: String, seconds: u64 },

    #[error("Failed to start script '{script}': {source}")]
    SpawnFailed {
        script: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read message log {}: {source}", .path.display())]
    LogReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write message log {}: {source}", .path.display())]
    LogWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write state file {}: {reason}", .path.display())]
    StateWriteFailed { path: PathBuf, reason: String },

    #[error("Failed to list scripts in {}: {source}", .path.display())]
    ScriptsDirUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration error: {0}")]
    Config(String),
}

fn exit_suffix(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!(" with exit code {}", code),
        None => String::new(),
    }
}

/// Stable discriminant for [`OrchestraError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    ScriptNotFound,
    ExecutionFailed,
    SpawnFailed,
    LogReadFailed,
    LogWriteFailed,
    StateWriteFailed,
    Io,
    Config,
}

impl OrchestraError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ScriptNotFound { .. } => ErrorKind::ScriptNotFound,
            Self::ExecutionFailed { .. } | Self::TimedOut { .. } => ErrorKind::ExecutionFailed,
            Self::SpawnFailed { .. } => ErrorKind::SpawnFailed,
            Self::LogReadFailed { .. } => ErrorKind::LogReadFailed,
            Self::LogWriteFailed { .. } => ErrorKind::LogWriteFailed,
            Self::StateWriteFailed { .. } => ErrorKind::StateWriteFailed,
            Self::ScriptsDirUnreadable { .. } => ErrorKind::Io,
            Self::Config(_) => ErrorKind::Config,
        }
    }

    /// Captured stderr for execution failures
    pub fn stderr(&self) -> Option<&str> {
        match self {
            Self::ExecutionFailed { stderr, .. } => Some(stderr),
            _ => None,
        }
    }
}

/// Structured failure handed to the host dispatcher
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Failure {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&OrchestraError> for Failure {
    fn from(err: &OrchestraError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

impl From<OrchestraError> for Failure {
    fn from(err: OrchestraError) -> Self {
        Self::from(&err)
    }
}

pub type Result<T, E = OrchestraError> = std::result::Result<T, E>;
