//! Adapter interfaces for launching scripts.
//!
//! The façade talks to a [`ScriptRunner`]; [`ProcessRunner`] is the
//! subprocess-backed implementation.

pub mod process;

use async_trait::async_trait;

use crate::domain::{ExecutionResult, ProcessHandle, ScriptDescriptor};
use crate::error::Result;

// Re-export the subprocess runner
pub use process::ProcessRunner;

/// Trait for script execution backends
#[async_trait]
pub trait ScriptRunner: Send + Sync {
    /// Human-readable runner name
    fn name(&self) -> &str;

    /// Run to completion, capturing stdout and stderr.
    ///
    /// Non-zero exit and spawn failures both yield `ExecutionFailed`.
    async fn run_sync(&self, script: &ScriptDescriptor, args: &[String]) -> Result<ExecutionResult>;

    /// Launch detached and return once the OS confirms the start.
    ///
    /// Only `SpawnFailed` is possible; completion is never observed.
    async fn run_async(&self, script: &ScriptDescriptor, args: &[String]) -> Result<ProcessHandle>;
}
