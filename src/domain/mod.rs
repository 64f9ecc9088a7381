//! Domain types for the orchestra coordinator.
//!
//! This module contains the core data structures:
//! - Script: Known scripts and resolved descriptors
//! - Execution: Sync results and async launch handles
//! - Message: Broadcast messages and log entries
//! - State: Coordination state and action history

pub mod execution;
pub mod message;
pub mod script;
pub mod state;

// Re-export commonly used types
pub use execution::{Execution, ExecutionResult, ProcessHandle};
pub use message::{BroadcastMessage, LogEntry, MessageType, RawLogLine};
pub use script::{Interpreter, KnownScript, ScriptDescriptor, KNOWN_SCRIPTS};
pub use state::{ActionRecord, ActionStatus, CoordinationState, DEFAULT_HISTORY_CAPACITY};
