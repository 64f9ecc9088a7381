//! Core coordination logic.
//!
//! This module contains:
//! - ScriptResolver: Logical name to script file mapping
//! - MessageLog: Append-only broadcast log
//! - StateStore: Bounded action history with locked read-modify-write
//! - Outcome: Results carrying non-fatal warnings
//! - Orchestra: The public operation façade

pub mod message_log;
pub mod orchestra;
pub mod outcome;
pub mod resolver;
pub mod state_store;

// Re-export commonly used types
pub use message_log::MessageLog;
pub use orchestra::{
    BroadcastResult, IntegrationResult, Orchestra, RunScriptResult, SessionResult, StatusReport,
    SwarmResult, SyncResult, SyncType, ALL_TARGETS,
};
pub use outcome::{Outcome, Warning, WarningKind};
pub use resolver::ScriptResolver;
pub use state_store::StateStore;
