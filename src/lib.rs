//! orchestra - multi-instance coordination for editor automation scripts
//!
//! Dispatches named external scripts, broadcasts typed messages to logical
//! instances, synchronizes state between them and keeps a bounded history
//! of coordination actions.
//!
//! # Architecture
//!
//! - Scripts are resolved from a fixed table on every call and run either
//!   synchronously (output captured) or detached (fire-and-forget)
//! - Broadcasts are appended to a JSONL message log
//! - Actions are recorded in a single JSON state document holding the last
//!   action and the most recent 50 entries
//! - Corrupt persisted state is treated as empty instead of failing
//!
//! # Modules
//!
//! - `adapters`: Script execution backends (subprocess)
//! - `core`: Resolver, message log, state store and the `Orchestra` façade
//! - `domain`: Data structures (scripts, messages, state, executions)
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Broadcast to every instance
//! orchestra broadcast "reload config" --type command
//!
//! # Sync buffers from one instance to two others
//! orchestra sync buffers --source nvim-1 --targets nvim-2,nvim-3
//!
//! # Start a long-running script without waiting
//! orchestra run vim-swarm --async start
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod error;

// Re-export main types at crate root for convenience
pub use config::OrchestraConfig;
pub use core::{Orchestra, Outcome, SyncType, Warning, WarningKind};
pub use domain::{ActionRecord, BroadcastMessage, CoordinationState, Execution, LogEntry, MessageType};
pub use error::{ErrorKind, Failure, OrchestraError};
