//! The orchestra façade: public coordination operations.
//!
//! Every operation is a short, self-contained sequence over the resolver,
//! the runner, the message log and the state store. Nothing is retried.
//!
//! Broadcast and sync treat the script as authoritative and bookkeeping as
//! best effort: a failing script fails the operation, while message-log and
//! state-record failures only add warnings to the returned [`Outcome`].

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{info, instrument};

use super::message_log::MessageLog;
use super::outcome::{Outcome, Warning, WarningKind};
use super::resolver::ScriptResolver;
use super::state_store::StateStore;
use crate::adapters::{ProcessRunner, ScriptRunner};
use crate::config::OrchestraConfig;
use crate::domain::script::{CLAUDE_CONTROLLER, ORCHESTRATOR, ULTIMATE_ORCHESTRA, VIM_SWARM};
use crate::domain::{
    ActionRecord, BroadcastMessage, CoordinationState, Execution, ExecutionResult, LogEntry,
    MessageType, ScriptDescriptor,
};
use crate::error::Result;

/// Target list recorded when a broadcast addresses every instance
pub const ALL_TARGETS: &str = "all";

/// What to synchronize between instances
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncType {
    Config,
    Session,
    Buffers,
    All,
}

impl fmt::Display for SyncType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config => write!(f, "config"),
            Self::Session => write!(f, "session"),
            Self::Buffers => write!(f, "buffers"),
            Self::All => write!(f, "all"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunScriptResult {
    pub script: String,
    #[serde(rename = "async")]
    pub is_async: bool,
    pub result: String,
    pub execution: Execution,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BroadcastResult {
    pub action: &'static str,
    pub message: String,
    pub message_type: MessageType,
    /// `"all"` or the explicit target list
    pub targets: Value,
    pub result: String,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncResult {
    pub action: &'static str,
    pub sync_type: SyncType,
    pub source_instance: Option<String>,
    pub target_instances: Vec<String>,
    pub result: String,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    pub timestamp: DateTime<Utc>,
    pub state: CoordinationState,
    pub recent_messages: Vec<LogEntry>,
    pub available_scripts: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResult {
    pub action: String,
    pub session_name: Option<String>,
    pub result: String,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct IntegrationResult {
    pub command: String,
    pub result: String,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SwarmResult {
    pub action: String,
    pub result: String,
    pub error: Option<String>,
}

/// Main coordination façade
pub struct Orchestra {
    config: OrchestraConfig,
    resolver: ScriptResolver,
    runner: Arc<dyn ScriptRunner>,
    messages: MessageLog,
    state: StateStore,
}

impl Orchestra {
    /// Create a façade that runs scripts as subprocesses
    pub fn new(config: OrchestraConfig) -> Self {
        let runner = Arc::new(ProcessRunner::with_timeout(config.script_timeout));
        Self::with_runner(config, runner)
    }

    /// Create a façade with a custom script runner
    pub fn with_runner(config: OrchestraConfig, runner: Arc<dyn ScriptRunner>) -> Self {
        Self {
            resolver: ScriptResolver::new(&config.scripts_dir),
            messages: MessageLog::new(&config.messages_path),
            state: StateStore::with_capacity(&config.state_path, config.history_capacity),
            runner,
            config,
        }
    }

    pub fn config(&self) -> &OrchestraConfig {
        &self.config
    }

    pub fn resolver(&self) -> &ScriptResolver {
        &self.resolver
    }

    pub fn message_log(&self) -> &MessageLog {
        &self.messages
    }

    pub fn state_store(&self) -> &StateStore {
        &self.state
    }

    /// Resolve and run a script, blocking or detached
    #[instrument(skip_all, fields(script = %name, is_async = is_async))]
    pub async fn run_script(&self, name: &str, args: &[String], is_async: bool) -> Result<RunScriptResult> {
        let script = self.resolver.resolve(name)?;

        let execution = if is_async {
            Execution::Async(self.runner.run_async(&script, args).await?)
        } else {
            Execution::Sync(self.runner.run_sync(&script, args).await?)
        };

        Ok(RunScriptResult {
            script: name.to_string(),
            is_async,
            result: execution.summary(&script.file_name()),
            execution,
            timestamp: Utc::now(),
        })
    }

    /// Log a message, hand it to the broadcast script and record the action
    #[instrument(skip_all, fields(message_type = %message_type, targets = targets.len()))]
    pub async fn broadcast(
        &self,
        message: &str,
        targets: &[String],
        message_type: MessageType,
    ) -> Result<Outcome<BroadcastResult>> {
        let script = self.resolver.resolve(ULTIMATE_ORCHESTRA)?;
        let mut warnings = Vec::new();

        let logged_targets = if targets.is_empty() {
            vec![ALL_TARGETS.to_string()]
        } else {
            targets.to_vec()
        };
        let entry = BroadcastMessage::new(message, message_type, logged_targets);
        if let Err(e) = self.messages.append(&entry).await {
            warnings.push(Warning::new(WarningKind::LogWriteFailed, e.to_string()));
        }

        let mut args = vec!["broadcast".to_string(), message.to_string()];
        if !targets.is_empty() {
            args.push("--targets".to_string());
            args.push(targets.join(","));
        }

        let data = json!({
            "message": message,
            "messageType": message_type,
            "targets": targets,
            "timestamp": entry.timestamp,
        });
        let output = self
            .run_and_record("broadcast", data, &script, &args, &mut warnings)
            .await?;

        info!("Broadcast delivered");
        Ok(Outcome::with_warnings(
            BroadcastResult {
                action: "broadcast",
                message: message.to_string(),
                message_type,
                targets: if targets.is_empty() {
                    json!(ALL_TARGETS)
                } else {
                    json!(targets)
                },
                result: output_or(&output, "Message broadcasted successfully"),
                error: output.error_text().map(str::to_string),
            },
            warnings,
        ))
    }

    /// Ask the orchestrator script to synchronize instances and record the action
    #[instrument(skip_all, fields(sync_type = %sync_type))]
    pub async fn sync(
        &self,
        sync_type: SyncType,
        source_instance: Option<&str>,
        target_instances: &[String],
    ) -> Result<Outcome<SyncResult>> {
        let script = self.resolver.resolve(ORCHESTRATOR)?;
        let mut warnings = Vec::new();

        let mut args = vec!["sync".to_string(), "--type".to_string(), sync_type.to_string()];
        if let Some(source) = source_instance {
            args.push("--source".to_string());
            args.push(source.to_string());
        }
        if !target_instances.is_empty() {
            args.push("--targets".to_string());
            args.push(target_instances.join(","));
        }

        let data = json!({
            "syncType": sync_type,
            "sourceInstance": source_instance,
            "targetInstances": target_instances,
            "timestamp": Utc::now(),
        });
        let output = self
            .run_and_record("sync", data, &script, &args, &mut warnings)
            .await?;

        info!("Instances synchronized");
        Ok(Outcome::with_warnings(
            SyncResult {
                action: "sync",
                sync_type,
                source_instance: source_instance.map(str::to_string),
                target_instances: target_instances.to_vec(),
                result: output_or(&output, "Synchronization completed"),
                error: output.error_text().map(str::to_string),
            },
            warnings,
        ))
    }

    /// Snapshot of state, recent messages and installed scripts. Never mutates.
    pub async fn get_status(&self) -> Result<Outcome<StatusReport>> {
        let Outcome { value: state, warnings } = self.state.read_state().await;
        let recent_messages = self.messages.read_recent(self.config.recent_messages).await?;
        let available_scripts = self
            .resolver
            .available_scripts(&self.config.script_patterns)
            .await?;

        Ok(Outcome::with_warnings(
            StatusReport {
                timestamp: Utc::now(),
                state,
                recent_messages,
                available_scripts,
            },
            warnings,
        ))
    }

    /// Instance IDs registered in the state document (empty if unknown)
    pub async fn active_instances(&self) -> Vec<String> {
        self.state.read_state().await.into_inner().active_instances
    }

    /// Pass a session action through to the session script
    #[instrument(skip(self))]
    pub async fn manage_session(&self, action: &str, session_name: Option<&str>) -> Result<SessionResult> {
        let script = self.resolver.resolve(ULTIMATE_ORCHESTRA)?;

        let mut args = vec![action.to_string()];
        if let Some(name) = session_name {
            args.push(name.to_string());
        }

        let output = self.runner.run_sync(&script, &args).await?;
        Ok(SessionResult {
            action: action.to_string(),
            session_name: session_name.map(str::to_string),
            result: output_or(&output, &format!("Session {} completed", action)),
            error: output.error_text().map(str::to_string),
        })
    }

    /// Pass a command (with optional JSON context) to the integration controller
    #[instrument(skip(self, context))]
    pub async fn execute_integration(&self, command: &str, context: Option<&Value>) -> Result<IntegrationResult> {
        let script = self.resolver.resolve(CLAUDE_CONTROLLER)?;

        let mut args = vec![command.to_string()];
        if let Some(context) = context {
            args.push("--context".to_string());
            args.push(context.to_string());
        }

        let output = self.runner.run_sync(&script, &args).await?;
        Ok(IntegrationResult {
            command: command.to_string(),
            result: output_or(&output, "Integration command executed"),
            error: output.error_text().map(str::to_string),
        })
    }

    /// Pass a concurrent-editing action (with optional JSON data) to the swarm script
    #[instrument(skip(self, data))]
    pub async fn manage_concurrent_editing(&self, action: &str, data: Option<&Value>) -> Result<SwarmResult> {
        let script = self.resolver.resolve(VIM_SWARM)?;

        let mut args = vec![action.to_string()];
        if let Some(data) = data {
            args.push("--data".to_string());
            args.push(data.to_string());
        }

        let output = self.runner.run_sync(&script, &args).await?;
        Ok(SwarmResult {
            action: action.to_string(),
            result: output_or(&output, "Swarm action completed"),
            error: output.error_text().map(str::to_string),
        })
    }

    /// Run a script synchronously and record the outcome under `action`.
    ///
    /// The record reflects what actually happened: a failed run is stored
    /// with `status: failed` before the error is returned.
    async fn run_and_record(
        &self,
        action: &str,
        data: Value,
        script: &ScriptDescriptor,
        args: &[String],
        warnings: &mut Vec<Warning>,
    ) -> Result<ExecutionResult> {
        let run = self.runner.run_sync(script, args).await;

        let record = match &run {
            Ok(_) => ActionRecord::new(action, data),
            Err(e) => ActionRecord::new(action, data).failed(e.to_string()),
        };
        self.commit(record, warnings).await;

        run
    }

    /// Persist a record; failures become warnings
    async fn commit(&self, record: ActionRecord, warnings: &mut Vec<Warning>) {
        match self.state.record(record).await {
            Ok(outcome) => warnings.extend(outcome.warnings),
            Err(e) => warnings.push(Warning::new(WarningKind::StateWriteFailed, e.to_string())),
        }
    }
}

/// stdout, or `fallback` when the script printed nothing there
fn output_or(output: &ExecutionResult, fallback: &str) -> String {
    if output.stdout.is_empty() {
        fallback.to_string()
    } else {
        output.stdout.clone()
    }
}

impl fmt::Debug for Orchestra {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Orchestra")
            .field("config", &self.config)
            .field("runner", &self.runner.name())
            .finish()
    }
}
