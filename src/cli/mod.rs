//! Command-line interface for orchestra.
//!
//! Every façade operation is exposed as a subcommand. Results are printed to
//! stdout as pretty JSON; warnings go to stderr. A failed operation prints a
//! `{kind, message}` failure and exits non-zero.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use serde_json::Value;

use crate::config::OrchestraConfig;
use crate::core::{Orchestra, Outcome, SyncType};
use crate::domain::MessageType;
use crate::error::{Failure, OrchestraError};

/// orchestra - coordinate scripts and state across editor instances
#[derive(Parser, Debug)]
#[command(name = "orchestra")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a script by logical name or file name
    Run {
        /// Script name (ultimate-orchestra, orchestrator, claude-controller, vim-swarm or a file)
        script: String,

        /// Start detached and return immediately with the PID
        #[arg(long = "async")]
        detach: bool,

        /// Arguments passed to the script
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },

    /// Broadcast a message to instances
    Broadcast {
        /// Message text
        message: String,

        /// Target instance IDs (comma-separated, default: all)
        #[arg(short, long, value_delimiter = ',')]
        targets: Vec<String>,

        /// Message type
        #[arg(short = 'k', long = "type", value_enum, default_value = "info")]
        message_type: CliMessageType,
    },

    /// Synchronize state between instances
    Sync {
        /// What to synchronize
        #[arg(value_enum)]
        sync_type: CliSyncType,

        /// Source instance ID
        #[arg(short, long)]
        source: Option<String>,

        /// Target instance IDs (comma-separated)
        #[arg(short, long, value_delimiter = ',')]
        targets: Vec<String>,
    },

    /// Show coordination state, recent messages and available scripts
    Status,

    /// List active instances recorded in the state document
    Instances,

    /// Show the most recent recorded actions
    History {
        /// Maximum number of actions to show
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },

    /// Pass a session action to the session script
    Session {
        /// Session action (e.g. start, stop, list)
        action: String,

        /// Session name
        name: Option<String>,
    },

    /// Send a command to the integration controller
    Integrate {
        /// Controller command
        command: String,

        /// JSON context passed to the controller
        #[arg(long)]
        context: Option<String>,
    },

    /// Manage concurrent editing through the swarm script
    Swarm {
        /// Swarm action
        action: String,

        /// JSON data passed to the swarm script
        #[arg(long)]
        data: Option<String>,
    },

    /// Show resolved configuration (debug)
    Config,
}

/// Message type for CLI (maps to MessageType)
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum CliMessageType {
    Info,
    Warning,
    Error,
    Command,
}

impl From<CliMessageType> for MessageType {
    fn from(t: CliMessageType) -> Self {
        match t {
            CliMessageType::Info => MessageType::Info,
            CliMessageType::Warning => MessageType::Warning,
            CliMessageType::Error => MessageType::Error,
            CliMessageType::Command => MessageType::Command,
        }
    }
}

/// Sync type for CLI (maps to SyncType)
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum CliSyncType {
    Config,
    Session,
    Buffers,
    All,
}

impl From<CliSyncType> for SyncType {
    fn from(t: CliSyncType) -> Self {
        match t {
            CliSyncType::Config => SyncType::Config,
            CliSyncType::Session => SyncType::Session,
            CliSyncType::Buffers => SyncType::Buffers,
            CliSyncType::All => SyncType::All,
        }
    }
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        let orchestra = Orchestra::new(OrchestraConfig::load()?);

        match self.command {
            Commands::Run {
                script,
                detach,
                args,
            } => report(orchestra.run_script(&script, &args, detach).await),
            Commands::Broadcast {
                message,
                targets,
                message_type,
            } => report_outcome(
                orchestra
                    .broadcast(&message, &targets, message_type.into())
                    .await,
            ),
            Commands::Sync {
                sync_type,
                source,
                targets,
            } => report_outcome(
                orchestra
                    .sync(sync_type.into(), source.as_deref(), &targets)
                    .await,
            ),
            Commands::Status => report_outcome(orchestra.get_status().await),
            Commands::Instances => print_json(&orchestra.active_instances().await),
            Commands::History { limit } => show_history(&orchestra, limit).await,
            Commands::Session { action, name } => {
                report(orchestra.manage_session(&action, name.as_deref()).await)
            }
            Commands::Integrate { command, context } => {
                let context = parse_json_arg("--context", context)?;
                report(orchestra.execute_integration(&command, context.as_ref()).await)
            }
            Commands::Swarm { action, data } => {
                let data = parse_json_arg("--data", data)?;
                report(
                    orchestra
                        .manage_concurrent_editing(&action, data.as_ref())
                        .await,
                )
            }
            Commands::Config => show_config(orchestra.config()),
        }
    }
}

/// Parse an optional JSON argument
fn parse_json_arg(flag: &str, raw: Option<String>) -> Result<Option<Value>> {
    raw.map(|s| {
        serde_json::from_str(&s).with_context(|| format!("{} is not valid JSON: {}", flag, s))
    })
    .transpose()
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize result")?;
    println!("{}", json);
    Ok(())
}

/// Print a result, or the structured failure and exit non-zero
fn report<T: Serialize>(result: std::result::Result<T, OrchestraError>) -> Result<()> {
    match result {
        Ok(value) => print_json(&value),
        Err(e) => fail(&e),
    }
}

fn report_outcome<T: Serialize>(result: std::result::Result<Outcome<T>, OrchestraError>) -> Result<()> {
    match result {
        Ok(outcome) => {
            for warning in &outcome.warnings {
                eprintln!("warning: {}", warning.message);
            }
            print_json(&outcome.value)
        }
        Err(e) => fail(&e),
    }
}

fn fail(err: &OrchestraError) -> Result<()> {
    print_json(&Failure::from(err))?;
    std::process::exit(1);
}

/// Show the last `limit` recorded actions, newest last
async fn show_history(orchestra: &Orchestra, limit: usize) -> Result<()> {
    let outcome = orchestra.state_store().read_state().await;
    for warning in &outcome.warnings {
        eprintln!("warning: {}", warning.message);
    }

    let history = &outcome.value.history;
    if history.is_empty() {
        println!("No actions recorded");
        return Ok(());
    }

    println!("{:<32} {:<12} {:<10}", "TIMESTAMP", "ACTION", "STATUS");
    println!("{}", "-".repeat(56));

    let skip = history.len().saturating_sub(limit);
    for record in &history[skip..] {
        let status = match record.status {
            crate::domain::ActionStatus::Completed => "completed",
            crate::domain::ActionStatus::Failed => "failed",
        };
        println!(
            "{:<32} {:<12} {:<10}",
            record.timestamp.to_rfc3339(),
            record.action,
            status
        );
    }

    Ok(())
}

/// Show resolved configuration
fn show_config(config: &OrchestraConfig) -> Result<()> {
    println!("Orchestra Configuration");
    println!("=======================");
    println!();

    if let Some(ref path) = config.config_file {
        println!("Config file: {}", path.display());
    } else {
        println!("Config file: (none - using defaults)");
    }
    println!();

    println!("Paths:");
    println!("  home:     {}", config.home.display());
    println!("  scripts:  {}", config.scripts_dir.display());
    println!("  state:    {}", config.state_path.display());
    println!("  messages: {}", config.messages_path.display());
    println!();

    println!("Limits:");
    println!("  history capacity: {}", config.history_capacity);
    println!("  recent messages:  {}", config.recent_messages);
    match config.script_timeout {
        Some(timeout) => println!("  script timeout:   {}s", timeout.as_secs()),
        None => println!("  script timeout:   (none)"),
    }

    Ok(())
}
