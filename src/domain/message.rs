//! Broadcast messages and message-log entries.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Timestamp written for log lines that could not be parsed
pub const UNKNOWN_TIMESTAMP: &str = "unknown";

/// Severity/kind of a broadcast message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    #[default]
    Info,
    Warning,
    Error,
    Command,
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
            Self::Command => write!(f, "command"),
        }
    }
}

impl FromStr for MessageType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "info" => Ok(Self::Info),
            "warning" => Ok(Self::Warning),
            "error" => Ok(Self::Error),
            "command" => Ok(Self::Command),
            other => Err(format!("unknown message type: {}", other)),
        }
    }
}

/// A message broadcast to logical instances.
///
/// Written once to the message log and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BroadcastMessage {
    /// When the message was broadcast (ISO 8601)
    pub timestamp: DateTime<Utc>,

    #[serde(rename = "type")]
    pub message_type: MessageType,

    pub message: String,

    /// Target instance IDs (empty means all instances)
    #[serde(default)]
    pub targets: Vec<String>,
}

impl BroadcastMessage {
    /// Create a message stamped with the current time
    pub fn new(message: impl Into<String>, message_type: MessageType, targets: Vec<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            message_type,
            message: message.into(),
            targets,
        }
    }

    /// Whether the message addresses every instance
    pub fn is_for_all(&self) -> bool {
        self.targets.is_empty() || self.targets.iter().any(|t| t == "all")
    }
}

/// Best-effort record for a log line that is not a valid message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawLogLine {
    pub message: String,
    pub timestamp: String,
}

/// One entry read back from the message log
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum LogEntry {
    Message(BroadcastMessage),
    Unparsed(RawLogLine),
}

impl LogEntry {
    /// Parse a single log line, falling back to a raw record
    pub fn parse_line(line: &str) -> Self {
        match serde_json::from_str::<BroadcastMessage>(line) {
            Ok(message) => Self::Message(message),
            Err(_) => Self::Unparsed(RawLogLine {
                message: line.to_string(),
                timestamp: UNKNOWN_TIMESTAMP.to_string(),
            }),
        }
    }

    /// The parsed message, if this line was well-formed
    pub fn as_message(&self) -> Option<&BroadcastMessage> {
        match self {
            Self::Message(m) => Some(m),
            Self::Unparsed(_) => None,
        }
    }

    /// Message text regardless of parse status
    pub fn text(&self) -> &str {
        match self {
            Self::Message(m) => &m.message,
            Self::Unparsed(raw) => &raw.message,
        }
    }
}
