//! Persisted coordination state: the last action and a bounded history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Maximum number of history entries kept in the state document
pub const DEFAULT_HISTORY_CAPACITY: usize = 50;

/// Outcome of the action an [`ActionRecord`] describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ActionStatus {
    #[default]
    Completed,
    Failed,
}

/// A single coordination action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionRecord {
    pub action: String,

    /// Arbitrary action payload
    #[serde(default)]
    pub data: Value,

    pub timestamp: DateTime<Utc>,

    /// Documents written before status tracking read as completed
    #[serde(default)]
    pub status: ActionStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ActionRecord {
    /// Create a completed record stamped with the current time
    pub fn new(action: impl Into<String>, data: Value) -> Self {
        Self {
            action: action.into(),
            data,
            timestamp: Utc::now(),
            status: ActionStatus::Completed,
            error: None,
        }
    }

    /// Mark the record as failed with the given error
    pub fn failed(mut self, error: impl Into<String>) -> Self {
        self.status = ActionStatus::Failed;
        self.error = Some(error.into());
        self
    }
}

/// The whole state document.
///
/// Unknown top-level keys are carried through read-modify-write unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoordinationState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_action: Option<ActionRecord>,

    #[serde(default)]
    pub history: Vec<ActionRecord>,

    /// Instance IDs registered by external scripts
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub active_instances: Vec<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CoordinationState {
    /// Append a record, evicting the oldest entries beyond `capacity`
    pub fn push(&mut self, record: ActionRecord, capacity: usize) {
        self.history.push(record.clone());
        if self.history.len() > capacity {
            let excess = self.history.len() - capacity;
            self.history.drain(..excess);
        }
        self.last_action = Some(record);
    }

    pub fn is_empty(&self) -> bool {
        self.last_action.is_none() && self.history.is_empty()
    }

    /// Build state from a parsed JSON document, keeping every part that fits.
    ///
    /// A history entry, `lastAction` or `activeInstances` that does not match
    /// the schema is dropped on its own and described in the returned list;
    /// the rest of the document (foreign keys included) survives.
    pub fn from_document(document: Value) -> (Self, Vec<String>) {
        let mut problems = Vec::new();

        let mut extra = match document {
            Value::Object(map) => map,
            _ => {
                problems.push("document is not a JSON object".to_string());
                return (Self::default(), problems);
            }
        };

        let last_action = match extra.remove("lastAction") {
            None | Some(Value::Null) => None,
            Some(raw) => match serde_json::from_value(raw) {
                Ok(record) => Some(record),
                Err(e) => {
                    problems.push(format!("lastAction dropped: {}", e));
                    None
                }
            },
        };

        let history = match extra.remove("history") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(entries)) => entries
                .into_iter()
                .enumerate()
                .filter_map(|(index, raw)| match serde_json::from_value(raw) {
                    Ok(record) => Some(record),
                    Err(e) => {
                        problems.push(format!("history entry {} dropped: {}", index, e));
                        None
                    }
                })
                .collect(),
            Some(_) => {
                problems.push("history is not a list".to_string());
                Vec::new()
            }
        };

        let active_instances = match extra.remove("activeInstances") {
            None | Some(Value::Null) => Vec::new(),
            Some(raw) => match serde_json::from_value(raw) {
                Ok(instances) => instances,
                Err(e) => {
                    problems.push(format!("activeInstances dropped: {}", e));
                    Vec::new()
                }
            },
        };

        let state = Self {
            last_action,
            history,
            active_instances,
            extra,
        };
        (state, problems)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_push_sets_last_action() {
        let mut state = CoordinationState::default();
        state.push(ActionRecord::new("broadcast", json!({"message": "hi"})), 50);

        assert_eq!(state.history.len(), 1);
        assert_eq!(state.last_action.as_ref().unwrap().action, "broadcast");
    }

    #[test]
    fn test_from_document_drops_only_bad_entries() {
        let document = json!({
            "lastAction": {"action": "a", "data": {}, "timestamp": "2024-01-01T00:00:00Z"},
            "history": [
                {"action": "a", "data": {}, "timestamp": "2024-01-01T00:00:00Z"},
                {"action": "b", "data": {}, "timestamp": "unknown"},
                {"action": "c"}
            ],
            "activeInstances": ["nvim-1"],
            "layout": "grid"
        });

        let (state, problems) = CoordinationState::from_document(document);

        assert_eq!(problems.len(), 2);
        assert!(problems[0].contains("history entry 1"));
        assert!(problems[1].contains("history entry 2"));
        assert_eq!(state.history.len(), 1);
        assert_eq!(state.history[0].action, "a");
        assert_eq!(state.last_action.unwrap().action, "a");
        assert_eq!(state.active_instances, vec!["nvim-1"]);
        assert_eq!(state.extra["layout"], "grid");
    }

    #[test]
    fn test_from_document_rejects_non_object() {
        let (state, problems) = CoordinationState::from_document(json!([1, 2]));
        assert!(state.is_empty());
        assert_eq!(problems.len(), 1);
    }

    #[test]
    fn test_push_evicts_oldest() {
        let mut state = CoordinationState::default();
        for i in 0..5 {
            state.push(ActionRecord::new("sync", json!({ "n": i })), 3);
        }

        assert_eq!(state.history.len(), 3);
        let ns: Vec<i64> = state
            .history
            .iter()
            .map(|r| r.data["n"].as_i64().unwrap())
            .collect();
        assert_eq!(ns, vec![2, 3, 4]);
        assert_eq!(state.last_action.unwrap().data["n"], 4);
    }

    #[test]
    fn test_document_shape() {
        let mut state = CoordinationState::default();
        state.push(ActionRecord::new("sync", Value::Null), 50);
        let json = serde_json::to_value(&state).unwrap();

        assert!(json.get("lastAction").is_some());
        assert!(json["history"].is_array());
        assert!(json.get("activeInstances").is_none());
        assert_eq!(json["lastAction"]["status"], "completed");
    }

    #[test]
    fn test_unknown_fields_preserved() {
        let raw = r#"{"history":[],"activeInstances":["a","b"],"custom":{"k":1}}"#;
        let state: CoordinationState = serde_json::from_str(raw).unwrap();

        assert_eq!(state.active_instances, vec!["a", "b"]);
        let back = serde_json::to_value(&state).unwrap();
        assert_eq!(back["custom"]["k"], 1);
    }

    #[test]
    fn test_legacy_record_without_status() {
        let raw = r#"{"action":"broadcast","data":{},"timestamp":"2026-01-01T00:00:00Z"}"#;
        let record: ActionRecord = serde_json::from_str(raw).unwrap();
        assert_eq!(record.status, ActionStatus::Completed);
        assert!(record.error.is_none());
    }

    #[test]
    fn test_failed_record() {
        let record = ActionRecord::new("sync", Value::Null).failed("exit 2");
        assert_eq!(record.status, ActionStatus::Failed);
        assert_eq!(record.error.as_deref(), Some("exit 2"));
    }
}
