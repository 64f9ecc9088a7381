//! Coordination state store: one JSON document, bounded action history.
//!
//! Writes are read-modify-write under two locks: an in-process async mutex
//! that serializes every `record` call on this store, and an exclusive
//! advisory lock on `<state>.lock` so separate processes sharing the file do
//! not interleave. The document is replaced by atomic rename.
//!
//! Reads never fail. A missing, unreadable or unparseable document is treated
//! as empty state; the latter two raise a `StateCorrupt` warning. A document
//! that parses as JSON keeps every part that fits the schema, and each
//! dropped part raises its own warning.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use serde_json::Value;
use tempfile::NamedTempFile;
use tokio::sync::Mutex;
use tracing::debug;

use super::outcome::{Outcome, Warning, WarningKind};
use crate::domain::{ActionRecord, CoordinationState, DEFAULT_HISTORY_CAPACITY};
use crate::error::{OrchestraError, Result};

/// File-backed coordination state
#[derive(Debug)]
pub struct StateStore {
    path: PathBuf,
    capacity: usize,
    write_lock: Mutex<()>,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_capacity(path, DEFAULT_HISTORY_CAPACITY)
    }

    /// Create a store that keeps at most `capacity` history entries (minimum 1)
    pub fn with_capacity(path: impl Into<PathBuf>, capacity: usize) -> Self {
        Self {
            path: path.into(),
            capacity: capacity.max(1),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Load the current document, falling back to empty state
    pub async fn read_state(&self) -> Outcome<CoordinationState> {
        let path = self.path.clone();
        match tokio::task::spawn_blocking(move || load_state(&path)).await {
            Ok(outcome) => outcome,
            Err(e) => Outcome::with_warnings(
                CoordinationState::default(),
                vec![Warning::new(
                    WarningKind::StateCorrupt,
                    format!("State read task failed: {}", e),
                )],
            ),
        }
    }

    /// Record a completed action stamped with the current time
    pub async fn record_action(&self, action: &str, data: Value) -> Result<Outcome<ActionRecord>> {
        self.record(ActionRecord::new(action, data)).await
    }

    /// Append `record` as the last action and persist the document
    pub async fn record(&self, record: ActionRecord) -> Result<Outcome<ActionRecord>> {
        let _guard = self.write_lock.lock().await;

        let path = self.path.clone();
        let capacity = self.capacity;
        tokio::task::spawn_blocking(move || record_blocking(&path, record, capacity))
            .await
            .map_err(|e| OrchestraError::StateWriteFailed {
                path: self.path.clone(),
                reason: e.to_string(),
            })?
    }
}

/// Directory for sibling files (lock, temp) of `path`
fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

/// `<state file>.lock`
fn lock_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "state".into());
    name.push(".lock");
    path.with_file_name(name)
}

fn load_state(path: &Path) -> Outcome<CoordinationState> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Outcome::new(CoordinationState::default())
        }
        Err(e) => {
            return Outcome::with_warnings(
                CoordinationState::default(),
                vec![Warning::new(
                    WarningKind::StateCorrupt,
                    format!("Failed to read state file {}: {}", path.display(), e),
                )],
            )
        }
    };

    // An empty file is a fresh store, not corruption
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Outcome::new(CoordinationState::default());
    }

    match serde_json::from_slice::<Value>(&bytes) {
        Ok(document) => {
            let (state, problems) = CoordinationState::from_document(document);
            let warnings = problems
                .into_iter()
                .map(|problem| {
                    Warning::new(
                        WarningKind::StateCorrupt,
                        format!("State file {}: {}", path.display(), problem),
                    )
                })
                .collect();
            Outcome::with_warnings(state, warnings)
        }
        Err(e) => Outcome::with_warnings(
            CoordinationState::default(),
            vec![Warning::new(
                WarningKind::StateCorrupt,
                format!(
                    "State file {} is corrupt, starting from empty state: {}",
                    path.display(),
                    e
                ),
            )],
        ),
    }
}

fn record_blocking(path: &Path, record: ActionRecord, capacity: usize) -> Result<Outcome<ActionRecord>> {
    let write_failed = |reason: String| OrchestraError::StateWriteFailed {
        path: path.to_path_buf(),
        reason,
    };

    let dir = parent_dir(path);
    std::fs::create_dir_all(dir).map_err(|e| write_failed(e.to_string()))?;

    let lock_file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(false)
        .open(lock_path(path))
        .map_err(|e| write_failed(format!("failed to open lock file: {}", e)))?;
    lock_file
        .lock_exclusive()
        .map_err(|e| write_failed(format!("failed to acquire lock: {}", e)))?;

    let Outcome {
        value: mut state,
        warnings,
    } = load_state(path);
    state.push(record.clone(), capacity);

    let json = serde_json::to_string_pretty(&state).map_err(|e| write_failed(e.to_string()))?;

    let mut temp_file = NamedTempFile::new_in(dir).map_err(|e| write_failed(e.to_string()))?;
    writeln!(temp_file, "{}", json).map_err(|e| write_failed(e.to_string()))?;
    temp_file
        .as_file()
        .sync_all()
        .map_err(|e| write_failed(e.to_string()))?;
    temp_file
        .persist(path)
        .map_err(|e| write_failed(e.error.to_string()))?;

    debug!(
        action = %record.action,
        history_len = state.history.len(),
        "Recorded coordination action"
    );

    // Lock is released when lock_file is dropped
    Ok(Outcome::with_warnings(record, warnings))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn create_test_store(capacity: usize) -> (StateStore, TempDir) {
        let temp = TempDir::new().unwrap();
        let store = StateStore::with_capacity(temp.path().join("state.json"), capacity);
        (store, temp)
    }

    #[tokio::test]
    async fn test_missing_file_is_empty_without_warning() {
        let (store, _temp) = create_test_store(50);
        let outcome = store.read_state().await;

        assert!(outcome.value.is_empty());
        assert!(outcome.warnings.is_empty());
    }

    #[tokio::test]
    async fn test_empty_file_is_not_corruption() {
        let (store, _temp) = create_test_store(50);
        std::fs::write(store.path(), "").unwrap();

        let outcome = store.read_state().await;
        assert!(outcome.value.is_empty());
        assert!(outcome.warnings.is_empty());
    }

    #[tokio::test]
    async fn test_record_and_read_back() {
        let (store, _temp) = create_test_store(50);

        store.record_action("broadcast", json!({"message": "a"})).await.unwrap();
        store.record_action("sync", json!({"syncType": "all"})).await.unwrap();

        let state = store.read_state().await.into_inner();
        assert_eq!(state.history.len(), 2);
        assert_eq!(state.history[0].action, "broadcast");
        assert_eq!(state.last_action.unwrap().action, "sync");
    }

    #[tokio::test]
    async fn test_capacity_evicts_oldest() {
        let (store, _temp) = create_test_store(3);
        for i in 0..7 {
            store.record_action("sync", json!({ "n": i })).await.unwrap();
        }

        let state = store.read_state().await.into_inner();
        let ns: Vec<i64> = state.history.iter().map(|r| r.data["n"].as_i64().unwrap()).collect();
        assert_eq!(ns, vec![4, 5, 6]);
    }

    #[tokio::test]
    async fn test_corrupt_file_warns_on_record() {
        let (store, _temp) = create_test_store(50);
        std::fs::write(store.path(), "{ not json").unwrap();

        let outcome = store.record_action("broadcast", json!({})).await.unwrap();
        assert!(outcome.has_warning(WarningKind::StateCorrupt));

        // The rewrite heals the document
        let reread = store.read_state().await;
        assert!(reread.warnings.is_empty());
        assert_eq!(reread.value.history.len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_fields_survive_rewrite() {
        let (store, _temp) = create_test_store(50);
        std::fs::write(
            store.path(),
            r#"{"history":[],"activeInstances":["nvim-1"],"layout":"grid"}"#,
        )
        .unwrap();

        store.record_action("sync", json!({})).await.unwrap();

        let raw: Value = serde_json::from_str(&std::fs::read_to_string(store.path()).unwrap()).unwrap();
        assert_eq!(raw["activeInstances"][0], "nvim-1");
        assert_eq!(raw["layout"], "grid");
        assert_eq!(raw["history"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_bad_history_entry_does_not_discard_document() {
        let (store, _temp) = create_test_store(50);
        std::fs::write(
            store.path(),
            r#"{
                "history": [
                    {"action": "broadcast", "data": {"message": "kept"}, "timestamp": "2024-05-01T12:00:00Z"},
                    {"action": "b", "data": {}, "timestamp": "unknown"}
                ],
                "activeInstances": ["nvim-1"],
                "layout": "grid"
            }"#,
        )
        .unwrap();

        let outcome = store.read_state().await;
        assert_eq!(outcome.warnings.len(), 1);
        assert!(outcome.has_warning(WarningKind::StateCorrupt));
        assert_eq!(outcome.value.history.len(), 1);

        let recorded = store.record_action("sync", json!({})).await.unwrap();
        assert!(recorded.has_warning(WarningKind::StateCorrupt));

        let raw: Value = serde_json::from_str(&std::fs::read_to_string(store.path()).unwrap()).unwrap();
        let history = raw["history"].as_array().unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0]["data"]["message"], "kept");
        assert_eq!(history[1]["action"], "sync");
        assert_eq!(raw["activeInstances"], json!(["nvim-1"]));
        assert_eq!(raw["layout"], "grid");

        // Healed after the rewrite
        assert!(store.read_state().await.warnings.is_empty());
    }

    #[test]
    fn test_lock_path() {
        assert_eq!(
            lock_path(Path::new("/a/state.json")),
            PathBuf::from("/a/state.json.lock")
        );
        assert_eq!(parent_dir(Path::new("state.json")), Path::new("."));
    }
}
