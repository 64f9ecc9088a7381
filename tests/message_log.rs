//! Message Log Integration Tests
//!
//! Tests for append/read-recent ordering and tolerance of corrupt lines.

use orchestra::core::MessageLog;
use orchestra::domain::{BroadcastMessage, LogEntry, MessageType};
use tempfile::TempDir;

fn message(text: &str, targets: &[&str]) -> BroadcastMessage {
    BroadcastMessage::new(
        text,
        MessageType::Info,
        targets.iter().map(|t| t.to_string()).collect(),
    )
}

#[tokio::test]
async fn test_read_recent_returns_last_k_in_order() {
    let temp = TempDir::new().unwrap();
    let log = MessageLog::new(temp.path().join("messages.log"));

    let appended: Vec<BroadcastMessage> = (0..12)
        .map(|i| message(&format!("message {}", i), &["nvim-1"]))
        .collect();
    for msg in &appended {
        log.append(msg).await.unwrap();
    }

    for k in [1, 5, 12] {
        let recent = log.read_recent(k).await.unwrap();
        let parsed: Vec<&BroadcastMessage> = recent.iter().filter_map(LogEntry::as_message).collect();

        assert_eq!(parsed.len(), k);
        let expected: Vec<&BroadcastMessage> = appended[appended.len() - k..].iter().collect();
        assert_eq!(parsed, expected);
    }
}

#[tokio::test]
async fn test_malformed_line_becomes_fallback_record() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("messages.log");
    let log = MessageLog::new(&path);

    let first = message("first", &[]);
    let second = message("second", &["nvim-2"]);
    let content = format!(
        "{}\n{{ truncated record\n{}\n",
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
    std::fs::write(&path, content).unwrap();

    let entries = log.read_recent(3).await.unwrap();
    assert_eq!(entries.len(), 3);

    assert_eq!(entries[0].as_message(), Some(&first));
    match &entries[1] {
        LogEntry::Unparsed(raw) => {
            assert_eq!(raw.message, "{ truncated record");
            assert_eq!(raw.timestamp, "unknown");
        }
        other => panic!("expected fallback record, got {:?}", other),
    }
    assert_eq!(entries[2].as_message(), Some(&second));
}

#[tokio::test]
async fn test_fallback_record_wire_shape() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("messages.log");
    std::fs::write(&path, "garbage\n").unwrap();

    let entries = MessageLog::new(&path).read_recent(10).await.unwrap();
    let json = serde_json::to_value(&entries).unwrap();

    assert_eq!(json[0]["message"], "garbage");
    assert_eq!(json[0]["timestamp"], "unknown");
}

#[tokio::test]
async fn test_invalid_utf8_does_not_abort_read() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("messages.log");

    let good = message("after", &[]);
    let mut bytes = vec![0xff, 0xfe, b'\n'];
    bytes.extend_from_slice(serde_json::to_string(&good).unwrap().as_bytes());
    bytes.push(b'\n');
    std::fs::write(&path, bytes).unwrap();

    let entries = MessageLog::new(&path).read_recent(10).await.unwrap();
    assert_eq!(entries.len(), 2);
    assert!(entries[0].as_message().is_none());
    assert_eq!(entries[1].as_message(), Some(&good));
}

#[tokio::test]
async fn test_concurrent_appends_do_not_interleave() {
    let temp = TempDir::new().unwrap();
    let log = std::sync::Arc::new(MessageLog::new(temp.path().join("messages.log")));

    let mut handles = Vec::new();
    for i in 0..40 {
        let log = log.clone();
        handles.push(tokio::spawn(async move {
            log.append(&message(&format!("m{}", i), &[])).await.unwrap();
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let entries = log.read_recent(100).await.unwrap();
    assert_eq!(entries.len(), 40);
    assert!(entries.iter().all(|e| e.as_message().is_some()));
}
