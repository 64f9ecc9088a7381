//! Append-only broadcast message log.
//!
//! Messages are stored as newline-delimited JSON (JSONL), one record per
//! line. Reads tolerate corrupt lines: anything that does not parse is
//! returned as a raw fallback record instead of failing the read.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use tracing::debug;

use crate::domain::{BroadcastMessage, LogEntry};
use crate::error::{OrchestraError, Result};

/// Bytes read per step when scanning the log backwards
const TAIL_CHUNK_BYTES: u64 = 8 * 1024;

/// File-based message log using JSONL format
#[derive(Debug, Clone)]
pub struct MessageLog {
    path: PathBuf,
}

impl MessageLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Get the path to the log file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append a message as a single newline-terminated record
    pub async fn append(&self, message: &BroadcastMessage) -> Result<()> {
        let write_failed = |source| OrchestraError::LogWriteFailed {
            path: self.path.clone(),
            source,
        };

        let json = serde_json::to_string(message).map_err(|e| write_failed(e.into()))?;
        let path = self.path.clone();

        tokio::task::spawn_blocking(move || append_line(&path, &json))
            .await
            .map_err(|e| write_failed(io::Error::new(io::ErrorKind::Other, e)))?
            .map_err(write_failed)?;

        debug!(path = %self.path.display(), "Appended broadcast message");
        Ok(())
    }

    /// The last `n` entries in original order (oldest first).
    ///
    /// A missing log reads as empty; a log that exists but cannot be opened
    /// is an error. Only the tail of the file is read.
    pub async fn read_recent(&self, n: usize) -> Result<Vec<LogEntry>> {
        if n == 0 {
            return Ok(Vec::new());
        }

        let path = self.path.clone();
        let read_failed = |source| OrchestraError::LogReadFailed {
            path: self.path.clone(),
            source,
        };

        let bytes = match tokio::task::spawn_blocking(move || read_tail(&path, n))
            .await
            .map_err(|e| read_failed(io::Error::new(io::ErrorKind::Other, e)))?
        {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => return Err(read_failed(source)),
        };

        let content = String::from_utf8_lossy(&bytes);
        let lines: Vec<&str> = content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .collect();
        let skip = lines.len().saturating_sub(n);

        Ok(lines[skip..]
            .iter()
            .map(|line| LogEntry::parse_line(line))
            .collect())
    }
}

/// Read backwards from the end of `path` until more than `n` non-blank
/// lines are buffered (or the whole file is).
///
/// Only the first buffered line can be cut short, so the last `n` lines are
/// always complete.
fn read_tail(path: &Path, n: usize) -> io::Result<Vec<u8>> {
    let mut file = File::open(path)?;
    let metadata = file.metadata()?;
    if !metadata.is_file() {
        return Err(io::Error::new(
            io::ErrorKind::Other,
            "message log is not a regular file",
        ));
    }

    let mut start = metadata.len();
    let mut tail = Vec::new();
    while start > 0 {
        let step = TAIL_CHUNK_BYTES.min(start);
        start -= step;

        let mut chunk = vec![0u8; step as usize];
        file.seek(SeekFrom::Start(start))?;
        file.read_exact(&mut chunk)?;
        chunk.extend_from_slice(&tail);
        tail = chunk;

        if count_non_blank_lines(&tail) > n {
            break;
        }
    }

    Ok(tail)
}

fn count_non_blank_lines(bytes: &[u8]) -> usize {
    bytes
        .split(|b| *b == b'\n')
        .filter(|line| !line.iter().all(u8::is_ascii_whitespace))
        .count()
}

/// Append one line under an exclusive advisory lock
fn append_line(path: &Path, line: &str) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.lock_exclusive()?;

    file.write_all(format!("{}\n", line).as_bytes())?;
    file.flush()?;

    // Lock is released when file is dropped
    Ok(())
}
