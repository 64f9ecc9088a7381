//! Results that carry non-fatal warnings.
//!
//! Audit-log and state-record failures never fail an operation. They are
//! collected here (and logged via `tracing::warn!`) so callers can see that
//! an operation succeeded with a degraded side effect.

use serde::Serialize;
use tracing::warn;

/// Kind of non-fatal problem
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    /// State document could not be read or parsed and was treated as empty
    StateCorrupt,

    /// Broadcast message could not be appended to the message log
    LogWriteFailed,

    /// Action record could not be persisted
    StateWriteFailed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Warning {
    pub kind: WarningKind,
    pub message: String,
}

impl Warning {
    /// Create a warning and emit it on the tracing side channel
    pub fn new(kind: WarningKind, message: impl Into<String>) -> Self {
        let message = message.into();
        warn!(?kind, "{}", message);
        Self { kind, message }
    }
}

/// A value plus any warnings raised while producing it.
///
/// Callers report `value` and `warnings` separately; the pair itself is not
/// a wire type.
#[derive(Debug, Clone)]
pub struct Outcome<T> {
    pub value: T,
    pub warnings: Vec<Warning>,
}

impl<T> Outcome<T> {
    pub fn new(value: T) -> Self {
        Self {
            value,
            warnings: Vec::new(),
        }
    }

    pub fn with_warnings(value: T, warnings: Vec<Warning>) -> Self {
        Self { value, warnings }
    }

    pub fn warn(&mut self, warning: Warning) {
        self.warnings.push(warning);
    }

    pub fn has_warning(&self, kind: WarningKind) -> bool {
        self.warnings.iter().any(|w| w.kind == kind)
    }

    pub fn into_inner(self) -> T {
        self.value
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        Outcome {
            value: f(self.value),
            warnings: self.warnings,
        }
    }
}
