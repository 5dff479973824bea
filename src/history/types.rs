//! History record types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::provisioning::{ExecutionResult, ExecutionStatus};

/// Current version of the history format.
pub const HISTORY_VERSION: &str = "1.0";

/// Number of entries kept on disk.
pub const MAX_ENTRIES: usize = 100;

/// The persisted history document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryLog {
    /// Format version.
    pub version: String,
    /// Entries, oldest first.
    #[serde(default)]
    pub entries: Vec<HistoryEntry>,
}

/// One recorded `confirm` outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Unique id.
    pub id: Uuid,
    /// When the confirm returned.
    pub timestamp: DateTime<Utc>,
    /// What happened.
    pub outcome: HistoryOutcome,
    /// Description shown when the plan was proposed.
    pub description: String,
    /// SHA-256 of the attempted code, hex encoded. Empty when there was none.
    pub fingerprint: String,
    /// Host the workflow ran on.
    pub operator: String,
    /// Apply output or error text.
    pub message: String,
}

/// Recorded outcome.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HistoryOutcome {
    /// Applied successfully.
    Success,
    /// Failed at a stage or while preparing the workspace.
    Error,
    /// Rejected by the operator.
    Cancelled,
}

impl HistoryLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self {
            version: HISTORY_VERSION.to_string(),
            entries: Vec::new(),
        }
    }

    /// Appends `entry`, dropping the oldest entries beyond [`MAX_ENTRIES`].
    pub fn push(&mut self, entry: HistoryEntry) {
        self.entries.push(entry);
        if self.entries.len() > MAX_ENTRIES {
            let excess = self.entries.len() - MAX_ENTRIES;
            self.entries.drain(..excess);
        }
    }

    /// Most recent entries, newest first.
    #[must_use]
    pub fn recent(&self, limit: usize) -> Vec<HistoryEntry> {
        self.entries.iter().rev().take(limit).cloned().collect()
    }
}

impl Default for HistoryLog {
    fn default() -> Self {
        Self::new()
    }
}

impl HistoryEntry {
    /// Builds an entry for a confirm result.
    #[must_use]
    pub fn from_result(result: &ExecutionResult, description: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            outcome: result.status.into(),
            description: description.to_string(),
            fingerprint: fingerprint(&result.code),
            operator: operator_id(),
            message: result.output.clone(),
        }
    }

    /// Short fingerprint for display.
    #[must_use]
    pub fn short_fingerprint(&self) -> &str {
        self.fingerprint.get(..12).unwrap_or(&self.fingerprint)
    }
}

impl From<ExecutionStatus> for HistoryOutcome {
    fn from(status: ExecutionStatus) -> Self {
        match status {
            ExecutionStatus::Success => Self::Success,
            ExecutionStatus::Error => Self::Error,
            ExecutionStatus::Cancelled => Self::Cancelled,
        }
    }
}

impl std::fmt::Display for HistoryOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let outcome = match self {
            Self::Success => "success",
            Self::Error => "error",
            Self::Cancelled => "cancelled",
        };
        write!(f, "{outcome}")
    }
}

/// SHA-256 of `code` as lowercase hex, or an empty string for empty code.
#[must_use]
pub fn fingerprint(code: &str) -> String {
    if code.is_empty() {
        return String::new();
    }
    let mut hasher = Sha256::new();
    hasher.update(code.as_bytes());
    hex::encode(hasher.finalize())
}

/// Hostname of this machine.
#[must_use]
pub fn operator_id() -> String {
    hostname::get().map_or_else(|_| String::from("unknown"), |h| h.to_string_lossy().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(message: &str) -> HistoryEntry {
        HistoryEntry::from_result(&ExecutionResult::success("code", message), "desc")
    }

    #[test]
    fn test_fingerprint() {
        assert_eq!(fingerprint(""), "");
        assert_eq!(
            fingerprint("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_entry_from_result() {
        let result = ExecutionResult::error("resource \"a\" \"b\" {}", "Error: boom");
        let entry = HistoryEntry::from_result(&result, "create b");

        assert_eq!(entry.outcome, HistoryOutcome::Error);
        assert_eq!(entry.description, "create b");
        assert_eq!(entry.message, "Error: boom");
        assert_eq!(entry.fingerprint, fingerprint(&result.code));
        assert_eq!(entry.short_fingerprint().len(), 12);
        assert!(!entry.operator.is_empty());
    }

    #[test]
    fn test_log_keeps_most_recent() {
        let mut log = HistoryLog::new();
        for i in 0..(MAX_ENTRIES + 5) {
            log.push(entry(&i.to_string()));
        }

        assert_eq!(log.entries.len(), MAX_ENTRIES);
        assert_eq!(log.entries[0].message, "5");

        let recent = log.recent(2);
        assert_eq!(recent[0].message, (MAX_ENTRIES + 4).to_string());
        assert_eq!(recent[1].message, (MAX_ENTRIES + 3).to_string());
    }
}
