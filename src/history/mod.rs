//! Execution history.
//!
//! Every `confirm` outcome is appended to a small local log so operators
//! can see what was applied, rejected or failed, and which code was tried
//! (by fingerprint).

mod local;
mod store;
mod types;

pub use local::{LocalHistoryStore, HISTORY_FILE};
pub use store::HistoryStore;
pub use types::{
    fingerprint, operator_id, HistoryEntry, HistoryLog, HistoryOutcome, HISTORY_VERSION,
    MAX_ENTRIES,
};

#[cfg(test)]
pub use store::MockHistoryStore;
