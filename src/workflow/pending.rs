//! Single-slot holder for the plan awaiting confirmation.

use serde::{Deserialize, Serialize};

/// A generated artifact that has not been applied yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingPlan {
    /// Infrastructure code that `confirm(true)` would apply.
    pub code: String,
    /// Human-readable description shown to the operator.
    pub description: String,
}

/// Holds at most one [`PendingPlan`]. A new `store` replaces the old one.
#[derive(Debug, Default)]
pub struct PendingPlanStore {
    slot: Option<PendingPlan>,
}

impl PendingPlanStore {
    /// Creates an empty store.
    #[must_use]
    pub const fn new() -> Self {
        Self { slot: None }
    }

    /// Replaces whatever is pending with `code`.
    pub fn store(&mut self, code: impl Into<String>, description: impl Into<String>) {
        self.slot = Some(PendingPlan {
            code: code.into(),
            description: description.into(),
        });
    }

    /// Returns the pending code, if any.
    #[must_use]
    pub fn retrieve(&self) -> Option<&str> {
        self.slot.as_ref().map(|plan| plan.code.as_str())
    }

    /// Returns the full pending plan, if any.
    #[must_use]
    pub const fn pending(&self) -> Option<&PendingPlan> {
        self.slot.as_ref()
    }

    /// True iff non-empty code is held.
    #[must_use]
    pub fn has_pending(&self) -> bool {
        self.slot.as_ref().is_some_and(|plan| !plan.code.is_empty())
    }

    /// Empties the slot. Clearing an empty store is a no-op.
    pub fn clear(&mut self) {
        self.slot = None;
    }

    /// Removes and returns the pending plan.
    pub const fn take(&mut self) -> Option<PendingPlan> {
        self.slot.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_write_wins() {
        let mut store = PendingPlanStore::new();
        store.store("resource \"a\" \"one\" {}", "first");
        store.store("resource \"a\" \"two\" {}", "second");
        store.store("resource \"a\" \"three\" {}", "third");

        assert_eq!(store.retrieve(), Some("resource \"a\" \"three\" {}"));
        assert_eq!(store.pending().map(|p| p.description.as_str()), Some("third"));
    }

    #[test]
    fn test_has_pending_tracks_non_empty_code() {
        let mut store = PendingPlanStore::new();
        assert!(!store.has_pending());

        store.store("", "nothing to do");
        assert!(!store.has_pending());
        assert_eq!(store.retrieve(), Some(""));

        store.store("resource \"x\" \"demo\" {}", "demo");
        assert!(store.has_pending());
    }

    #[test]
    fn test_clear_is_idempotent() {
        let mut store = PendingPlanStore::new();
        store.clear();
        assert!(store.retrieve().is_none());

        store.store("resource \"x\" \"demo\" {}", "demo");
        store.clear();
        store.clear();
        assert!(!store.has_pending());
        assert!(store.retrieve().is_none());
    }

    #[test]
    fn test_take_empties_slot() {
        let mut store = PendingPlanStore::new();
        store.store("resource \"x\" \"demo\" {}", "demo");

        let plan = store.take().unwrap();
        assert_eq!(plan.description, "demo");
        assert!(store.take().is_none());
    }
}
