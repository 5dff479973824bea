//! History store trait definition.

use async_trait::async_trait;

use crate::error::Result;

use super::types::HistoryEntry;

/// Trait for history storage backends.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Appends an entry.
    async fn record(&self, entry: &HistoryEntry) -> Result<()>;

    /// Returns up to `limit` entries, newest first.
    async fn recent(&self, limit: usize) -> Result<Vec<HistoryEntry>>;

    /// Gets the backend type name.
    fn backend_type(&self) -> &'static str;
}

#[async_trait]
impl HistoryStore for Box<dyn HistoryStore> {
    async fn record(&self, entry: &HistoryEntry) -> Result<()> {
        (**self).record(entry).await
    }

    async fn recent(&self, limit: usize) -> Result<Vec<HistoryEntry>> {
        (**self).recent(limit).await
    }

    fn backend_type(&self) -> &'static str {
        (**self).backend_type()
    }
}
