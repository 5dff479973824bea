//! Local file-based history backend.
//!
//! The whole log lives in one JSON file that is rewritten atomically on
//! every record.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::config::HistoryConfig;
use crate::error::{HistoryError, Result, StagehandError};

use super::store::HistoryStore;
use super::types::{HistoryEntry, HistoryLog};

/// History file name.
pub const HISTORY_FILE: &str = "history.json";

/// Local file-based history store.
#[derive(Debug, Clone)]
pub struct LocalHistoryStore {
    /// Directory holding the history file.
    base_dir: PathBuf,
    /// Path to the history file.
    history_path: PathBuf,
}

impl LocalHistoryStore {
    /// Creates a store under `base_dir`.
    #[must_use]
    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        let base_dir = base_dir.into();
        let history_path = base_dir.join(HISTORY_FILE);
        Self {
            base_dir,
            history_path,
        }
    }

    /// Creates a store from the configuration section.
    #[must_use]
    pub fn from_config(config: &HistoryConfig) -> Self {
        Self::with_base_dir(&config.dir)
    }

    /// Path of the history file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.history_path
    }

    async fn load(&self) -> Result<HistoryLog> {
        if !fs::try_exists(&self.history_path).await? {
            debug!("History file does not exist: {}", self.history_path.display());
            return Ok(HistoryLog::new());
        }

        let content = fs::read_to_string(&self.history_path).await.map_err(|e| {
            StagehandError::History(HistoryError::Corrupted {
                message: format!("Failed to read history file: {e}"),
            })
        })?;

        serde_json::from_str(&content).map_err(|e| {
            StagehandError::History(HistoryError::Corrupted {
                message: format!("Failed to parse history file: {e}"),
            })
        })
    }

    async fn save(&self, log: &HistoryLog) -> Result<()> {
        fs::create_dir_all(&self.base_dir).await.map_err(|e| {
            StagehandError::History(HistoryError::WriteFailed {
                message: format!("Failed to create history directory: {e}"),
            })
        })?;

        let content = serde_json::to_string_pretty(log).map_err(|e| {
            StagehandError::History(HistoryError::SerializationError {
                message: format!("Failed to serialize history: {e}"),
            })
        })?;

        // Write to a temporary file first, then rename for atomicity
        let temp_path = self.history_path.with_extension("tmp");
        let write_failed = |e: std::io::Error| {
            StagehandError::History(HistoryError::WriteFailed {
                message: e.to_string(),
            })
        };

        let mut file = fs::File::create(&temp_path).await.map_err(write_failed)?;
        file.write_all(content.as_bytes()).await.map_err(write_failed)?;
        file.sync_all().await.map_err(write_failed)?;
        fs::rename(&temp_path, &self.history_path)
            .await
            .map_err(write_failed)?;

        Ok(())
    }
}

#[async_trait]
impl HistoryStore for LocalHistoryStore {
    async fn record(&self, entry: &HistoryEntry) -> Result<()> {
        let mut log = self.load().await?;
        log.push(entry.clone());
        self.save(&log).await?;
        debug!("Recorded {} outcome {}", entry.outcome, entry.id);
        Ok(())
    }

    async fn recent(&self, limit: usize) -> Result<Vec<HistoryEntry>> {
        Ok(self.load().await?.recent(limit))
    }

    fn backend_type(&self) -> &'static str {
        "local"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::HistoryOutcome;
    use crate::provisioning::ExecutionResult;
    use tempfile::TempDir;

    fn create_test_store() -> (LocalHistoryStore, TempDir) {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = LocalHistoryStore::with_base_dir(temp_dir.path().join(".stagehand"));
        (store, temp_dir)
    }

    #[tokio::test]
    async fn test_record_and_read_back() {
        let (store, _temp) = create_test_store();

        let first = HistoryEntry::from_result(&ExecutionResult::success("a", "ok"), "first");
        let second = HistoryEntry::from_result(&ExecutionResult::cancelled("", "no"), "second");
        store.record(&first).await.expect("Failed to record");
        store.record(&second).await.expect("Failed to record");

        let recent = store.recent(10).await.expect("Failed to read");
        assert_eq!(recent, vec![second, first]);
        assert_eq!(recent[0].outcome, HistoryOutcome::Cancelled);
        assert!(store.path().exists());
        assert!(!store.path().with_extension("tmp").exists());
    }

    #[tokio::test]
    async fn test_missing_file_is_empty() {
        let (store, _temp) = create_test_store();
        assert!(store.recent(5).await.expect("Read should not fail").is_empty());
    }

    #[tokio::test]
    async fn test_corrupted_file() {
        let (store, _temp) = create_test_store();
        std::fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        std::fs::write(store.path(), "{ not json").unwrap();

        let err = store.recent(5).await.unwrap_err();
        assert!(matches!(
            err,
            StagehandError::History(HistoryError::Corrupted { .. })
        ));
    }
}
