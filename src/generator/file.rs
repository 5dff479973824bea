//! Pre-written terraform as a plan source.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{GenerationError, Result};
use crate::workspace::{extract_resource_blocks, ResourceBlock};

use super::{GeneratedPlan, PlanGenerator};

/// [`PlanGenerator`] that reads the code from a file.
///
/// The request text is ignored; the description lists the resource
/// addresses found in the file.
#[derive(Debug, Clone)]
pub struct FileGenerator {
    path: PathBuf,
}

impl FileGenerator {
    /// Creates a generator for `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The source file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl PlanGenerator for FileGenerator {
    async fn generate(&self, _request: &str) -> Result<GeneratedPlan> {
        debug!("Reading plan from {}", self.path.display());

        let code = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            GenerationError::invalid(format!("Cannot read {}: {e}", self.path.display()))
        })?;
        if code.trim().is_empty() {
            return Err(GenerationError::EmptyCode.into());
        }

        let addresses: Vec<String> = extract_resource_blocks(&code)
            .iter()
            .filter_map(ResourceBlock::address)
            .collect();

        let description = if addresses.is_empty() {
            format!("Apply {} (no resource blocks found)", self.path.display())
        } else {
            format!(
                "Apply {} resource(s) from {}: {}",
                addresses.len(),
                self.path.display(),
                addresses.join(", ")
            )
        };

        Ok(GeneratedPlan::new(description, code))
    }
}
