//! Idempotent merge of generated code into the persistent config file.
//!
//! The first artifact is written verbatim and becomes the header-bearing
//! version of the file. Every later artifact contributes only its
//! `resource` blocks, appended after a separator comment, so provider and
//! backend declarations appear exactly once no matter how often this runs.

use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::config::WorkspaceConfig;
use crate::error::Result;

use super::blocks::{extract_resource_blocks, render_blocks};

/// Separator written before every appended batch of resources.
pub const APPEND_SEPARATOR: &str = "\n\n# ========================================\n# Resources added\n# ========================================\n\n";

/// Writes generated code into a fixed working directory.
#[derive(Debug, Clone)]
pub struct ConfigMerger {
    /// Working directory handed to terraform.
    dir: PathBuf,
    /// Name of the config file inside `dir`.
    file_name: String,
}

/// What [`ConfigMerger::prepare`] did to the config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// The file did not exist and was written verbatim.
    Created,
    /// Resource blocks were appended to an existing file.
    Appended {
        /// Number of blocks appended.
        blocks: usize,
    },
    /// The file existed and the new code had no resource blocks.
    Unchanged,
}

/// A working directory ready for `terraform init`.
#[derive(Debug, Clone)]
pub struct PreparedWorkspace {
    /// Directory terraform runs in.
    pub dir: PathBuf,
    /// Full path of the config file.
    pub config_file: PathBuf,
    /// What happened to the config file.
    pub outcome: MergeOutcome,
}

impl ConfigMerger {
    /// Creates a merger for `dir/file_name`.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>, file_name: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            file_name: file_name.into(),
        }
    }

    /// Creates a merger from the workspace section of the configuration.
    #[must_use]
    pub fn from_config(workspace: &WorkspaceConfig) -> Self {
        Self::new(&workspace.dir, &workspace.file_name)
    }

    /// The working directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Full path of the config file.
    #[must_use]
    pub fn config_file(&self) -> PathBuf {
        self.dir.join(&self.file_name)
    }

    /// Creates the working directory if needed and merges `code` into the
    /// config file.
    ///
    /// # Errors
    ///
    /// Returns an IO error if the directory cannot be created or the file
    /// cannot be read or written.
    pub async fn prepare(&self, code: &str) -> Result<PreparedWorkspace> {
        fs::create_dir_all(&self.dir).await?;

        let config_file = self.config_file();

        let outcome = if fs::try_exists(&config_file).await? {
            let blocks = extract_resource_blocks(code);
            if blocks.is_empty() {
                debug!(
                    "No resource blocks in new code, leaving {} untouched",
                    config_file.display()
                );
                MergeOutcome::Unchanged
            } else {
                let mut file = fs::OpenOptions::new()
                    .append(true)
                    .open(&config_file)
                    .await?;
                let mut chunk = String::from(APPEND_SEPARATOR);
                chunk.push_str(&render_blocks(&blocks));
                file.write_all(chunk.as_bytes()).await?;
                file.flush().await?;

                info!(
                    "Appended {} resource block(s) to {}",
                    blocks.len(),
                    config_file.display()
                );
                MergeOutcome::Appended {
                    blocks: blocks.len(),
                }
            }
        } else {
            fs::write(&config_file, code).await?;
            info!("Created {}", config_file.display());
            MergeOutcome::Created
        };

        Ok(PreparedWorkspace {
            dir: self.dir.clone(),
            config_file,
            outcome,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::{InfraPlan, ResourceSpec, TemplateRenderer};
    use tempfile::TempDir;

    const HEADER: &str = r#"terraform {
  required_providers {
    aws = {
      source = "hashicorp/aws"
    }
  }
}

provider "aws" {
  region = "us-east-1"
}
"#;

    fn artifact(bucket: &str) -> String {
        format!("{HEADER}\nresource \"aws_s3_bucket\" \"{bucket}\" {{\n  bucket = \"{bucket}\"\n}}\n")
    }

    fn merger_in(temp: &TempDir) -> ConfigMerger {
        ConfigMerger::new(temp.path().join("infra"), "main.tf")
    }

    #[tokio::test]
    async fn test_creates_directory_and_writes_verbatim() {
        let temp = TempDir::new().unwrap();
        let merger = merger_in(&temp);
        let code = "resource \"aws_sqs_queue\" \"test\" { name = \"test-queue\" }";

        let prepared = merger.prepare(code).await.unwrap();

        assert_eq!(prepared.dir, temp.path().join("infra"));
        assert_eq!(prepared.outcome, MergeOutcome::Created);
        assert!(prepared.dir.is_dir());
        let content = std::fs::read_to_string(prepared.config_file).unwrap();
        assert_eq!(content, code);
    }

    #[tokio::test]
    async fn test_header_written_once() {
        let temp = TempDir::new().unwrap();
        let merger = merger_in(&temp);

        merger.prepare(&artifact("bucket1")).await.unwrap();
        let prepared = merger.prepare(&artifact("bucket2")).await.unwrap();

        assert_eq!(prepared.outcome, MergeOutcome::Appended { blocks: 1 });
        let content = std::fs::read_to_string(merger.config_file()).unwrap();
        assert!(content.contains("bucket1"));
        assert!(content.contains("bucket2"));
        assert_eq!(content.matches("provider \"aws\"").count(), 1);
        assert_eq!(content.matches("required_providers").count(), 1);
        assert_eq!(content.matches("# Resources added").count(), 1);
    }

    #[tokio::test]
    async fn test_each_merge_gets_its_own_separator() {
        let temp = TempDir::new().unwrap();
        let merger = merger_in(&temp);

        merger.prepare(&artifact("a")).await.unwrap();
        merger.prepare(&artifact("b")).await.unwrap();
        merger.prepare(&artifact("c")).await.unwrap();

        let content = std::fs::read_to_string(merger.config_file()).unwrap();
        assert_eq!(content.matches("# Resources added").count(), 2);
        let a = content.find("\"a\"").unwrap();
        let b = content.find("\"b\"").unwrap();
        let c = content.find("\"c\"").unwrap();
        assert!(a < b && b < c);
    }

    #[tokio::test]
    async fn test_exact_appended_layout() {
        let temp = TempDir::new().unwrap();
        let merger = merger_in(&temp);

        merger.prepare("resource \"x\" \"one\" {}").await.unwrap();
        merger.prepare("resource \"x\" \"two\" {}").await.unwrap();

        let content = std::fs::read_to_string(merger.config_file()).unwrap();
        assert_eq!(
            content,
            format!("resource \"x\" \"one\" {{}}{APPEND_SEPARATOR}resource \"x\" \"two\" {{}}\n\n")
        );
    }

    #[tokio::test]
    async fn test_header_only_code_leaves_file_untouched() {
        let temp = TempDir::new().unwrap();
        let merger = merger_in(&temp);

        merger.prepare(&artifact("bucket1")).await.unwrap();
        let before = std::fs::read_to_string(merger.config_file()).unwrap();

        let prepared = merger.prepare(HEADER).await.unwrap();

        assert_eq!(prepared.outcome, MergeOutcome::Unchanged);
        let after = std::fs::read_to_string(merger.config_file()).unwrap();
        assert_eq!(before, after);
    }

    /// `(type, name)` of every `data.<type>.<name>` expression in `content`.
    fn data_references(content: &str) -> Vec<(String, String)> {
        content
            .match_indices("data.")
            .filter(|(i, _)| {
                content[..*i]
                    .chars()
                    .next_back()
                    .is_none_or(|c| !(c.is_ascii_alphanumeric() || c == '_'))
            })
            .filter_map(|(i, m)| {
                let rest: String = content[i + m.len()..]
                    .chars()
                    .take_while(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '.')
                    .collect();
                let mut parts = rest.split('.');
                Some((parts.next()?.to_string(), parts.next()?.to_string()))
            })
            .collect()
    }

    #[tokio::test]
    async fn test_appended_ecs_stack_references_only_declared_data() {
        let temp = TempDir::new().unwrap();
        let merger = merger_in(&temp);
        let renderer = TemplateRenderer::new();

        let storage = InfraPlan::new("eu-west-1").with_resource(ResourceSpec::S3 {
            name: "logs".to_string(),
            versioning: false,
            encrypted: false,
        });
        let compute = InfraPlan::new("eu-west-1").with_resource(ResourceSpec::EcsCluster {
            cluster_name: "web".to_string(),
            service_name: "api".to_string(),
            task_name: "api-task".to_string(),
            cpu: 256,
            memory: 512,
        });

        merger.prepare(&renderer.render(&storage)).await.unwrap();
        let prepared = merger.prepare(&renderer.render(&compute)).await.unwrap();
        assert!(matches!(prepared.outcome, MergeOutcome::Appended { .. }));

        let content = std::fs::read_to_string(merger.config_file()).unwrap();
        assert!(content.contains("resource \"aws_subnet\" \"api_subnet\""));
        for (kind, name) in data_references(&content) {
            assert!(
                content.contains(&format!("data \"{kind}\" \"{name}\"")),
                "data.{kind}.{name} is referenced but never declared"
            );
        }
    }

    #[tokio::test]
    async fn test_directory_creation_failure_is_io_error() {
        let temp = TempDir::new().unwrap();
        let blocker = temp.path().join("not-a-dir");
        std::fs::write(&blocker, "file in the way").unwrap();

        let merger = ConfigMerger::new(blocker.join("infra"), "main.tf");
        let err = merger.prepare("resource \"x\" \"y\" {}").await.unwrap_err();

        assert!(matches!(err, crate::error::StagehandError::Io(_)));
    }
}
