//! Configuration specification types for Stagehand.
//!
//! This module defines the structs that map to the `stagehand.yaml` file.
//! Every section is optional; a missing file yields [`StagehandConfig::default`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// The root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StagehandConfig {
    /// Where generated configuration is written.
    #[serde(default)]
    pub workspace: WorkspaceConfig,
    /// How the terraform binary is invoked.
    #[serde(default)]
    pub terraform: TerraformConfig,
    /// Plan generator settings.
    #[serde(default)]
    pub generator: GeneratorConfig,
    /// Optional cloud credentials injected into terraform.
    #[serde(default)]
    pub credentials: CredentialsConfig,
    /// Execution history settings.
    #[serde(default)]
    pub history: HistoryConfig,
}

/// Working directory configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WorkspaceConfig {
    /// Working directory for terraform, relative to the config file.
    #[serde(default = "default_workspace_dir")]
    pub dir: PathBuf,
    /// Name of the merged configuration file inside `dir`.
    #[serde(default = "default_file_name")]
    pub file_name: String,
}

/// Terraform invocation settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TerraformConfig {
    /// Terraform executable (name on `PATH` or absolute path).
    #[serde(default = "default_binary")]
    pub binary: String,
    /// File name of the serialized plan inside the working directory.
    #[serde(default = "default_plan_artifact")]
    pub plan_artifact: String,
    /// Per-stage time budget. Unbounded when absent.
    #[serde(default)]
    pub stage_timeout_secs: Option<u64>,
}

/// Plan generator settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GeneratorConfig {
    /// What the model is asked to return.
    #[serde(default)]
    pub mode: GeneratorMode,
    /// OpenAI-compatible chat completions endpoint.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Model name.
    #[serde(default = "default_model")]
    pub model: String,
    /// Environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    /// Request timeout.
    #[serde(default = "default_generator_timeout")]
    pub timeout_secs: u64,
    /// Region used when the request does not name one.
    #[serde(default = "default_region")]
    pub default_region: String,
    /// Sampling temperature.
    #[serde(default)]
    pub temperature: Option<f32>,
}

/// Generator output modes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum GeneratorMode {
    /// The model writes HCL directly.
    #[default]
    Code,
    /// The model returns a structured plan rendered from templates.
    Structured,
}

/// Cloud credentials.
#[derive(Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CredentialsConfig {
    /// Access key id.
    #[serde(default)]
    pub access_key_id: Option<String>,
    /// Secret access key.
    #[serde(default)]
    pub secret_access_key: Option<String>,
}

/// Execution history settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HistoryConfig {
    /// Whether confirm outcomes are recorded.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Directory holding `history.json`.
    #[serde(default = "default_history_dir")]
    pub dir: PathBuf,
}

fn default_workspace_dir() -> PathBuf {
    PathBuf::from("infra")
}

fn default_file_name() -> String {
    String::from("main.tf")
}

fn default_binary() -> String {
    String::from("terraform")
}

fn default_plan_artifact() -> String {
    String::from("tfplan")
}

fn default_endpoint() -> String {
    String::from("https://api.openai.com/v1/chat/completions")
}

fn default_model() -> String {
    String::from("gpt-4o-mini")
}

fn default_api_key_env() -> String {
    String::from("OPENAI_API_KEY")
}

const fn default_generator_timeout() -> u64 {
    120
}

fn default_region() -> String {
    String::from("us-east-1")
}

const fn default_true() -> bool {
    true
}

fn default_history_dir() -> PathBuf {
    PathBuf::from(".stagehand")
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            dir: default_workspace_dir(),
            file_name: default_file_name(),
        }
    }
}

impl Default for TerraformConfig {
    fn default() -> Self {
        Self {
            binary: default_binary(),
            plan_artifact: default_plan_artifact(),
            stage_timeout_secs: None,
        }
    }
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            mode: GeneratorMode::default(),
            endpoint: default_endpoint(),
            model: default_model(),
            api_key_env: default_api_key_env(),
            timeout_secs: default_generator_timeout(),
            default_region: default_region(),
            temperature: None,
        }
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: default_history_dir(),
        }
    }
}

impl fmt::Debug for CredentialsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialsConfig")
            .field("access_key_id", &self.access_key_id.as_ref().map(|_| "<redacted>"))
            .field(
                "secret_access_key",
                &self.secret_access_key.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

impl StagehandConfig {
    /// Resolves relative workspace and history directories against `base`.
    pub fn resolve_paths(&mut self, base: &std::path::Path) {
        if self.workspace.dir.is_relative() {
            self.workspace.dir = base.join(&self.workspace.dir);
        }
        if self.history.dir.is_relative() {
            self.history.dir = base.join(&self.history.dir);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = StagehandConfig::default();
        assert_eq!(config.workspace.dir, PathBuf::from("infra"));
        assert_eq!(config.workspace.file_name, "main.tf");
        assert_eq!(config.terraform.binary, "terraform");
        assert_eq!(config.terraform.plan_artifact, "tfplan");
        assert!(config.terraform.stage_timeout_secs.is_none());
        assert_eq!(config.generator.mode, GeneratorMode::Code);
        assert!(config.history.enabled);
    }

    #[test]
    fn test_credentials_debug_is_redacted() {
        let creds = CredentialsConfig {
            access_key_id: Some("AKIAEXAMPLE".to_string()),
            secret_access_key: None,
        };
        let rendered = format!("{creds:?}");
        assert!(!rendered.contains("AKIAEXAMPLE"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn test_resolve_paths_keeps_absolute() {
        let mut config = StagehandConfig::default();
        config.workspace.dir = PathBuf::from("/srv/infra");
        config.resolve_paths(std::path::Path::new("/home/op"));
        assert_eq!(config.workspace.dir, PathBuf::from("/srv/infra"));
        assert_eq!(config.history.dir, PathBuf::from("/home/op/.stagehand"));
    }
}
