//! Configuration module for Stagehand.
//!
//! This module handles all configuration-related functionality:
//! - Parsing and deserializing `stagehand.yaml`
//! - Environment and `.env` overrides
//! - Validation of configuration values

mod spec;
mod parser;
mod validator;

pub use spec::{
    CredentialsConfig, GeneratorConfig, GeneratorMode, HistoryConfig, StagehandConfig,
    TerraformConfig, WorkspaceConfig,
};
pub use parser::{apply_env_overrides, find_config_file, ConfigParser, CONFIG_ENV_VAR, DEFAULT_CONFIG_FILES};
pub use validator::{ConfigValidator, ValidationError, ValidationResult};
