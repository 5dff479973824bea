//! Configuration parser for loading Stagehand configuration.
//!
//! This module handles loading configuration from YAML files and environment
//! variables, with proper precedence and error handling.

use crate::error::{ConfigError, Result, StagehandError};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::spec::StagehandConfig;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV_VAR: &str = "STAGEHAND_CONFIG";

/// Configuration parser for loading Stagehand configuration.
#[derive(Debug, Default)]
pub struct ConfigParser {
    /// Base path for resolving relative paths.
    base_path: Option<PathBuf>,
}

impl ConfigParser {
    /// Creates a new configuration parser.
    #[must_use]
    pub const fn new() -> Self {
        Self { base_path: None }
    }

    /// Sets the base path for resolving relative paths.
    #[must_use]
    pub fn with_base_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.base_path = Some(path.into());
        self
    }

    /// Loads configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<StagehandConfig> {
        let path = path.as_ref();
        info!("Loading configuration from: {}", path.display());

        if !path.exists() {
            return Err(StagehandError::Config(ConfigError::FileNotFound {
                path: path.to_path_buf(),
            }));
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            StagehandError::Config(ConfigError::ParseError {
                message: format!("Failed to read file: {e}"),
                location: Some(path.display().to_string()),
            })
        })?;

        self.parse_yaml(&content, Some(path))
    }

    /// Parses configuration from a YAML string.
    ///
    /// An empty document yields the default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is invalid.
    pub fn parse_yaml(&self, content: &str, source: Option<&Path>) -> Result<StagehandConfig> {
        debug!("Parsing YAML configuration");

        if content.trim().is_empty() {
            return Ok(self.finish(StagehandConfig::default()));
        }

        let config: StagehandConfig = serde_yaml::from_str(content).map_err(|e| {
            let location = source.map(|p| p.display().to_string());
            StagehandError::Config(ConfigError::ParseError {
                message: format!("YAML parse error: {e}"),
                location,
            })
        })?;

        Ok(self.finish(config))
    }

    /// Loads configuration with environment variable overrides.
    ///
    /// Environment variables are checked in the format
    /// `STAGEHAND_<SECTION>_<KEY>` (e.g., `STAGEHAND_TERRAFORM_BINARY`).
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_with_env(&self, path: impl AsRef<Path>) -> Result<StagehandConfig> {
        let mut config = self.load_file(path)?;
        apply_env_overrides(&mut config, |name| std::env::var(name).ok());
        Ok(config)
    }

    /// Returns the default configuration with environment overrides applied.
    #[must_use]
    pub fn defaults_with_env(&self) -> StagehandConfig {
        let mut config = self.finish(StagehandConfig::default());
        apply_env_overrides(&mut config, |name| std::env::var(name).ok());
        config
    }

    /// Loads the .env file if present.
    ///
    /// # Errors
    ///
    /// Returns an error if the .env file exists but cannot be loaded.
    pub fn load_dotenv(&self) -> Result<()> {
        let env_path = self
            .base_path
            .as_ref()
            .map_or_else(|| PathBuf::from(".env"), |p| p.join(".env"));

        if env_path.exists() {
            info!("Loading environment from: {}", env_path.display());
            dotenvy::from_path(&env_path).map_err(|e| {
                StagehandError::Config(ConfigError::ParseError {
                    message: format!("Failed to load .env file: {e}"),
                    location: Some(env_path.display().to_string()),
                })
            })?;
        } else {
            debug!(".env file not found at: {}", env_path.display());
        }

        Ok(())
    }

    /// Reads the generator API key from the configured environment variable.
    ///
    /// # Errors
    ///
    /// Returns an error if the variable is unset or blank.
    pub fn get_api_key(config: &StagehandConfig) -> Result<String> {
        let name = &config.generator.api_key_env;
        match std::env::var(name) {
            Ok(key) if !key.trim().is_empty() => Ok(key.trim().to_string()),
            _ => Err(StagehandError::Config(ConfigError::MissingEnvVar {
                name: name.clone(),
            })),
        }
    }

    fn finish(&self, mut config: StagehandConfig) -> StagehandConfig {
        if let Some(base) = &self.base_path {
            config.resolve_paths(base);
        }
        config
    }
}

/// Applies `STAGEHAND_*` overrides using `lookup` to read variables.
pub fn apply_env_overrides(config: &mut StagehandConfig, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(dir) = lookup("STAGEHAND_WORKSPACE_DIR") {
        debug!("Overriding workspace.dir from environment");
        config.workspace.dir = PathBuf::from(dir);
    }

    if let Some(binary) = lookup("STAGEHAND_TERRAFORM_BINARY") {
        debug!("Overriding terraform.binary from environment");
        config.terraform.binary = binary;
    }

    if let Some(endpoint) = lookup("STAGEHAND_GENERATOR_ENDPOINT") {
        debug!("Overriding generator.endpoint from environment");
        config.generator.endpoint = endpoint;
    }

    if let Some(model) = lookup("STAGEHAND_GENERATOR_MODEL") {
        debug!("Overriding generator.model from environment");
        config.generator.model = model;
    }

    // Values are not logged
    if let Some(key) = lookup("STAGEHAND_AWS_ACCESS_KEY_ID") {
        config.credentials.access_key_id = Some(key);
    }

    if let Some(secret) = lookup("STAGEHAND_AWS_SECRET_ACCESS_KEY") {
        config.credentials.secret_access_key = Some(secret);
    }
}

/// Default configuration file names to search for.
pub const DEFAULT_CONFIG_FILES: &[&str] = &["stagehand.yaml", "stagehand.yml"];

/// Finds the configuration file in the given directory or its parents, then
/// in the user configuration directory.
///
/// # Errors
///
/// Returns an error if no configuration file is found.
pub fn find_config_file(start_dir: impl AsRef<Path>) -> Result<PathBuf> {
    let start = start_dir.as_ref();
    let mut current = start.to_path_buf();

    loop {
        for filename in DEFAULT_CONFIG_FILES {
            let config_path = current.join(filename);
            if config_path.exists() {
                info!("Found configuration file: {}", config_path.display());
                return Ok(config_path);
            }
        }

        if !current.pop() {
            break;
        }
    }

    if let Some(user_dir) = dirs::config_dir() {
        for filename in DEFAULT_CONFIG_FILES {
            let config_path = user_dir.join("stagehand").join(filename);
            if config_path.exists() {
                info!("Found user configuration file: {}", config_path.display());
                return Ok(config_path);
            }
        }
    }

    Err(StagehandError::Config(ConfigError::FileNotFound {
        path: start.join(DEFAULT_CONFIG_FILES[0]),
    }))
}
