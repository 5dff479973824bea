//! Configuration validation.
//!
//! Checks that a loaded configuration can actually drive the workflow before
//! anything touches the working directory or spawns terraform.

use crate::error::{ConfigError, Result, StagehandError};
use std::path::{Component, Path};
use tracing::debug;

use super::spec::{GeneratorConfig, HistoryConfig, StagehandConfig, TerraformConfig, WorkspaceConfig};

/// Validator for Stagehand configurations.
#[derive(Debug, Default)]
pub struct ConfigValidator;

/// Validation result containing all errors found.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// List of validation errors.
    pub errors: Vec<ValidationError>,
    /// List of warnings (non-fatal issues).
    pub warnings: Vec<String>,
}

/// A single validation error.
#[derive(Debug)]
pub struct ValidationError {
    /// The field path that failed validation.
    pub field: String,
    /// The error message.
    pub message: String,
}

impl ConfigValidator {
    /// Creates a new validator.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Validates a configuration.
    ///
    /// # Errors
    ///
    /// Returns the first validation error if any check fails.
    pub fn validate(&self, config: &StagehandConfig) -> Result<ValidationResult> {
        let mut result = ValidationResult::default();

        Self::validate_workspace(&config.workspace, &mut result);
        Self::validate_terraform(&config.terraform, &mut result);
        Self::validate_generator(&config.generator, &mut result);
        Self::validate_history(&config.history, &config.workspace, &mut result);
        Self::validate_credentials(config, &mut result);

        if result.errors.is_empty() {
            debug!("Configuration validation passed");
            Ok(result)
        } else {
            let first_error = &result.errors[0];
            Err(StagehandError::Config(ConfigError::validation(
                first_error.message.clone(),
                first_error.field.clone(),
            )))
        }
    }

    fn validate_workspace(workspace: &WorkspaceConfig, result: &mut ValidationResult) {
        if !is_plain_file_name(&workspace.file_name) {
            result.errors.push(ValidationError {
                field: String::from("workspace.file_name"),
                message: format!(
                    "'{}' must be a plain file name inside the working directory",
                    workspace.file_name
                ),
            });
        } else if !workspace.file_name.ends_with(".tf") {
            result.warnings.push(format!(
                "workspace.file_name '{}' does not end in .tf; terraform will ignore it",
                workspace.file_name
            ));
        }

        if workspace.dir.as_os_str().is_empty() {
            result.errors.push(ValidationError {
                field: String::from("workspace.dir"),
                message: String::from("Working directory cannot be empty"),
            });
        }
    }

    fn validate_terraform(terraform: &TerraformConfig, result: &mut ValidationResult) {
        if terraform.binary.trim().is_empty() {
            result.errors.push(ValidationError {
                field: String::from("terraform.binary"),
                message: String::from("Terraform binary cannot be empty"),
            });
        }

        if !is_plain_file_name(&terraform.plan_artifact) {
            result.errors.push(ValidationError {
                field: String::from("terraform.plan_artifact"),
                message: format!(
                    "'{}' must be a plain file name without path separators",
                    terraform.plan_artifact
                ),
            });
        }

        if terraform.stage_timeout_secs == Some(0) {
            result.errors.push(ValidationError {
                field: String::from("terraform.stage_timeout_secs"),
                message: String::from("Stage timeout must be at least 1 second"),
            });
        }
    }

    fn validate_generator(generator: &GeneratorConfig, result: &mut ValidationResult) {
        if !generator.endpoint.starts_with("http://") && !generator.endpoint.starts_with("https://") {
            result.errors.push(ValidationError {
                field: String::from("generator.endpoint"),
                message: format!("'{}' is not an http(s) URL", generator.endpoint),
            });
        } else if generator.endpoint.starts_with("http://")
            && !generator.endpoint.contains("localhost")
            && !generator.endpoint.contains("127.0.0.1")
        {
            result.warnings.push(String::from(
                "generator.endpoint uses plain http; the API key is sent unencrypted",
            ));
        }

        if generator.model.trim().is_empty() {
            result.errors.push(ValidationError {
                field: String::from("generator.model"),
                message: String::from("Model name cannot be empty"),
            });
        }

        if generator.api_key_env.trim().is_empty() {
            result.errors.push(ValidationError {
                field: String::from("generator.api_key_env"),
                message: String::from("API key variable name cannot be empty"),
            });
        }

        if generator.timeout_secs == 0 {
            result.errors.push(ValidationError {
                field: String::from("generator.timeout_secs"),
                message: String::from("Generator timeout must be at least 1 second"),
            });
        }

        if let Some(temperature) = generator.temperature {
            if !(0.0..=2.0).contains(&temperature) {
                result.errors.push(ValidationError {
                    field: String::from("generator.temperature"),
                    message: format!("Temperature {temperature} is outside 0.0..=2.0"),
                });
            }
        }
    }

    fn validate_history(
        history: &HistoryConfig,
        workspace: &WorkspaceConfig,
        result: &mut ValidationResult,
    ) {
        if history.enabled && history.dir == workspace.dir {
            result.errors.push(ValidationError {
                field: String::from("history.dir"),
                message: String::from(
                    "History directory must differ from the terraform working directory",
                ),
            });
        }
    }

    fn validate_credentials(config: &StagehandConfig, result: &mut ValidationResult) {
        let has_key = config
            .credentials
            .access_key_id
            .as_deref()
            .is_some_and(|v| !v.trim().is_empty());
        let has_secret = config
            .credentials
            .secret_access_key
            .as_deref()
            .is_some_and(|v| !v.trim().is_empty());

        if has_key != has_secret {
            result.warnings.push(String::from(
                "Only one of credentials.access_key_id / credentials.secret_access_key is set",
            ));
        }
    }
}

/// Returns true if `name` is a single normal path component.
fn is_plain_file_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    ) && !name.contains('/')
        && !name.contains('\\')
}

impl ValidationResult {
    /// Returns true if validation passed (no errors).
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Returns the number of errors.
    #[must_use]
    pub const fn error_count(&self) -> usize {
        self.errors.len()
    }

    /// Returns the number of warnings.
    #[must_use]
    pub const fn warning_count(&self) -> usize {
        self.warnings.len()
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let result = ConfigValidator::new()
            .validate(&StagehandConfig::default())
            .unwrap();
        assert!(result.is_valid());
        assert_eq!(result.warning_count(), 0);
    }

    #[test]
    fn test_plain_file_name() {
        assert!(is_plain_file_name("main.tf"));
        assert!(is_plain_file_name("tfplan"));
        assert!(!is_plain_file_name(""));
        assert!(!is_plain_file_name("../main.tf"));
        assert!(!is_plain_file_name("sub/main.tf"));
        assert!(!is_plain_file_name("/etc/main.tf"));
        assert!(!is_plain_file_name(".."));
    }

    #[test]
    fn test_rejects_zero_stage_timeout() {
        let mut config = StagehandConfig::default();
        config.terraform.stage_timeout_secs = Some(0);

        let err = ConfigValidator::new().validate(&config).unwrap_err();
        assert!(err.to_string().contains("Stage timeout"));
        assert!(matches!(
            err,
            StagehandError::Config(ConfigError::ValidationError { field: Some(ref f), .. })
                if f == "terraform.stage_timeout_secs"
        ));
    }

    #[test]
    fn test_rejects_plan_artifact_with_separator() {
        let mut config = StagehandConfig::default();
        config.terraform.plan_artifact = String::from("../tfplan");

        assert!(ConfigValidator::new().validate(&config).is_err());
    }

    #[test]
    fn test_warns_on_half_credentials() {
        let mut config = StagehandConfig::default();
        config.credentials.access_key_id = Some(String::from("AKIAEXAMPLE"));

        let result = ConfigValidator::new().validate(&config).unwrap();
        assert_eq!(result.warning_count(), 1);
    }

    #[test]
    fn test_rejects_non_http_endpoint() {
        let mut config = StagehandConfig::default();
        config.generator.endpoint = String::from("ftp://models.example");

        assert!(ConfigValidator::new().validate(&config).is_err());
    }
}
