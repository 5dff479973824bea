//! Error types for the Stagehand provisioning workflow.
//!
//! This module provides the error hierarchy for every step of the workflow:
//! configuration, plan generation, the pending-plan lifecycle, the staged
//! Terraform pipeline and the execution history.

use std::path::PathBuf;
use thiserror::Error;

use crate::provisioning::Stage;

/// The main error type for Stagehand.
#[derive(Debug, Error)]
pub enum StagehandError {
    /// Configuration-related errors.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Plan generation errors.
    #[error("Plan generation error: {0}")]
    Generation(#[from] GenerationError),

    /// Workflow ordering errors.
    #[error("Workflow error: {0}")]
    Workflow(#[from] WorkflowError),

    /// Terraform stage errors.
    #[error("Stage error: {0}")]
    Stage(#[from] StageError),

    /// Execution history errors.
    #[error("History error: {0}")]
    History(#[from] HistoryError),

    /// IO errors.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file was not found.
    #[error("Configuration file not found: {path}")]
    FileNotFound {
        /// Path to the missing file.
        path: PathBuf,
    },

    /// The configuration file could not be parsed.
    #[error("Failed to parse configuration: {message}")]
    ParseError {
        /// Description of the parse error.
        message: String,
        /// Optional source location.
        location: Option<String>,
    },

    /// Validation failed.
    #[error("Configuration validation failed: {message}")]
    ValidationError {
        /// Description of the validation error.
        message: String,
        /// Field that failed validation.
        field: Option<String>,
    },

    /// Environment variable is missing.
    #[error("Missing environment variable: {name}")]
    MissingEnvVar {
        /// Name of the missing variable.
        name: String,
    },
}

/// Errors raised by a plan generator.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// Authentication against the model endpoint failed.
    #[error("Authentication failed: {message}")]
    AuthenticationFailed {
        /// Description of the auth failure.
        message: String,
    },

    /// API request failed.
    #[error("Model API request failed: {status} - {message}")]
    ApiRequestFailed {
        /// HTTP status code.
        status: u16,
        /// Error message from API.
        message: String,
    },

    /// Rate limited.
    #[error("Model API rate limited, retry after {retry_after_secs} seconds")]
    RateLimited {
        /// Seconds to wait before retrying.
        retry_after_secs: u64,
    },

    /// Network error.
    #[error("Network error communicating with the model endpoint: {message}")]
    NetworkError {
        /// Description of the network error.
        message: String,
    },

    /// The model answered with something that is not a usable plan.
    #[error("Model returned an invalid plan: {message}")]
    InvalidResponse {
        /// Description of the response issue.
        message: String,
    },

    /// The generated plan contained no code.
    #[error("Model returned an empty infrastructure code artifact")]
    EmptyCode,
}

/// Errors in the propose/confirm ordering.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// `confirm(true)` was called with nothing staged.
    #[error("no pending plan: propose a change before confirming")]
    NoPendingPlan,
}

/// Errors raised while running a pipeline stage.
#[derive(Debug, Error)]
pub enum StageError {
    /// The tool exited with a non-zero status.
    #[error("terraform {stage} failed (exit code {exit_code:?}): {stderr}")]
    Failed {
        /// Stage that failed.
        stage: Stage,
        /// Process exit code, if the process exited normally.
        exit_code: Option<i32>,
        /// Captured error stream of the stage.
        stderr: String,
    },

    /// The stage exceeded its time budget and was killed.
    #[error("terraform {stage} timed out after {timeout_secs} seconds")]
    Timeout {
        /// Stage that timed out.
        stage: Stage,
        /// Configured timeout.
        timeout_secs: f64,
    },

    /// The process could not be started.
    #[error("failed to start terraform {stage}: {message}")]
    SpawnFailed {
        /// Stage that could not be started.
        stage: Stage,
        /// Description of the spawn failure.
        message: String,
    },
}

/// Errors raised by the execution history store.
#[derive(Debug, Error)]
pub enum HistoryError {
    /// The history file exists but cannot be read or parsed.
    #[error("History file is corrupted: {message}")]
    Corrupted {
        /// Description of the corruption.
        message: String,
    },

    /// The history could not be serialized.
    #[error("Failed to serialize history: {message}")]
    SerializationError {
        /// Description of the serialization error.
        message: String,
    },

    /// The history file could not be written.
    #[error("Failed to write history: {message}")]
    WriteFailed {
        /// Description of the write failure.
        message: String,
    },
}

/// Result type alias for Stagehand operations.
pub type Result<T> = std::result::Result<T, StagehandError>;

impl StagehandError {
    /// Creates a new internal error with the given message.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Returns true if this error is retryable.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Generation(
                GenerationError::RateLimited { .. } | GenerationError::NetworkError { .. }
            )
        )
    }

    /// Returns the delay the server asked for before retrying, if any.
    #[must_use]
    pub const fn retry_delay_secs(&self) -> Option<u64> {
        match self {
            Self::Generation(GenerationError::RateLimited { retry_after_secs }) => {
                Some(*retry_after_secs)
            }
            _ => None,
        }
    }

    /// Returns the operator-facing message for this error.
    ///
    /// Stage failures surface the captured error stream verbatim so the
    /// operator sees exactly what terraform printed.
    #[must_use]
    pub fn operator_message(&self) -> String {
        match self {
            Self::Stage(StageError::Failed { stderr, .. }) => stderr.clone(),
            Self::Generation(e) => e.to_string(),
            Self::Workflow(e) => e.to_string(),
            Self::Stage(e) => e.to_string(),
            Self::History(e) => e.to_string(),
            Self::Io(e) => e.to_string(),
            Self::Config(e) => e.to_string(),
            Self::Internal(message) => message.clone(),
        }
    }
}

impl ConfigError {
    /// Creates a validation error for a specific field.
    #[must_use]
    pub fn validation(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
            field: Some(field.into()),
        }
    }
}

impl GenerationError {
    /// Creates an API request error.
    #[must_use]
    pub fn api_error(status: u16, message: impl Into<String>) -> Self {
        Self::ApiRequestFailed {
            status,
            message: message.into(),
        }
    }

    /// Creates a network error.
    #[must_use]
    pub fn network(message: impl Into<String>) -> Self {
        Self::NetworkError {
            message: message.into(),
        }
    }

    /// Creates an invalid-response error.
    #[must_use]
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            message: message.into(),
        }
    }
}
