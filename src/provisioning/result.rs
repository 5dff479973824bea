//! Outcome of a confirm.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Terminal status of a confirmed (or rejected) plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionStatus {
    /// All three stages exited successfully.
    Success,
    /// A stage failed or the workspace could not be prepared.
    Error,
    /// The operator rejected the plan.
    Cancelled,
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Success => "SUCCESS",
            Self::Error => "ERROR",
            Self::Cancelled => "CANCELLED",
        };
        write!(f, "{s}")
    }
}

/// `{ status, code, output }` returned by `confirm`.
///
/// `code` always carries the artifact that was (or would have been)
/// applied, so a failure can be inspected against exactly what was tried.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// Outcome.
    pub status: ExecutionStatus,
    /// Attempted code.
    pub code: String,
    /// Apply output on success, error text otherwise.
    pub output: String,
}

impl ExecutionResult {
    /// A successful apply.
    #[must_use]
    pub fn success(code: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            status: ExecutionStatus::Success,
            code: code.into(),
            output: output.into(),
        }
    }

    /// A failed run.
    #[must_use]
    pub fn error(code: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            status: ExecutionStatus::Error,
            code: code.into(),
            output: output.into(),
        }
    }

    /// A rejected plan.
    #[must_use]
    pub fn cancelled(code: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            status: ExecutionStatus::Cancelled,
            code: code.into(),
            output: output.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_serializes_upper_case() {
        let result = ExecutionResult::cancelled("", "rejected");
        let json = serde_json::to_value(&result).unwrap();

        assert_eq!(json["status"], "CANCELLED");
        assert_eq!(json["output"], "rejected");
        assert_eq!(
            serde_json::to_value(ExecutionStatus::Success).unwrap(),
            "SUCCESS"
        );
    }
}
