//! Process control for pipeline stages.
//!
//! [`CommandRunner`] is the seam between the pipeline and the operating
//! system; [`ProcessRunner`] is the real implementation backed by
//! `tokio::process`.

use async_trait::async_trait;
use std::fmt;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::{Result, StageError};

use super::stage::Stage;

/// Everything needed to start one stage.
#[derive(Clone, PartialEq, Eq)]
pub struct StageInvocation {
    /// Stage being run.
    pub stage: Stage,
    /// Executable.
    pub program: String,
    /// Arguments.
    pub args: Vec<String>,
    /// Working directory.
    pub cwd: PathBuf,
    /// Variables added on top of the inherited environment.
    pub env: Vec<(String, String)>,
    /// Time budget; `None` waits indefinitely.
    pub timeout: Option<Duration>,
}

/// Captured result of a finished stage.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StageOutput {
    /// Exit code, `None` if the process was killed by a signal.
    pub exit_code: Option<i32>,
    /// Whether the process exited with status zero.
    pub success: bool,
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
}

/// Runs a stage to completion and captures its output.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Runs `invocation` and waits for it to exit.
    ///
    /// A non-zero exit is reported through [`StageOutput::success`], not as
    /// an error. Errors are reserved for processes that could not be started
    /// or exceeded their time budget.
    async fn run(&self, invocation: &StageInvocation) -> Result<StageOutput>;
}

/// [`CommandRunner`] that spawns real processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

impl ProcessRunner {
    /// Creates a new process runner.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, invocation: &StageInvocation) -> Result<StageOutput> {
        let stage = invocation.stage;
        debug!("Running {invocation:?}");

        let mut command = Command::new(&invocation.program);
        command
            .args(&invocation.args)
            .current_dir(&invocation.cwd)
            .envs(invocation.env.iter().map(|(k, v)| (k, v)))
            .stdin(Stdio::null())
            .kill_on_drop(true);

        let output = match invocation.timeout {
            Some(limit) => {
                if let Ok(finished) = tokio::time::timeout(limit, command.output()).await {
                    finished
                } else {
                    warn!("terraform {stage} exceeded {limit:?}, killing it");
                    return Err(StageError::Timeout {
                        stage,
                        timeout_secs: limit.as_secs_f64(),
                    }
                    .into());
                }
            }
            None => command.output().await,
        }
        .map_err(|e| StageError::SpawnFailed {
            stage,
            message: format!("{}: {e}", invocation.program),
        })?;

        Ok(StageOutput {
            exit_code: output.status.code(),
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

impl fmt::Debug for StageInvocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let env_names: Vec<&str> = self.env.iter().map(|(k, _)| k.as_str()).collect();
        f.debug_struct("StageInvocation")
            .field("stage", &self.stage)
            .field("program", &self.program)
            .field("args", &self.args)
            .field("cwd", &self.cwd)
            .field("env", &env_names)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn invocation(program: &str, args: &[&str]) -> StageInvocation {
        StageInvocation {
            stage: Stage::Init,
            program: program.to_string(),
            args: args.iter().map(|a| (*a).to_string()).collect(),
            cwd: std::env::temp_dir(),
            env: vec![(String::from("STAGEHAND_TEST_VALUE"), String::from("injected"))],
            timeout: None,
        }
    }

    #[tokio::test]
    async fn test_captures_streams_and_env() {
        let inv = invocation(
            "sh",
            &["-c", "echo \"out:$STAGEHAND_TEST_VALUE\"; echo err >&2"],
        );
        let output = ProcessRunner::new().run(&inv).await.unwrap();

        assert!(output.success);
        assert_eq!(output.exit_code, Some(0));
        assert_eq!(output.stdout, "out:injected\n");
        assert_eq!(output.stderr, "err\n");
    }

    #[tokio::test]
    async fn test_non_zero_exit_is_not_an_error() {
        let inv = invocation("sh", &["-c", "echo boom >&2; exit 3"]);
        let output = ProcessRunner::new().run(&inv).await.unwrap();

        assert!(!output.success);
        assert_eq!(output.exit_code, Some(3));
        assert_eq!(output.stderr, "boom\n");
    }

    #[tokio::test]
    async fn test_missing_program_is_spawn_failure() {
        let inv = invocation("/nonexistent/terraform-binary", &[]);
        let err = ProcessRunner::new().run(&inv).await.unwrap_err();

        assert!(matches!(
            err,
            crate::error::StagehandError::Stage(StageError::SpawnFailed { stage: Stage::Init, .. })
        ));
    }

    #[tokio::test]
    async fn test_timeout_kills_stage() {
        let mut inv = invocation("sh", &["-c", "sleep 5"]);
        inv.timeout = Some(Duration::from_millis(200));

        let started = std::time::Instant::now();
        let err = ProcessRunner::new().run(&inv).await.unwrap_err();

        assert!(started.elapsed() < Duration::from_secs(4));
        assert!(matches!(
            err,
            crate::error::StagehandError::Stage(StageError::Timeout { .. })
        ));
        assert!(err.to_string().contains("terraform init timed out after 0.2 seconds"));
    }

    #[test]
    fn test_debug_omits_env_values() {
        let inv = invocation("terraform", &["init"]);
        let rendered = format!("{inv:?}");
        assert!(rendered.contains("STAGEHAND_TEST_VALUE"));
        assert!(!rendered.contains("injected"));
    }
}
