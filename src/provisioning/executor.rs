//! The staged terraform pipeline.
//!
//! [`ProvisioningExecutor::run`] prepares the working directory, then runs
//! `init`, `plan` and `apply` in order, stopping at the first stage that
//! fails. It never returns an error: every failure becomes an
//! [`ExecutionResult`] with [`ExecutionStatus::Error`](super::ExecutionStatus)
//! carrying the attempted code.

use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, error, info};

use crate::config::StagehandConfig;
use crate::error::{Result, StageError};
use crate::workspace::ConfigMerger;

use super::credentials::Credentials;
use super::result::ExecutionResult;
use super::runner::{CommandRunner, ProcessRunner, StageInvocation};
use super::stage::{Stage, PIPELINE};

/// Something that can apply a code artifact.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Provisioner: Send + Sync {
    /// Applies `code` and reports the outcome.
    async fn run(&self, code: &str) -> ExecutionResult;
}

/// Runs terraform `init`, `plan` and `apply` against the workspace.
#[derive(Debug)]
pub struct ProvisioningExecutor<R = ProcessRunner> {
    merger: ConfigMerger,
    runner: R,
    binary: String,
    plan_artifact: String,
    stage_timeout: Option<Duration>,
    credentials: Credentials,
}

impl ProvisioningExecutor<ProcessRunner> {
    /// Creates an executor that spawns real processes.
    #[must_use]
    pub fn new(merger: ConfigMerger) -> Self {
        Self {
            merger,
            runner: ProcessRunner::new(),
            binary: String::from("terraform"),
            plan_artifact: String::from("tfplan"),
            stage_timeout: None,
            credentials: Credentials::default(),
        }
    }

    /// Creates an executor from the loaded configuration.
    #[must_use]
    pub fn from_config(config: &StagehandConfig) -> Self {
        Self::new(ConfigMerger::from_config(&config.workspace))
            .with_binary(&config.terraform.binary)
            .with_plan_artifact(&config.terraform.plan_artifact)
            .with_stage_timeout(config.terraform.stage_timeout_secs.map(Duration::from_secs))
            .with_credentials(Credentials::from_config(&config.credentials))
    }
}

impl<R: CommandRunner> ProvisioningExecutor<R> {
    /// Replaces the process runner.
    #[must_use]
    pub fn with_runner<T: CommandRunner>(self, runner: T) -> ProvisioningExecutor<T> {
        ProvisioningExecutor {
            merger: self.merger,
            runner,
            binary: self.binary,
            plan_artifact: self.plan_artifact,
            stage_timeout: self.stage_timeout,
            credentials: self.credentials,
        }
    }

    /// Sets the terraform executable.
    #[must_use]
    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }

    /// Sets the file name of the saved plan.
    #[must_use]
    pub fn with_plan_artifact(mut self, artifact: impl Into<String>) -> Self {
        self.plan_artifact = artifact.into();
        self
    }

    /// Bounds every stage; `None` waits indefinitely.
    #[must_use]
    pub const fn with_stage_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.stage_timeout = timeout;
        self
    }

    /// Sets the credentials injected into each stage.
    #[must_use]
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = credentials;
        self
    }

    /// The merger that prepares the working directory.
    #[must_use]
    pub const fn merger(&self) -> &ConfigMerger {
        &self.merger
    }

    async fn try_run(&self, code: &str) -> Result<String> {
        let workspace = self.merger.prepare(code).await?;
        debug!(
            "Workspace ready at {} ({:?})",
            workspace.dir.display(),
            workspace.outcome
        );

        let env = self.credentials.env_vars();
        let mut apply_output = String::new();

        for stage in PIPELINE {
            let output = self.run_stage(stage, &workspace.dir, &env).await?;
            if stage == Stage::Apply {
                apply_output = output;
            }
        }

        Ok(apply_output)
    }

    async fn run_stage(
        &self,
        stage: Stage,
        cwd: &Path,
        env: &[(String, String)],
    ) -> Result<String> {
        info!("Running terraform {}", stage);

        let invocation = StageInvocation {
            stage,
            program: self.binary.clone(),
            args: stage.args(&self.plan_artifact),
            cwd: cwd.to_path_buf(),
            env: env.to_vec(),
            timeout: self.stage_timeout,
        };

        let output = self.runner.run(&invocation).await?;
        if !output.success {
            debug!("terraform {} stdout before failure:\n{}", stage, output.stdout);
            return Err(StageError::Failed {
                stage,
                exit_code: output.exit_code,
                stderr: output.stderr,
            }
            .into());
        }

        debug!("terraform {} finished", stage);
        Ok(output.stdout)
    }
}

#[async_trait]
impl<R: CommandRunner> Provisioner for ProvisioningExecutor<R> {
    async fn run(&self, code: &str) -> ExecutionResult {
        match self.try_run(code).await {
            Ok(output) => {
                info!("Apply complete");
                ExecutionResult::success(code, output)
            }
            Err(e) => {
                error!("Provisioning failed: {}", e);
                ExecutionResult::error(code, e.operator_message())
            }
        }
    }
}
