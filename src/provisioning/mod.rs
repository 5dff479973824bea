//! Terraform execution.
//!
//! This module runs the fixed `init` → `plan` → `apply` pipeline against the
//! prepared working directory:
//! - Stage command lines ([`Stage`])
//! - Credential injection ([`Credentials`])
//! - Process control with an optional time budget ([`ProcessRunner`])
//! - The fail-fast pipeline itself ([`ProvisioningExecutor`])

mod credentials;
mod executor;
mod result;
mod runner;
mod stage;

pub use credentials::{Credentials, ACCESS_KEY_VAR, SECRET_KEY_VAR};
pub use executor::{Provisioner, ProvisioningExecutor};
pub use result::{ExecutionResult, ExecutionStatus};
pub use runner::{CommandRunner, ProcessRunner, StageInvocation, StageOutput};
pub use stage::{Stage, PIPELINE};

#[cfg(test)]
pub use executor::MockProvisioner;
