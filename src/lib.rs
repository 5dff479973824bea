// ============================================================================
// Strict linting - Dangerous or non-idiomatic practices are forbidden
// ============================================================================

#![deny(unsafe_code)]                 // Unsafe code is forbidden
#![warn(missing_docs)]                // All public items must be documented
#![warn(dead_code)]                   // Unused code is flagged
#![deny(non_camel_case_types)]        // Types must follow CamelCase convention

// Additional strictness - Leave nothing unchecked
#![warn(unused_imports)]              // Unused imports are flagged
#![warn(unused_variables)]            // Unused variables are flagged
#![deny(unused_must_use)]             // Must handle Result and Option explicitly
#![deny(non_snake_case)]              // Variables and functions must be snake_case
#![deny(non_upper_case_globals)]      // Constants must be UPPER_CASE
#![deny(nonstandard_style)]           // Non-standard code style is forbidden
#![forbid(unsafe_op_in_unsafe_fn)]    // Unsafe ops in unsafe fns are forbidden

// Clippy lints (warnings only)
#![warn(clippy::all)]                 // All standard Clippy lints
#![warn(clippy::pedantic)]            // Very strict Clippy lints
#![warn(clippy::nursery)]             // Experimental lints
#![warn(clippy::unwrap_used)]         // unwrap() warning
#![warn(clippy::expect_used)]         // expect() warning
#![warn(clippy::panic)]               // panic!() warning
#![warn(clippy::print_stdout)]        // println!() warning
#![warn(clippy::todo)]                // TODO warning
#![warn(clippy::unimplemented)]       // unimplemented!() warning
#![warn(clippy::missing_const_for_fn)] // Force const when possible
#![warn(clippy::unwrap_in_result)]    // unwrap() in Result warning
#![warn(clippy::module_inception)]    // Module with same name as crate warning
#![warn(clippy::redundant_clone)]     // Useless clones warning
#![warn(clippy::shadow_unrelated)]    // Shadowing unrelated variables warning
#![warn(clippy::too_many_arguments)]  // Limit function arguments
#![warn(clippy::cognitive_complexity)] // Limit cognitive complexity

// Safety and robustness lints
#![deny(overflowing_literals)]        // Overflowing literals are forbidden
#![deny(arithmetic_overflow)]         // Arithmetic overflow is forbidden

// Tests assert with unwrap
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

// ============================================================================
// Crate Documentation
// ============================================================================

//! # Stagehand
//!
//! A confirm-before-apply workflow for generated Terraform code.
//!
//! ## Overview
//!
//! An operator describes an infrastructure change in plain language, reviews
//! the generated code, and explicitly approves or rejects it. Approved code
//! is merged into a persistent workspace and applied with terraform:
//!
//! - Nothing is applied without an explicit confirmation
//! - Provider and backend blocks are written once; later plans only append
//!   resource blocks
//! - `init`, `plan` and `apply` stop at the first failing stage and report
//!   that stage's error output verbatim
//!
//! ## Architecture
//!
//! 1. **Propose**: a [`generator::PlanGenerator`] returns a description and
//!    code, which is staged in a single-slot [`workflow::PendingPlanStore`]
//! 2. **Confirm**: the [`workflow::WorkflowOrchestrator`] hands the staged
//!    code to the [`provisioning::ProvisioningExecutor`] and clears the slot
//! 3. **Merge and run**: the [`workspace::ConfigMerger`] prepares the
//!    working directory, then the three terraform stages run in order
//!
//! ## Modules
//!
//! - [`config`]: Configuration parsing and validation
//! - [`generator`]: Plan generators and structured plan templates
//! - [`workflow`]: Pending plan slot and propose/confirm orchestration
//! - [`workspace`]: Resource block extraction and config file merging
//! - [`provisioning`]: Staged terraform execution
//! - [`history`]: Record of confirm outcomes
//! - [`cli`]: Command-line interface
//!
//! ## Example
//!
//! ```yaml
//! workspace:
//!   dir: infra
//!   file_name: main.tf
//!
//! terraform:
//!   stage_timeout_secs: 1800
//!
//! generator:
//!   mode: code
//!   model: gpt-4o-mini
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod cli;
pub mod config;
pub mod error;
pub mod generator;
pub mod history;
pub mod provisioning;
pub mod workflow;
pub mod workspace;

// ============================================================================
// Re-exports
// ============================================================================

pub use cli::{Cli, Commands, OutputFormatter};
pub use config::{ConfigParser, ConfigValidator, StagehandConfig};
pub use error::{Result, StagehandError};
pub use generator::{
    ChatCompletionsGenerator, FileGenerator, GeneratedPlan, InfraPlan, PlanGenerator,
    ResourceSpec, TemplateRenderer,
};
pub use history::{HistoryEntry, HistoryStore, LocalHistoryStore};
pub use provisioning::{
    Credentials, ExecutionResult, ExecutionStatus, ProcessRunner, Provisioner,
    ProvisioningExecutor, Stage,
};
pub use workflow::{PendingPlanStore, ProposeResult, ProposeStatus, WorkflowOrchestrator};
pub use workspace::{extract_resource_blocks, ConfigMerger, ResourceBlock};
