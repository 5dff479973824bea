//! CLI module for Stagehand.
//!
//! This module provides the command-line interface for proposing,
//! reviewing and applying Terraform changes.

mod commands;
mod output;

pub use commands::{Cli, Commands, LogFormat, OutputFormat};
pub use output::OutputFormatter;
