//! Working directory management.
//!
//! This module owns the terraform working directory and the single config
//! file inside it: extracting resource blocks from generated code and
//! merging them without duplicating provider or backend declarations.

mod blocks;
mod merger;

pub use blocks::{extract_resource_blocks, render_blocks, ResourceBlock, RESOURCE_KEYWORD};
pub use merger::{ConfigMerger, MergeOutcome, PreparedWorkspace, APPEND_SEPARATOR};
