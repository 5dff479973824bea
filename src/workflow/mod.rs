//! Confirm-before-apply workflow.
//!
//! A session proposes a change, reviews the generated code, then confirms or
//! rejects it. At most one plan is pending at a time.

mod orchestrator;
mod pending;

pub use orchestrator::{
    ProposeResult, ProposeStatus, WorkflowOrchestrator, WorkflowState, CANCELLED_MESSAGE,
};
pub use pending::{PendingPlan, PendingPlanStore};
