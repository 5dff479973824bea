//! The propose/confirm workflow.
//!
//! [`WorkflowOrchestrator`] owns the pending-plan slot and wires the plan
//! generator to the provisioner:
//!
//! ```text
//! Idle --propose--> Proposed --confirm(true)--> run --> Idle
//!                       |
//!                       +--confirm(false)--> Idle
//! ```
//!
//! `confirm` always leaves the slot empty, whatever the outcome.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::WorkflowError;
use crate::generator::PlanGenerator;
use crate::history::{HistoryEntry, HistoryStore};
use crate::provisioning::{ExecutionResult, Provisioner};

use super::pending::PendingPlanStore;

/// Message returned when the operator rejects a plan.
pub const CANCELLED_MESSAGE: &str = "Execution cancelled by the operator.";

/// Where the workflow stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkflowState {
    /// No plan awaiting confirmation.
    Idle,
    /// One plan awaiting confirmation.
    Proposed,
}

/// Status of a proposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProposeStatus {
    /// A plan was generated and staged.
    PlanGenerated,
    /// Generation failed; nothing was staged.
    Error,
}

/// `{ status, description, code }` returned by `propose`.
///
/// On error `description` carries the failure message and `code` is empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposeResult {
    /// Outcome.
    pub status: ProposeStatus,
    /// Plan description, or the error message.
    pub description: String,
    /// Staged code.
    pub code: String,
}

impl ProposeResult {
    /// True when a plan was staged.
    #[must_use]
    pub fn is_generated(&self) -> bool {
        self.status == ProposeStatus::PlanGenerated
    }
}

/// Drives one operator session.
pub struct WorkflowOrchestrator<G, P> {
    generator: G,
    provisioner: P,
    pending: PendingPlanStore,
    history: Option<Box<dyn HistoryStore>>,
}

impl<G: PlanGenerator, P: Provisioner> WorkflowOrchestrator<G, P> {
    /// Creates an orchestrator with an empty pending slot.
    #[must_use]
    pub fn new(generator: G, provisioner: P) -> Self {
        Self {
            generator,
            provisioner,
            pending: PendingPlanStore::new(),
            history: None,
        }
    }

    /// Uses `pending` as the pending-plan slot.
    #[must_use]
    pub fn with_pending_store(mut self, pending: PendingPlanStore) -> Self {
        self.pending = pending;
        self
    }

    /// Records confirm outcomes in `history`.
    #[must_use]
    pub fn with_history(mut self, history: Box<dyn HistoryStore>) -> Self {
        self.history = Some(history);
        self
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> WorkflowState {
        if self.pending.has_pending() {
            WorkflowState::Proposed
        } else {
            WorkflowState::Idle
        }
    }

    /// The pending-plan slot.
    #[must_use]
    pub const fn pending(&self) -> &PendingPlanStore {
        &self.pending
    }

    /// True when a plan awaits confirmation.
    #[must_use]
    pub fn has_pending(&self) -> bool {
        self.pending.has_pending()
    }

    /// Generates a plan for `request` and stages it, replacing any plan
    /// already pending.
    ///
    /// A generation failure leaves the slot untouched.
    pub async fn propose(&mut self, request: &str) -> ProposeResult {
        match self.generator.generate(request).await {
            Ok(plan) => {
                if self.pending.has_pending() {
                    info!("Replacing the pending plan");
                }
                self.pending.store(plan.code.clone(), plan.description.clone());
                info!("Plan staged, awaiting confirmation");
                ProposeResult {
                    status: ProposeStatus::PlanGenerated,
                    description: plan.description,
                    code: plan.code,
                }
            }
            Err(e) => {
                warn!("Plan generation failed: {}", e);
                ProposeResult {
                    status: ProposeStatus::Error,
                    description: e.operator_message(),
                    code: String::new(),
                }
            }
        }
    }

    /// Applies (`approved`) or discards the pending plan.
    ///
    /// - rejected: the slot is cleared and the provisioner is not called
    /// - approved with nothing pending: an error result, nothing else happens
    /// - approved: the provisioner runs and the slot is cleared afterwards
    pub async fn confirm(&mut self, approved: bool) -> ExecutionResult {
        if !approved {
            let discarded = self.pending.take();
            info!("Plan rejected");
            let (code, description) =
                discarded.map_or_else(|| (String::new(), String::new()), |p| (p.code, p.description));
            let result = ExecutionResult::cancelled(code, CANCELLED_MESSAGE);
            self.record(&result, &description).await;
            return result;
        }

        if !self.pending.has_pending() {
            warn!("Confirm called with no pending plan");
            return ExecutionResult::error("", WorkflowError::NoPendingPlan.to_string());
        }

        let (code, description) = match self.pending.pending() {
            Some(plan) => (plan.code.clone(), plan.description.clone()),
            None => (String::new(), String::new()),
        };

        info!("Plan approved, provisioning");
        let result = self.provisioner.run(&code).await;
        self.pending.clear();

        self.record(&result, &description).await;
        result
    }

    async fn record(&self, result: &ExecutionResult, description: &str) {
        let Some(history) = &self.history else {
            return;
        };
        let entry = HistoryEntry::from_result(result, description);
        if let Err(e) = history.record(&entry).await {
            warn!("Failed to record history ({}): {}", history.backend_type(), e);
        }
    }
}
