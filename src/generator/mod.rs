//! Plan generation.
//!
//! A [`PlanGenerator`] turns a free-text request into a human-readable
//! description and a terraform code artifact. Backends:
//! - [`ChatCompletionsGenerator`]: an OpenAI-compatible chat endpoint
//! - [`FileGenerator`]: pre-written HCL on disk
//!
//! [`TemplateRenderer`] renders structured [`InfraPlan`] documents.

mod chat;
mod file;
mod template;

pub use chat::{clean_code, extract_json_object, strip_thinking, ChatCompletionsGenerator};
pub use file::FileGenerator;
pub use template::{InfraPlan, ResourceSpec, TemplateRenderer, DEFAULT_VISIBILITY_TIMEOUT};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Output of a [`PlanGenerator`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedPlan {
    /// What the code will create, for the operator to review.
    pub description: String,
    /// Terraform code.
    pub code: String,
}

impl GeneratedPlan {
    /// Creates a generated plan.
    #[must_use]
    pub fn new(description: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            code: code.into(),
        }
    }
}

/// Translates a request into a reviewable code artifact.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PlanGenerator: Send + Sync {
    /// Generates a plan for `request`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails or produces no usable code.
    async fn generate(&self, request: &str) -> Result<GeneratedPlan>;
}

#[async_trait]
impl PlanGenerator for Box<dyn PlanGenerator> {
    async fn generate(&self, request: &str) -> Result<GeneratedPlan> {
        (**self).generate(request).await
    }
}
