//! The three terraform stages and their command lines.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One step of the terraform pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// `terraform init`.
    Init,
    /// `terraform plan -out=<artifact>`.
    Plan,
    /// `terraform apply <artifact>`.
    Apply,
}

/// Stages in execution order.
pub const PIPELINE: [Stage; 3] = [Stage::Init, Stage::Plan, Stage::Apply];

impl Stage {
    /// Arguments passed to terraform for this stage.
    ///
    /// Every stage disables colour and interactive input. `apply` consumes
    /// the saved plan without prompting.
    #[must_use]
    pub fn args(self, plan_artifact: &str) -> Vec<String> {
        let mut args = vec![self.to_string(), String::from("-no-color"), String::from("-input=false")];
        match self {
            Self::Init => {}
            Self::Plan => args.push(format!("-out={plan_artifact}")),
            Self::Apply => {
                args.push(String::from("-auto-approve"));
                args.push(plan_artifact.to_string());
            }
        }
        args
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Init => "init",
            Self::Plan => "plan",
            Self::Apply => "apply",
        };
        write!(f, "{s}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_args() {
        assert_eq!(Stage::Init.args("tfplan"), ["init", "-no-color", "-input=false"]);
        assert_eq!(
            Stage::Plan.args("tfplan"),
            ["plan", "-no-color", "-input=false", "-out=tfplan"]
        );
        assert_eq!(
            Stage::Apply.args("tfplan"),
            ["apply", "-no-color", "-input=false", "-auto-approve", "tfplan"]
        );
    }

    #[test]
    fn test_pipeline_order() {
        assert_eq!(PIPELINE, [Stage::Init, Stage::Plan, Stage::Apply]);
    }
}
