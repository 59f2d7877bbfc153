//! Workflow validation.
//!
//! Pure and total: for any list of steps the validator terminates with
//! exactly one verdict and never panics. Rules are checked in order and
//! short-circuit on the first failure:
//!
//! 1. At least one step.
//! 2. The first step is an mcp step.
//! 3. Every mcp step's referenced config is deployed.
//! 4. Step types strictly alternate (mcp, response, mcp, ...).
//!
//! The alternation rule and the mcp-first rule come from the source system
//! as asserted invariants; no branching or parallel MCP layout exists at
//! this layer, so a flat list cannot form cycles.

use serde::{Deserialize, Serialize};

use super::types::{StepType, WorkflowStep};
use crate::repository::Repository;

/// Validation verdict. `reason` is present exactly when `valid` is false.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Validation {
    pub valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl Validation {
    pub fn ok() -> Self {
        Self {
            valid: true,
            reason: None,
        }
    }

    pub fn fail(reason: impl Into<String>) -> Self {
        Self {
            valid: false,
            reason: Some(reason.into()),
        }
    }
}

/// Validate a workflow sequence against the repository.
///
/// Callers must re-validate before every run; validity is never cached.
pub fn validate(steps: &[WorkflowStep], repo: &dyn Repository) -> Validation {
    let Some(first) = steps.first() else {
        return Validation::fail("Workflow must have at least one step");
    };

    if first.step_type != StepType::Mcp {
        return Validation::fail("The first step must be an MCP step");
    }

    for step in steps.iter().filter(|s| s.step_type == StepType::Mcp) {
        let Some(config_id) = step.mcp_config_id else {
            return Validation::fail(format!("Step {} has no MCP config reference", step.id));
        };
        let Some(config) = repo.mcp_config(config_id) else {
            return Validation::fail(format!(
                "Step {} references unknown MCP config {}",
                step.id, config_id
            ));
        };
        if !config.is_deployed() {
            return Validation::fail(format!(
                "MCP config '{}' is not deployed (status: {})",
                config.name, config.deployment_status
            ));
        }
    }

    for pair in steps.windows(2) {
        if pair[0].step_type == pair[1].step_type {
            return Validation::fail(format!(
                "Steps must alternate between mcp and response; found consecutive {} steps",
                pair[0].step_type
            ));
        }
    }

    Validation::ok()
}
