//! Workflow sequence: ordered steps over MCP and Response configurations.

mod types;
mod validator;

pub use types::{EffectiveMcpStep, EffectiveResponseStep, StepType, WorkflowStep};
pub use validator::{validate, Validation};
