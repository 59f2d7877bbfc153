//! Workflow step definitions.
//!
//! A workflow is a flat ordered list of steps. Each step references either
//! an MCP configuration or a Response configuration and may carry per-step
//! overrides that win over the referenced config's defaults.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{EntityId, ErrorHandling, ResponseType};
use crate::repository::Repository;

/// Which kind of configuration a step references.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StepType {
    Mcp,
    Response,
}

impl std::fmt::Display for StepType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Mcp => write!(f, "mcp"),
            Self::Response => write!(f, "response"),
        }
    }
}

/// One element of the ordered pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowStep {
    pub id: EntityId,
    #[serde(rename = "type")]
    pub step_type: StepType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mcp_config_id: Option<EntityId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_config_id: Option<EntityId>,

    // Per-step overrides for mcp steps.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instruction: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_tools: Option<Vec<EntityId>>,

    // Per-step overrides for response steps.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_type: Option<ResponseType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reprocess_instructions: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_handling: Option<ErrorHandling>,
}

impl WorkflowStep {
    /// A bare mcp step referencing a config, no overrides.
    pub fn mcp(id: EntityId, mcp_config_id: EntityId) -> Self {
        Self {
            id,
            step_type: StepType::Mcp,
            mcp_config_id: Some(mcp_config_id),
            response_config_id: None,
            model: None,
            temperature: None,
            max_tokens: None,
            system_prompt: None,
            instruction: None,
            selected_tools: None,
            response_type: None,
            reprocess_instructions: None,
            error_handling: None,
        }
    }

    /// A bare response step referencing a config, no overrides.
    pub fn response(id: EntityId, response_config_id: EntityId) -> Self {
        Self {
            step_type: StepType::Response,
            mcp_config_id: None,
            response_config_id: Some(response_config_id),
            ..Self::mcp(id, 0)
        }
    }

    /// Resolve the effective MCP parameters for this step: the step's own
    /// value wins when present, else the referenced config's value.
    pub fn resolve_mcp(&self, repo: &dyn Repository) -> Result<EffectiveMcpStep> {
        let config_id = self.mcp_config_id.ok_or_else(|| {
            Error::Resolution(format!("Step {} has no MCP config reference", self.id))
        })?;
        let config = repo.mcp_config(config_id).ok_or_else(|| {
            Error::Resolution(format!(
                "Step {} references unknown MCP config {}",
                self.id, config_id
            ))
        })?;

        Ok(EffectiveMcpStep {
            step_id: self.id,
            config_id,
            name: config.name.clone(),
            model: self.model.clone().unwrap_or_else(|| config.model.clone()),
            temperature: self.temperature.unwrap_or(config.temperature),
            max_tokens: self.max_tokens.unwrap_or(config.max_tokens),
            system_prompt: self
                .system_prompt
                .clone()
                .or_else(|| config.system_prompt.clone()),
            instruction: self
                .instruction
                .clone()
                .unwrap_or_else(|| config.instruction.clone()),
            selected_tools: self
                .selected_tools
                .clone()
                .unwrap_or_else(|| config.selected_tools.clone()),
        })
    }

    /// Resolve the effective Response parameters for this step.
    pub fn resolve_response(&self, repo: &dyn Repository) -> Result<EffectiveResponseStep> {
        let config_id = self.response_config_id.ok_or_else(|| {
            Error::Resolution(format!("Step {} has no response config reference", self.id))
        })?;
        let config = repo.response_config(config_id).ok_or_else(|| {
            Error::Resolution(format!(
                "Step {} references unknown response config {}",
                self.id, config_id
            ))
        })?;

        Ok(EffectiveResponseStep {
            step_id: self.id,
            config_id,
            name: config.name.clone(),
            response_type: self.response_type.unwrap_or(config.response_type),
            reprocess_instructions: self
                .reprocess_instructions
                .clone()
                .or_else(|| config.reprocess_instructions.clone()),
            error_handling: self.error_handling.unwrap_or(config.error_handling),
            fallback_value: config.fallback_value.clone(),
        })
    }
}

/// MCP step parameters after override layering.
#[derive(Debug, Clone, PartialEq)]
pub struct EffectiveMcpStep {
    pub step_id: EntityId,
    pub config_id: EntityId,
    pub name: String,
    pub model: String,
    pub temperature: f64,
    pub max_tokens: u32,
    pub system_prompt: Option<String>,
    pub instruction: String,
    pub selected_tools: Vec<EntityId>,
}

/// Response step parameters after override layering.
#[derive(Debug, Clone, PartialEq)]
pub struct EffectiveResponseStep {
    pub step_id: EntityId,
    pub config_id: EntityId,
    pub name: String,
    pub response_type: ResponseType,
    pub reprocess_instructions: Option<String>,
    pub error_handling: ErrorHandling,
    pub fallback_value: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::{McpConfigDraft, MemoryRepository, ResponseConfigDraft};

    fn repo_with_config() -> (MemoryRepository, EntityId) {
        let mut repo = MemoryRepository::new();
        let id = repo.create_mcp_config(McpConfigDraft {
            name: "assistant".into(),
            model: "gpt-4o".into(),
            temperature: 0.7,
            max_tokens: 1024,
            system_prompt: Some("be brief".into()),
            instruction: "answer questions".into(),
            selected_tools: vec![1, 2],
        });
        (repo, id)
    }

    #[test]
    fn test_step_value_wins_over_config() {
        let (repo, config_id) = repo_with_config();
        let mut step = WorkflowStep::mcp(1, config_id);
        step.temperature = Some(1.5);
        step.instruction = Some("summarize instead".into());

        let effective = step.resolve_mcp(&repo).unwrap();
        assert_eq!(effective.temperature, 1.5);
        assert_eq!(effective.instruction, "summarize instead");
        // Untouched fields fall back to the config.
        assert_eq!(effective.model, "gpt-4o");
        assert_eq!(effective.selected_tools, vec![1, 2]);
        assert_eq!(effective.system_prompt.as_deref(), Some("be brief"));
    }

    #[test]
    fn test_resolve_unknown_config_is_resolution_error() {
        let repo = MemoryRepository::new();
        let step = WorkflowStep::mcp(1, 99);
        let err = step.resolve_mcp(&repo).unwrap_err();
        assert_eq!(err.code(), "RESOLUTION_ERROR");
        assert!(err.to_string().contains("99"));
    }

    #[test]
    fn test_resolve_response_overrides() {
        let mut repo = MemoryRepository::new();
        let config_id = repo.create_response_config(ResponseConfigDraft {
            name: "formatter".into(),
            response_type: ResponseType::RawOutput,
            reprocess_instructions: None,
            error_handling: ErrorHandling::PassThrough,
            fallback_value: Some("n/a".into()),
        });

        let mut step = WorkflowStep::response(2, config_id);
        step.response_type = Some(ResponseType::LlmReprocess);
        step.reprocess_instructions = Some("as bullet points".into());

        let effective = step.resolve_response(&repo).unwrap();
        assert_eq!(effective.response_type, ResponseType::LlmReprocess);
        assert_eq!(
            effective.reprocess_instructions.as_deref(),
            Some("as bullet points")
        );
        assert_eq!(effective.error_handling, ErrorHandling::PassThrough);
        assert_eq!(effective.fallback_value.as_deref(), Some("n/a"));
    }

    #[test]
    fn test_step_serde_shape() {
        let step = WorkflowStep::mcp(1, 7);
        let json = serde_json::to_value(&step).unwrap();
        assert_eq!(json["type"], "mcp");
        assert_eq!(json["mcp_config_id"], 7);
        assert!(json.get("model").is_none(), "unset overrides are omitted");
    }
}
