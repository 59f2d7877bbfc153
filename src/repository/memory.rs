//! In-memory entity repository.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::Repository;
use crate::error::{Error, Result};
use crate::model::{
    DeploymentStatus, EntityId, ErrorHandling, HttpMethod, KeyValue, McpConfig, Prompt,
    ResponseConfig, ResponseType, Tool, ToolDraft,
};

/// Fields accepted when creating a Prompt.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PromptDraft {
    pub name: String,
    pub content: String,
}

/// Fields accepted when creating an MCP configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct McpConfigDraft {
    pub name: String,
    pub model: String,
    pub temperature: f64,
    pub max_tokens: u32,
    #[serde(default)]
    pub system_prompt: Option<String>,
    pub instruction: String,
    #[serde(default)]
    pub selected_tools: Vec<EntityId>,
}

/// Fields accepted when creating a Response configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResponseConfigDraft {
    pub name: String,
    #[serde(rename = "type", default)]
    pub response_type: ResponseType,
    #[serde(default)]
    pub reprocess_instructions: Option<String>,
    #[serde(default)]
    pub error_handling: ErrorHandling,
    #[serde(default)]
    pub fallback_value: Option<String>,
}

/// Partial update for a Tool. `None` fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub method: Option<HttpMethod>,
    pub url: Option<String>,
    pub headers: Option<Vec<KeyValue>>,
    pub query_params: Option<Vec<KeyValue>>,
    pub body: Option<String>,
}

/// Partial update for a Prompt.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PromptPatch {
    pub name: Option<String>,
    pub content: Option<String>,
}

/// Partial update for an MCP configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct McpConfigPatch {
    pub name: Option<String>,
    pub model: Option<String>,
    pub temperature: Option<f64>,
    pub max_tokens: Option<u32>,
    pub system_prompt: Option<Option<String>>,
    pub instruction: Option<String>,
    pub selected_tools: Option<Vec<EntityId>>,
}

/// Partial update for a Response configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResponseConfigPatch {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub response_type: Option<ResponseType>,
    pub reprocess_instructions: Option<Option<String>>,
    pub error_handling: Option<ErrorHandling>,
    pub fallback_value: Option<Option<String>>,
}

/// In-memory entity collections with per-kind id allocation.
///
/// Ids are monotonically increasing and never reused, even after delete.
/// Collections preserve insertion order; `list` order is creation order.
#[derive(Debug, Default)]
pub struct MemoryRepository {
    tools: Vec<Tool>,
    prompts: Vec<Prompt>,
    mcp_configs: Vec<McpConfig>,
    response_configs: Vec<ResponseConfig>,
    next_tool_id: EntityId,
    next_prompt_id: EntityId,
    next_mcp_config_id: EntityId,
    next_response_config_id: EntityId,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_tool(&mut self, draft: ToolDraft) -> EntityId {
        self.next_tool_id += 1;
        let id = self.next_tool_id;
        self.tools.push(Tool {
            id,
            name: draft.name,
            description: draft.description,
            method: draft.method,
            url: draft.url,
            headers: draft.headers,
            query_params: draft.query_params,
            body: draft.body,
        });
        id
    }

    pub fn update_tool(&mut self, id: EntityId, patch: ToolPatch) -> Result<()> {
        let tool = self
            .tools
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| Error::Resolution(format!("Tool {} not found", id)))?;
        if let Some(name) = patch.name {
            tool.name = name;
        }
        if let Some(description) = patch.description {
            tool.description = description;
        }
        if let Some(method) = patch.method {
            tool.method = method;
        }
        if let Some(url) = patch.url {
            tool.url = url;
        }
        if let Some(headers) = patch.headers {
            tool.headers = headers;
        }
        if let Some(query_params) = patch.query_params {
            tool.query_params = query_params;
        }
        if let Some(body) = patch.body {
            tool.body = body;
        }
        Ok(())
    }

    /// Delete a Tool. Does not cascade: MCP configs keep any reference to
    /// the deleted id and lookups degrade to `None`.
    pub fn delete_tool(&mut self, id: EntityId) {
        self.tools.retain(|t| t.id != id);
    }

    pub fn create_prompt(&mut self, draft: PromptDraft) -> EntityId {
        self.next_prompt_id += 1;
        let id = self.next_prompt_id;
        self.prompts.push(Prompt {
            id,
            name: draft.name,
            content: draft.content,
        });
        id
    }

    pub fn update_prompt(&mut self, id: EntityId, patch: PromptPatch) -> Result<()> {
        let prompt = self
            .prompts
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| Error::Resolution(format!("Prompt {} not found", id)))?;
        if let Some(name) = patch.name {
            prompt.name = name;
        }
        if let Some(content) = patch.content {
            prompt.content = content;
        }
        Ok(())
    }

    pub fn delete_prompt(&mut self, id: EntityId) {
        self.prompts.retain(|p| p.id != id);
    }

    pub fn create_mcp_config(&mut self, draft: McpConfigDraft) -> EntityId {
        self.next_mcp_config_id += 1;
        let id = self.next_mcp_config_id;
        self.mcp_configs.push(McpConfig {
            id,
            name: draft.name,
            model: draft.model,
            temperature: McpConfig::clamp_temperature(draft.temperature),
            max_tokens: draft.max_tokens,
            system_prompt: draft.system_prompt,
            instruction: draft.instruction,
            selected_tools: draft.selected_tools,
            deployment_status: DeploymentStatus::NotDeployed,
            deployment_url: None,
            deployed_at: None,
        });
        id
    }

    pub fn update_mcp_config(&mut self, id: EntityId, patch: McpConfigPatch) -> Result<()> {
        let config = self
            .mcp_configs
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| Error::Resolution(format!("MCP config {} not found", id)))?;
        if let Some(name) = patch.name {
            config.name = name;
        }
        if let Some(model) = patch.model {
            config.model = model;
        }
        if let Some(temperature) = patch.temperature {
            config.temperature = McpConfig::clamp_temperature(temperature);
        }
        if let Some(max_tokens) = patch.max_tokens {
            config.max_tokens = max_tokens;
        }
        if let Some(system_prompt) = patch.system_prompt {
            config.system_prompt = system_prompt;
        }
        if let Some(instruction) = patch.instruction {
            config.instruction = instruction;
        }
        if let Some(selected_tools) = patch.selected_tools {
            config.selected_tools = selected_tools;
        }
        Ok(())
    }

    pub fn delete_mcp_config(&mut self, id: EntityId) {
        self.mcp_configs.retain(|c| c.id != id);
    }

    /// Mark a config as deploying. Re-deploying a deployed config resets it.
    pub fn begin_deployment(&mut self, id: EntityId) -> Result<()> {
        let config = self
            .mcp_configs
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| Error::Resolution(format!("MCP config {} not found", id)))?;
        config.deployment_status = DeploymentStatus::Deploying;
        config.deployment_url = None;
        config.deployed_at = None;
        Ok(())
    }

    /// Record the outcome of a deployment attempt.
    pub fn finish_deployment(
        &mut self,
        id: EntityId,
        outcome: std::result::Result<String, String>,
    ) -> Result<()> {
        let config = self
            .mcp_configs
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| Error::Resolution(format!("MCP config {} not found", id)))?;
        match outcome {
            Ok(url) => {
                config.deployment_status = DeploymentStatus::Deployed;
                config.deployment_url = Some(url);
                config.deployed_at = Some(Utc::now());
            }
            Err(_) => {
                config.deployment_status = DeploymentStatus::Failed;
                config.deployment_url = None;
                config.deployed_at = None;
            }
        }
        Ok(())
    }

    pub fn create_response_config(&mut self, draft: ResponseConfigDraft) -> EntityId {
        self.next_response_config_id += 1;
        let id = self.next_response_config_id;
        self.response_configs.push(ResponseConfig {
            id,
            name: draft.name,
            response_type: draft.response_type,
            reprocess_instructions: draft.reprocess_instructions,
            error_handling: draft.error_handling,
            fallback_value: draft.fallback_value,
        });
        id
    }

    pub fn update_response_config(
        &mut self,
        id: EntityId,
        patch: ResponseConfigPatch,
    ) -> Result<()> {
        let config = self
            .response_configs
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| Error::Resolution(format!("Response config {} not found", id)))?;
        if let Some(name) = patch.name {
            config.name = name;
        }
        if let Some(response_type) = patch.response_type {
            config.response_type = response_type;
        }
        if let Some(reprocess_instructions) = patch.reprocess_instructions {
            config.reprocess_instructions = reprocess_instructions;
        }
        if let Some(error_handling) = patch.error_handling {
            config.error_handling = error_handling;
        }
        if let Some(fallback_value) = patch.fallback_value {
            config.fallback_value = fallback_value;
        }
        Ok(())
    }

    pub fn delete_response_config(&mut self, id: EntityId) {
        self.response_configs.retain(|c| c.id != id);
    }
}

impl Repository for MemoryRepository {
    fn tool(&self, id: EntityId) -> Option<&Tool> {
        self.tools.iter().find(|t| t.id == id)
    }

    fn prompt(&self, id: EntityId) -> Option<&Prompt> {
        self.prompts.iter().find(|p| p.id == id)
    }

    fn mcp_config(&self, id: EntityId) -> Option<&McpConfig> {
        self.mcp_configs.iter().find(|c| c.id == id)
    }

    fn response_config(&self, id: EntityId) -> Option<&ResponseConfig> {
        self.response_configs.iter().find(|c| c.id == id)
    }

    fn tools(&self) -> &[Tool] {
        &self.tools
    }

    fn prompts(&self) -> &[Prompt] {
        &self.prompts
    }

    fn mcp_configs(&self) -> &[McpConfig] {
        &self.mcp_configs
    }

    fn response_configs(&self) -> &[ResponseConfig] {
        &self.response_configs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tool_draft(name: &str) -> ToolDraft {
        ToolDraft {
            name: name.to_string(),
            method: HttpMethod::Get,
            url: "https://api.example.com".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_ids_monotonic_and_never_reused() {
        let mut repo = MemoryRepository::new();
        let a = repo.create_tool(tool_draft("a"));
        let b = repo.create_tool(tool_draft("b"));
        assert!(b > a);

        repo.delete_tool(b);
        let c = repo.create_tool(tool_draft("c"));
        assert!(c > b, "deleted id must not be reused");
    }

    #[test]
    fn test_ids_scoped_per_kind() {
        let mut repo = MemoryRepository::new();
        let tool_id = repo.create_tool(tool_draft("a"));
        let prompt_id = repo.create_prompt(PromptDraft {
            name: "greeting".into(),
            content: "hi".into(),
        });
        // Each kind starts its own sequence.
        assert_eq!(tool_id, 1);
        assert_eq!(prompt_id, 1);
    }

    #[test]
    fn test_update_applies_partial() {
        let mut repo = MemoryRepository::new();
        let id = repo.create_tool(tool_draft("weather"));
        repo.update_tool(
            id,
            ToolPatch {
                url: Some("https://api.weather.test".into()),
                ..Default::default()
            },
        )
        .unwrap();
        let tool = repo.tool(id).unwrap();
        assert_eq!(tool.url, "https://api.weather.test");
        assert_eq!(tool.name, "weather");
    }

    #[test]
    fn test_update_missing_is_resolution_error() {
        let mut repo = MemoryRepository::new();
        let err = repo.update_tool(42, ToolPatch::default()).unwrap_err();
        assert_eq!(err.code(), "RESOLUTION_ERROR");
    }

    #[test]
    fn test_delete_tool_does_not_cascade() {
        let mut repo = MemoryRepository::new();
        let tool_id = repo.create_tool(tool_draft("weather"));
        let config_id = repo.create_mcp_config(McpConfigDraft {
            name: "assistant".into(),
            model: "gpt-4o".into(),
            temperature: 0.7,
            max_tokens: 1024,
            system_prompt: None,
            instruction: "call the weather api".into(),
            selected_tools: vec![tool_id],
        });

        repo.delete_tool(tool_id);

        let config = repo.mcp_config(config_id).unwrap();
        assert_eq!(config.selected_tools, vec![tool_id]);
        assert!(repo.tool(tool_id).is_none());
    }

    #[test]
    fn test_temperature_clamped_on_create_and_update() {
        let mut repo = MemoryRepository::new();
        let id = repo.create_mcp_config(McpConfigDraft {
            name: "hot".into(),
            model: "gpt-4o".into(),
            temperature: 9.0,
            max_tokens: 256,
            system_prompt: None,
            instruction: "x".into(),
            selected_tools: vec![],
        });
        assert_eq!(repo.mcp_config(id).unwrap().temperature, 2.0);

        repo.update_mcp_config(
            id,
            McpConfigPatch {
                temperature: Some(-3.0),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(repo.mcp_config(id).unwrap().temperature, 0.0);
    }

    #[test]
    fn test_deployment_lifecycle() {
        let mut repo = MemoryRepository::new();
        let id = repo.create_mcp_config(McpConfigDraft {
            name: "assistant".into(),
            model: "gpt-4o".into(),
            temperature: 0.7,
            max_tokens: 1024,
            system_prompt: None,
            instruction: "x".into(),
            selected_tools: vec![],
        });
        assert_eq!(
            repo.mcp_config(id).unwrap().deployment_status,
            DeploymentStatus::NotDeployed
        );

        repo.begin_deployment(id).unwrap();
        assert_eq!(
            repo.mcp_config(id).unwrap().deployment_status,
            DeploymentStatus::Deploying
        );

        repo.finish_deployment(id, Ok("https://mcp.example.com/assistant".into()))
            .unwrap();
        let config = repo.mcp_config(id).unwrap();
        assert_eq!(config.deployment_status, DeploymentStatus::Deployed);
        assert!(config.deployment_url.is_some());
        assert!(config.deployed_at.is_some());

        // Re-deploy resets to deploying, then records failure.
        repo.begin_deployment(id).unwrap();
        assert!(repo.mcp_config(id).unwrap().deployment_url.is_none());
        repo.finish_deployment(id, Err("quota exceeded".into()))
            .unwrap();
        assert_eq!(
            repo.mcp_config(id).unwrap().deployment_status,
            DeploymentStatus::Failed
        );
    }

    #[test]
    fn test_list_preserves_creation_order() {
        let mut repo = MemoryRepository::new();
        repo.create_tool(tool_draft("a"));
        repo.create_tool(tool_draft("b"));
        repo.create_tool(tool_draft("c"));
        let names: Vec<&str> = repo.tools().iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }
}
