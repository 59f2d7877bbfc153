//! Entity type definitions.
//!
//! These are the records the builder edits: HTTP tools, reusable prompts,
//! MCP configurations (one deployable LLM-with-tools unit), and response
//! post-processing configurations. Wire shapes for the workflow backend
//! live here too so the whole data model is in one place.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Entity identifier. Assigned by the repository, monotonically increasing
/// per entity kind, never reused after delete.
pub type EntityId = u64;

/// HTTP method supported by a Tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Get => write!(f, "GET"),
            Self::Post => write!(f, "POST"),
            Self::Put => write!(f, "PUT"),
            Self::Patch => write!(f, "PATCH"),
            Self::Delete => write!(f, "DELETE"),
        }
    }
}

impl std::str::FromStr for HttpMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "PATCH" => Ok(Self::Patch),
            "DELETE" => Ok(Self::Delete),
            other => Err(format!("Unknown HTTP method: {}", other)),
        }
    }
}

/// An ordered key/value entry (header or query parameter).
///
/// Kept as a list rather than a map: entry order is user-visible in the
/// editor and must survive round-trips.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyValue {
    pub key: String,
    pub value: String,
}

impl KeyValue {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// A reusable definition of one HTTP call invocable by an LLM step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tool {
    pub id: EntityId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub method: HttpMethod,
    pub url: String,
    #[serde(default)]
    pub headers: Vec<KeyValue>,
    #[serde(default)]
    pub query_params: Vec<KeyValue>,
    /// Default request body (free text, usually JSON).
    #[serde(default)]
    pub body: String,
}

/// Fields accepted when creating or importing a Tool. The repository
/// assigns the id.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolDraft {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub method: HttpMethod,
    pub url: String,
    #[serde(default)]
    pub headers: Vec<KeyValue>,
    #[serde(default)]
    pub query_params: Vec<KeyValue>,
    #[serde(default)]
    pub body: String,
}

impl Default for HttpMethod {
    fn default() -> Self {
        Self::Get
    }
}

/// Free text reused as system prompt or instruction text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prompt {
    pub id: EntityId,
    pub name: String,
    pub content: String,
}

/// Deployment lifecycle of an MCP configuration.
///
/// Not ordered: a re-deploy resets the status to `Deploying` and then to
/// `Deployed` or `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeploymentStatus {
    NotDeployed,
    Deploying,
    Deployed,
    Failed,
}

impl Default for DeploymentStatus {
    fn default() -> Self {
        Self::NotDeployed
    }
}

impl std::fmt::Display for DeploymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotDeployed => write!(f, "not-deployed"),
            Self::Deploying => write!(f, "deploying"),
            Self::Deployed => write!(f, "deployed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// A bundle of model parameters, prompts, and selected Tools representing
/// one deployable LLM-with-tools unit.
///
/// `selected_tools` may reference Tools that have since been deleted; the
/// engine degrades gracefully on lookup rather than failing at edit time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpConfig {
    pub id: EntityId,
    pub name: String,
    pub model: String,
    /// Sampling temperature, clamped to [0, 2].
    pub temperature: f64,
    pub max_tokens: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    pub instruction: String,
    #[serde(default)]
    pub selected_tools: Vec<EntityId>,
    #[serde(default)]
    pub deployment_status: DeploymentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployment_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployed_at: Option<DateTime<Utc>>,
}

impl McpConfig {
    /// Clamp the temperature into the supported [0, 2] range.
    pub fn clamp_temperature(value: f64) -> f64 {
        value.clamp(0.0, 2.0)
    }

    pub fn is_deployed(&self) -> bool {
        self.deployment_status == DeploymentStatus::Deployed
    }
}

/// Post-processing applied to an MCP's output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResponseType {
    /// Pass the upstream output through unchanged.
    RawOutput,
    /// Re-process the output with the LLM using stored instructions.
    LlmReprocess,
}

impl Default for ResponseType {
    fn default() -> Self {
        Self::RawOutput
    }
}

/// What to do when a step governed by this config fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorHandling {
    /// Re-raise the error unchanged.
    PassThrough,
    /// Re-invoke the same step once before giving up.
    Retry,
    /// Substitute a configured default string instead of propagating.
    Fallback,
}

impl Default for ErrorHandling {
    fn default() -> Self {
        Self::PassThrough
    }
}

/// Post-processing policy applied to an MCP's output plus error handling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseConfig {
    pub id: EntityId,
    pub name: String,
    #[serde(rename = "type")]
    pub response_type: ResponseType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reprocess_instructions: Option<String>,
    #[serde(default)]
    pub error_handling: ErrorHandling,
    /// Default output substituted when `error_handling` is `Fallback`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_value: Option<String>,
}

/// A concrete HTTP request generated by the backend's LLM stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpSpec {
    pub method: String,
    pub url: String,
    #[serde(default)]
    pub headers: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_params: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<serde_json::Value>,
}

/// Request body for `POST /workflow` on the backend collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowRequest {
    pub user_instructions: String,
    /// Tool *names* resolved from the step's selected tool ids.
    pub tool_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format_response: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_format_instructions: Option<String>,
}

/// Response body from `POST /workflow`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowResponse {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_tool: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_spec: Option<HttpSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_response: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formatted_response: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_stage: Option<String>,
}

impl WorkflowResponse {
    pub fn is_success(&self) -> bool {
        self.status == "success"
    }

    /// Best textual output: formatted response if requested, else the raw
    /// response rendered as a string.
    pub fn output_text(&self) -> String {
        if let Some(formatted) = &self.formatted_response {
            return formatted.clone();
        }
        match &self.raw_response {
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(v) => v.to_string(),
            None => String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_parse() {
        assert_eq!("get".parse::<HttpMethod>().unwrap(), HttpMethod::Get);
        assert_eq!("PATCH".parse::<HttpMethod>().unwrap(), HttpMethod::Patch);
        assert!("TRACE".parse::<HttpMethod>().is_err());
    }

    #[test]
    fn test_temperature_clamped() {
        assert_eq!(McpConfig::clamp_temperature(2.7), 2.0);
        assert_eq!(McpConfig::clamp_temperature(-1.0), 0.0);
        assert_eq!(McpConfig::clamp_temperature(0.8), 0.8);
    }

    #[test]
    fn test_deployment_status_serde() {
        let json = serde_json::to_string(&DeploymentStatus::NotDeployed).unwrap();
        assert_eq!(json, "\"not-deployed\"");
    }

    #[test]
    fn test_workflow_response_output_text() {
        let resp = WorkflowResponse {
            status: "success".into(),
            selected_tool: Some("weather".into()),
            http_spec: None,
            raw_response: Some(serde_json::json!({"temp": 21})),
            formatted_response: Some("21 degrees".into()),
            error: None,
            error_stage: None,
        };
        assert!(resp.is_success());
        assert_eq!(resp.output_text(), "21 degrees");

        let raw_only = WorkflowResponse {
            formatted_response: None,
            ..resp
        };
        assert_eq!(raw_only.output_text(), "{\"temp\":21}");
    }

    #[test]
    fn test_workflow_request_omits_empty_options() {
        let req = WorkflowRequest {
            user_instructions: "hello".into(),
            tool_ids: vec!["weather".into()],
            format_response: None,
            response_format_instructions: None,
        };
        let json = serde_json::to_value(&req).unwrap();
        assert!(json.get("format_response").is_none());
        assert_eq!(json["tool_ids"][0], "weather");
    }
}
