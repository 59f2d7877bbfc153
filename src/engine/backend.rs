//! Workflow backend collaborator.
//!
//! The first MCP step of a test run is delegated to an external backend
//! that performs real tool selection and the actual HTTP call. Everything
//! the engine needs from it is behind [`WorkflowBackend`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, warn};

use crate::error::Result;
use crate::model::{WorkflowRequest, WorkflowResponse};

/// External executor for one MCP workflow request.
#[async_trait]
pub trait WorkflowBackend: Send + Sync {
    async fn execute(&self, request: WorkflowRequest) -> Result<WorkflowResponse>;
}

const DEFAULT_TIMEOUT_SECS: u64 = 60;
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// HTTP implementation talking to `POST {base_url}/workflow`.
pub struct HttpWorkflowBackend {
    client: Client,
    base_url: String,
}

impl HttpWorkflowBackend {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_timeout(base_url, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS))
            .build()
            .unwrap_or_else(|e| {
                warn!("Failed to build HTTP client with timeout defaults: {}", e);
                Client::new()
            });
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl WorkflowBackend for HttpWorkflowBackend {
    async fn execute(&self, request: WorkflowRequest) -> Result<WorkflowResponse> {
        let url = format!("{}/workflow", self.base_url);
        debug!(%url, tools = request.tool_ids.len(), "Executing workflow request");
        let response = self.client.post(&url).json(&request).send().await?;
        // The backend reports its own success/error inside the body, even
        // for non-2xx statuses; surface the body whenever it parses.
        let body: WorkflowResponse = response.json().await?;
        Ok(body)
    }
}
