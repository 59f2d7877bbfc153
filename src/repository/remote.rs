//! Remote persistence collaborator and the synced repository wrapper.
//!
//! Mutations through [`SyncedRepository`] follow an explicit two-phase
//! protocol: the remote store is asked first, and the local mutation is only
//! applied after the remote ack. A remote failure surfaces as an error and
//! leaves local state untouched. Deletes are the exception: they apply
//! locally immediately and mirror remotely best-effort, because the local
//! list is the source of truth for the active session.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, warn};

use super::{EntityKind, MemoryRepository, Repository};
use crate::error::{Error, Result};
use crate::model::{EntityId, McpConfig, Prompt, ResponseConfig, Tool, ToolDraft};
use crate::repository::memory::{
    McpConfigDraft, McpConfigPatch, PromptDraft, PromptPatch, ResponseConfigDraft,
    ResponseConfigPatch, ToolPatch,
};

/// External persistence collaborator.
///
/// Payloads are plain JSON: the remote side owns its own schema and the
/// repository does not interpret what comes back beyond success/failure.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    async fn create(&self, kind: EntityKind, body: Value) -> Result<Value>;
    async fn update(&self, kind: EntityKind, id: EntityId, body: Value) -> Result<()>;
    async fn delete(&self, kind: EntityKind, id: EntityId) -> Result<()>;
}

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// REST implementation of [`RemoteStore`].
///
/// Collections are scoped under a project: `POST /projects/{id}/tools`,
/// `PATCH /tools/{id}`, `DELETE /tools/{id}`, with the same shape for
/// prompts, mcp-configs, and response-configs.
pub struct RestStore {
    client: Client,
    base_url: String,
    project_id: String,
}

impl RestStore {
    pub fn new(base_url: impl Into<String>, project_id: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .connect_timeout(Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS))
            .build()
            .unwrap_or_else(|e| {
                warn!("Failed to build HTTP client with timeout defaults: {}", e);
                Client::new()
            });
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            project_id: project_id.into(),
        }
    }

    fn collection_url(&self, kind: EntityKind) -> String {
        format!(
            "{}/projects/{}/{}",
            self.base_url,
            self.project_id,
            kind.path()
        )
    }

    fn item_url(&self, kind: EntityKind, id: EntityId) -> String {
        format!("{}/{}/{}", self.base_url, kind.path(), id)
    }

    fn check_status(kind: EntityKind, status: reqwest::StatusCode) -> Result<()> {
        if status.is_success() {
            Ok(())
        } else {
            Err(Error::Storage(format!(
                "Remote store rejected {} mutation with status {}",
                kind, status
            )))
        }
    }
}

#[async_trait]
impl RemoteStore for RestStore {
    async fn create(&self, kind: EntityKind, body: Value) -> Result<Value> {
        let url = self.collection_url(kind);
        debug!(%url, "Creating remote {}", kind);
        let response = self.client.post(&url).json(&body).send().await?;
        let status = response.status();
        Self::check_status(kind, status)?;
        Ok(response.json().await.unwrap_or(Value::Null))
    }

    async fn update(&self, kind: EntityKind, id: EntityId, body: Value) -> Result<()> {
        let url = self.item_url(kind, id);
        debug!(%url, "Updating remote {}", kind);
        let response = self.client.patch(&url).json(&body).send().await?;
        Self::check_status(kind, response.status())
    }

    async fn delete(&self, kind: EntityKind, id: EntityId) -> Result<()> {
        let url = self.item_url(kind, id);
        debug!(%url, "Deleting remote {}", kind);
        let response = self.client.delete(&url).send().await?;
        Self::check_status(kind, response.status())
    }
}

/// Repository with a remote mirror.
pub struct SyncedRepository {
    local: MemoryRepository,
    remote: Arc<dyn RemoteStore>,
}

impl SyncedRepository {
    pub fn new(remote: Arc<dyn RemoteStore>) -> Self {
        Self {
            local: MemoryRepository::new(),
            remote,
        }
    }

    /// The wrapped local repository, for read access and local-only edits.
    pub fn local(&self) -> &MemoryRepository {
        &self.local
    }

    pub fn local_mut(&mut self) -> &mut MemoryRepository {
        &mut self.local
    }

    pub async fn create_tool(&mut self, draft: ToolDraft) -> Result<EntityId> {
        self.remote
            .create(EntityKind::Tool, serde_json::to_value(&draft)?)
            .await?;
        Ok(self.local.create_tool(draft))
    }

    pub async fn update_tool(&mut self, id: EntityId, patch: ToolPatch) -> Result<()> {
        self.remote
            .update(EntityKind::Tool, id, serde_json::to_value(&patch)?)
            .await?;
        self.local.update_tool(id, patch)
    }

    pub async fn delete_tool(&mut self, id: EntityId) {
        self.local.delete_tool(id);
        if let Err(e) = self.remote.delete(EntityKind::Tool, id).await {
            warn!("Remote delete of tool {} failed: {}", id, e);
        }
    }

    pub async fn create_prompt(&mut self, draft: PromptDraft) -> Result<EntityId> {
        self.remote
            .create(EntityKind::Prompt, serde_json::to_value(&draft)?)
            .await?;
        Ok(self.local.create_prompt(draft))
    }

    pub async fn update_prompt(&mut self, id: EntityId, patch: PromptPatch) -> Result<()> {
        self.remote
            .update(EntityKind::Prompt, id, serde_json::to_value(&patch)?)
            .await?;
        self.local.update_prompt(id, patch)
    }

    pub async fn delete_prompt(&mut self, id: EntityId) {
        self.local.delete_prompt(id);
        if let Err(e) = self.remote.delete(EntityKind::Prompt, id).await {
            warn!("Remote delete of prompt {} failed: {}", id, e);
        }
    }

    pub async fn create_mcp_config(&mut self, draft: McpConfigDraft) -> Result<EntityId> {
        self.remote
            .create(EntityKind::McpConfig, serde_json::to_value(&draft)?)
            .await?;
        Ok(self.local.create_mcp_config(draft))
    }

    pub async fn update_mcp_config(&mut self, id: EntityId, patch: McpConfigPatch) -> Result<()> {
        self.remote
            .update(EntityKind::McpConfig, id, serde_json::to_value(&patch)?)
            .await?;
        self.local.update_mcp_config(id, patch)
    }

    pub async fn delete_mcp_config(&mut self, id: EntityId) {
        self.local.delete_mcp_config(id);
        if let Err(e) = self.remote.delete(EntityKind::McpConfig, id).await {
            warn!("Remote delete of MCP config {} failed: {}", id, e);
        }
    }

    pub async fn create_response_config(
        &mut self,
        draft: ResponseConfigDraft,
    ) -> Result<EntityId> {
        self.remote
            .create(EntityKind::ResponseConfig, serde_json::to_value(&draft)?)
            .await?;
        Ok(self.local.create_response_config(draft))
    }

    pub async fn update_response_config(
        &mut self,
        id: EntityId,
        patch: ResponseConfigPatch,
    ) -> Result<()> {
        self.remote
            .update(EntityKind::ResponseConfig, id, serde_json::to_value(&patch)?)
            .await?;
        self.local.update_response_config(id, patch)
    }

    pub async fn delete_response_config(&mut self, id: EntityId) {
        self.local.delete_response_config(id);
        if let Err(e) = self.remote.delete(EntityKind::ResponseConfig, id).await {
            warn!("Remote delete of response config {} failed: {}", id, e);
        }
    }
}

impl Repository for SyncedRepository {
    fn tool(&self, id: EntityId) -> Option<&Tool> {
        self.local.tool(id)
    }

    fn prompt(&self, id: EntityId) -> Option<&Prompt> {
        self.local.prompt(id)
    }

    fn mcp_config(&self, id: EntityId) -> Option<&McpConfig> {
        self.local.mcp_config(id)
    }

    fn response_config(&self, id: EntityId) -> Option<&ResponseConfig> {
        self.local.response_config(id)
    }

    fn tools(&self) -> &[Tool] {
        self.local.tools()
    }

    fn prompts(&self) -> &[Prompt] {
        self.local.prompts()
    }

    fn mcp_configs(&self) -> &[McpConfig] {
        self.local.mcp_configs()
    }

    fn response_configs(&self) -> &[ResponseConfig] {
        self.local.response_configs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::HttpMethod;
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

    /// Remote store stub that can be flipped into a failing mode.
    struct StubStore {
        fail: AtomicBool,
        creates: AtomicU32,
        deletes: AtomicU32,
    }

    impl StubStore {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                fail: AtomicBool::new(false),
                creates: AtomicU32::new(0),
                deletes: AtomicU32::new(0),
            })
        }

        fn set_failing(&self, failing: bool) {
            self.fail.store(failing, Ordering::SeqCst);
        }

        fn check(&self) -> Result<()> {
            if self.fail.load(Ordering::SeqCst) {
                Err(Error::Storage("remote unavailable".into()))
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl RemoteStore for StubStore {
        async fn create(&self, _kind: EntityKind, _body: Value) -> Result<Value> {
            self.creates.fetch_add(1, Ordering::SeqCst);
            self.check().map(|_| Value::Null)
        }

        async fn update(&self, _kind: EntityKind, _id: EntityId, _body: Value) -> Result<()> {
            self.check()
        }

        async fn delete(&self, _kind: EntityKind, _id: EntityId) -> Result<()> {
            self.deletes.fetch_add(1, Ordering::SeqCst);
            self.check()
        }
    }

    fn draft(name: &str) -> ToolDraft {
        ToolDraft {
            name: name.to_string(),
            method: HttpMethod::Get,
            url: "https://api.example.com".to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_applies_locally_after_remote_ack() {
        let store = StubStore::new();
        let mut repo = SyncedRepository::new(store.clone());

        let id = repo.create_tool(draft("weather")).await.unwrap();
        assert!(repo.tool(id).is_some());
        assert_eq!(store.creates.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_create_rolls_back_on_remote_failure() {
        let store = StubStore::new();
        store.set_failing(true);
        let mut repo = SyncedRepository::new(store.clone());

        let err = repo.create_tool(draft("weather")).await.unwrap_err();
        assert_eq!(err.code(), "STORAGE_ERROR");
        assert!(repo.tools().is_empty(), "local state must stay untouched");
    }

    #[tokio::test]
    async fn test_update_not_applied_on_remote_failure() {
        let store = StubStore::new();
        let mut repo = SyncedRepository::new(store.clone());
        let id = repo.create_tool(draft("weather")).await.unwrap();

        store.set_failing(true);
        let result = repo
            .update_tool(
                id,
                ToolPatch {
                    name: Some("renamed".into()),
                    ..Default::default()
                },
            )
            .await;
        assert!(result.is_err());
        assert_eq!(repo.tool(id).unwrap().name, "weather");
    }

    #[tokio::test]
    async fn test_delete_is_local_first_best_effort_remote() {
        let store = StubStore::new();
        let mut repo = SyncedRepository::new(store.clone());
        let id = repo.create_tool(draft("weather")).await.unwrap();

        store.set_failing(true);
        repo.delete_tool(id).await;

        // Local delete sticks even though the remote mirror failed.
        assert!(repo.tool(id).is_none());
        assert_eq!(store.deletes.load(Ordering::SeqCst), 1);
    }
}
