//! Entity repository.
//!
//! All entities live in an in-memory repository with explicit CRUD methods
//! and no ambient global state. A synced wrapper layers an external
//! persistence collaborator on top with an explicit two-phase commit for
//! mutations.

mod memory;
mod remote;

pub use memory::{
    McpConfigDraft, McpConfigPatch, MemoryRepository, PromptDraft, PromptPatch,
    ResponseConfigDraft, ResponseConfigPatch, ToolPatch,
};
pub use remote::{RemoteStore, RestStore, SyncedRepository};

use serde::{Deserialize, Serialize};

use crate::model::{EntityId, McpConfig, Prompt, ResponseConfig, Tool};

/// The four entity kinds the repository manages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EntityKind {
    Tool,
    Prompt,
    McpConfig,
    ResponseConfig,
}

impl EntityKind {
    /// REST collection path segment for this kind.
    pub fn path(&self) -> &'static str {
        match self {
            Self::Tool => "tools",
            Self::Prompt => "prompts",
            Self::McpConfig => "mcp-configs",
            Self::ResponseConfig => "response-configs",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.path())
    }
}

/// Read access to the entity collections.
///
/// The validator, projector, and simulator take this trait rather than the
/// concrete repository so tests can substitute fixtures.
pub trait Repository {
    /// Look up a Tool by id. Dangling references are expected; `None` is a
    /// normal outcome, not an error.
    fn tool(&self, id: EntityId) -> Option<&Tool>;
    fn prompt(&self, id: EntityId) -> Option<&Prompt>;
    fn mcp_config(&self, id: EntityId) -> Option<&McpConfig>;
    fn response_config(&self, id: EntityId) -> Option<&ResponseConfig>;

    fn tools(&self) -> &[Tool];
    fn prompts(&self) -> &[Prompt];
    fn mcp_configs(&self) -> &[McpConfig];
    fn response_configs(&self) -> &[ResponseConfig];
}
