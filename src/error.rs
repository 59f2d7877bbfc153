//! Error types for mcpflow.
//!
//! Every failure surfaced by the engine carries a parseable code so the
//! hosting UI (or an agent driving the API) can branch on it without
//! string-matching messages.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for mcpflow operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The stage at which a workflow backend call failed.
///
/// Mirrors the `error_stage` field reported by the workflow backend so the
/// engine can surface upstream failures verbatim. Stages the backend adds
/// later are carried through unchanged as [`ErrorStage::Other`] rather than
/// collapsed into a catch-all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorStage {
    ToolRetrieval,
    ToolContextGeneration,
    LlmSelection,
    ApiExecution,
    /// A stage this crate does not know about, preserved verbatim.
    Other(String),
}

impl std::fmt::Display for ErrorStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ToolRetrieval => write!(f, "tool_retrieval"),
            Self::ToolContextGeneration => write!(f, "tool_context_generation"),
            Self::LlmSelection => write!(f, "llm_selection"),
            Self::ApiExecution => write!(f, "api_execution"),
            Self::Other(stage) => f.write_str(stage),
        }
    }
}

impl From<&str> for ErrorStage {
    fn from(s: &str) -> Self {
        match s {
            "tool_retrieval" => Self::ToolRetrieval,
            "tool_context_generation" => Self::ToolContextGeneration,
            "llm_selection" => Self::LlmSelection,
            "api_execution" => Self::ApiExecution,
            other => Self::Other(other.to_string()),
        }
    }
}

impl Serialize for ErrorStage {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ErrorStage {
    fn deserialize<D: serde::Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(Self::from(s.as_str()))
    }
}

/// mcpflow error types.
///
/// Each variant includes a code that callers can parse programmatically.
#[derive(Error, Debug)]
pub enum Error {
    /// The workflow is structurally invalid or an entity is misconfigured.
    /// Raised synchronously before any network call; never retried.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A referenced entity id could not be resolved (e.g. a deleted Tool
    /// still selected by a config). Aborts the run at resolution time.
    #[error("Resolution error: {0}")]
    Resolution(String),

    /// Network-level failure talking to the relay or upstream.
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The backend explicitly reported `status: "error"`, tagged with the
    /// stage at which it failed.
    #[error("Upstream error at {stage}: {message}")]
    Upstream { stage: ErrorStage, message: String },

    /// The remote persistence collaborator rejected or failed a mutation.
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Get the error code for programmatic handling.
    pub fn code(&self) -> &'static str {
        match self {
            Error::Validation(_) => "VALIDATION_ERROR",
            Error::Resolution(_) => "RESOLUTION_ERROR",
            Error::Transport(_) => "TRANSPORT_ERROR",
            Error::Upstream { .. } => "UPSTREAM_ERROR",
            Error::Storage(_) => "STORAGE_ERROR",
            Error::Config(_) => "CONFIG_ERROR",
            Error::Parse(_) => "PARSE_ERROR",
            Error::Json(_) => "JSON_ERROR",
            Error::Io(_) => "IO_ERROR",
            Error::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Get a sanitized error message safe for external consumers.
    ///
    /// Hides internal details like file paths and raw transport errors that
    /// could leak sensitive information.
    pub fn external_message(&self) -> String {
        match self {
            // User-facing errors - safe to expose the message
            Error::Validation(msg) => format!("Validation error: {}", msg),
            Error::Resolution(msg) => format!("Resolution error: {}", msg),
            Error::Upstream { stage, message } => {
                format!("Upstream error at {}: {}", stage, message)
            }
            Error::Config(msg) => format!("Configuration error: {}", msg),
            Error::Parse(msg) => format!("Parse error: {}", msg),

            // Transport errors - expose status code if present, hide details
            Error::Transport(e) => {
                if let Some(status) = e.status() {
                    format!("HTTP request failed with status {}", status.as_u16())
                } else if e.is_timeout() {
                    "HTTP request timed out".to_string()
                } else if e.is_connect() {
                    "Failed to connect to remote service".to_string()
                } else {
                    "HTTP request failed".to_string()
                }
            }

            // Internal errors - sanitize to avoid leaking details
            Error::Storage(_) => "A storage error occurred".to_string(),
            Error::Json(_) => "A serialization error occurred".to_string(),
            Error::Io(_) => "An I/O error occurred".to_string(),
            Error::Internal(_) => "An internal error occurred".to_string(),
        }
    }
}
