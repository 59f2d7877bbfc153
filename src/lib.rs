//! mcpflow - Workflow composition and execution engine for MCP tooling
//!
//! mcpflow manages the building blocks of MCP-backed workflows (tools,
//! prompts, MCP configurations, response configurations), validates step
//! sequences against structural rules, projects configurations into
//! renderable flow graphs, and simulates chained execution against a
//! remote workflow backend.
//!
//! ## Key Features
//!
//! - **Typed entity repository**: per-kind monotone ids, partial updates,
//!   and an optional remote sync layer with remote-first commit semantics
//! - **Workflow validation**: ordered structural rules with a single
//!   human-readable failure reason
//! - **Flow projection**: deterministic graph layout for MCP
//!   configurations, with conditional styled edges
//! - **Execution simulation**: sequential step chaining with fail-fast
//!   halts, retry/fallback error handling, and abortable runs
//! - **Import surface**: OpenAPI/Swagger, Postman v2.1, and flat JSON
//!   documents become tool drafts
//! - **Same-origin relay**: axum proxy that forwards browser traffic to
//!   the upstream backend verbatim

pub mod config;
pub mod engine;
pub mod error;
pub mod flow;
pub mod import;
pub mod model;
pub mod relay;
pub mod repository;
pub mod telemetry;
pub mod workflow;

pub use error::{Error, Result};
