//! Batch ingestion of Tool definitions from external API descriptions.
//!
//! Three source formats are accepted: OpenAPI/Swagger documents, Postman
//! collections (v2.1), and flat JSON arrays/objects. Every importer
//! produces [`ToolDraft`](crate::model::ToolDraft)s; the repository assigns
//! ids on insertion.

mod flat;
mod openapi;
mod postman;

pub use flat::import_flat;
pub use openapi::import_openapi;
pub use postman::import_postman;

use crate::error::{Error, Result};
use crate::model::ToolDraft;

/// Detect the source format and import accordingly.
///
/// OpenAPI documents are recognized by an `openapi` or `swagger` version
/// field, Postman collections by their `info.schema` URL; anything else is
/// treated as a flat record set.
pub fn import_any(doc: &serde_json::Value) -> Result<Vec<ToolDraft>> {
    if doc.get("openapi").is_some() || doc.get("swagger").is_some() {
        return import_openapi(doc);
    }
    if doc
        .pointer("/info/schema")
        .and_then(|s| s.as_str())
        .map(|s| s.contains("schema.getpostman.com"))
        .unwrap_or(false)
    {
        return import_postman(doc);
    }
    import_flat(doc)
}

/// Shared guard: reject imports that produce nothing usable.
fn non_empty(tools: Vec<ToolDraft>, source: &str) -> Result<Vec<ToolDraft>> {
    if tools.is_empty() {
        Err(Error::Parse(format!(
            "No importable tools found in {} document",
            source
        )))
    } else {
        Ok(tools)
    }
}
