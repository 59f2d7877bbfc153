//! Postman collection (v2.1) import.

use serde_json::Value;

use crate::error::Result;
use crate::model::{HttpMethod, KeyValue, ToolDraft};

/// Import a Postman v2.1 collection, recursively walking folder/item trees.
/// Every item carrying a `request` becomes one Tool.
pub fn import_postman(doc: &Value) -> Result<Vec<ToolDraft>> {
    let mut tools = Vec::new();
    if let Some(items) = doc.get("item").and_then(|i| i.as_array()) {
        for item in items {
            walk_item(item, &mut tools);
        }
    }
    super::non_empty(tools, "Postman collection")
}

fn walk_item(item: &Value, tools: &mut Vec<ToolDraft>) {
    // Folders nest arbitrarily; requests are leaves.
    if let Some(children) = item.get("item").and_then(|i| i.as_array()) {
        for child in children {
            walk_item(child, tools);
        }
        return;
    }

    let Some(request) = item.get("request") else {
        return;
    };
    let Some(method) = request
        .get("method")
        .and_then(|m| m.as_str())
        .and_then(|m| m.parse::<HttpMethod>().ok())
    else {
        return;
    };

    let name = item
        .get("name")
        .and_then(|n| n.as_str())
        .unwrap_or("unnamed request")
        .to_string();
    let description = request
        .get("description")
        .and_then(|d| d.as_str())
        .unwrap_or_default()
        .to_string();

    let (url, query_params) = extract_url(request.get("url"));

    let headers = request
        .get("header")
        .and_then(|h| h.as_array())
        .map(|entries| {
            entries
                .iter()
                .filter_map(|e| {
                    let key = e.get("key")?.as_str()?;
                    let value = e.get("value").and_then(|v| v.as_str()).unwrap_or("");
                    Some(KeyValue::new(key, value))
                })
                .collect()
        })
        .unwrap_or_default();

    let body = request
        .pointer("/body/raw")
        .and_then(|b| b.as_str())
        .unwrap_or_default()
        .to_string();

    tools.push(ToolDraft {
        name,
        description,
        method,
        url,
        headers,
        query_params,
        body,
    });
}

/// Postman URLs are either a plain string or a structured object with a
/// `raw` form plus a parsed `query` list.
fn extract_url(url: Option<&Value>) -> (String, Vec<KeyValue>) {
    match url {
        Some(Value::String(s)) => (s.clone(), Vec::new()),
        Some(Value::Object(obj)) => {
            let raw = obj
                .get("raw")
                .and_then(|r| r.as_str())
                .unwrap_or_default()
                .to_string();
            // Strip the query string from the raw URL; queries are carried
            // as structured entries.
            let base = raw.split('?').next().unwrap_or("").to_string();
            let query = obj
                .get("query")
                .and_then(|q| q.as_array())
                .map(|entries| {
                    entries
                        .iter()
                        .filter_map(|e| {
                            let key = e.get("key")?.as_str()?;
                            let value = e.get("value").and_then(|v| v.as_str()).unwrap_or("");
                            Some(KeyValue::new(key, value))
                        })
                        .collect()
                })
                .unwrap_or_default();
            (base, query)
        }
        _ => (String::new(), Vec::new()),
    }
}
