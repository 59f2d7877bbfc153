//! OpenAPI/Swagger document import.

use serde_json::Value;

use crate::error::Result;
use crate::model::{HttpMethod, KeyValue, ToolDraft};

const METHODS: [&str; 5] = ["get", "post", "put", "patch", "delete"];

/// Import an OpenAPI 3.x or Swagger 2.0 document: one Tool per
/// method+path. Path, header, and query parameters map to Tool header and
/// query entries; a request body example becomes the default body.
pub fn import_openapi(doc: &Value) -> Result<Vec<ToolDraft>> {
    let base_url = base_url(doc);
    let mut tools = Vec::new();

    let paths = doc.get("paths").and_then(|p| p.as_object());
    if let Some(paths) = paths {
        for (path, operations) in paths {
            let Some(operations) = operations.as_object() else {
                continue;
            };
            // Parameters declared at path level apply to every operation.
            let shared_params = operations
                .get("parameters")
                .and_then(|p| p.as_array())
                .cloned()
                .unwrap_or_default();

            for method_name in METHODS {
                let Some(operation) = operations.get(method_name) else {
                    continue;
                };
                let method: HttpMethod = match method_name.parse() {
                    Ok(m) => m,
                    Err(_) => continue,
                };

                let name = operation
                    .get("operationId")
                    .and_then(|v| v.as_str())
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("{} {}", method, path));
                let description = operation
                    .get("summary")
                    .or_else(|| operation.get("description"))
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string();

                let mut headers = Vec::new();
                let mut query_params = Vec::new();
                let own_params = operation
                    .get("parameters")
                    .and_then(|p| p.as_array())
                    .cloned()
                    .unwrap_or_default();
                for param in shared_params.iter().chain(own_params.iter()) {
                    collect_parameter(param, &mut headers, &mut query_params);
                }

                tools.push(ToolDraft {
                    name,
                    description,
                    method,
                    url: format!("{}{}", base_url, path),
                    headers,
                    query_params,
                    body: request_body_example(operation, &own_params),
                });
            }
        }
    }

    super::non_empty(tools, "OpenAPI")
}

/// Resolve the server base URL: OpenAPI `servers[0].url`, or Swagger 2.0
/// `schemes`/`host`/`basePath`.
fn base_url(doc: &Value) -> String {
    if let Some(url) = doc
        .pointer("/servers/0/url")
        .and_then(|v| v.as_str())
    {
        return url.trim_end_matches('/').to_string();
    }
    if let Some(host) = doc.get("host").and_then(|v| v.as_str()) {
        let scheme = doc
            .pointer("/schemes/0")
            .and_then(|v| v.as_str())
            .unwrap_or("https");
        let base_path = doc
            .get("basePath")
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .trim_end_matches('/');
        return format!("{}://{}{}", scheme, host, base_path);
    }
    String::new()
}

fn collect_parameter(param: &Value, headers: &mut Vec<KeyValue>, query: &mut Vec<KeyValue>) {
    let Some(name) = param.get("name").and_then(|v| v.as_str()) else {
        return;
    };
    let value = param
        .get("example")
        .or_else(|| param.pointer("/schema/example"))
        .or_else(|| param.pointer("/schema/default"))
        .map(render_example)
        .unwrap_or_default();
    match param.get("in").and_then(|v| v.as_str()) {
        Some("header") => headers.push(KeyValue::new(name, value)),
        Some("query") => query.push(KeyValue::new(name, value)),
        _ => {}
    }
}

/// Extract a request body example: OpenAPI 3 `requestBody` content, or a
/// Swagger 2 `in: body` parameter schema example.
fn request_body_example(operation: &Value, params: &[Value]) -> String {
    if let Some(example) = operation
        .pointer("/requestBody/content/application~1json/example")
        .or_else(|| {
            operation.pointer("/requestBody/content/application~1json/schema/example")
        })
    {
        return render_example(example);
    }
    for param in params {
        if param.get("in").and_then(|v| v.as_str()) == Some("body") {
            if let Some(example) = param
                .pointer("/schema/example")
                .or_else(|| param.get("example"))
            {
                return render_example(example);
            }
        }
    }
    String::new()
}

fn render_example(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
