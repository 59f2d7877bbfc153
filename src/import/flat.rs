//! Flat JSON import.
//!
//! Accepts a JSON array of records, or a single record object. The import
//! is all-or-nothing: every record must carry `name`, `method`, and `url`,
//! otherwise the whole document is rejected.

use serde_json::Value;

use crate::error::{Error, Result};
use crate::model::{HttpMethod, KeyValue, ToolDraft};

/// Import a flat array/object of `{name, method, url, ...}` records.
pub fn import_flat(doc: &Value) -> Result<Vec<ToolDraft>> {
    let records: Vec<&Value> = match doc {
        Value::Array(items) => items.iter().collect(),
        Value::Object(_) => vec![doc],
        _ => {
            return Err(Error::Parse(
                "Flat import expects a JSON array or object".into(),
            ))
        }
    };

    let mut tools = Vec::with_capacity(records.len());
    for (index, record) in records.iter().enumerate() {
        tools.push(parse_record(record).map_err(|e| {
            Error::Parse(format!("Record {} is not importable: {}", index, e))
        })?);
    }
    super::non_empty(tools, "flat")
}

fn parse_record(record: &Value) -> std::result::Result<ToolDraft, String> {
    let name = required_str(record, "name")?;
    let method: HttpMethod = required_str(record, "method")?.parse()?;
    let url = required_str(record, "url")?;

    Ok(ToolDraft {
        name: name.to_string(),
        description: record
            .get("description")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string(),
        method,
        url: url.to_string(),
        headers: key_values(record.get("headers")),
        query_params: key_values(record.get("query_params")),
        body: record
            .get("body")
            .map(|v| match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .unwrap_or_default(),
    })
}

fn required_str<'a>(record: &'a Value, field: &str) -> std::result::Result<&'a str, String> {
    record
        .get(field)
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| format!("missing required field '{}'", field))
}

/// Key/value entries arrive either as a list of `{key, value}` objects or
/// as a plain object map.
fn key_values(value: Option<&Value>) -> Vec<KeyValue> {
    match value {
        Some(Value::Array(entries)) => entries
            .iter()
            .filter_map(|e| {
                let key = e.get("key")?.as_str()?;
                let value = e.get("value").and_then(|v| v.as_str()).unwrap_or("");
                Some(KeyValue::new(key, value))
            })
            .collect(),
        Some(Value::Object(map)) => map
            .iter()
            .map(|(k, v)| {
                KeyValue::new(
                    k,
                    match v {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    },
                )
            })
            .collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_array_of_records() {
        let doc = json!([
            {"name": "a", "method": "GET", "url": "https://x.test/a"},
            {
                "name": "b",
                "method": "post",
                "url": "https://x.test/b",
                "headers": {"Authorization": "Bearer t"},
                "body": {"k": 1}
            }
        ]);
        let tools = import_flat(&doc).unwrap();
        assert_eq!(tools.len(), 2);
        assert_eq!(tools[1].method, HttpMethod::Post);
        assert_eq!(tools[1].headers, vec![KeyValue::new("Authorization", "Bearer t")]);
        assert_eq!(tools[1].body, "{\"k\":1}");
    }

    #[test]
    fn test_single_object_accepted() {
        let doc = json!({"name": "solo", "method": "DELETE", "url": "https://x.test"});
        let tools = import_flat(&doc).unwrap();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].method, HttpMethod::Delete);
    }

    #[test]
    fn test_missing_required_field_rejects_whole_document() {
        let doc = json!([
            {"name": "ok", "method": "GET", "url": "https://x.test"},
            {"name": "broken", "method": "GET"}
        ]);
        let err = import_flat(&doc).unwrap_err();
        assert_eq!(err.code(), "PARSE_ERROR");
        assert!(err.to_string().contains("url"));
    }

    #[test]
    fn test_unknown_method_rejected() {
        let doc = json!([{"name": "x", "method": "TRACE", "url": "https://x.test"}]);
        assert!(import_flat(&doc).is_err());
    }

    #[test]
    fn test_scalar_document_rejected() {
        assert!(import_flat(&json!("nope")).is_err());
        assert!(import_flat(&json!(42)).is_err());
    }
}
