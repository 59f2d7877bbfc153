//! Same-origin HTTP relay.
//!
//! Browsers hosting the builder cannot call the upstream backend directly
//! (mixed content / CORS), so every REST and workflow call is proxied
//! through this relay: method, path, query, and body are forwarded to the
//! configured upstream origin and the upstream status/body come back
//! verbatim. Relay-level failures return a structured 500 body.

use std::time::Duration;

use axum::{
    body::Bytes,
    extract::{Path, RawQuery, State},
    http::{HeaderMap, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::any,
    Json, Router,
};
use reqwest::Client;
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::config::Config;

/// Shared relay state.
#[derive(Clone)]
pub struct RelayState {
    client: Client,
    upstream_origin: String,
}

impl RelayState {
    pub fn new(config: &Config) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.upstream.timeout_seconds))
            .build()
            .unwrap_or_else(|e| {
                warn!("Failed to build relay HTTP client with timeout: {}", e);
                Client::new()
            });
        Self {
            client,
            upstream_origin: config.upstream.origin.trim_end_matches('/').to_string(),
        }
    }
}

/// Build the relay router: a catch-all that forwards everything, with
/// permissive CORS for the hosting page and request tracing.
pub fn router(state: RelayState) -> Router {
    Router::new()
        .route("/{*path}", any(relay_request))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Headers that must not be forwarded to the upstream.
fn is_hop_header(name: &str) -> bool {
    matches!(name, "host" | "content-length")
}

fn target_url(origin: &str, path: &str, query: Option<&str>) -> String {
    match query {
        Some(q) if !q.is_empty() => format!("{}/{}?{}", origin, path, q),
        _ => format!("{}/{}", origin, path),
    }
}

async fn relay_request(
    State(state): State<RelayState>,
    method: Method,
    Path(path): Path<String>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let url = target_url(&state.upstream_origin, &path, query.as_deref());
    info!(%method, %url, "Relaying request upstream");

    let reqwest_method = match reqwest::Method::from_bytes(method.as_str().as_bytes()) {
        Ok(m) => m,
        Err(e) => {
            return relay_error("Unsupported method", &e.to_string());
        }
    };

    let mut request = state.client.request(reqwest_method, &url);
    for (name, value) in headers.iter() {
        if is_hop_header(name.as_str()) {
            continue;
        }
        if let Ok(value) = value.to_str() {
            request = request.header(name.as_str(), value);
        }
    }
    if !body.is_empty() {
        request = request.body(body.to_vec());
    }

    match request.send().await {
        Ok(upstream) => {
            let status =
                StatusCode::from_u16(upstream.status().as_u16()).unwrap_or(StatusCode::BAD_GATEWAY);
            let content_type = upstream
                .headers()
                .get(reqwest::header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("application/json")
                .to_string();
            match upstream.bytes().await {
                Ok(bytes) => {
                    // Status and body verbatim.
                    (status, [(axum::http::header::CONTENT_TYPE, content_type)], bytes)
                        .into_response()
                }
                Err(e) => {
                    error!("Failed to read upstream body: {}", e);
                    relay_error("Failed to read upstream response", &e.to_string())
                }
            }
        }
        Err(e) => {
            error!("Relay request failed: {}", e);
            relay_error("Relay request failed", &e.to_string())
        }
    }
}

fn relay_error(message: &str, details: &str) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({"error": message, "details": details})),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_url_joins_path_and_query() {
        assert_eq!(
            target_url("http://up.test", "api/projects", Some("limit=5")),
            "http://up.test/api/projects?limit=5"
        );
        assert_eq!(
            target_url("http://up.test", "api/projects", None),
            "http://up.test/api/projects"
        );
        assert_eq!(
            target_url("http://up.test", "api/projects", Some("")),
            "http://up.test/api/projects"
        );
    }

    #[test]
    fn test_hop_headers_not_forwarded() {
        assert!(is_hop_header("host"));
        assert!(is_hop_header("content-length"));
        assert!(!is_hop_header("authorization"));
        assert!(!is_hop_header("content-type"));
    }

    #[test]
    fn test_router_builds() {
        let state = RelayState::new(&Config::default());
        let _router = router(state);
    }
}
