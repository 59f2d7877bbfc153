//! Configuration management.
//!
//! mcpflow configuration can come from:
//! - Environment variables (MCPFLOW_*)
//! - Config file (~/.config/mcpflow/config.toml)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// mcpflow configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Relay server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Upstream origin the relay forwards to
    #[serde(default)]
    pub upstream: UpstreamConfig,

    /// Workflow backend configuration
    #[serde(default)]
    pub backend: BackendConfig,
}

/// Relay server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
        }
    }
}

fn default_port() -> u16 {
    8080
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

/// Upstream origin configuration for the relay.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// Origin to forward relayed requests to
    #[serde(default = "default_upstream_origin")]
    pub origin: String,

    /// Fixed timeout for relayed requests (seconds)
    #[serde(default = "default_upstream_timeout")]
    pub timeout_seconds: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            origin: default_upstream_origin(),
            timeout_seconds: default_upstream_timeout(),
        }
    }
}

fn default_upstream_origin() -> String {
    "http://localhost:8000".to_string()
}

fn default_upstream_timeout() -> u64 {
    30
}

/// Workflow backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Base URL for the workflow execution backend
    #[serde(default = "default_backend_url")]
    pub base_url: String,

    /// Timeout for workflow calls (seconds)
    #[serde(default = "default_backend_timeout")]
    pub timeout_seconds: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_backend_url(),
            timeout_seconds: default_backend_timeout(),
        }
    }
}

fn default_backend_url() -> String {
    "http://localhost:8000/api".to_string()
}

fn default_backend_timeout() -> u64 {
    60
}

impl Config {
    /// Load configuration from default locations.
    pub fn load() -> Self {
        let mut config = Self::default();

        let primary_path = Self::config_dir().join("config.toml");
        if let Ok(partial) = Self::load_partial_from_path(&primary_path) {
            config.apply_partial(partial);
        }

        config.apply_env_overrides();
        config
    }

    /// Get the config directory.
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .map(|d| d.join("mcpflow"))
            .unwrap_or_else(|| PathBuf::from(".mcpflow"))
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(port) = std::env::var("MCPFLOW_SERVER_PORT") {
            if let Ok(parsed) = port.parse::<u16>() {
                self.server.port = parsed;
            }
        }
        if let Ok(host) = std::env::var("MCPFLOW_SERVER_HOST") {
            self.server.host = host;
        }
        if let Ok(origin) = std::env::var("MCPFLOW_UPSTREAM_ORIGIN") {
            self.upstream.origin = origin;
        }
        if let Ok(timeout) = std::env::var("MCPFLOW_UPSTREAM_TIMEOUT_SECONDS") {
            if let Ok(parsed) = timeout.parse::<u64>() {
                self.upstream.timeout_seconds = parsed;
            }
        }
        if let Ok(url) = std::env::var("MCPFLOW_BACKEND_URL") {
            self.backend.base_url = url;
        }
        if let Ok(timeout) = std::env::var("MCPFLOW_BACKEND_TIMEOUT_SECONDS") {
            if let Ok(parsed) = timeout.parse::<u64>() {
                self.backend.timeout_seconds = parsed;
            }
        }
    }

    fn load_partial_from_path(path: &Path) -> std::result::Result<PartialConfig, ()> {
        let content = std::fs::read_to_string(path).map_err(|_| ())?;
        toml::from_str(&content).map_err(|_| ())
    }

    fn apply_partial(&mut self, partial: PartialConfig) {
        if let Some(server) = partial.server {
            self.server = server;
        }
        if let Some(upstream) = partial.upstream {
            self.upstream = upstream;
        }
        if let Some(backend) = partial.backend {
            self.backend = backend;
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct PartialConfig {
    server: Option<ServerConfig>,
    upstream: Option<UpstreamConfig>,
    backend: Option<BackendConfig>,
}
