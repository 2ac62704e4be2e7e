use figment::{
    Figment,
    providers::{Env, Format, Toml, Yaml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::KateError;

/// Top-level client configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub traces: TraceConfig,
    #[serde(default)]
    pub log: LogConfig,
}

/// Where the control API lives and how to talk to it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Whole-request timeout enforced by the transport.
    #[serde(default = "default_timeout")]
    pub timeout_ms: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// File the bearer token is kept in between runs.
    #[serde(default = "default_token_file")]
    pub token_file: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceConfig {
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

// ── Defaults ──────────────────────────────────────────────────

fn default_base_url() -> String { "http://127.0.0.1:8080".into() }
fn default_timeout() -> u64 { 10_000 }
fn default_user_agent() -> String { format!("kate-admin/{}", env!("CARGO_PKG_VERSION")) }
fn default_token_file() -> PathBuf { PathBuf::from(".kate/token") }
fn default_page_size() -> u32 { 20 }
fn default_log_level() -> String { "info".into() }

// ── Impls ─────────────────────────────────────────────────────

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_ms: default_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            token_file: default_token_file(),
        }
    }
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl ClientConfig {
    /// Load configuration from a YAML or TOML file plus `KATE_` env overrides.
    ///
    /// Nested keys are separated by a double underscore in the environment,
    /// e.g. `KATE_GATEWAY__BASE_URL`.
    pub fn load(path: &Path) -> Result<Self, KateError> {
        let figment = match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Figment::new().merge(Toml::file(path)),
            _ => Figment::new().merge(Yaml::file(path)),
        };
        Self::extract(figment)
    }

    /// Defaults plus `KATE_` env overrides, no file.
    pub fn from_env() -> Result<Self, KateError> {
        Self::extract(Figment::new())
    }

    fn extract(figment: Figment) -> Result<Self, KateError> {
        figment
            .merge(Env::prefixed("KATE_").split("__"))
            .extract()
            .map_err(|e| KateError::Config(e.to_string()))
    }
}
