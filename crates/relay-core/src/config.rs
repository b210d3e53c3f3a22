//! Process configuration, read from environment variables.

use crate::error::{RelayError, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

pub const DEFAULT_API_URL: &str = "https://api.groq.com/openai/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "llama3-70b-8192";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_MAX_HISTORY: usize = 20;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RelayConfig {
    pub provider: ProviderConfig,
    pub session: SessionConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub api_url: String,
    /// `None` when no credential is configured; the relay degrades instead of failing.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub model: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    pub max_history: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub static_dir: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    /// `text` or `json`.
    pub format: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.into(),
            api_key: None,
            model: DEFAULT_MODEL.into(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { max_history: DEFAULT_MAX_HISTORY }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8000,
            static_dir: "../frontend/dist".into(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "text".into(),
        }
    }
}

impl RelayConfig {
    /// Build the configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup. Unset keys keep
    /// their defaults; empty strings count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut cfg = Self::default();

        cfg.provider.api_key = get("GROQ_API_KEY");
        if let Some(url) = get("GROQ_API_URL") {
            cfg.provider.api_url = url;
        }
        if let Some(model) = get("GROQ_MODEL") {
            cfg.provider.model = model;
        }
        if let Some(raw) = get("RELAY_TIMEOUT_SECS") {
            cfg.provider.timeout_secs = parse_var("RELAY_TIMEOUT_SECS", &raw)?;
        }

        if let Some(raw) = get("RELAY_MAX_HISTORY") {
            let max: usize = parse_var("RELAY_MAX_HISTORY", &raw)?;
            if max == 0 {
                return Err(RelayError::Config("RELAY_MAX_HISTORY must be at least 1".into()));
            }
            cfg.session.max_history = max;
        }

        if let Some(host) = get("RELAY_HOST") {
            cfg.server.host = host;
        }
        if let Some(raw) = get("RELAY_PORT") {
            cfg.server.port = parse_var("RELAY_PORT", &raw)?;
        }
        if let Some(dir) = get("RELAY_STATIC_DIR") {
            cfg.server.static_dir = dir;
        }

        if let Some(level) = get("RUST_LOG") {
            cfg.logging.level = level;
        }
        if let Some(format) = get("RELAY_LOG_FORMAT") {
            cfg.logging.format = format;
        }

        Ok(cfg)
    }
}

fn parse_var<T: FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| RelayError::Config(format!("{key} has an invalid value: {raw:?}")))
}
