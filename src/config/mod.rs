//! Configuration system (layered: code > env > `.env`, plus an optional TOML settings file).

pub mod mcp;
pub mod settings;

pub use mcp::{McpConfigFile, McpServerConfig};
pub use settings::LoopSettings;

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

use crate::models::ProviderKind;

/// Credentials and endpoint overrides per backend.
///
/// Cloning is cheap and clones share state.
#[derive(Clone, Default)]
pub struct TetherConfig {
    api_keys: Arc<RwLock<HashMap<String, String>>>,
    base_urls: Arc<RwLock<HashMap<String, String>>>,
}

impl fmt::Debug for TetherConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let providers: Vec<String> = self
            .api_keys
            .read()
            .map(|keys| keys.keys().cloned().collect())
            .unwrap_or_default();
        f.debug_struct("TetherConfig")
            .field("api_keys_for", &providers)
            .field("base_urls", &self.base_urls)
            .finish()
    }
}

const API_KEY_ENV: [(&str, ProviderKind); 3] = [
    ("OPENAI_API_KEY", ProviderKind::OpenAi),
    ("GROQ_API_KEY", ProviderKind::Groq),
    ("ANTHROPIC_API_KEY", ProviderKind::Anthropic),
];

const BASE_URL_ENV: [(&str, ProviderKind); 4] = [
    ("OPENAI_BASE_URL", ProviderKind::OpenAi),
    ("GROQ_BASE_URL", ProviderKind::Groq),
    ("ANTHROPIC_BASE_URL", ProviderKind::Anthropic),
    ("OLLAMA_BASE_URL", ProviderKind::Ollama),
];

impl TetherConfig {
    /// Create an empty config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from environment variables, reading `.env` first when present.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let config = Self::new();
        for (env_var, provider) in API_KEY_ENV {
            if let Some(key) = lookup(env_var).filter(|v| !v.trim().is_empty()) {
                config.set_api_key(provider, key);
            }
        }
        for (env_var, provider) in BASE_URL_ENV {
            if let Some(url) = lookup(env_var).filter(|v| !v.trim().is_empty()) {
                config.set_base_url(provider, url);
            }
        }
        config
    }

    pub fn set_api_key(&self, provider: ProviderKind, key: impl Into<String>) {
        let mut keys = self.api_keys.write().unwrap_or_else(|e| e.into_inner());
        keys.insert(provider.as_str().to_string(), key.into());
    }

    pub fn get_api_key(&self, provider: ProviderKind) -> Option<String> {
        let keys = self.api_keys.read().unwrap_or_else(|e| e.into_inner());
        keys.get(provider.as_str()).cloned()
    }

    pub fn set_base_url(&self, provider: ProviderKind, url: impl Into<String>) {
        let mut urls = self.base_urls.write().unwrap_or_else(|e| e.into_inner());
        urls.insert(provider.as_str().to_string(), url.into());
    }

    pub fn get_base_url(&self, provider: ProviderKind) -> Option<String> {
        let urls = self.base_urls.read().unwrap_or_else(|e| e.into_inner());
        urls.get(provider.as_str()).cloned()
    }

    /// Whether a backend can be reached without further configuration.
    pub fn has_credentials(&self, provider: ProviderKind) -> bool {
        !provider.requires_api_key() || self.get_api_key(provider).is_some()
    }
}
