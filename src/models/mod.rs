//! Backend identifiers and `provider:model` parsing.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use crate::error::TetherError;

/// Chat backends with a built-in adapter.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[strum(serialize = "openai")]
    OpenAi,
    Groq,
    #[strum(to_string = "anthropic", serialize = "claude")]
    Anthropic,
    Ollama,
}

impl ProviderKind {
    /// Canonical provider key string.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Groq => "groq",
            Self::Anthropic => "anthropic",
            Self::Ollama => "ollama",
        }
    }

    /// Default API root.
    pub const fn default_base_url(self) -> &'static str {
        match self {
            Self::OpenAi => "https://api.openai.com/v1",
            Self::Groq => "https://api.groq.com/openai/v1",
            Self::Anthropic => "https://api.anthropic.com/v1",
            Self::Ollama => "http://localhost:11434",
        }
    }

    pub const fn requires_api_key(self) -> bool {
        !matches!(self, Self::Ollama)
    }

    /// Whether the backend natively returns structured tool-call requests.
    pub const fn supports_tool_calling(self) -> bool {
        !matches!(self, Self::Ollama)
    }
}

/// A parsed `provider:model` identifier.
///
/// Only the first `:` separates the provider, so `ollama:gemma3:latest` keeps the
/// `gemma3:latest` tag intact.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModelId {
    pub provider: ProviderKind,
    pub model: String,
}

impl ModelId {
    pub fn new(provider: ProviderKind, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
        }
    }
}

impl FromStr for ModelId {
    type Err = TetherError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (provider, model) = s.split_once(':').ok_or_else(|| {
            TetherError::InvalidArgument(format!(
                "Invalid model identifier '{s}': expected 'provider:model'"
            ))
        })?;
        let model = model.trim();
        if model.is_empty() {
            return Err(TetherError::InvalidArgument(format!(
                "Invalid model identifier '{s}': model name is empty"
            )));
        }
        let provider = ProviderKind::from_str(provider.trim())
            .map_err(|_| TetherError::UnsupportedProvider(provider.to_string()))?;
        Ok(Self::new(provider, model))
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.provider, self.model)
    }
}
