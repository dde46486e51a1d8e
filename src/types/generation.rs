//! Per-request sampling settings.

use bon::Builder;
use serde::{Deserialize, Serialize};

/// Settings controlling one chat-completion request.
#[derive(Debug, Clone, Builder, Serialize, Deserialize, Default, PartialEq)]
pub struct GenerationSettings {
    pub temperature: Option<f64>,
    pub max_tokens: Option<u32>,
}

impl GenerationSettings {
    /// Settings with only a temperature set.
    pub fn with_temperature(temperature: f64) -> Self {
        Self {
            temperature: Some(temperature),
            ..Default::default()
        }
    }
}
