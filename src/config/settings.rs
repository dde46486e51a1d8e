//! Loop limits and sampling settings, loadable from `tether.toml`.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::TetherError;
use crate::util::retry::RetryPolicy;

const DEFAULT_MAX_TURNS: usize = 3;
const DEFAULT_MAX_PLAN_STEPS: usize = 5;
const MAX_TURNS_ENV: &str = "TETHER_MAX_TURNS";
const MAX_PLAN_STEPS_ENV: &str = "TETHER_MAX_PLAN_STEPS";
const PARALLEL_TOOLS_ENV: &str = "TETHER_PARALLEL_TOOLS";
const SETTINGS_FILE_NAME: &str = "tether.toml";

/// Turn budget, plan cap, per-phase temperatures and transport limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoopSettings {
    /// Model calls allowed per execution loop.
    pub max_turns: usize,
    /// Upper bound on executed plan entries.
    pub max_plan_steps: usize,
    pub tool_temperature: f64,
    pub plan_temperature: f64,
    pub synthesis_temperature: f64,
    /// Run the tool calls of one assistant turn concurrently.
    pub parallel_tool_calls: bool,
    pub tool_timeout_ms: Option<u64>,
    pub request_timeout_ms: u64,
    /// Retries after the first backend attempt.
    pub max_retries: u32,
}

impl Default for LoopSettings {
    fn default() -> Self {
        Self {
            max_turns: DEFAULT_MAX_TURNS,
            max_plan_steps: DEFAULT_MAX_PLAN_STEPS,
            tool_temperature: 1.0,
            plan_temperature: 0.3,
            synthesis_temperature: 0.6,
            parallel_tool_calls: true,
            tool_timeout_ms: None,
            request_timeout_ms: 120_000,
            max_retries: 1,
        }
    }
}

impl LoopSettings {
    /// Default file location: `<platform config dir>/tether/tether.toml`.
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "tether")
            .map(|dirs| dirs.config_dir().join(SETTINGS_FILE_NAME))
    }

    /// Parse settings from a TOML file. Missing keys keep their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, TetherError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)?;
        let settings: Self = toml::from_str(&raw).map_err(|e| {
            TetherError::Configuration(format!("invalid settings file {}: {e}", path.display()))
        })?;
        Ok(settings.normalized())
    }

    /// Read the default file when it exists, then apply environment overrides.
    pub fn load() -> Result<Self, TetherError> {
        let base = match Self::default_path() {
            Some(path) if path.exists() => Self::from_file(path)?,
            _ => Self::default(),
        };
        Ok(base.with_env_overrides(|key| std::env::var(key).ok()))
    }

    /// Apply `TETHER_*` overrides. Zero or unparsable limits are ignored.
    pub fn with_env_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(turns) = lookup(MAX_TURNS_ENV).and_then(|v| parse_positive_usize(&v)) {
            self.max_turns = turns;
        }
        if let Some(steps) = lookup(MAX_PLAN_STEPS_ENV).and_then(|v| parse_positive_usize(&v)) {
            self.max_plan_steps = steps;
        }
        if let Some(parallel) = lookup(PARALLEL_TOOLS_ENV).and_then(|v| parse_bool(&v)) {
            self.parallel_tool_calls = parallel;
        }
        self
    }

    pub fn tool_timeout(&self) -> Option<Duration> {
        self.tool_timeout_ms.map(Duration::from_millis)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_retries.saturating_add(1),
            ..RetryPolicy::default()
        }
    }

    fn normalized(mut self) -> Self {
        if self.max_turns == 0 {
            self.max_turns = DEFAULT_MAX_TURNS;
        }
        if self.max_plan_steps == 0 {
            self.max_plan_steps = DEFAULT_MAX_PLAN_STEPS;
        }
        self
    }
}

fn parse_positive_usize(raw: &str) -> Option<usize> {
    raw.trim().parse::<usize>().ok().filter(|value| *value > 0)
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_match_documented_values() {
        let settings = LoopSettings::default();
        assert_eq!(settings.max_turns, 3);
        assert_eq!(settings.max_plan_steps, 5);
        assert_eq!(settings.plan_temperature, 0.3);
        assert_eq!(settings.synthesis_temperature, 0.6);
        assert!(settings.parallel_tool_calls);
        assert_eq!(settings.retry_policy().max_attempts, 2);
    }

    #[test]
    fn env_overrides_ignore_zero_and_garbage() {
        let vars = HashMap::from([
            (MAX_TURNS_ENV, "0"),
            (MAX_PLAN_STEPS_ENV, "8"),
            (PARALLEL_TOOLS_ENV, "off"),
        ]);
        let settings = LoopSettings::default()
            .with_env_overrides(|k| vars.get(k).map(|v| v.to_string()));
        assert_eq!(settings.max_turns, 3);
        assert_eq!(settings.max_plan_steps, 8);
        assert!(!settings.parallel_tool_calls);

        let settings = LoopSettings::default()
            .with_env_overrides(|k| (k == MAX_TURNS_ENV).then(|| "many".to_string()));
        assert_eq!(settings.max_turns, 3);
    }
}
