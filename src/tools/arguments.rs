//! Typed access to tool call arguments.

use serde_json::{Map, Value};

use crate::error::TetherError;

/// Wrapper around a tool call's argument object providing typed extraction.
#[derive(Debug, Clone, Default)]
pub struct ToolArguments {
    values: Map<String, Value>,
}

impl ToolArguments {
    pub fn new(values: Map<String, Value>) -> Self {
        Self { values }
    }

    /// Build from a JSON value; anything but an object is an argument-shape error.
    pub fn from_value(value: Value) -> Result<Self, TetherError> {
        match value {
            Value::Object(values) => Ok(Self { values }),
            Value::Null => Ok(Self::default()),
            other => Err(TetherError::InvalidArgument(format!(
                "expected an argument object, got {other}"
            ))),
        }
    }

    /// The raw argument object.
    pub fn raw(&self) -> &Map<String, Value> {
        &self.values
    }

    /// The arguments as a JSON value.
    pub fn to_value(&self) -> Value {
        Value::Object(self.values.clone())
    }

    /// Get a string argument by key.
    pub fn get_str(&self, key: &str) -> Result<&str, TetherError> {
        self.values
            .get(key)
            .and_then(|v| v.as_str())
            .ok_or_else(|| TetherError::InvalidArgument(format!("Missing string argument: {key}")))
    }

    /// Get an optional string argument.
    pub fn get_str_opt(&self, key: &str) -> Option<&str> {
        self.values.get(key).and_then(|v| v.as_str())
    }

    /// Get an integer argument.
    pub fn get_i64(&self, key: &str) -> Result<i64, TetherError> {
        self.values
            .get(key)
            .and_then(|v| v.as_i64())
            .ok_or_else(|| TetherError::InvalidArgument(format!("Missing integer argument: {key}")))
    }

    /// Get a float argument.
    pub fn get_f64(&self, key: &str) -> Result<f64, TetherError> {
        self.values
            .get(key)
            .and_then(|v| v.as_f64())
            .ok_or_else(|| TetherError::InvalidArgument(format!("Missing float argument: {key}")))
    }

    /// Get a boolean argument.
    pub fn get_bool(&self, key: &str) -> Result<bool, TetherError> {
        self.values
            .get(key)
            .and_then(|v| v.as_bool())
            .ok_or_else(|| TetherError::InvalidArgument(format!("Missing boolean argument: {key}")))
    }

    /// Deserialize the whole argument object into a typed struct.
    pub fn deserialize<T: serde::de::DeserializeOwned>(&self) -> Result<T, TetherError> {
        serde_json::from_value(self.to_value()).map_err(|e| {
            TetherError::InvalidArgument(format!("Failed to deserialize arguments: {e}"))
        })
    }
}
