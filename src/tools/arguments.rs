//! Typed accessors over JSON tool arguments.

use serde::de::DeserializeOwned;

use crate::error::{ColloquyError, Result};

/// Arguments passed to a tool invocation, as sent by the model.
#[derive(Debug, Clone)]
pub struct ToolArguments {
    value: serde_json::Value,
}

impl ToolArguments {
    pub fn new(value: serde_json::Value) -> Self {
        Self { value }
    }

    /// The raw JSON value.
    pub fn raw(&self) -> &serde_json::Value {
        &self.value
    }

    /// Get a required string field.
    pub fn get_str(&self, key: &str) -> Result<&str> {
        self.value
            .get(key)
            .and_then(|v| v.as_str())
            .ok_or_else(|| ColloquyError::InvalidArgument(format!("missing string field {key:?}")))
    }

    /// Get an optional string field.
    pub fn get_str_opt(&self, key: &str) -> Option<&str> {
        self.value.get(key).and_then(|v| v.as_str())
    }

    /// Get a required integer field.
    pub fn get_i64(&self, key: &str) -> Result<i64> {
        self.value
            .get(key)
            .and_then(|v| v.as_i64())
            .ok_or_else(|| ColloquyError::InvalidArgument(format!("missing integer field {key:?}")))
    }

    /// Get a required number field.
    pub fn get_f64(&self, key: &str) -> Result<f64> {
        self.value
            .get(key)
            .and_then(|v| v.as_f64())
            .ok_or_else(|| ColloquyError::InvalidArgument(format!("missing number field {key:?}")))
    }

    /// Get a required boolean field.
    pub fn get_bool(&self, key: &str) -> Result<bool> {
        self.value
            .get(key)
            .and_then(|v| v.as_bool())
            .ok_or_else(|| ColloquyError::InvalidArgument(format!("missing boolean field {key:?}")))
    }

    /// Deserialize the full argument object into a typed struct.
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_value(self.value.clone())?)
    }
}

impl std::fmt::Display for ToolArguments {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.value)
    }
}
