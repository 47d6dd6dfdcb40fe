//! Key/value fields attached to errors

use std::fmt;

use serde::Serialize;
use serde_json::Value;

/// One key/value pair.
///
/// Errors keep fields in a `Vec`, not a map: insertion order and repeated
/// keys are both observable.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Field {
    pub key: String,
    pub value: Value,
}

impl Field {
    pub fn new(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Same key, value replaced by `replacement`
    pub(crate) fn redacted(&self, replacement: &str) -> Self {
        Self {
            key: self.key.clone(),
            value: Value::String(replacement.to_string()),
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            // Strings print bare, everything else as JSON
            Value::String(s) => write!(f, "{}: {}", self.key, s),
            other => write!(f, "{}: {}", self.key, other),
        }
    }
}

impl<K, V> From<(K, V)> for Field
where
    K: Into<String>,
    V: Into<Value>,
{
    fn from((key, value): (K, V)) -> Self {
        Field::new(key, value)
    }
}
