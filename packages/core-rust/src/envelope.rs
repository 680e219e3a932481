//! The JSON object wrapping every action response, success or failure.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{Map, Value};

/// The `error` member of a failed response.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorRecord {
    /// Stable taxonomy label, e.g. `"Not Found Error"`.
    #[serde(rename = "__type")]
    pub error_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Additional members (echoed call data, per-field validation messages).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ErrorRecord {
    pub fn new(error_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error_type: error_type.into(),
            message: Some(message.into()),
            extra: Map::new(),
        }
    }

    /// A record carrying only the label; members are added with [`Self::with_extra`].
    pub fn bare(error_type: impl Into<String>) -> Self {
        Self {
            error_type: error_type.into(),
            message: None,
            extra: Map::new(),
        }
    }

    #[must_use]
    pub fn with_extra(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }
}

/// Top-level response object.
///
/// `help` is absent only when the action name could not be resolved.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResponseEnvelope {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub help: Option<String>,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub changed_entities: Option<BTreeMap<String, Vec<String>>>,
}

impl ResponseEnvelope {
    #[must_use]
    pub fn success(help: Option<String>, result: Value) -> Self {
        Self {
            help,
            success: true,
            result: Some(result),
            error: None,
            changed_entities: None,
        }
    }

    #[must_use]
    pub fn failure(help: Option<String>, error: ErrorRecord) -> Self {
        Self {
            help,
            success: false,
            result: None,
            error: Some(error),
            changed_entities: None,
        }
    }

    #[must_use]
    pub fn with_changed_entities(mut self, changed: BTreeMap<String, Vec<String>>) -> Self {
        self.changed_entities = Some(changed);
        self
    }

    /// Renders the envelope as a JSON value.
    #[must_use]
    pub fn to_json(&self) -> Value {
        // Every member is a string, bool, map or JSON value: serialization cannot fail.
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}
