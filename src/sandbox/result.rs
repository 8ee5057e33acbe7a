//! Uniform result record returned by every shell, process and file operation.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Outcome of a sandbox operation.
///
/// This is also the envelope the sandbox servers answer with, so a
/// successful response body deserializes straight into it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    /// Whether the operation succeeded.
    pub success: bool,
    /// Human-readable detail, usually populated on failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Operation payload.
    #[serde(default)]
    pub data: Option<Value>,
}

impl ToolResult {
    /// A successful result carrying `data`.
    #[cfg(test)]
    pub fn ok(data: impl Into<Value>) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(data.into()),
        }
    }

    /// A failed result with a descriptive message and no payload.
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            data: None,
        }
    }

    /// Maps the native shell shape `{output, error}` onto a result.
    ///
    /// The native endpoint reports command errors in-band, so the call
    /// itself counts as a success; `error` is kept as the message.
    pub(crate) fn from_shell_output(body: &Value) -> Self {
        let output = body.get("output").cloned().unwrap_or(Value::String(String::new()));
        let message = body
            .get("error")
            .and_then(Value::as_str)
            .filter(|e| !e.is_empty())
            .map(str::to_string);
        Self {
            success: true,
            message,
            data: Some(output),
        }
    }
}
