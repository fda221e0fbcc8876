//! Wire envelopes.
//!
//! One JSON value per line in each direction. A request names a task, carries
//! an opaque input payload and the sender's client id. A response is tagged by
//! `status` and carries either `result` or `error`, never both.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Sent when a line does not decode as a [`Request`].
pub const INVALID_JSON: &str = "Invalid JSON";
/// Sent when a well-formed request cannot be dispatched.
pub const INTERNAL_ERROR: &str = "Internal server error";
/// Sent when a line exceeds the configured maximum message size.
pub const MESSAGE_TOO_LARGE: &str = "Message too large";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Request {
    /// Registered task number. Missing decodes as 0, which no task claims.
    #[serde(default)]
    pub task: i64,
    /// Payload whose shape depends on the task
    #[serde(default)]
    pub input: Value,
    #[serde(default)]
    pub client_id: i64,
}

impl Request {
    pub fn new(task: i64, input: Value) -> Self {
        Self {
            task,
            input,
            client_id: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Response {
    Success { result: Value },
    Error { error: String },
}

impl Response {
    pub fn success(result: Value) -> Self {
        Self::Success { result }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            error: message.into(),
        }
    }

    pub fn invalid_json() -> Self {
        Self::error(INVALID_JSON)
    }

    pub fn internal_error() -> Self {
        Self::error(INTERNAL_ERROR)
    }

    pub fn message_too_large() -> Self {
        Self::error(MESSAGE_TOO_LARGE)
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Encode as a single newline-terminated line.
    pub fn to_line(&self) -> serde_json::Result<String> {
        let mut line = serde_json::to_string(self)?;
        line.push('\n');
        Ok(line)
    }
}
