//! Error body returned by the portal backend.

use serde::{Deserialize, Serialize};

/// The JSON body of a failed request.
///
/// ```json
/// { "message": "invalid pin", "code": "invalid_credentials" }
/// ```
///
/// Only `message` is guaranteed; every other field is passed through to the
/// caller as error data.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorResponse {
    /// Human-readable description of the problem.
    pub message: String,

    /// Machine-readable error code, when the backend provides one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }
}
