//! Error type for every client call.

use serde_json::{Map, Value};
use wavepool_portal_api::RouteKey;
use wavepool_schema::{AssertionError, Failure};

/// Everything that can go wrong between building a request and handing the
/// decoded payload back to the caller.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The request never produced a response (connection refused, DNS, TLS).
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The server answered with a non-2xx status and a JSON body.
    /// `message` comes from the body's `message` field; every other field
    /// is kept in `data`.
    #[error("{message} (HTTP {status})")]
    Api {
        status: u16,
        message: String,
        data: Map<String, Value>,
    },

    /// The body was not JSON and could not be accepted as-is.
    #[error("unexpected response body (HTTP {status}): {body}")]
    Body { status: u16, body: String },

    /// A successful payload did not match the route's output schema.
    #[error("response from {route} does not match its schema: {source}")]
    Contract {
        route: RouteKey,
        #[source]
        source: AssertionError,
        failures: Vec<Failure>,
    },

    /// The call was aborted through its cancellation token.
    #[error("request cancelled")]
    Cancelled,

    #[error("missing path parameter {name:?} for {route}")]
    MissingPathParam { route: RouteKey, name: String },

    #[error("invalid input for {route}: {reason}")]
    InvalidInput { route: RouteKey, reason: String },

    #[error("invalid header: {0}")]
    InvalidHeader(String),

    #[error("could not encode request: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("could not decode response from {route}: {source}")]
    Decode {
        route: RouteKey,
        #[source]
        source: serde_json::Error,
    },

    #[error("unknown route: {0}")]
    UnknownRoute(String),
}

impl ClientError {
    /// HTTP status of an `Api` or `Body` error.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Api { status, .. } | ClientError::Body { status, .. } => Some(*status),
            ClientError::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ClientError::Api { status: 401, .. })
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, ClientError::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_display_and_status() {
        let err = ClientError::Api {
            status: 401,
            message: "token expired".into(),
            data: Map::new(),
        };
        assert_eq!(err.to_string(), "token expired (HTTP 401)");
        assert_eq!(err.status(), Some(401));
        assert!(err.is_unauthorized());
        assert!(!ClientError::Cancelled.is_unauthorized());
    }
}
