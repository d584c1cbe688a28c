//! One-shot dispatch of a route: input encoding, HTTP exchange, response
//! classification and output validation.
//!
//! The [`Fetcher`] works on raw JSON and a [`RouteEntry`]; typed wrappers in
//! [`crate::api`] serialize the route's `Input` before calling it and
//! deserialize its `Output` afterwards.

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Response};
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use wavepool_portal_api::{path_parts, Method, PathPart, RouteEntry};

use crate::error::ClientError;

/// Statuses whose body is never read.
const WITHOUT_BODY: [u16; 3] = [204, 205, 304];

/// Per-call options.
#[derive(Debug, Clone, Default)]
pub struct FetchOptions {
    /// Headers merged over the defaults; a caller header replaces the default
    /// of the same name.
    pub headers: HeaderMap,
    /// Aborts the call when cancelled.
    pub cancel: Option<CancellationToken>,
}

impl FetchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Options carrying `Authorization: Bearer <token>`.
    pub fn bearer(token: &str) -> Result<Self, ClientError> {
        Self::new().header(AUTHORIZATION, &format!("Bearer {token}"))
    }

    pub fn header(mut self, name: HeaderName, value: &str) -> Result<Self, ClientError> {
        let value = HeaderValue::from_str(value)
            .map_err(|e| ClientError::InvalidHeader(format!("{name}: {e}")))?;
        self.headers.insert(name, value);
        Ok(self)
    }

    pub fn with_cancel(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }
}

/// Where and what to send, derived from a route and its input.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Plan {
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

/// Fill path placeholders from `input`, then encode what remains as query
/// parameters (GET) or as the JSON body (everything else).
pub(crate) fn plan(entry: &RouteEntry, input: Value) -> Result<Plan, ClientError> {
    let mut fields = match input {
        Value::Null => None,
        Value::Object(map) => Some(map),
        other => {
            if !entry.placeholders().is_empty() {
                return Err(ClientError::InvalidInput {
                    route: entry.key.clone(),
                    reason: "input must be an object to fill path parameters".into(),
                });
            }
            return match entry.key.method {
                Method::Get => Err(ClientError::InvalidInput {
                    route: entry.key.clone(),
                    reason: "query input must be an object".into(),
                }),
                _ => Ok(Plan {
                    path: entry.key.path.clone(),
                    query: Vec::new(),
                    body: Some(other),
                }),
            };
        }
    };

    let mut path = String::with_capacity(entry.key.path.len());
    for part in path_parts(&entry.key.path) {
        match part {
            PathPart::Literal(text) => path.push_str(text),
            PathPart::Placeholder(name) => {
                let value = fields
                    .as_mut()
                    .and_then(|f| f.remove(name))
                    .as_ref()
                    .and_then(scalar)
                    .ok_or_else(|| ClientError::MissingPathParam {
                        route: entry.key.clone(),
                        name: name.to_string(),
                    })?;
                path.push_str(&urlencoding::encode(&value));
            }
        }
    }

    let fields = fields.filter(|f| !f.is_empty());
    match (entry.key.method, fields) {
        (_, None) => Ok(Plan {
            path,
            query: Vec::new(),
            body: None,
        }),
        (Method::Get, Some(fields)) => Ok(Plan {
            path,
            query: query_pairs(entry, fields)?,
            body: None,
        }),
        (_, Some(fields)) => Ok(Plan {
            path,
            query: Vec::new(),
            body: Some(Value::Object(fields)),
        }),
    }
}

fn query_pairs(
    entry: &RouteEntry,
    fields: Map<String, Value>,
) -> Result<Vec<(String, String)>, ClientError> {
    let mut pairs = Vec::new();
    for (key, value) in fields {
        match value {
            Value::Null => {}
            Value::Array(items) => {
                for item in items.iter().filter(|v| !v.is_null()) {
                    let item = scalar(item).ok_or_else(|| nested(entry, &key))?;
                    pairs.push((key.clone(), item));
                }
            }
            other => {
                let item = scalar(&other).ok_or_else(|| nested(entry, &key))?;
                pairs.push((key, item));
            }
        }
    }
    Ok(pairs)
}

fn nested(entry: &RouteEntry, key: &str) -> ClientError {
    ClientError::InvalidInput {
        route: entry.key.clone(),
        reason: format!("query parameter {key:?} cannot hold a nested value"),
    }
}

/// Strings verbatim; numbers and booleans stringified.
fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Sends requests for registry routes against one backend origin.
///
/// Cheap to clone: the inner [`reqwest::Client`] pools connections.
#[derive(Debug, Clone)]
pub struct Fetcher {
    http: Client,
    base: String,
    validate: bool,
}

impl Fetcher {
    /// * `http`: pre-configured `reqwest::Client` (e.g. with a timeout).
    /// * `base`: origin every route path is appended to.
    /// * `validate`: check 2xx payloads against the route's output schema.
    pub fn new(http: Client, base: impl Into<String>, validate: bool) -> Self {
        Self {
            http,
            base: base.into().trim_end_matches('/').to_string(),
            validate,
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    /// Dispatch `entry` with `input` and return the accepted payload.
    pub async fn call(
        &self,
        entry: &RouteEntry,
        input: Value,
        options: &FetchOptions,
    ) -> Result<Value, ClientError> {
        let exchange = self.exchange(entry, input, options);
        match &options.cancel {
            Some(token) => tokio::select! {
                biased;
                _ = token.cancelled() => {
                    debug!(route = %entry.key, "request cancelled");
                    Err(ClientError::Cancelled)
                }
                result = exchange => result,
            },
            None => exchange.await,
        }
    }

    async fn exchange(
        &self,
        entry: &RouteEntry,
        input: Value,
        options: &FetchOptions,
    ) -> Result<Value, ClientError> {
        let plan = plan(entry, input)?;
        let url = format!("{}{}", self.base, plan.path);

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.extend(options.headers.clone());

        let mut request = self
            .http
            .request(http_method(entry.key.method), &url)
            .headers(headers);
        if !plan.query.is_empty() {
            request = request.query(&plan.query);
        }
        if let Some(body) = &plan.body {
            request = request.body(serde_json::to_vec(body).map_err(ClientError::Encode)?);
        }

        debug!(route = %entry.key, %url, "sending request");
        let response = request.send().await?;
        self.receive(entry, response).await
    }

    async fn receive(&self, entry: &RouteEntry, response: Response) -> Result<Value, ClientError> {
        let status = response.status().as_u16();
        debug!(route = %entry.key, status, "response received");
        if WITHOUT_BODY.contains(&status) {
            return Ok(Value::Null);
        }

        let ok = response.status().is_success();
        let body = response.text().await?;
        match serde_json::from_str::<Value>(&body) {
            Ok(payload) if ok => self.validate(entry, payload),
            Ok(payload) => Err(api_error(status, payload)),
            Err(_) if ok => {
                let raw = Value::String(body);
                // only a bare-string output schema can accept plain text
                match &entry.output {
                    Some(schema) if schema.assert(&raw).is_ok() => Ok(raw),
                    _ => Err(ClientError::Body {
                        status,
                        body: into_string(raw),
                    }),
                }
            }
            Err(_) => Err(ClientError::Body { status, body }),
        }
    }

    fn validate(&self, entry: &RouteEntry, payload: Value) -> Result<Value, ClientError> {
        let Some(schema) = entry.output.as_ref().filter(|_| self.validate) else {
            return Ok(payload);
        };
        if let Err(source) = schema.assert(&payload) {
            let failures = schema.report(&payload);
            for failure in &failures {
                warn!(route = %entry.key, "response mismatch: {failure}");
            }
            return Err(ClientError::Contract {
                route: entry.key.clone(),
                source,
                failures,
            });
        }
        Ok(payload)
    }
}

// --- helpers ---

fn http_method(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Post => reqwest::Method::POST,
        Method::Put => reqwest::Method::PUT,
        Method::Patch => reqwest::Method::PATCH,
        Method::Delete => reqwest::Method::DELETE,
    }
}

/// Split an error payload into its `message` and the remaining fields.
fn api_error(status: u16, payload: Value) -> ClientError {
    let fallback = || format!("request failed with status {status}");
    let (message, data) = match payload {
        Value::Object(mut map) => {
            let message = match map.remove("message") {
                Some(Value::String(m)) => m,
                Some(other) => {
                    map.insert("message".into(), other);
                    fallback()
                }
                None => fallback(),
            };
            (message, map)
        }
        Value::String(m) if !m.is_empty() => (m, Map::new()),
        _ => (fallback(), Map::new()),
    };
    ClientError::Api {
        status,
        message,
        data,
    }
}

fn into_string(value: Value) -> String {
    match value {
        Value::String(s) => s,
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wavepool_portal_api::{registry, GetMe, ListApiKeys, Login, RevokeApiKey, Route};

    fn entry<R: Route>() -> RouteEntry {
        registry().entry::<R>().unwrap().clone()
    }

    #[test]
    fn post_input_becomes_body() {
        let p = plan(&entry::<Login>(), json!({ "phone": "1", "pin": "2" })).unwrap();
        assert_eq!(p.path, "/api/v1/auth");
        assert!(p.query.is_empty());
        assert_eq!(p.body, Some(json!({ "phone": "1", "pin": "2" })));
    }

    #[test]
    fn placeholder_filled_and_removed() {
        let p = plan(&entry::<RevokeApiKey>(), json!({ "key_id": "k 1/x" })).unwrap();
        assert_eq!(p.path, "/api/v1/api-keys/k%201%2Fx");
        assert_eq!(p.body, None);
    }

    #[test]
    fn missing_placeholder() {
        let err = plan(&entry::<RevokeApiKey>(), json!({})).unwrap_err();
        assert!(matches!(err, ClientError::MissingPathParam { ref name, .. } if name == "key_id"));
        let err = plan(&entry::<RevokeApiKey>(), Value::Null).unwrap_err();
        assert!(matches!(err, ClientError::MissingPathParam { .. }));
    }

    #[test]
    fn expansion_fills_exactly_the_declared_placeholders() {
        for entry in registry().iter() {
            let names = entry.placeholders();
            let input: Map<String, Value> =
                names.iter().map(|n| (n.to_string(), json!("v"))).collect();
            let p = plan(entry, Value::Object(input)).unwrap();
            let expected = names
                .iter()
                .fold(entry.key.path.clone(), |path, n| path.replace(&format!("{{{n}}}"), "v"));
            assert_eq!(p.path, expected, "{}", entry.key);
            assert!(!p.path.contains('{'), "{}", entry.key);
        }
    }

    #[test]
    fn get_input_becomes_query() {
        let p = plan(
            &entry::<ListApiKeys>(),
            json!({ "env": "prod", "limit": 10, "active": true, "skip": null, "scope": ["a", "b"] }),
        )
        .unwrap();
        assert_eq!(p.body, None);
        let mut q = p.query.clone();
        q.sort();
        assert_eq!(
            q,
            [
                ("active".to_string(), "true".to_string()),
                ("env".into(), "prod".into()),
                ("limit".into(), "10".into()),
                ("scope".into(), "a".into()),
                ("scope".into(), "b".into()),
            ]
        );
    }

    #[test]
    fn get_rejects_nested_objects() {
        let err = plan(&entry::<GetMe>(), json!({ "filter": { "a": 1 } })).unwrap_err();
        assert!(matches!(err, ClientError::InvalidInput { .. }));
    }

    #[test]
    fn null_input_sends_nothing() {
        let p = plan(&entry::<GetMe>(), Value::Null).unwrap();
        assert_eq!(
            p,
            Plan {
                path: "/api/v1/me".into(),
                query: vec![],
                body: None
            }
        );
    }

    #[test]
    fn error_payload_split() {
        let err = api_error(400, json!({ "message": "invalid pin", "code": "bad_pin" }));
        match err {
            ClientError::Api {
                status,
                message,
                data,
            } => {
                assert_eq!(status, 400);
                assert_eq!(message, "invalid pin");
                assert_eq!(data.get("code"), Some(&json!("bad_pin")));
                assert!(!data.contains_key("message"));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(
            api_error(500, json!({})).to_string(),
            "request failed with status 500 (HTTP 500)"
        );
    }

    #[test]
    fn bearer_header() {
        let opts = FetchOptions::bearer("abc").unwrap();
        assert_eq!(opts.headers[AUTHORIZATION], "Bearer abc");
        assert!(FetchOptions::bearer("bad\ntoken").is_err());
    }
}
