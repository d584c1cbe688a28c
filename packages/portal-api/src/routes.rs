//! The route registry: every endpoint the portal talks to, keyed by
//! `METHOD + path`.
//!
//! Each route is a zero-sized marker implementing [`Route`], which ties the
//! method and path template to the Rust input/output types and to the
//! schemas that validate them at runtime. [`registry()`] exposes the same
//! declarations as data, for lookup by key and for documentation.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use wavepool_schema::{Described, Schema};

use crate::api_key::{ApiKeyId, ApiKeyList, CreateApiKeyRequest, CreatedApiKey};
use crate::auth::{AuthOutcome, Credentials, LogoutRequest, RefreshRequest, TokenPair};
use crate::checkout::CheckoutSessionList;
use crate::user::Me;
use crate::webhook::{CreateWebhookRequest, UpdateWebhookRequest, Webhook, WebhookId, WebhookList};

/// Output type of routes that declare no response body. Decodes from any
/// JSON value, `null` included.
pub type NoContent = serde::de::IgnoredAny;

/// HTTP method of a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = RouteKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [Method::Get, Method::Post, Method::Put, Method::Patch, Method::Delete]
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| RouteKeyError::UnknownMethod(s.to_string()))
    }
}

/// Why a string could not be parsed as a [`RouteKey`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RouteKeyError {
    #[error("unknown HTTP method: {0:?}")]
    UnknownMethod(String),

    #[error("route key has no path: {0:?}")]
    MissingPath(String),
}

/// Identity of a route: method plus path template.
///
/// Displays as `"POST /api/v1/auth"`. Parsing also accepts the compact
/// `"POST/api/v1/auth"` form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RouteKey {
    pub method: Method,
    pub path: String,
}

impl RouteKey {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
        }
    }
}

impl fmt::Display for RouteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.path)
    }
}

impl FromStr for RouteKey {
    type Err = RouteKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let slash = s
            .find('/')
            .ok_or_else(|| RouteKeyError::MissingPath(s.to_string()))?;
        let method = s[..slash].trim().parse()?;
        Ok(RouteKey::new(method, s[slash..].trim()))
    }
}

/// A route declaration as data.
#[derive(Debug, Clone)]
pub struct RouteEntry {
    pub key: RouteKey,
    pub input: Option<Schema>,
    pub output: Option<Schema>,
    pub description: &'static str,
}

impl RouteEntry {
    /// Names of the `{placeholder}` segments in the path template, in order.
    pub fn placeholders(&self) -> Vec<&str> {
        placeholders(&self.key.path)
    }

    /// JSON documentation of this route, used by `wavepool routes --json`.
    pub fn to_document(&self) -> Value {
        json!({
            "method": self.key.method.as_str(),
            "path": self.key.path,
            "description": self.description,
            "input": self.input.as_ref().map(Schema::to_document),
            "output": self.output.as_ref().map(Schema::to_document),
        })
    }
}

/// One piece of a path template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathPart<'a> {
    Literal(&'a str),
    /// A `{name}` placeholder, braces stripped.
    Placeholder(&'a str),
}

/// Split a path template into literal text and `{name}` placeholders.
///
/// An unclosed `{` is literal text.
pub fn path_parts(template: &str) -> Vec<PathPart<'_>> {
    let mut parts = Vec::new();
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        let after = &rest[open + 1..];
        let Some(close) = after.find('}') else {
            break;
        };
        if open > 0 {
            parts.push(PathPart::Literal(&rest[..open]));
        }
        parts.push(PathPart::Placeholder(&after[..close]));
        rest = &after[close + 1..];
    }
    if !rest.is_empty() {
        parts.push(PathPart::Literal(rest));
    }
    parts
}

/// Names of the `{name}` placeholders in a path template, in order.
pub fn placeholders(template: &str) -> Vec<&str> {
    path_parts(template)
        .into_iter()
        .filter_map(|part| match part {
            PathPart::Placeholder(name) => Some(name),
            PathPart::Literal(_) => None,
        })
        .collect()
}

/// A typed route.
pub trait Route: Send + Sync + 'static {
    const METHOD: Method;
    /// Path template, possibly containing `{name}` placeholders.
    const PATH: &'static str;
    const DESCRIPTION: &'static str;

    /// Request payload. `()` means the route takes no input.
    type Input: Serialize + Send + Sync + 'static;
    /// Decoded response payload.
    type Output: DeserializeOwned + Clone + fmt::Debug + Send + Sync + 'static;

    fn input_schema() -> Option<Schema>;
    fn output_schema() -> Option<Schema>;

    fn key() -> RouteKey {
        RouteKey::new(Self::METHOD, Self::PATH)
    }

    fn entry() -> RouteEntry {
        RouteEntry {
            key: Self::key(),
            input: Self::input_schema(),
            output: Self::output_schema(),
            description: Self::DESCRIPTION,
        }
    }
}

macro_rules! declared {
    (()) => {
        None
    };
    (NoContent) => {
        None
    };
    ($t:tt) => {
        Some(<$t as Described>::schema())
    };
}

macro_rules! route {
    (
        $(#[$meta:meta])*
        $name:ident: $method:ident $path:literal, $input:tt => $output:tt, $desc:literal
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Default)]
        pub struct $name;

        impl Route for $name {
            const METHOD: Method = Method::$method;
            const PATH: &'static str = $path;
            const DESCRIPTION: &'static str = $desc;

            type Input = $input;
            type Output = $output;

            fn input_schema() -> Option<Schema> {
                declared!($input)
            }

            fn output_schema() -> Option<Schema> {
                declared!($output)
            }
        }
    };
}

route! { Health: Get "/api/health", () => String, "Health check endpoint" }
route! { Login: Post "/api/v1/auth", Credentials => AuthOutcome, "Authenticate user with phone and pin" }
route! { GetMe: Get "/api/v1/me", () => Me, "Get current user information" }
route! { Refresh: Post "/api/v1/auth/refresh", RefreshRequest => TokenPair, "Refresh access token" }
route! { Logout: Delete "/api/v1/auth/logout", LogoutRequest => String, "Logout and revoke refresh token" }
route! { CreateApiKey: Post "/api/v1/api-keys", CreateApiKeyRequest => CreatedApiKey, "Create a new API key" }
route! { ListApiKeys: Get "/api/v1/api-keys", () => ApiKeyList, "List all API keys for the user" }
route! { RevokeApiKey: Delete "/api/v1/api-keys/{key_id}", ApiKeyId => NoContent, "Revoke an API key" }
route! { ListWebhooks: Get "/api/v1/webhooks", () => WebhookList, "List webhooks of the user's business" }
route! { CreateWebhook: Post "/api/v1/webhooks", CreateWebhookRequest => Webhook, "Register a webhook" }
route! { UpdateWebhook: Put "/api/v1/webhooks/{webhook_id}", UpdateWebhookRequest => Webhook, "Update a webhook" }
route! { DeleteWebhook: Delete "/api/v1/webhooks/{webhook_id}", WebhookId => NoContent, "Delete a webhook" }
route! { ListCheckoutSessions: Get "/api/v1/portal/checkout-sessions", () => CheckoutSessionList, "List recent checkout sessions" }

/// Read-only table of every declared route.
#[derive(Debug)]
pub struct Registry {
    routes: BTreeMap<RouteKey, RouteEntry>,
}

impl Registry {
    fn build() -> Self {
        let entries = [
            Health::entry(),
            Login::entry(),
            GetMe::entry(),
            Refresh::entry(),
            Logout::entry(),
            CreateApiKey::entry(),
            ListApiKeys::entry(),
            RevokeApiKey::entry(),
            ListWebhooks::entry(),
            CreateWebhook::entry(),
            UpdateWebhook::entry(),
            DeleteWebhook::entry(),
            ListCheckoutSessions::entry(),
        ];
        let mut routes = BTreeMap::new();
        for entry in entries {
            routes.entry(entry.key.clone()).or_insert(entry);
        }
        Self { routes }
    }

    /// Exact-key lookup.
    pub fn get(&self, key: &RouteKey) -> Option<&RouteEntry> {
        self.routes.get(key)
    }

    /// Parse `key` (e.g. `"GET /api/v1/me"`) and look it up.
    pub fn lookup(&self, key: &str) -> Option<&RouteEntry> {
        self.get(&key.parse().ok()?)
    }

    /// The entry registered for the typed route `R`, if any.
    pub fn entry<R: Route>(&self) -> Option<&RouteEntry> {
        self.get(&R::key())
    }

    pub fn iter(&self) -> impl Iterator<Item = &RouteEntry> {
        self.routes.values()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::build);

/// The process-wide registry, built on first access.
pub fn registry() -> &'static Registry {
    &REGISTRY
}

#[cfg(test)]
mod tests {
    use super::*;
    use wavepool_schema::Kind;

    #[test]
    fn key_parses_both_forms() {
        let spaced: RouteKey = "POST /api/v1/auth".parse().unwrap();
        let compact: RouteKey = "POST/api/v1/auth".parse().unwrap();
        assert_eq!(spaced, compact);
        assert_eq!(spaced.to_string(), "POST /api/v1/auth");
        assert_eq!(spaced, Login::key());
    }

    #[test]
    fn key_parse_errors() {
        assert_eq!(
            "FETCH /x".parse::<RouteKey>(),
            Err(RouteKeyError::UnknownMethod("FETCH".into()))
        );
        assert!(matches!(
            "GET".parse::<RouteKey>(),
            Err(RouteKeyError::MissingPath(_))
        ));
    }

    #[test]
    fn key_errors_display_the_input() {
        let unknown = "FETCH /x".parse::<RouteKey>().unwrap_err();
        assert_eq!(unknown.to_string(), r#"unknown HTTP method: "FETCH""#);
        let missing = "GET".parse::<RouteKey>().unwrap_err();
        assert_eq!(missing.to_string(), r#"route key has no path: "GET""#);
        let boxed: Box<dyn std::error::Error> = Box::new(missing);
        assert!(boxed.source().is_none());
    }

    #[test]
    fn registry_holds_every_route() {
        let reg = registry();
        assert_eq!(reg.len(), 13);
        assert!(reg.lookup("GET /api/v1/me").is_some());
        assert!(reg.lookup("GET /api/v1/you").is_none());
        // exact match only: templates are not patterns
        assert!(reg.lookup("DELETE /api/v1/api-keys/k_1").is_none());
        assert!(reg.lookup("DELETE /api/v1/api-keys/{key_id}").is_some());
    }

    #[test]
    fn entries_mirror_route_types() {
        let login = registry().entry::<Login>().unwrap();
        assert_eq!(login.description, "Authenticate user with phone and pin");
        assert_eq!(login.output.as_ref().unwrap().kind(), Kind::Union);

        let revoke = registry().entry::<RevokeApiKey>().unwrap();
        assert!(revoke.output.is_none());
        assert_eq!(revoke.placeholders(), ["key_id"]);

        let health = registry().entry::<Health>().unwrap();
        assert!(health.input.is_none());
        assert_eq!(health.output.as_ref().unwrap().kind(), Kind::String);
    }

    #[test]
    fn placeholder_scan() {
        assert_eq!(placeholders("/a/{x}/b/{y}"), ["x", "y"]);
        assert!(placeholders("/a/b").is_empty());
        assert!(placeholders("/a/{broken").is_empty());
    }

    #[test]
    fn path_parts_keep_literals_around_placeholders() {
        assert_eq!(
            path_parts("/api/v1/webhooks/{webhook_id}/events"),
            [
                PathPart::Literal("/api/v1/webhooks/"),
                PathPart::Placeholder("webhook_id"),
                PathPart::Literal("/events"),
            ]
        );
        assert_eq!(path_parts("/a/{broken"), [PathPart::Literal("/a/{broken")]);
        assert_eq!(path_parts("{x}{y}"), [PathPart::Placeholder("x"), PathPart::Placeholder("y")]);
    }

    #[test]
    fn document_has_method_and_schemas() {
        let doc = registry().entry::<CreateApiKey>().unwrap().to_document();
        assert_eq!(doc["method"], "POST");
        assert_eq!(doc["input"]["properties"]["scopes"]["type"], "array");
        assert_eq!(doc["output"]["description"], "response body");
    }

    #[test]
    fn no_content_accepts_anything() {
        let _: NoContent = serde_json::from_value(Value::Null).unwrap();
        let _: NoContent = serde_json::from_value(json!({ "ok": true })).unwrap();
    }
}
