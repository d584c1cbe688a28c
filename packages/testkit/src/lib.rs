//! Shared helpers for the Wave Pool end-to-end test suite.
//!
//! Provides [`spawn_portal`], which binds a `TcpListener` on an ephemeral
//! port and serves an in-process mock of the portal backend, and
//! [`spawn_router`] for tests that need a scripted server instead.
//!
//! The mock knows one account ([`PHONE`] / [`PIN`]) and keeps API keys,
//! webhooks and checkout sessions in memory. Any request may carry an
//! `x-delay-ms` header to hold the response back, which lets tests keep a
//! call in flight for as long as they need.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use axum::extract::{Path, Request, State};
use axum::http::{header::AUTHORIZATION, HeaderMap, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use serde::Deserialize;
use uuid::Uuid;
use wavepool_client::ClientConfig;
use wavepool_portal_api::{
    ApiKeySummary, AuthOutcome, Business, CheckoutSession, CheckoutSessionList,
    CreateApiKeyRequest, CreateWebhookRequest, CreatedApiKey, Credentials, ErrorResponse,
    LogoutRequest, Me, RefreshRequest, SigningStrategy, TokenPair, Webhook, WebhookEvent,
    WebhookStatus,
};

/// Phone number of the mock account.
pub const PHONE: &str = "+221700000000";
pub const PIN: &str = "1234";
/// An account the mock answers with a bare message instead of tokens.
pub const LOCKED_PHONE: &str = "+221700000009";

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

#[derive(Default)]
struct Inner {
    access: HashSet<String>,
    refresh: HashSet<String>,
    api_keys: Vec<ApiKeySummary>,
    webhooks: Vec<Webhook>,
    sessions: Vec<CheckoutSession>,
}

/// Backend state shared between the mock server and the test.
pub struct PortalState {
    inner: RwLock<Inner>,
    refresh_calls: AtomicUsize,
    token_ttl: AtomicU64,
    refresh_delay_ms: AtomicU64,
}

impl Default for PortalState {
    fn default() -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
            refresh_calls: AtomicUsize::new(0),
            token_ttl: AtomicU64::new(3600),
            refresh_delay_ms: AtomicU64::new(0),
        }
    }
}

impl PortalState {
    pub fn new() -> Self {
        Self::default()
    }

    /// The profile returned by `GET /api/v1/me`.
    pub fn me() -> Me {
        Me {
            id: "usr_1".into(),
            phone: PHONE.into(),
            created_at: "2026-01-01T00:00:00Z".into(),
            business: Business {
                id: "biz_1".into(),
                name: "Dakar Surf Shop".into(),
                country: "SN".into(),
                currency: "XOF".into(),
            },
        }
    }

    /// How many refresh requests reached the server.
    pub fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    /// `expires_in` of the tokens issued from now on.
    pub fn set_token_ttl(&self, secs: u64) {
        self.token_ttl.store(secs, Ordering::SeqCst);
    }

    pub fn set_refresh_delay(&self, delay: Duration) {
        self.refresh_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    /// Invalidate every access token, as if they had expired server-side.
    pub fn revoke_access_tokens(&self) {
        self.write().access.clear();
    }

    pub fn seed_sessions(&self, sessions: Vec<CheckoutSession>) {
        self.write().sessions = sessions;
    }

    pub fn api_keys(&self) -> Vec<ApiKeySummary> {
        self.read().api_keys.clone()
    }

    pub fn webhooks(&self) -> Vec<Webhook> {
        self.read().webhooks.clone()
    }

    fn issue(&self) -> TokenPair {
        let pair = TokenPair {
            access_token: format!("at_{}", Uuid::now_v7().simple()),
            refresh_token: format!("rt_{}", Uuid::now_v7().simple()),
            expires_in: self.token_ttl.load(Ordering::SeqCst),
        };
        let mut inner = self.write();
        inner.access.insert(pair.access_token.clone());
        inner.refresh.insert(pair.refresh_token.clone());
        pair
    }

    fn authorize(&self, headers: &HeaderMap) -> Result<(), MockError> {
        let token = headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .ok_or(MockError::Unauthorized("missing bearer token"))?;
        if self.read().access.contains(token) {
            Ok(())
        } else {
            Err(MockError::Unauthorized("invalid or expired token"))
        }
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug)]
enum MockError {
    BadRequest(&'static str),
    Unauthorized(&'static str),
    NotFound(&'static str),
}

impl IntoResponse for MockError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            MockError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "invalid_parameter", msg),
            MockError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "unauthorized", msg),
            MockError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg),
        };
        (status, Json(ErrorResponse::new(message).with_code(code))).into_response()
    }
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// The mock backend's routes over `state`.
pub fn build_router(state: Arc<PortalState>) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/v1/auth", post(login))
        .route("/api/v1/me", get(me))
        .route("/api/v1/auth/refresh", post(refresh))
        .route("/api/v1/auth/logout", delete(logout))
        .route("/api/v1/api-keys", get(list_api_keys).post(create_api_key))
        .route("/api/v1/api-keys/{key_id}", delete(revoke_api_key))
        .route("/api/v1/webhooks", get(list_webhooks).post(create_webhook))
        .route(
            "/api/v1/webhooks/{webhook_id}",
            put(update_webhook).delete(delete_webhook),
        )
        .route("/api/v1/portal/checkout-sessions", get(list_checkout_sessions))
        .layer(middleware::from_fn(delay))
        .with_state(state)
}

/// Start the mock backend and return `(base_url, state)`.
///
/// # Panics
///
/// Panics if the TCP listener cannot be bound.
pub async fn spawn_portal() -> (String, Arc<PortalState>) {
    let state = Arc::new(PortalState::new());
    let base_url = spawn_router(build_router(Arc::clone(&state))).await;
    (base_url, state)
}

/// Serve `router` on an OS-assigned port on `127.0.0.1` and return its base
/// URL, e.g. `http://127.0.0.1:51234`.
///
/// # Panics
///
/// Panics if the TCP listener cannot be bound.
pub async fn spawn_router(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let addr = listener.local_addr().expect("get local addr");
    tokio::spawn(async move {
        axum::serve(listener, router)
            .await
            .expect("mock portal error");
    });
    format!("http://{addr}")
}

/// Client configuration pointing at `base_url`.
pub fn config(base_url: &str) -> ClientConfig {
    ClientConfig::new(base_url)
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn delay(request: Request, next: Next) -> Response {
    let ms = request
        .headers()
        .get("x-delay-ms")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok());
    if let Some(ms) = ms {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }
    next.run(request).await
}

async fn health() -> &'static str {
    "ok"
}

async fn login(
    State(state): State<Arc<PortalState>>,
    Json(credentials): Json<Credentials>,
) -> Result<Json<AuthOutcome>, MockError> {
    if credentials.phone == LOCKED_PHONE {
        return Ok(Json(AuthOutcome::Message("account locked".into())));
    }
    if credentials.phone != PHONE || credentials.pin != PIN {
        return Err(MockError::BadRequest("invalid pin"));
    }
    Ok(Json(AuthOutcome::Tokens(state.issue())))
}

async fn me(
    State(state): State<Arc<PortalState>>,
    headers: HeaderMap,
) -> Result<Json<Me>, MockError> {
    state.authorize(&headers)?;
    Ok(Json(PortalState::me()))
}

async fn refresh(
    State(state): State<Arc<PortalState>>,
    Json(body): Json<RefreshRequest>,
) -> Result<Json<TokenPair>, MockError> {
    state.refresh_calls.fetch_add(1, Ordering::SeqCst);
    let delay = state.refresh_delay_ms.load(Ordering::SeqCst);
    if delay > 0 {
        tokio::time::sleep(Duration::from_millis(delay)).await;
    }
    // refresh tokens are single use
    if !state.write().refresh.remove(&body.refresh_token) {
        return Err(MockError::Unauthorized("invalid refresh token"));
    }
    Ok(Json(state.issue()))
}

async fn logout(
    State(state): State<Arc<PortalState>>,
    Json(body): Json<LogoutRequest>,
) -> &'static str {
    state.write().refresh.remove(&body.refresh_token);
    "logged out"
}

async fn create_api_key(
    State(state): State<Arc<PortalState>>,
    headers: HeaderMap,
    Json(body): Json<CreateApiKeyRequest>,
) -> Result<(StatusCode, Json<CreatedApiKey>), MockError> {
    state.authorize(&headers)?;
    if body.scopes.is_empty() {
        return Err(MockError::BadRequest("at least one scope is required"));
    }
    let id = Uuid::now_v7().to_string();
    let secret = format!("wp_{}_{}", body.env, Uuid::now_v7().simple());
    let prefix = secret.chars().take(12).collect::<String>();
    state.write().api_keys.push(ApiKeySummary {
        id: id.clone(),
        business_id: PortalState::me().business.id,
        prefix: prefix.clone(),
        scopes: body.scopes.clone(),
        env: body.env.clone(),
        status: "active".into(),
        created_at: now(),
    });
    let created = CreatedApiKey {
        id,
        secret_key: secret,
        prefix,
        scopes: body.scopes,
        env: body.env,
    };
    Ok((StatusCode::CREATED, Json(created)))
}

async fn list_api_keys(
    State(state): State<Arc<PortalState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<ApiKeySummary>>, MockError> {
    state.authorize(&headers)?;
    Ok(Json(state.api_keys()))
}

async fn revoke_api_key(
    State(state): State<Arc<PortalState>>,
    headers: HeaderMap,
    Path(key_id): Path<String>,
) -> Result<StatusCode, MockError> {
    state.authorize(&headers)?;
    let mut inner = state.write();
    let key = inner
        .api_keys
        .iter_mut()
        .find(|k| k.id == key_id)
        .ok_or(MockError::NotFound("API key not found"))?;
    key.status = "revoked".into();
    Ok(StatusCode::NO_CONTENT)
}

async fn list_webhooks(
    State(state): State<Arc<PortalState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<Webhook>>, MockError> {
    state.authorize(&headers)?;
    Ok(Json(state.webhooks()))
}

async fn create_webhook(
    State(state): State<Arc<PortalState>>,
    headers: HeaderMap,
    Json(body): Json<CreateWebhookRequest>,
) -> Result<(StatusCode, Json<Webhook>), MockError> {
    state.authorize(&headers)?;
    if !body.url.starts_with("https://") && !body.url.starts_with("http://") {
        return Err(MockError::BadRequest("url must be http(s)"));
    }
    let stamp = now();
    let webhook = Webhook {
        id: format!("wh_{}", Uuid::now_v7().simple()),
        business_id: PortalState::me().business.id,
        url: body.url,
        signing_strategy: body.signing_strategy,
        secret: None,
        events: body.events,
        status: WebhookStatus::Active,
        created_at: stamp.clone(),
        updated_at: stamp,
    };
    state.write().webhooks.push(webhook.clone());
    let secret = match webhook.signing_strategy {
        SigningStrategy::SharedSecret => format!("wps_{}", Uuid::now_v7().simple()),
        SigningStrategy::SigningSecret => format!("whsec_{}", Uuid::now_v7().simple()),
    };
    Ok((
        StatusCode::CREATED,
        Json(Webhook {
            secret: Some(secret),
            ..webhook
        }),
    ))
}

/// The update body once the client has moved `webhook_id` into the path.
#[derive(Deserialize)]
struct WebhookChanges {
    url: String,
    signing_strategy: SigningStrategy,
    events: Vec<WebhookEvent>,
    status: WebhookStatus,
}

async fn update_webhook(
    State(state): State<Arc<PortalState>>,
    headers: HeaderMap,
    Path(webhook_id): Path<String>,
    Json(body): Json<WebhookChanges>,
) -> Result<Json<Webhook>, MockError> {
    state.authorize(&headers)?;
    let mut inner = state.write();
    let webhook = inner
        .webhooks
        .iter_mut()
        .find(|w| w.id == webhook_id)
        .ok_or(MockError::NotFound("webhook not found"))?;
    webhook.url = body.url;
    webhook.signing_strategy = body.signing_strategy;
    webhook.events = body.events;
    webhook.status = body.status;
    webhook.updated_at = now();
    Ok(Json(webhook.clone()))
}

async fn delete_webhook(
    State(state): State<Arc<PortalState>>,
    headers: HeaderMap,
    Path(webhook_id): Path<String>,
) -> Result<StatusCode, MockError> {
    state.authorize(&headers)?;
    let mut inner = state.write();
    let before = inner.webhooks.len();
    inner.webhooks.retain(|w| w.id != webhook_id);
    if inner.webhooks.len() == before {
        return Err(MockError::NotFound("webhook not found"));
    }
    Ok(StatusCode::NO_CONTENT)
}

async fn list_checkout_sessions(
    State(state): State<Arc<PortalState>>,
    headers: HeaderMap,
) -> Result<Json<CheckoutSessionList>, MockError> {
    state.authorize(&headers)?;
    let sessions = state.read().sessions.clone();
    Ok(Json(CheckoutSessionList {
        total: sessions.len() as u64,
        sessions,
    }))
}

fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// A checkout session in the given states, for seeding.
pub fn checkout_session(id: &str, checkout_status: &str, payment_status: &str) -> CheckoutSession {
    CheckoutSession {
        id: id.into(),
        amount: "2500".into(),
        currency: "XOF".into(),
        checkout_status: checkout_status.into(),
        payment_status: payment_status.into(),
        client_reference: None,
        transaction_id: None,
        business_name: Some("Dakar Surf Shop".into()),
        when_created: "2026-03-01T10:00:00Z".into(),
        when_expires: None,
        when_completed: None,
    }
}
