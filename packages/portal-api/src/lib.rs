//! Request and response types for the Wave Pool developer portal API.
//!
//! Every wire type is declared together with the schema that validates its
//! JSON form (see [`wavepool_schema::described_struct!`]), and every endpoint
//! is a typed [`Route`] collected in the process-wide [`registry()`].
//!
//! # Endpoints covered
//!
//! | Method | Path | Type |
//! |--------|------|------|
//! | GET | `/api/health` | → `String` |
//! | POST | `/api/v1/auth` | [`Credentials`] → [`AuthOutcome`] |
//! | GET | `/api/v1/me` | → [`Me`] |
//! | POST | `/api/v1/auth/refresh` | [`RefreshRequest`] → [`TokenPair`] |
//! | DELETE | `/api/v1/auth/logout` | [`LogoutRequest`] → `String` |
//! | POST | `/api/v1/api-keys` | [`CreateApiKeyRequest`] → [`CreatedApiKey`] |
//! | GET | `/api/v1/api-keys` | → [`ApiKeyList`] |
//! | DELETE | `/api/v1/api-keys/{key_id}` | [`ApiKeyId`] → [`NoContent`] |
//! | GET | `/api/v1/webhooks` | → [`WebhookList`] |
//! | POST | `/api/v1/webhooks` | [`CreateWebhookRequest`] → [`Webhook`] |
//! | PUT | `/api/v1/webhooks/{webhook_id}` | [`UpdateWebhookRequest`] → [`Webhook`] |
//! | DELETE | `/api/v1/webhooks/{webhook_id}` | [`WebhookId`] → [`NoContent`] |
//! | GET | `/api/v1/portal/checkout-sessions` | → [`CheckoutSessionList`] |

pub mod api_key;
pub mod auth;
pub mod checkout;
pub mod error;
pub mod routes;
pub mod user;
pub mod webhook;

pub use api_key::{ApiKeyId, ApiKeyList, ApiKeySummary, CreateApiKeyRequest, CreatedApiKey};
pub use auth::{AuthOutcome, Credentials, LogoutRequest, RefreshRequest, TokenPair};
pub use checkout::{CheckoutSession, CheckoutSessionList, SessionBadge, TransactionStats};
pub use error::ErrorResponse;
pub use routes::{
    path_parts, placeholders, registry, CreateApiKey, CreateWebhook, DeleteWebhook, GetMe,
    Health, ListApiKeys, ListCheckoutSessions, ListWebhooks, Login, Logout, Method, NoContent,
    PathPart, Refresh, Registry, RevokeApiKey, Route, RouteEntry, RouteKey, RouteKeyError, UpdateWebhook,
};
pub use user::{Business, Me};
pub use webhook::{
    CreateWebhookRequest, SigningStrategy, UpdateWebhookRequest, Webhook, WebhookEvent,
    WebhookId, WebhookList, WebhookStatus,
};
