//! Signed-in state: stored credentials, token refresh and the current user.
//!
//! Flows:
//!
//! - **login**: `POST /api/v1/auth`, store the token pair, load the user.
//! - **ensure_valid_token**: hand back a live access token, refreshing it
//!   through `POST /api/v1/auth/refresh` when it has expired. Concurrent
//!   callers share one refresh.
//! - **logout**: `DELETE /api/v1/auth/logout`, then forget everything.
//!
//! Any authenticated call that comes back `401` clears the credentials, which
//! forces a new login.

pub mod vault;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::{info, warn};
use wavepool_portal_api::{AuthOutcome, Credentials, GetMe, LogoutRequest, Me, RefreshRequest, Route};

use crate::api::{Api, Endpoint};
use crate::error::ClientError;
use crate::fetch::FetchOptions;
use crate::signal::RequestSignal;
use crate::store::{KeyValueStore, StoreError};

pub use vault::{CredentialVault, StoredCredentials};

/// Errors from session flows.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Client(Arc<ClientError>),

    #[error("credential store: {0}")]
    Store(#[from] StoreError),

    /// The operation needs a signed-in user.
    #[error("not signed in")]
    SignedOut,
}

impl From<ClientError> for SessionError {
    fn from(e: ClientError) -> Self {
        SessionError::Client(Arc::new(e))
    }
}

impl From<Arc<ClientError>> for SessionError {
    fn from(e: Arc<ClientError>) -> Self {
        SessionError::Client(e)
    }
}

impl SessionError {
    pub fn client(&self) -> Option<&ClientError> {
        match self {
            SessionError::Client(e) => Some(e.as_ref()),
            _ => None,
        }
    }
}

/// Result of a login attempt that reached the server.
#[derive(Debug, Clone, PartialEq)]
pub enum LoginOutcome {
    SignedIn(Me),
    /// The server declined with a message instead of tokens.
    Rejected(String),
}

pub struct Session {
    api: Api,
    vault: CredentialVault,
    user: RequestSignal<GetMe>,
    refresh_gate: Mutex<()>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session").field("user", &self.user).finish()
    }
}

impl Session {
    pub fn new(api: Api, store: Arc<dyn KeyValueStore>, margin: Duration) -> Self {
        let user = api.me.signal();
        Self {
            api,
            vault: CredentialVault::new(store, margin),
            user,
            refresh_gate: Mutex::new(()),
        }
    }

    pub fn api(&self) -> &Api {
        &self.api
    }

    pub fn vault(&self) -> &CredentialVault {
        &self.vault
    }

    /// The current-user cell.
    pub fn user(&self) -> &RequestSignal<GetMe> {
        &self.user
    }

    pub fn signed_in(&self) -> bool {
        self.user.data().is_some()
    }

    pub async fn login(&self, credentials: Credentials) -> Result<LoginOutcome, SessionError> {
        match self.api.login.fetch(credentials, &FetchOptions::new()).await? {
            AuthOutcome::Tokens(tokens) => {
                self.vault.save(&tokens).await?;
                let options = FetchOptions::bearer(&tokens.access_token)?;
                let me = self.user.fetch((), options).await?;
                info!(user = %me.id, business = %me.business.id, "signed in");
                Ok(LoginOutcome::SignedIn(me))
            }
            AuthOutcome::Message(message) => {
                warn!(%message, "login rejected");
                Ok(LoginOutcome::Rejected(message))
            }
        }
    }

    /// A usable access token, or `None` when the user has to sign in again.
    pub async fn ensure_valid_token(&self) -> Result<Option<String>, SessionError> {
        if let Some(token) = self.vault.load().await?.valid_access_token(vault::now_ms()) {
            return Ok(Some(token.to_string()));
        }

        let _gate = self.refresh_gate.lock().await;
        // whoever held the gate before us may have refreshed already
        let creds = self.vault.load().await?;
        if let Some(token) = creds.valid_access_token(vault::now_ms()) {
            return Ok(Some(token.to_string()));
        }

        let Some(refresh_token) = creds.refresh_token else {
            self.user.reset();
            return Ok(None);
        };

        let request = RefreshRequest { refresh_token };
        match self.api.refresh.fetch(request, &FetchOptions::new()).await {
            Ok(tokens) => {
                self.vault.save(&tokens).await?;
                info!("access token refreshed");
                Ok(Some(tokens.access_token))
            }
            Err(e) => {
                warn!("token refresh failed: {e}");
                self.vault.clear().await?;
                self.user.reset();
                Ok(None)
            }
        }
    }

    /// Fetch options carrying the bearer token when one is available.
    pub async fn authorized(&self) -> Result<FetchOptions, SessionError> {
        match self.ensure_valid_token().await? {
            Some(token) => Ok(FetchOptions::bearer(&token)?),
            None => Ok(FetchOptions::new()),
        }
    }

    /// Reload the current user, or reset the cell when signed out.
    pub async fn sync_user(&self) -> Result<Option<Me>, SessionError> {
        let Some(token) = self.ensure_valid_token().await? else {
            self.user.reset();
            return Ok(None);
        };
        match self.user.fetch((), FetchOptions::bearer(&token)?).await {
            Ok(me) => Ok(Some(me)),
            Err(e) => {
                self.handle_failure(&e).await?;
                Err(e.into())
            }
        }
    }

    /// Call `endpoint` with the bearer token; a `401` signs the user out.
    pub async fn call<R: Route>(
        &self,
        endpoint: &Endpoint<R>,
        input: R::Input,
    ) -> Result<R::Output, SessionError> {
        let Some(token) = self.ensure_valid_token().await? else {
            return Err(SessionError::SignedOut);
        };
        match endpoint.fetch(input, &FetchOptions::bearer(&token)?).await {
            Ok(output) => Ok(output),
            Err(e) => {
                self.handle_failure(&e).await?;
                Err(e.into())
            }
        }
    }

    /// Revoke the refresh token server-side, then forget the credentials.
    pub async fn logout(&self) -> Result<(), SessionError> {
        let creds = self.vault.load().await?;
        if let Some(refresh_token) = creds.refresh_token {
            let options = self.authorized().await?;
            if let Err(e) = self
                .api
                .logout
                .fetch(LogoutRequest { refresh_token }, &options)
                .await
            {
                self.handle_failure(&e).await?;
                return Err(e.into());
            }
        }
        self.vault.clear().await?;
        self.user.reset();
        info!("signed out");
        Ok(())
    }

    /// A `401` from the API means the stored credentials are no good: drop
    /// them and reset the user. Returns whether that happened.
    pub async fn handle_failure(&self, error: &ClientError) -> Result<bool, StoreError> {
        if !error.is_unauthorized() {
            return Ok(false);
        }
        warn!("unauthorized response, clearing credentials");
        self.vault.clear().await?;
        self.user.reset();
        Ok(true)
    }
}
