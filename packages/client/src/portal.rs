//! The process-wide context: configuration, typed API, session and
//! navigation, built once at startup.

use std::sync::Arc;

use tracing::info;

use crate::api::Api;
use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::navigation::{History, NavigateTo, NavigationError, Navigator};
use crate::session::{Session, SessionError};
use crate::store::{self, KeyValueStore, StoreError};
use crate::view::{Resolved, View};

#[derive(Debug, thiserror::Error)]
pub enum PortalError {
    #[error(transparent)]
    Client(#[from] ClientError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Navigation(#[from] NavigationError),

    #[error(transparent)]
    Session(#[from] SessionError),
}

#[derive(Debug)]
pub struct Portal {
    config: ClientConfig,
    session: Session,
    navigator: Navigator,
}

impl Portal {
    /// Open the credential store named by `config` and bind every route.
    pub fn connect(config: ClientConfig, history: Arc<dyn History>) -> Result<Self, PortalError> {
        let store = store::open(&config)?;
        Self::with_store(config, store, history)
    }

    pub fn with_store(
        config: ClientConfig,
        store: Arc<dyn KeyValueStore>,
        history: Arc<dyn History>,
    ) -> Result<Self, PortalError> {
        let api = Api::from_config(&config)?;
        let session = Session::new(api, store, config.expiry_margin);
        let navigator = Navigator::new(history)?;
        info!(api_base = %config.api_base, "portal ready");
        Ok(Self {
            config,
            session,
            navigator,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn api(&self) -> &Api {
        self.session.api()
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn navigator(&self) -> &Navigator {
        &self.navigator
    }

    /// Re-sync the user, resolve the current view and apply its redirect.
    pub async fn refresh_view(&self) -> Result<View, PortalError> {
        let signed_in = self.session.sync_user().await?.is_some();
        let Resolved { view, redirect } = View::resolve(&self.navigator.location(), signed_in);
        if let Some(to) = redirect {
            self.navigator.navigate(&to)?;
        }
        Ok(view)
    }

    /// Sign out and return to the login screen.
    pub async fn logout(&self) -> Result<(), PortalError> {
        self.session.logout().await?;
        let params = self
            .navigator
            .replace_params(vec![("nav".into(), "login".into())]);
        self.navigator.navigate(&NavigateTo::new().params(params))?;
        Ok(())
    }
}
