//! The typed client: one endpoint per registry route.

use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;

use serde_json::Value;
use wavepool_portal_api::{
    registry, CreateApiKey, CreateWebhook, DeleteWebhook, GetMe, Health, ListApiKeys,
    ListCheckoutSessions, ListWebhooks, Login, Logout, Refresh, RevokeApiKey, Route, RouteEntry,
    RouteKey, UpdateWebhook,
};

use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::fetch::{FetchOptions, Fetcher};
use crate::scope::Scope;
use crate::signal::RequestSignal;

/// A route bound to a [`Fetcher`], speaking raw JSON.
#[derive(Debug)]
pub struct RawEndpoint {
    entry: RouteEntry,
    fetcher: Fetcher,
}

impl RawEndpoint {
    pub fn new(entry: RouteEntry, fetcher: Fetcher) -> Self {
        Self { entry, fetcher }
    }

    pub fn entry(&self) -> &RouteEntry {
        &self.entry
    }

    pub async fn fetch(&self, input: Value, options: &FetchOptions) -> Result<Value, ClientError> {
        self.fetcher.call(&self.entry, input, options).await
    }
}

/// Typed handle on route `R`.
pub struct Endpoint<R: Route> {
    raw: Arc<RawEndpoint>,
    _route: PhantomData<fn() -> R>,
}

impl<R: Route> Clone for Endpoint<R> {
    fn clone(&self) -> Self {
        Self {
            raw: Arc::clone(&self.raw),
            _route: PhantomData,
        }
    }
}

impl<R: Route> std::fmt::Debug for Endpoint<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Endpoint").field(&self.raw.entry.key).finish()
    }
}

impl<R: Route> Endpoint<R> {
    fn bind(raw: &HashMap<RouteKey, Arc<RawEndpoint>>, fetcher: &Fetcher) -> Self {
        let raw = raw
            .get(&R::key())
            .cloned()
            .unwrap_or_else(|| Arc::new(RawEndpoint::new(R::entry(), fetcher.clone())));
        Self {
            raw,
            _route: PhantomData,
        }
    }

    pub fn key(&self) -> &RouteKey {
        &self.raw.entry.key
    }

    pub fn raw(&self) -> &Arc<RawEndpoint> {
        &self.raw
    }

    /// One-shot call: encode `input`, dispatch, validate and decode.
    pub async fn fetch(
        &self,
        input: R::Input,
        options: &FetchOptions,
    ) -> Result<R::Output, ClientError> {
        let input = serde_json::to_value(&input).map_err(ClientError::Encode)?;
        let payload = self.raw.fetch(input, options).await?;
        serde_json::from_value(payload).map_err(|source| ClientError::Decode {
            route: self.key().clone(),
            source,
        })
    }

    /// A fresh, standalone reactive cell for this route.
    pub fn signal(&self) -> RequestSignal<R> {
        RequestSignal::new(self.clone())
    }

    /// The cell held in the next slot of `scope`, created on first use.
    pub fn use_in(&self, scope: &Scope) -> RequestSignal<R> {
        scope.memo(|| self.signal())
    }
}

/// Every registry route bound to one backend.
///
/// Built eagerly: the raw endpoint map covers the whole registry, and each
/// typed field shares its raw endpoint with that map.
#[derive(Debug, Clone)]
pub struct Api {
    fetcher: Fetcher,
    raw: HashMap<RouteKey, Arc<RawEndpoint>>,

    pub health: Endpoint<Health>,
    pub login: Endpoint<Login>,
    pub me: Endpoint<GetMe>,
    pub refresh: Endpoint<Refresh>,
    pub logout: Endpoint<Logout>,
    pub create_api_key: Endpoint<CreateApiKey>,
    pub list_api_keys: Endpoint<ListApiKeys>,
    pub revoke_api_key: Endpoint<RevokeApiKey>,
    pub list_webhooks: Endpoint<ListWebhooks>,
    pub create_webhook: Endpoint<CreateWebhook>,
    pub update_webhook: Endpoint<UpdateWebhook>,
    pub delete_webhook: Endpoint<DeleteWebhook>,
    pub checkout_sessions: Endpoint<ListCheckoutSessions>,
}

impl Api {
    pub fn new(fetcher: Fetcher) -> Self {
        let raw: HashMap<RouteKey, Arc<RawEndpoint>> = registry()
            .iter()
            .map(|entry| {
                let endpoint = RawEndpoint::new(entry.clone(), fetcher.clone());
                (entry.key.clone(), Arc::new(endpoint))
            })
            .collect();

        Self {
            health: Endpoint::bind(&raw, &fetcher),
            login: Endpoint::bind(&raw, &fetcher),
            me: Endpoint::bind(&raw, &fetcher),
            refresh: Endpoint::bind(&raw, &fetcher),
            logout: Endpoint::bind(&raw, &fetcher),
            create_api_key: Endpoint::bind(&raw, &fetcher),
            list_api_keys: Endpoint::bind(&raw, &fetcher),
            revoke_api_key: Endpoint::bind(&raw, &fetcher),
            list_webhooks: Endpoint::bind(&raw, &fetcher),
            create_webhook: Endpoint::bind(&raw, &fetcher),
            update_webhook: Endpoint::bind(&raw, &fetcher),
            delete_webhook: Endpoint::bind(&raw, &fetcher),
            checkout_sessions: Endpoint::bind(&raw, &fetcher),
            fetcher,
            raw,
        }
    }

    /// Build the HTTP client and bind every route to `config.api_base`.
    pub fn from_config(config: &ClientConfig) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder().build()?;
        Ok(Self::new(Fetcher::new(
            http,
            config.api_base.clone(),
            config.validate_responses,
        )))
    }

    pub fn fetcher(&self) -> &Fetcher {
        &self.fetcher
    }

    /// Typed access by route type.
    pub fn endpoint<R: Route>(&self) -> Endpoint<R> {
        Endpoint::bind(&self.raw, &self.fetcher)
    }

    /// Raw access by key, e.g. `"GET /api/v1/me"` or `"GET/api/v1/me"`.
    pub fn route(&self, key: &str) -> Result<&Arc<RawEndpoint>, ClientError> {
        key.parse::<RouteKey>()
            .ok()
            .and_then(|k| self.raw.get(&k))
            .ok_or_else(|| ClientError::UnknownRoute(key.to_string()))
    }
}
