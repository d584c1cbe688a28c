//! Reactive wrapper around one route: a cell whose state tracks the latest
//! call made through it.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tracing::debug;
use wavepool_portal_api::Route;

use crate::api::Endpoint;
use crate::error::ClientError;
use crate::fetch::FetchOptions;
use crate::state::{RequestState, StateCell};

/// A reactive request cell bound to route `R`.
///
/// Clones share the same cell. A new [`fetch`](Self::fetch) aborts the call
/// already in flight on this cell; the aborted call never writes its result.
pub struct RequestSignal<R: Route> {
    endpoint: Endpoint<R>,
    cell: Arc<StateCell<R::Output>>,
}

impl<R: Route> Clone for RequestSignal<R> {
    fn clone(&self) -> Self {
        Self {
            endpoint: self.endpoint.clone(),
            cell: Arc::clone(&self.cell),
        }
    }
}

impl<R: Route> std::fmt::Debug for RequestSignal<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestSignal")
            .field("route", self.endpoint.key())
            .field("state", &*self.cell.borrow())
            .finish()
    }
}

impl<R: Route> RequestSignal<R> {
    pub(crate) fn new(endpoint: Endpoint<R>) -> Self {
        Self {
            endpoint,
            cell: Arc::new(StateCell::new()),
        }
    }

    /// A snapshot of the whole state.
    pub fn state(&self) -> RequestState<R::Output> {
        self.cell.borrow().clone()
    }

    pub fn data(&self) -> Option<R::Output> {
        self.cell.borrow().data().cloned()
    }

    pub fn error(&self) -> Option<Arc<ClientError>> {
        self.cell.borrow().error().cloned()
    }

    pub fn pending(&self) -> bool {
        self.cell.borrow().is_pending()
    }

    pub fn since(&self) -> Option<DateTime<Utc>> {
        self.cell.borrow().since()
    }

    /// Observe every state change.
    pub fn subscribe(&self) -> watch::Receiver<RequestState<R::Output>> {
        self.cell.subscribe()
    }

    /// Abort any in-flight call and return to the empty idle state.
    pub fn reset(&self) {
        self.cell.reset();
    }

    /// Run the route through this cell.
    ///
    /// The cell goes `Pending` (prior data kept) and then settles to idle with
    /// the new data, back to idle with the prior data if the call was
    /// cancelled, or to failed with the prior data. A cancellation token in
    /// `options` aborts the call like a later `fetch` or a `reset` would.
    pub async fn fetch(
        &self,
        input: R::Input,
        mut options: FetchOptions,
    ) -> Result<R::Output, Arc<ClientError>> {
        let cancel = options
            .cancel
            .take()
            .map(|parent| parent.child_token())
            .unwrap_or_default();
        let ticket = self.cell.begin(cancel.clone());
        options.cancel = Some(cancel);

        match self.endpoint.fetch(input, &options).await {
            Ok(data) => {
                let settled = data.clone();
                self.cell
                    .settle(ticket, |_| RequestState::Idle { data: Some(settled) });
                Ok(data)
            }
            Err(ClientError::Cancelled) => {
                debug!(route = %self.endpoint.key(), ticket, "call superseded or cancelled");
                self.cell
                    .settle(ticket, |prior| RequestState::Idle { data: prior });
                Err(Arc::new(ClientError::Cancelled))
            }
            Err(e) => {
                let error = Arc::new(e);
                let stored = Arc::clone(&error);
                self.cell.settle(ticket, |prior| RequestState::Failed {
                    error: stored,
                    data: prior,
                });
                Err(error)
            }
        }
    }
}
