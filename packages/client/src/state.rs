//! The request state held by every reactive cell, and the cell itself.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::error::ClientError;

/// Exactly one of idle, pending or failed. Data from an earlier success may
/// ride along with any of them.
#[derive(Debug, Clone)]
pub enum RequestState<T> {
    Idle {
        data: Option<T>,
    },
    Pending {
        since: DateTime<Utc>,
        ticket: u64,
        cancel: CancellationToken,
        data: Option<T>,
    },
    Failed {
        error: Arc<ClientError>,
        data: Option<T>,
    },
}

impl<T> Default for RequestState<T> {
    fn default() -> Self {
        RequestState::Idle { data: None }
    }
}

impl<T> RequestState<T> {
    pub fn data(&self) -> Option<&T> {
        match self {
            RequestState::Idle { data }
            | RequestState::Pending { data, .. }
            | RequestState::Failed { data, .. } => data.as_ref(),
        }
    }

    pub fn error(&self) -> Option<&Arc<ClientError>> {
        match self {
            RequestState::Failed { error, .. } => Some(error),
            _ => None,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, RequestState::Pending { .. })
    }

    /// When the in-flight call started.
    pub fn since(&self) -> Option<DateTime<Utc>> {
        match self {
            RequestState::Pending { since, .. } => Some(*since),
            _ => None,
        }
    }

    /// `true` for the initial, empty idle shape.
    pub fn is_empty(&self) -> bool {
        matches!(self, RequestState::Idle { data: None })
    }

    fn take_data(&mut self) -> Option<T> {
        match self {
            RequestState::Idle { data }
            | RequestState::Pending { data, .. }
            | RequestState::Failed { data, .. } => data.take(),
        }
    }

    fn abort(&self) {
        if let RequestState::Pending { cancel, .. } = self {
            cancel.cancel();
        }
    }
}

/// Single-slot observable holder of a [`RequestState`].
///
/// Every write replaces the whole state in one step, so observers never see
/// a half-updated shape. Tickets order the calls made through the cell: only
/// the call whose ticket is still current may settle it.
#[derive(Debug)]
pub(crate) struct StateCell<T> {
    tx: watch::Sender<RequestState<T>>,
    tickets: AtomicU64,
}

impl<T> StateCell<T> {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(RequestState::default());
        Self {
            tx,
            tickets: AtomicU64::new(0),
        }
    }

    pub fn borrow(&self) -> watch::Ref<'_, RequestState<T>> {
        self.tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<RequestState<T>> {
        self.tx.subscribe()
    }

    /// Abort the in-flight call, if any, and enter `Pending` with the prior
    /// data. Returns the new call's ticket.
    pub fn begin(&self, cancel: CancellationToken) -> u64 {
        let ticket = self.tickets.fetch_add(1, Ordering::Relaxed) + 1;
        self.tx.send_modify(|state| {
            state.abort();
            let data = state.take_data();
            *state = RequestState::Pending {
                since: Utc::now(),
                ticket,
                cancel,
                data,
            };
        });
        ticket
    }

    /// Replace the state with `next(prior_data)` if `ticket` is still the
    /// pending call. Returns whether the write happened.
    pub fn settle(&self, ticket: u64, next: impl FnOnce(Option<T>) -> RequestState<T>) -> bool {
        self.tx.send_if_modified(|state| {
            let current = matches!(state, RequestState::Pending { ticket: t, .. } if *t == ticket);
            if current {
                let data = state.take_data();
                *state = next(data);
            }
            current
        })
    }

    /// Abort the in-flight call and return to the empty idle state.
    pub fn reset(&self) {
        self.tx.send_modify(|state| {
            state.abort();
            *state = RequestState::default();
        });
    }
}
