//! Typed client for the Wave Pool developer portal.
//!
//! Every route in [`wavepool_portal_api::registry()`] is bound to an
//! [`Endpoint`] on [`Api`]. An endpoint can be called once
//! ([`Endpoint::fetch`]) or through a reactive [`RequestSignal`] whose
//! [`RequestState`] tracks the latest call: pending, settled with data, or
//! failed, with earlier data kept across all three.
//!
//! # Crate layout
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | [`ClientConfig`] from environment variables |
//! | [`fetch`] | Input encoding, dispatch, response classification |
//! | [`api`] | [`Api`], [`Endpoint`] and [`RawEndpoint`] |
//! | [`state`], [`signal`] | Reactive request cells |
//! | [`scope`] | Hook slots for per-component cells |
//! | [`session`] | Stored credentials, token refresh, current user |
//! | [`store`] | Key-value backends (memory, SQLite) |
//! | [`navigation`], [`view`] | URL state and the screen it selects |
//! | [`portal`] | The startup context tying it all together |

pub mod api;
pub mod config;
pub mod error;
pub mod fetch;
pub mod navigation;
pub mod portal;
pub mod scope;
pub mod session;
pub mod signal;
pub mod state;
pub mod store;
pub mod view;

pub use api::{Api, Endpoint, RawEndpoint};
pub use config::{ClientConfig, ConfigError};
pub use error::ClientError;
pub use fetch::{FetchOptions, Fetcher};
pub use navigation::{History, Location, MemoryHistory, NavigateTo, NavigationError, Navigator, ParamValue};
pub use portal::{Portal, PortalError};
pub use scope::Scope;
pub use session::{LoginOutcome, Session, SessionError};
pub use signal::RequestSignal;
pub use state::RequestState;
pub use store::{KeyValueStore, MemoryStore, SqliteStore, StoreError};
pub use view::{Dialog, Tab, View};
