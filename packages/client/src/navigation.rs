//! URL-derived view state.
//!
//! The [`Navigator`] owns the current [`Location`] and keeps it in step with
//! a [`History`]: navigating pushes (or replaces) a history entry and
//! publishes the new location to subscribers; history moves made elsewhere
//! are picked up by [`Navigator::sync`].

use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::watch;
use tracing::debug;
use url::Url;

/// Errors raised while resolving a navigation target.
#[derive(Debug, thiserror::Error)]
pub enum NavigationError {
    #[error("invalid URL {href:?}: {source}")]
    InvalidUrl {
        href: String,
        #[source]
        source: url::ParseError,
    },
}

/// An absolute URL with its path normalized (no trailing `/`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    url: Url,
}

impl Location {
    pub fn parse(href: &str) -> Result<Self, NavigationError> {
        let url = Url::parse(href).map_err(|source| NavigationError::InvalidUrl {
            href: href.to_string(),
            source,
        })?;
        Ok(Self::from_url(url))
    }

    fn from_url(mut url: Url) -> Self {
        let path = url.path();
        if path.len() > 1 && path.ends_with('/') {
            let trimmed = path.trim_end_matches('/').to_string();
            url.set_path(if trimmed.is_empty() { "/" } else { &trimmed });
        }
        Self { url }
    }

    pub fn href(&self) -> &str {
        self.url.as_str()
    }

    pub fn origin(&self) -> String {
        self.url.origin().ascii_serialization()
    }

    pub fn path(&self) -> &str {
        self.url.path()
    }

    /// Fragment without the leading `#`.
    pub fn hash(&self) -> Option<&str> {
        self.url.fragment()
    }

    /// First value of `key`, `Some("")` for a bare flag.
    pub fn param(&self, key: &str) -> Option<String> {
        self.url
            .query_pairs()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.into_owned())
    }

    /// Every value of `key`, in order.
    pub fn params_all(&self, key: &str) -> Vec<String> {
        self.url
            .query_pairs()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.into_owned())
            .collect()
    }

    /// All query pairs, duplicates and order preserved.
    pub fn entries(&self) -> Vec<(String, String)> {
        self.url.query_pairs().into_owned().collect()
    }

    /// Same origin and path, and the same query pairs in any order. The
    /// fragment is not compared.
    pub fn same_as(&self, other: &Location) -> bool {
        if self.url == other.url {
            return true;
        }
        if self.origin() != other.origin() || self.path() != other.path() {
            return false;
        }
        let mut a = self.entries();
        let mut b = other.entries();
        a.sort();
        b.sort();
        a == b
    }

    /// Whether a link to this location should be routed in-app from a page
    /// served at `origin`. Other origins and `/api/` paths are left to the
    /// browser.
    pub fn is_routable_from(&self, origin: &str) -> bool {
        self.origin() == origin && !self.path().starts_with("/api/")
    }

    fn set_pairs(&mut self, pairs: &[(String, String)]) {
        if pairs.is_empty() {
            self.url.set_query(None);
        } else {
            self.url.query_pairs_mut().clear().extend_pairs(pairs);
        }
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.href())
    }
}

/// A query parameter override.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    /// Replace the first occurrence, drop the others.
    Set(String),
    /// Present with an empty value (`?open`).
    Flag,
    Delete,
    /// Drop every occurrence, then append each value in order.
    Many(Vec<String>),
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::Set(v.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        ParamValue::Set(v)
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        ParamValue::Set(v.to_string())
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        if v {
            ParamValue::Flag
        } else {
            ParamValue::Delete
        }
    }
}

impl<T: Into<ParamValue>> From<Option<T>> for ParamValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(ParamValue::Delete, Into::into)
    }
}

impl From<Vec<String>> for ParamValue {
    fn from(v: Vec<String>) -> Self {
        ParamValue::Many(v)
    }
}

/// Where to go, relative to the current location.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NavigateTo {
    pub href: Option<String>,
    pub hash: Option<String>,
    pub params: Option<Vec<(String, ParamValue)>>,
    pub replace: bool,
}

impl NavigateTo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn href(mut self, href: impl Into<String>) -> Self {
        self.href = Some(href.into());
        self
    }

    pub fn hash(mut self, hash: impl Into<String>) -> Self {
        self.hash = Some(hash.into());
        self
    }

    pub fn param(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.params
            .get_or_insert_with(Vec::new)
            .push((key.into(), value.into()));
        self
    }

    pub fn params(mut self, params: Vec<(String, ParamValue)>) -> Self {
        self.params = Some(params);
        self
    }

    pub fn replace(mut self) -> Self {
        self.replace = true;
        self
    }
}

/// A stack of visited URLs.
pub trait History: Send + Sync {
    fn current(&self) -> String;
    fn push(&self, href: &str);
    fn replace(&self, href: &str);

    /// Step back; `false` when there is nothing to go back to.
    fn back(&self) -> bool {
        false
    }

    fn forward(&self) -> bool {
        false
    }
}

#[derive(Debug)]
struct Entries {
    stack: Vec<String>,
    index: usize,
}

/// In-process [`History`] with back/forward.
#[derive(Debug)]
pub struct MemoryHistory {
    inner: Mutex<Entries>,
}

impl MemoryHistory {
    pub fn new(initial: impl Into<String>) -> Self {
        Self {
            inner: Mutex::new(Entries {
                stack: vec![initial.into()],
                index: 0,
            }),
        }
    }

    pub fn len(&self) -> usize {
        self.lock().stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().stack.is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Entries> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl History for MemoryHistory {
    fn current(&self) -> String {
        let entries = self.lock();
        entries.stack[entries.index].clone()
    }

    fn push(&self, href: &str) {
        let mut entries = self.lock();
        let next = entries.index + 1;
        entries.stack.truncate(next);
        entries.stack.push(href.to_string());
        entries.index = next;
    }

    fn replace(&self, href: &str) {
        let mut entries = self.lock();
        let index = entries.index;
        entries.stack[index] = href.to_string();
    }

    fn back(&self) -> bool {
        let mut entries = self.lock();
        if entries.index == 0 {
            return false;
        }
        entries.index -= 1;
        true
    }

    fn forward(&self) -> bool {
        let mut entries = self.lock();
        if entries.index + 1 >= entries.stack.len() {
            return false;
        }
        entries.index += 1;
        true
    }
}

/// Owner of the current [`Location`].
pub struct Navigator {
    history: Arc<dyn History>,
    origin: String,
    tx: watch::Sender<Location>,
}

impl std::fmt::Debug for Navigator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Navigator")
            .field("location", &self.location().href())
            .finish()
    }
}

impl Navigator {
    /// Start from the history's current entry, rewriting it in place when its
    /// path carries a trailing `/`.
    pub fn new(history: Arc<dyn History>) -> Result<Self, NavigationError> {
        let raw = history.current();
        let location = Location::parse(&raw)?;
        if location.href() != raw {
            history.replace(location.href());
        }
        let (tx, _) = watch::channel(location.clone());
        Ok(Self {
            history,
            origin: location.origin(),
            tx,
        })
    }

    pub fn location(&self) -> Location {
        self.tx.borrow().clone()
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn subscribe(&self) -> watch::Receiver<Location> {
        self.tx.subscribe()
    }

    /// Compute the location `to` points at without going there.
    pub fn resolve(&self, to: &NavigateTo) -> Result<Location, NavigationError> {
        let current = self.location();
        let url = match &to.href {
            Some(href) => current
                .url
                .join(href)
                .map_err(|source| NavigationError::InvalidUrl {
                    href: href.clone(),
                    source,
                })?,
            None => current.url.clone(),
        };
        let mut target = Location::from_url(url);
        if let Some(hash) = &to.hash {
            let hash = hash.trim_start_matches('#');
            target.url.set_fragment((!hash.is_empty()).then_some(hash));
        }

        match &to.params {
            None => {
                if target.path() == current.path() {
                    target.url.set_query(current.url.query());
                }
            }
            Some(params) => {
                let mut pairs = target.entries();
                for (key, value) in params {
                    apply(&mut pairs, key, value);
                }
                target.set_pairs(&pairs);
            }
        }
        Ok(target)
    }

    /// Go to `to`. Returns `false` when it already is the current location.
    pub fn navigate(&self, to: &NavigateTo) -> Result<bool, NavigationError> {
        let target = self.resolve(to)?;
        if target.same_as(&self.location()) {
            return Ok(false);
        }
        if to.replace {
            self.history.replace(target.href());
        } else {
            self.history.push(target.href());
        }
        debug!(href = %target, replace = to.replace, "navigate");
        Ok(self.sync())
    }

    /// Adopt the history's current entry. Returns whether the location changed.
    pub fn sync(&self) -> bool {
        let Ok(location) = Location::parse(&self.history.current()) else {
            return false;
        };
        self.tx.send_if_modified(|current| {
            if current.same_as(&location) {
                return false;
            }
            *current = location;
            true
        })
    }

    pub fn back(&self) -> bool {
        self.history.back() && self.sync()
    }

    pub fn forward(&self) -> bool {
        self.history.forward() && self.sync()
    }

    /// Overrides that delete every current parameter, then apply `params`.
    pub fn replace_params(&self, params: Vec<(String, ParamValue)>) -> Vec<(String, ParamValue)> {
        let mut out: Vec<(String, ParamValue)> = Vec::new();
        for (key, _) in self.location().entries() {
            if !out.iter().any(|(k, _)| *k == key) {
                out.push((key, ParamValue::Delete));
            }
        }
        for (key, value) in params {
            match out.iter_mut().find(|(k, _)| *k == key) {
                Some(slot) => slot.1 = value,
                None => out.push((key, value)),
            }
        }
        out
    }
}

fn apply(pairs: &mut Vec<(String, String)>, key: &str, value: &ParamValue) {
    match value {
        ParamValue::Set(v) => set(pairs, key, v),
        ParamValue::Flag => set(pairs, key, ""),
        ParamValue::Delete => pairs.retain(|(k, _)| k != key),
        ParamValue::Many(values) => {
            pairs.retain(|(k, _)| k != key);
            pairs.extend(values.iter().map(|v| (key.to_string(), v.clone())));
        }
    }
}

fn set(pairs: &mut Vec<(String, String)>, key: &str, value: &str) {
    match pairs.iter().position(|(k, _)| k == key) {
        Some(first) => {
            pairs[first].1 = value.to_string();
            let mut index = 0;
            pairs.retain(|(k, _)| {
                let keep = k != key || index == first;
                index += 1;
                keep
            });
        }
        None => pairs.push((key.to_string(), value.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn navigator(href: &str) -> (Arc<MemoryHistory>, Navigator) {
        let history = Arc::new(MemoryHistory::new(href));
        let nav = Navigator::new(history.clone()).unwrap();
        (history, nav)
    }

    #[test]
    fn trailing_slash_is_trimmed_in_place() {
        let (history, nav) = navigator("https://portal.test/dashboard/?a=1");
        assert_eq!(nav.location().path(), "/dashboard");
        assert_eq!(history.current(), "https://portal.test/dashboard?a=1");
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn params_merge_onto_current_query() {
        let (_, nav) = navigator("https://portal.test/?nav=dev-portal&tab=api-keys&tag=x");
        let to = NavigateTo::new()
            .param("tab", "webhooks")
            .param("dialog", true)
            .param("nav", None::<String>)
            .param("tag", vec!["a".to_string(), "b".to_string()]);
        assert!(nav.navigate(&to).unwrap());
        let loc = nav.location();
        assert_eq!(loc.param("tab").as_deref(), Some("webhooks"));
        assert_eq!(loc.param("dialog").as_deref(), Some(""));
        assert_eq!(loc.param("nav"), None);
        assert_eq!(loc.params_all("tag"), ["a", "b"]);
    }

    #[test]
    fn set_replaces_first_and_drops_duplicates() {
        let mut pairs = vec![
            ("a".to_string(), "1".to_string()),
            ("b".into(), "x".into()),
            ("a".into(), "2".into()),
        ];
        apply(&mut pairs, "a", &ParamValue::Set("9".into()));
        assert_eq!(pairs, [("a".to_string(), "9".to_string()), ("b".into(), "x".into())]);
    }

    #[test]
    fn no_params_keeps_query_on_same_path_only() {
        let (_, nav) = navigator("https://portal.test/keys?tab=webhooks");
        let same = nav.resolve(&NavigateTo::new().hash("top")).unwrap();
        assert_eq!(same.param("tab").as_deref(), Some("webhooks"));
        assert_eq!(same.hash(), Some("top"));

        let other = nav.resolve(&NavigateTo::new().href("/login?next=1")).unwrap();
        assert_eq!(other.path(), "/login");
        assert_eq!(other.param("next").as_deref(), Some("1"));
        assert_eq!(other.param("tab"), None);
    }

    #[test]
    fn equality_ignores_param_order_and_hash() {
        let a = Location::parse("https://portal.test/p?x=1&y=2").unwrap();
        let b = Location::parse("https://portal.test/p?y=2&x=1").unwrap();
        let c = Location::parse("https://portal.test/p?y=2&x=1#h").unwrap();
        let d = Location::parse("https://portal.test/p?x=1&x=1&y=2").unwrap();
        let e = Location::parse("https://portal.test/q?x=1&y=2").unwrap();
        assert!(a.same_as(&b));
        assert!(a.same_as(&c));
        assert!(!a.same_as(&d));
        assert!(!a.same_as(&e));
    }

    #[test]
    fn hash_only_navigation_is_redundant() {
        let (history, nav) = navigator("https://portal.test/keys?tab=webhooks");
        assert!(!nav.navigate(&NavigateTo::new().hash("top")).unwrap());
        assert_eq!(history.len(), 1);
        assert_eq!(nav.location().hash(), None);
    }

    #[test]
    fn redundant_navigation_is_skipped() {
        let (history, nav) = navigator("https://portal.test/?a=1&b=2");
        let mut rx = nav.subscribe();
        let to = NavigateTo::new().param("b", "2");
        assert!(!nav.navigate(&to).unwrap());
        assert_eq!(history.len(), 1);
        assert!(!rx.has_changed().unwrap());
    }

    #[test]
    fn replace_does_not_grow_history() {
        let (history, nav) = navigator("https://portal.test/");
        nav.navigate(&NavigateTo::new().param("nav", "dev-portal").replace())
            .unwrap();
        assert_eq!(history.len(), 1);
        nav.navigate(&NavigateTo::new().param("tab", "webhooks")).unwrap();
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn back_and_forward_publish() {
        let (_, nav) = navigator("https://portal.test/?tab=api-keys");
        nav.navigate(&NavigateTo::new().param("tab", "webhooks")).unwrap();
        assert!(nav.back());
        assert_eq!(nav.location().param("tab").as_deref(), Some("api-keys"));
        assert!(nav.forward());
        assert_eq!(nav.location().param("tab").as_deref(), Some("webhooks"));
        assert!(!nav.forward());
    }

    #[test]
    fn replace_params_deletes_everything_else() {
        let (_, nav) = navigator("https://portal.test/?tab=webhooks&dialog=create-webhook");
        let params = nav.replace_params(vec![("tab".into(), "transactions".into())]);
        nav.navigate(&NavigateTo::new().params(params)).unwrap();
        assert_eq!(
            nav.location().entries(),
            [("tab".to_string(), "transactions".to_string())]
        );
    }

    #[test]
    fn routability() {
        let loc = Location::parse("https://portal.test/api/health").unwrap();
        assert!(!loc.is_routable_from("https://portal.test"));
        let loc = Location::parse("https://portal.test/keys").unwrap();
        assert!(loc.is_routable_from("https://portal.test"));
        assert!(!loc.is_routable_from("https://other.test"));
    }
}
