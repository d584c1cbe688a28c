//! Token persistence on top of a [`KeyValueStore`].

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use wavepool_portal_api::TokenPair;

use crate::store::{KeyValueStore, StoreError};

pub const ACCESS_TOKEN: &str = "access_token";
pub const REFRESH_TOKEN: &str = "refresh_token";
/// Absolute expiry of the access token, Unix milliseconds.
pub const EXPIRES_AT: &str = "expires_at";

/// Snapshot of the three stored keys.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoredCredentials {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub expires_at: Option<i64>,
}

impl StoredCredentials {
    /// The access token, if one is stored and has not reached its expiry.
    pub fn valid_access_token(&self, now_ms: i64) -> Option<&str> {
        match (&self.access_token, self.expires_at) {
            (Some(token), Some(expires_at)) if now_ms < expires_at => Some(token),
            _ => None,
        }
    }
}

/// Reads and writes the stored credential triple.
pub struct CredentialVault {
    store: Arc<dyn KeyValueStore>,
    margin: Duration,
}

impl CredentialVault {
    pub fn new(store: Arc<dyn KeyValueStore>, margin: Duration) -> Self {
        Self { store, margin }
    }

    pub async fn load(&self) -> Result<StoredCredentials, StoreError> {
        Ok(StoredCredentials {
            access_token: self.store.get(ACCESS_TOKEN).await?,
            refresh_token: self.store.get(REFRESH_TOKEN).await?,
            // an unreadable expiry counts as expired
            expires_at: self
                .store
                .get(EXPIRES_AT)
                .await?
                .and_then(|v| v.parse().ok()),
        })
    }

    /// Store a fresh token pair, expiring `margin` before the server says.
    pub async fn save(&self, tokens: &TokenPair) -> Result<i64, StoreError> {
        let expires_at = expires_at(now_ms(), tokens.expires_in, self.margin);
        self.store.set(ACCESS_TOKEN, &tokens.access_token).await?;
        self.store.set(REFRESH_TOKEN, &tokens.refresh_token).await?;
        self.store.set(EXPIRES_AT, &expires_at.to_string()).await?;
        Ok(expires_at)
    }

    pub async fn clear(&self) -> Result<(), StoreError> {
        self.store.remove(ACCESS_TOKEN).await?;
        self.store.remove(REFRESH_TOKEN).await?;
        self.store.remove(EXPIRES_AT).await
    }
}

pub(crate) fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

pub(crate) fn expires_at(now_ms: i64, expires_in_secs: u64, margin: Duration) -> i64 {
    let lifetime = i64::try_from(expires_in_secs)
        .unwrap_or(i64::MAX / 1000)
        .saturating_mul(1000);
    let margin = i64::try_from(margin.as_millis()).unwrap_or(i64::MAX);
    now_ms.saturating_add(lifetime).saturating_sub(margin)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn tokens(expires_in: u64) -> TokenPair {
        TokenPair {
            access_token: "a".into(),
            refresh_token: "r".into(),
            expires_in,
        }
    }

    #[test]
    fn expiry_subtracts_margin() {
        assert_eq!(expires_at(1_000_000, 3600, Duration::from_secs(5)), 1_000_000 + 3_595_000);
        assert_eq!(expires_at(1_000_000, 0, Duration::from_secs(5)), 995_000);
    }

    #[tokio::test]
    async fn save_load_clear() {
        let vault = CredentialVault::new(Arc::new(MemoryStore::new()), Duration::from_secs(5));
        let at = vault.save(&tokens(3600)).await.unwrap();
        let creds = vault.load().await.unwrap();
        assert_eq!(creds.expires_at, Some(at));
        assert_eq!(creds.valid_access_token(now_ms()), Some("a"));
        assert_eq!(creds.valid_access_token(at), None);

        vault.clear().await.unwrap();
        assert_eq!(vault.load().await.unwrap(), StoredCredentials::default());
    }

    #[tokio::test]
    async fn short_lived_token_is_already_expired() {
        let vault = CredentialVault::new(Arc::new(MemoryStore::new()), Duration::from_secs(5));
        vault.save(&tokens(1)).await.unwrap();
        let creds = vault.load().await.unwrap();
        assert_eq!(creds.valid_access_token(now_ms()), None);
        assert_eq!(creds.refresh_token.as_deref(), Some("r"));
    }
}
