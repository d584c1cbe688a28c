//! Session and portal flows against the mock backend.
//!
//! | Test | Behavior |
//! |------|----------|
//! | `login_stores_tokens_and_loads_user` | login → credentials stored, user cell filled |
//! | `login_rejected_with_message` | string outcome surfaces as `Rejected` |
//! | `wrong_pin_is_an_api_error` | 400 propagates |
//! | `concurrent_callers_share_one_refresh` | single-flight refresh |
//! | `failed_refresh_clears_credentials` | unusable refresh token |
//! | `unauthorized_call_clears_credentials` | 401 forces re-login |
//! | `logout_revokes_and_forgets` | logout flow |
//! | `api_key_lifecycle` | create, list, revoke |
//! | `webhook_lifecycle` | create, list, update, delete |
//! | `transactions_dashboard` | listing + stats |
//! | `portal_view_follows_session` | view resolution and redirects |
//! | `sqlite_credentials_survive_restart` | durable store |

use std::sync::Arc;
use std::time::Duration;

use wavepool_client::{
    ClientError, FetchOptions, LoginOutcome, MemoryHistory, MemoryStore, Portal, SessionError,
    SqliteStore, Tab, View,
};
use wavepool_portal_api::{
    ApiKeyId, CreateApiKeyRequest, CreateWebhookRequest, Credentials, RefreshRequest, SessionBadge,
    SigningStrategy, TransactionStats, WebhookEvent, WebhookId, WebhookStatus,
};
use wavepool_testkit::{checkout_session, config, spawn_portal, PortalState, LOCKED_PHONE, PHONE, PIN};

fn portal(base: &str) -> Portal {
    let history = Arc::new(MemoryHistory::new("https://portal.test/"));
    Portal::with_store(config(base), Arc::new(MemoryStore::new()), history).unwrap()
}

fn credentials() -> Credentials {
    Credentials {
        phone: PHONE.into(),
        pin: PIN.into(),
    }
}

async fn signed_in(base: &str) -> Portal {
    let portal = portal(base);
    let outcome = portal.session().login(credentials()).await.unwrap();
    assert!(matches!(outcome, LoginOutcome::SignedIn(_)));
    portal
}

#[tokio::test]
async fn login_stores_tokens_and_loads_user() {
    let (base, _) = spawn_portal().await;
    let portal = portal(&base);
    let outcome = portal.session().login(credentials()).await.unwrap();

    assert_eq!(outcome, LoginOutcome::SignedIn(PortalState::me()));
    assert_eq!(portal.session().user().data(), Some(PortalState::me()));
    let stored = portal.session().vault().load().await.unwrap();
    assert!(stored.access_token.unwrap().starts_with("at_"));
    assert!(stored.refresh_token.unwrap().starts_with("rt_"));
    assert!(stored.expires_at.is_some());
}

#[tokio::test]
async fn login_rejected_with_message() {
    let (base, _) = spawn_portal().await;
    let portal = portal(&base);
    let outcome = portal
        .session()
        .login(Credentials {
            phone: LOCKED_PHONE.into(),
            pin: PIN.into(),
        })
        .await
        .unwrap();
    assert_eq!(outcome, LoginOutcome::Rejected("account locked".into()));
    assert!(!portal.session().signed_in());
}

#[tokio::test]
async fn wrong_pin_is_an_api_error() {
    let (base, _) = spawn_portal().await;
    let portal = portal(&base);
    let err = portal
        .session()
        .login(Credentials {
            phone: PHONE.into(),
            pin: "0000".into(),
        })
        .await
        .unwrap_err();
    match err.client() {
        Some(ClientError::Api { status, message, .. }) => {
            assert_eq!(*status, 400);
            assert_eq!(message, "invalid pin");
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test]
async fn concurrent_callers_share_one_refresh() {
    let (base, state) = spawn_portal().await;
    // issued tokens expire before the client's safety margin
    state.set_token_ttl(0);
    let portal = Arc::new(signed_in(&base).await);
    state.set_token_ttl(3600);
    state.set_refresh_delay(Duration::from_millis(100));

    let calls: Vec<_> = (0..5)
        .map(|_| {
            let portal = Arc::clone(&portal);
            tokio::spawn(async move { portal.session().ensure_valid_token().await })
        })
        .collect();
    let mut tokens = Vec::new();
    for call in calls {
        tokens.push(call.await.unwrap().unwrap().unwrap());
    }

    assert_eq!(state.refresh_calls(), 1);
    assert!(tokens.windows(2).all(|w| w[0] == w[1]));
}

#[tokio::test]
async fn failed_refresh_clears_credentials() {
    let (base, state) = spawn_portal().await;
    state.set_token_ttl(0);
    let portal = signed_in(&base).await;

    // someone else spends the refresh token first
    let stored = portal.session().vault().load().await.unwrap();
    portal
        .api()
        .refresh
        .fetch(
            RefreshRequest {
                refresh_token: stored.refresh_token.unwrap(),
            },
            &FetchOptions::new(),
        )
        .await
        .unwrap();

    assert_eq!(portal.session().ensure_valid_token().await.unwrap(), None);
    assert_eq!(
        portal.session().vault().load().await.unwrap(),
        Default::default()
    );
    assert!(!portal.session().signed_in());
}

#[tokio::test]
async fn unauthorized_call_clears_credentials() {
    let (base, state) = spawn_portal().await;
    let portal = signed_in(&base).await;
    state.revoke_access_tokens();

    let session = portal.session();
    let err = session
        .call(&portal.api().list_api_keys, ())
        .await
        .unwrap_err();
    assert!(err.client().is_some_and(ClientError::is_unauthorized));
    assert_eq!(session.vault().load().await.unwrap(), Default::default());
    assert!(session.user().state().is_empty());
    assert!(matches!(
        session.call(&portal.api().list_api_keys, ()).await,
        Err(SessionError::SignedOut)
    ));
}

#[tokio::test]
async fn logout_revokes_and_forgets() {
    let (base, _) = spawn_portal().await;
    let portal = signed_in(&base).await;
    let refresh_token = portal
        .session()
        .vault()
        .load()
        .await
        .unwrap()
        .refresh_token
        .unwrap();

    portal.logout().await.unwrap();

    assert!(!portal.session().signed_in());
    assert_eq!(portal.navigator().location().param("nav").as_deref(), Some("login"));
    let err = portal
        .api()
        .refresh
        .fetch(
            RefreshRequest { refresh_token },
            &FetchOptions::new(),
        )
        .await
        .unwrap_err();
    assert!(err.is_unauthorized());
}

#[tokio::test]
async fn api_key_lifecycle() {
    let (base, _) = spawn_portal().await;
    let portal = signed_in(&base).await;
    let session = portal.session();
    let api = portal.api();

    let created = session
        .call(
            &api.create_api_key,
            CreateApiKeyRequest {
                env: "prod".into(),
                scopes: vec!["checkout".into()],
            },
        )
        .await
        .unwrap();
    assert!(created.secret_key.starts_with(&created.prefix));

    let keys = session.call(&api.list_api_keys, ()).await.unwrap();
    assert_eq!(keys.len(), 1);
    assert_eq!(keys[0].id, created.id);
    assert!(keys[0].is_active());

    session
        .call(&api.revoke_api_key, ApiKeyId { key_id: created.id })
        .await
        .unwrap();
    let keys = session.call(&api.list_api_keys, ()).await.unwrap();
    assert!(!keys[0].is_active());
}

#[tokio::test]
async fn webhook_lifecycle() {
    let (base, state) = spawn_portal().await;
    let portal = signed_in(&base).await;
    let session = portal.session();
    let api = portal.api();

    let created = session
        .call(
            &api.create_webhook,
            CreateWebhookRequest {
                url: "https://shop.example/hooks".into(),
                signing_strategy: SigningStrategy::SigningSecret,
                events: vec![WebhookEvent::CheckoutSessionCompleted],
            },
        )
        .await
        .unwrap();
    assert!(created.secret.as_deref().is_some_and(|s| s.starts_with("whsec_")));

    let listed = session.call(&api.list_webhooks, ()).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert!(listed[0].secret.is_none());

    let mut update = listed[0].to_update();
    update.events.push(WebhookEvent::CheckoutSessionPaymentFailed);
    update.status = WebhookStatus::Revoked;
    let updated = session.call(&api.update_webhook, update).await.unwrap();
    assert_eq!(updated.events.len(), 2);
    assert_eq!(updated.status, WebhookStatus::Revoked);

    session
        .call(
            &api.delete_webhook,
            WebhookId {
                webhook_id: created.id,
            },
        )
        .await
        .unwrap();
    assert!(state.webhooks().is_empty());
}

#[tokio::test]
async fn transactions_dashboard() {
    let (base, state) = spawn_portal().await;
    state.seed_sessions(vec![
        checkout_session("cos_1", "complete", "succeeded"),
        checkout_session("cos_2", "complete", "cancelled"),
        checkout_session("cos_3", "expired", "processing"),
        checkout_session("cos_4", "open", "processing"),
    ]);
    let portal = signed_in(&base).await;

    let page = portal
        .session()
        .call(&portal.api().checkout_sessions, ())
        .await
        .unwrap();
    assert_eq!(page.total, 4);
    let stats = TransactionStats::from_sessions(&page.sessions);
    assert_eq!((stats.total, stats.successful, stats.failed), (4, 1, 2));
    let badges: Vec<SessionBadge> = page.sessions.iter().map(|s| s.badge()).collect();
    assert_eq!(
        badges,
        [
            SessionBadge::Completed,
            SessionBadge::Failed,
            SessionBadge::Expired,
            SessionBadge::Pending
        ]
    );
}

#[tokio::test]
async fn portal_view_follows_session() {
    let (base, _) = spawn_portal().await;
    let portal = portal(&base);
    assert_eq!(portal.refresh_view().await.unwrap(), View::Login);

    portal.session().login(credentials()).await.unwrap();
    let view = portal.refresh_view().await.unwrap();
    assert_eq!(
        view,
        View::DevPortal {
            tab: Tab::ApiKeys,
            dialog: None
        }
    );
    let location = portal.navigator().location();
    assert_eq!(location.param("nav").as_deref(), Some("dev-portal"));
    assert_eq!(location.param("tab").as_deref(), Some("api-keys"));
}

#[tokio::test]
async fn sqlite_credentials_survive_restart() {
    let (base, _) = spawn_portal().await;
    let store = Arc::new(SqliteStore::open_in_memory().unwrap());
    let history = || Arc::new(MemoryHistory::new("https://portal.test/"));

    let first = Portal::with_store(config(&base), store.clone(), history()).unwrap();
    first.session().login(credentials()).await.unwrap();
    drop(first);

    let second = Portal::with_store(config(&base), store, history()).unwrap();
    let me = second.session().sync_user().await.unwrap();
    assert_eq!(me, Some(PortalState::me()));
}
