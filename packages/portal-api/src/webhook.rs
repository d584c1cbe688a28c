//! Webhook subscriptions: `/api/v1/webhooks`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use wavepool_schema::{described_struct, list, Described, Schema};

/// Declares a closed string enum whose wire names double as the allowed
/// values of a `list` schema.
macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident: $desc:literal {
            $( $variant:ident = $wire:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $( #[serde(rename = $wire)] $variant, )+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $( $name::$variant => $wire, )+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $( $wire => Ok($name::$variant), )+
                    other => Err(format!(
                        "unknown {}: {other} (expected one of: {})",
                        stringify!($name),
                        [$($wire),+].join(", ")
                    )),
                }
            }
        }

        impl Described for $name {
            fn schema() -> Schema {
                list($name::ALL.iter().map(|v| v.as_str())).describe($desc)
            }
        }
    };
}

wire_enum! {
    /// How deliveries to a webhook are signed.
    pub enum SigningStrategy: "signing strategy" {
        SharedSecret = "shared_secret",
        SigningSecret = "signing_secret",
    }
}

wire_enum! {
    pub enum WebhookStatus: "webhook status" {
        Active = "active",
        Revoked = "revoked",
    }
}

wire_enum! {
    /// Event types a webhook can subscribe to.
    pub enum WebhookEvent: "event type" {
        B2bPaymentReceived = "b2b.payment_received",
        B2bPaymentFailed = "b2b.payment_failed",
        CheckoutSessionCompleted = "checkout.session.completed",
        CheckoutSessionPaymentFailed = "checkout.session.payment_failed",
        MerchantPaymentReceived = "merchant.payment_received",
    }
}

described_struct! {
    /// Body of `POST /api/v1/webhooks`.
    pub struct CreateWebhookRequest: "request body" {
        pub url: String => "URL to receive webhook events",
        pub signing_strategy: SigningStrategy,
        pub events: Vec<WebhookEvent> => "events to subscribe to",
    }
}

described_struct! {
    /// A registered webhook. `secret` is present only in the response that
    /// created it.
    pub struct Webhook: "webhook object" {
        pub id: String => "webhook ID",
        pub business_id: String => "associated business ID",
        pub url: String => "URL receiving webhook events",
        pub signing_strategy: SigningStrategy,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub secret: Option<String> => "webhook secret (only shown once)",
        pub events: Vec<WebhookEvent> => "subscribed events",
        pub status: WebhookStatus,
        pub created_at: String => "webhook creation timestamp",
        pub updated_at: String => "webhook last update timestamp",
    }
}

/// Response body of `GET /api/v1/webhooks`.
pub type WebhookList = Vec<Webhook>;

described_struct! {
    /// Body of `PUT /api/v1/webhooks/{webhook_id}`. The id fills the path
    /// placeholder and is not sent in the body.
    pub struct UpdateWebhookRequest: "request body" {
        pub webhook_id: String => "ID of the webhook to update",
        pub url: String => "URL to receive webhook events",
        pub signing_strategy: SigningStrategy,
        pub events: Vec<WebhookEvent> => "events to subscribe to",
        pub status: WebhookStatus,
    }
}

described_struct! {
    /// Path parameter of `DELETE /api/v1/webhooks/{webhook_id}`.
    pub struct WebhookId: "path parameter" {
        pub webhook_id: String => "ID of the webhook to delete",
    }
}

impl Webhook {
    /// The update request that would leave this webhook unchanged.
    pub fn to_update(&self) -> UpdateWebhookRequest {
        UpdateWebhookRequest {
            webhook_id: self.id.clone(),
            url: self.url.clone(),
            signing_strategy: self.signing_strategy,
            events: self.events.clone(),
            status: self.status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn wire_names_round_trip_through_from_str() {
        for event in WebhookEvent::ALL {
            assert_eq!(event.as_str().parse::<WebhookEvent>().unwrap(), *event);
        }
        let err = "checkout.created".parse::<WebhookEvent>().unwrap_err();
        assert!(err.contains("checkout.session.completed"));
    }

    #[test]
    fn events_schema_rejects_unknown_names() {
        let schema = CreateWebhookRequest::schema();
        let body = json!({
            "url": "https://example.com/hook",
            "signing_strategy": "shared_secret",
            "events": ["b2b.payment_received", "refund.created"]
        });
        let failures = schema.report(&body);
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].path_string(), "$.events[1]");
        assert_eq!(failures[0].expected.as_ref().unwrap().len(), 5);
    }

    #[test]
    fn serde_uses_wire_names() {
        let v = serde_json::to_value(SigningStrategy::SigningSecret).unwrap();
        assert_eq!(v, json!("signing_secret"));
    }

    #[test]
    fn to_update_copies_editable_fields() {
        let hook = Webhook {
            id: "wh_1".into(),
            business_id: "b1".into(),
            url: "https://example.com".into(),
            signing_strategy: SigningStrategy::SharedSecret,
            secret: Some("whsec".into()),
            events: vec![WebhookEvent::MerchantPaymentReceived],
            status: WebhookStatus::Active,
            created_at: "t".into(),
            updated_at: "t".into(),
        };
        let update = hook.to_update();
        assert_eq!(update.webhook_id, "wh_1");
        assert_eq!(update.events, hook.events);
    }
}
