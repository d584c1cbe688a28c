//! Checkout sessions as shown on the transactions tab:
//! `GET /api/v1/portal/checkout-sessions`.

use std::fmt;

use wavepool_schema::described_struct;

described_struct! {
    /// One checkout session.
    ///
    /// `checkout_status` is one of `open`, `complete`, `expired`;
    /// `payment_status` is one of `processing`, `cancelled`, `succeeded`.
    /// Both are kept as free strings so that new backend states do not break
    /// decoding; [`CheckoutSession::badge`] maps unknown combinations to
    /// [`SessionBadge::Unknown`].
    pub struct CheckoutSession: "checkout session" {
        pub id: String => "checkout session ID",
        pub amount: String => "amount as a decimal string",
        pub currency: String => "ISO currency code",
        pub checkout_status: String => "open, complete or expired",
        pub payment_status: String => "processing, cancelled or succeeded",
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub client_reference: Option<String> => "merchant reference",
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub transaction_id: Option<String> => "transaction ID once paid",
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub business_name: Option<String> => "name of the receiving business",
        pub when_created: String => "creation timestamp",
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub when_expires: Option<String> => "expiry timestamp",
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub when_completed: Option<String> => "completion timestamp",
    }
}

described_struct! {
    /// Response body of `GET /api/v1/portal/checkout-sessions`.
    pub struct CheckoutSessionList: "response body" {
        pub sessions: Vec<CheckoutSession> => "most recent sessions",
        pub total: u64 => "number of sessions returned",
    }
}

/// Display status of a checkout session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionBadge {
    Completed,
    Failed,
    Expired,
    Pending,
    Unknown,
}

impl fmt::Display for SessionBadge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SessionBadge::Completed => "Completed",
            SessionBadge::Failed => "Failed",
            SessionBadge::Expired => "Expired",
            SessionBadge::Pending => "Pending",
            SessionBadge::Unknown => "Unknown",
        };
        f.write_str(label)
    }
}

impl CheckoutSession {
    pub fn badge(&self) -> SessionBadge {
        match (self.checkout_status.as_str(), self.payment_status.as_str()) {
            ("complete", "succeeded") => SessionBadge::Completed,
            ("complete", "cancelled") => SessionBadge::Failed,
            ("expired", _) => SessionBadge::Expired,
            ("open", _) => SessionBadge::Pending,
            _ => SessionBadge::Unknown,
        }
    }
}

/// Aggregate counts over a page of sessions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransactionStats {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
}

impl TransactionStats {
    pub fn from_sessions(sessions: &[CheckoutSession]) -> Self {
        let successful = sessions
            .iter()
            .filter(|s| s.payment_status == "succeeded")
            .count();
        let failed = sessions
            .iter()
            .filter(|s| s.payment_status == "cancelled" || s.checkout_status == "expired")
            .count();
        Self {
            total: sessions.len(),
            successful,
            failed,
        }
    }
}
