//! Authentication types: `POST /api/v1/auth`, `POST /api/v1/auth/refresh`,
//! `DELETE /api/v1/auth/logout`.

use serde::{Deserialize, Serialize};
use wavepool_schema::{described_struct, string, union, Described, Schema};

described_struct! {
    /// Phone number and PIN submitted by the login form.
    pub struct Credentials: "request body" {
        pub phone: String => "user phone number",
        pub pin: String => "user pin code",
    }
}

described_struct! {
    /// A fresh access/refresh token pair.
    ///
    /// ```json
    /// { "access_token": "eyJ...", "refresh_token": "eyJ...", "expires_in": 3600 }
    /// ```
    pub struct TokenPair: "response body" {
        pub access_token: String => "JWT access token",
        pub refresh_token: String => "JWT refresh token",
        pub expires_in: u64 => "token expiration time in seconds",
    }
}

described_struct! {
    /// Body of `POST /api/v1/auth/refresh`.
    pub struct RefreshRequest: "request body" {
        pub refresh_token: String => "JWT refresh token",
    }
}

described_struct! {
    /// Body of `DELETE /api/v1/auth/logout`.
    pub struct LogoutRequest: "request body" {
        pub refresh_token: String => "JWT refresh token",
    }
}

/// What `POST /api/v1/auth` answers with: either tokens, or a bare message
/// explaining why none were issued.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AuthOutcome {
    Tokens(TokenPair),
    Message(String),
}

impl Described for AuthOutcome {
    fn schema() -> Schema {
        union([TokenPair::schema(), string().describe("error message")])
    }
}
