//! API key management: `/api/v1/api-keys`.

use wavepool_schema::described_struct;

described_struct! {
    /// Body of `POST /api/v1/api-keys`.
    pub struct CreateApiKeyRequest: "request body" {
        pub env: String => "environment for the API key, e.g. 'prod'",
        pub scopes: Vec<String> => "array of scopes",
    }
}

described_struct! {
    /// A newly minted key. `secret_key` is only ever returned here.
    pub struct CreatedApiKey: "response body" {
        pub id: String => "API key ID",
        pub secret_key: String => "API key secret (only shown once)",
        pub prefix: String => "API key prefix",
        pub scopes: Vec<String> => "array of scopes",
        pub env: String => "environment for the API key",
    }
}

described_struct! {
    /// One entry of `GET /api/v1/api-keys`. Never carries the secret.
    pub struct ApiKeySummary: "API key object" {
        pub id: String => "API key ID",
        pub business_id: String => "associated business ID",
        pub prefix: String => "API key prefix",
        pub scopes: Vec<String> => "array of scopes",
        pub env: String => "environment for the API key",
        pub status: String => "API key status: active or revoked",
        pub created_at: String => "API key creation timestamp",
    }
}

/// Response body of `GET /api/v1/api-keys`.
pub type ApiKeyList = Vec<ApiKeySummary>;

described_struct! {
    /// Path parameter of `DELETE /api/v1/api-keys/{key_id}`.
    pub struct ApiKeyId: "path parameter" {
        pub key_id: String => "ID of the API key to revoke",
    }
}

impl ApiKeySummary {
    pub fn is_active(&self) -> bool {
        self.status == "active"
    }
}
