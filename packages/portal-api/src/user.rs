//! The authenticated user: `GET /api/v1/me`.

use wavepool_schema::described_struct;

described_struct! {
    /// The business an account belongs to.
    pub struct Business: "business information" {
        pub id: String => "business id",
        pub name: String => "business name",
        pub country: String => "business country",
        pub currency: String => "business currency",
    }
}

described_struct! {
    /// Response body of `GET /api/v1/me`.
    pub struct Me: "response body" {
        pub id: String => "user id",
        pub phone: String => "user phone number",
        pub created_at: String => "user creation timestamp",
        pub business: Business,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wavepool_schema::Described;

    #[test]
    fn nested_business_is_checked() {
        let me = json!({
            "id": "u1",
            "phone": "+221700000000",
            "created_at": "2026-01-01T00:00:00Z",
            "business": { "id": "b1", "name": "Dakar Shop", "country": "SN" }
        });
        let failures = Me::schema().report(&me);
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].path_string(), "$.business.currency");
    }
}
