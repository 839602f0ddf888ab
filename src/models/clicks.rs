use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Deserialize, Serialize, sqlx::FromRow)]
pub struct Click {
    pub id: String,
    pub click_token: String,
    pub user_id: Option<String>,
    pub merchant_id: String,
    pub offer_id: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: chrono::NaiveDateTime,
}

#[derive(Clone, Debug, Deserialize)]
pub struct NewClick {
    pub user_id: Option<String>,
    pub merchant_id: String,
    pub offer_id: Option<String>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct TrackedClick {
    pub click: Click,
    pub redirect_url: String,
}

/// Generates an opaque 32 hex character click token.
pub fn new_click_token() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn click_tokens_are_unique_hex() {
        let a = new_click_token();
        let b = new_click_token();
        assert_eq!(a.len(), 32);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }
}
