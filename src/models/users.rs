use serde::{Deserialize, Serialize};

use super::wallet::Wallet;

#[derive(Clone, Debug, Deserialize, Serialize, sqlx::FromRow)]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: String,
    pub referral_code: String,
    pub referred_by: Option<String>,
    pub created_at: chrono::NaiveDateTime,
    pub updated_at: chrono::NaiveDateTime,
}

#[derive(Clone, Debug, Deserialize)]
pub struct NewUser {
    pub email: String,
    pub name: String,
    pub referral_code: Option<String>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct UserDetails {
    #[serde(flatten)]
    pub user: User,
    pub wallet: Wallet,
    pub referral_count: i64,
}

/// A user brought in by a referrer, and whether their one-time bonus was paid.
#[derive(Clone, Debug, Deserialize, Serialize, sqlx::FromRow)]
pub struct ReferredUser {
    pub id: String,
    pub name: String,
    pub created_at: chrono::NaiveDateTime,
    pub bonus_paid: bool,
}
