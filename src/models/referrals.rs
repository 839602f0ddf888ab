use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Deserialize, Serialize, sqlx::FromRow)]
pub struct ReferralBonus {
    pub id: String,
    pub referrer_id: String,
    pub referred_user_id: String,
    pub transaction_id: String,
    pub amount_in_cents: i64,
    pub created_at: chrono::NaiveDateTime,
}
