use serde::{Deserialize, Serialize};

text_enum!(
    TransactionStatus {
        Pending => "pending",
        Confirmed => "confirmed",
        Cancelled => "cancelled",
    }
);

#[derive(Clone, Debug, Deserialize, Serialize, sqlx::FromRow)]
pub struct Transaction {
    pub id: String,
    pub click_id: String,
    pub user_id: Option<String>,
    pub merchant_id: String,
    pub network_order_id: String,
    pub order_amount_in_cents: i64,
    pub cashback_in_cents: i64,
    pub status: TransactionStatus,
    pub confirmed_at: Option<chrono::NaiveDateTime>,
    pub created_at: chrono::NaiveDateTime,
    pub updated_at: chrono::NaiveDateTime,
}

/// Purchase report posted by an affiliate network.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct AffiliateWebhookEvent {
    pub click_token: String,
    pub order_id: String,
    pub order_amount_in_cents: i64,
    pub status: TransactionStatus,
}

#[derive(Clone, Debug, Deserialize)]
pub struct TransactionStatusUpdate {
    pub status: TransactionStatus,
}

/// Result of applying a webhook or status update.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct RecordedTransaction {
    pub transaction: Transaction,
    pub created: bool,
    pub referral_bonus_paid: bool,
}
