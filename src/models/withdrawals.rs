use serde::{Deserialize, Serialize};

text_enum!(
    WithdrawalStatus {
        Requested => "requested",
        Paid => "paid",
        Rejected => "rejected",
    }
);

text_enum!(
    PaymentMethod {
        BankTransfer => "bank_transfer",
        Upi => "upi",
        GiftCard => "gift_card",
    }
);

#[derive(Clone, Debug, Deserialize, Serialize, sqlx::FromRow)]
pub struct Withdrawal {
    pub id: String,
    pub user_id: String,
    pub amount_in_cents: i64,
    pub payment_method: PaymentMethod,
    pub payment_details: String,
    pub status: WithdrawalStatus,
    pub processed_at: Option<chrono::NaiveDateTime>,
    pub created_at: chrono::NaiveDateTime,
    pub updated_at: chrono::NaiveDateTime,
}

#[derive(Clone, Debug, Deserialize)]
pub struct NewWithdrawal {
    pub amount_in_cents: i64,
    pub payment_method: PaymentMethod,
    pub payment_details: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct WithdrawalDecision {
    pub status: WithdrawalStatus,
}
