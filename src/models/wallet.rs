use serde::{Deserialize, Serialize};

/// Per-user balances in cents, derived from transactions, referral bonuses and withdrawals.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Wallet {
    pub pending: i64,
    pub confirmed: i64,
    pub referral: i64,
    pub withdrawn: i64,
    pub paid: i64,
    pub available: i64,
}

/// Raw aggregate sums as returned by the ledger query.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, sqlx::FromRow)]
pub struct WalletTotals {
    pub pending: i64,
    pub confirmed: i64,
    pub referral: i64,
    pub withdrawn: i64,
    pub paid: i64,
}
