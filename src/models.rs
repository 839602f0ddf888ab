pub mod clicks;
pub mod merchants;
pub mod offers;
pub mod referrals;
pub mod transactions;
pub mod users;
pub mod wallet;
pub mod withdrawals;

#[derive(Debug, thiserror::Error)]
#[error("Invalid {kind}: {value}")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

text_enum!(
    /// How a merchant or offer pays cashback.
    CashbackType {
        Percentage => "percentage",
        Flat => "flat",
    }
);

/// A cashback rule. `value` is basis points for percentages and cents for flat amounts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct CashbackRule {
    pub cashback_type: CashbackType,
    pub value: i64,
}
