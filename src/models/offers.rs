use serde::{Deserialize, Serialize};

use super::{CashbackRule, CashbackType};

#[derive(Clone, Debug, Deserialize, Serialize, sqlx::FromRow)]
pub struct Offer {
    pub id: String,
    pub merchant_id: String,
    pub title: String,
    pub description: Option<String>,
    pub coupon_code: Option<String>,
    pub cashback_type: CashbackType,
    pub cashback_value: i64,
    pub starts_at: chrono::NaiveDateTime,
    pub ends_at: Option<chrono::NaiveDateTime>,
    pub active: bool,
    pub created_at: chrono::NaiveDateTime,
    pub updated_at: chrono::NaiveDateTime,
}

impl Offer {
    pub fn cashback_rule(&self) -> CashbackRule {
        CashbackRule {
            cashback_type: self.cashback_type,
            value: self.cashback_value,
        }
    }

    pub fn is_live(&self, now: chrono::NaiveDateTime) -> bool {
        self.active && self.starts_at <= now && self.ends_at.map_or(true, |end| now < end)
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct NewOffer {
    pub title: String,
    pub description: Option<String>,
    pub coupon_code: Option<String>,
    pub cashback_type: CashbackType,
    pub cashback_value: i64,
    pub starts_at: Option<chrono::NaiveDateTime>,
    pub ends_at: Option<chrono::NaiveDateTime>,
}

impl NewOffer {
    pub fn cashback_rule(&self) -> CashbackRule {
        CashbackRule {
            cashback_type: self.cashback_type,
            value: self.cashback_value,
        }
    }
}
