use serde::{Deserialize, Serialize};

use super::{CashbackRule, CashbackType};

pub const CLICK_TOKEN_PLACEHOLDER: &str = "{click_token}";

#[derive(Clone, Debug, Deserialize, Serialize, sqlx::FromRow)]
pub struct Merchant {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub website_url: String,
    pub tracking_url_template: String,
    pub cashback_type: CashbackType,
    pub cashback_value: i64,
    pub active: bool,
    pub created_at: chrono::NaiveDateTime,
    pub updated_at: chrono::NaiveDateTime,
}

impl Merchant {
    pub fn cashback_rule(&self) -> CashbackRule {
        CashbackRule {
            cashback_type: self.cashback_type,
            value: self.cashback_value,
        }
    }

    /// Builds the outbound affiliate link for a click.
    pub fn tracking_url(&self, click_token: &str) -> String {
        let template = &self.tracking_url_template;

        if template.contains(CLICK_TOKEN_PLACEHOLDER) {
            template.replace(CLICK_TOKEN_PLACEHOLDER, click_token)
        } else if template.contains('?') {
            format!("{}&click_token={}", template, click_token)
        } else {
            format!("{}?click_token={}", template, click_token)
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct NewMerchant {
    pub name: String,
    pub slug: String,
    pub website_url: String,
    pub tracking_url_template: String,
    pub cashback_type: CashbackType,
    pub cashback_value: i64,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct MerchantUpdate {
    pub tracking_url_template: Option<String>,
    pub cashback_type: Option<CashbackType>,
    pub cashback_value: Option<i64>,
    pub active: Option<bool>,
}

impl NewMerchant {
    pub fn cashback_rule(&self) -> CashbackRule {
        CashbackRule {
            cashback_type: self.cashback_type,
            value: self.cashback_value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn merchant(template: &str) -> Merchant {
        let now = chrono::Utc::now().naive_utc();
        Merchant {
            id: "m1".to_string(),
            name: "Shop".to_string(),
            slug: "shop".to_string(),
            website_url: "https://shop.example".to_string(),
            tracking_url_template: template.to_string(),
            cashback_type: CashbackType::Percentage,
            cashback_value: 500,
            active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn substitutes_placeholder() {
        let m = merchant("https://aff.example/r?m=shop&sub={click_token}");
        assert_eq!(m.tracking_url("abc"), "https://aff.example/r?m=shop&sub=abc");
    }

    #[test]
    fn appends_token_when_placeholder_missing() {
        assert_eq!(
            merchant("https://aff.example/r").tracking_url("abc"),
            "https://aff.example/r?click_token=abc"
        );
        assert_eq!(
            merchant("https://aff.example/r?m=1").tracking_url("abc"),
            "https://aff.example/r?m=1&click_token=abc"
        );
    }
}
