//! Fixtures for tests that run against a migrated database.

use sqlx::PgPool;

use super::{
    clicks::ClickRepository,
    merchants::{MerchantRepository, NewMerchantOutcome},
    transactions::{TransactionOutcome, TransactionRepository},
    users::{NewUserOutcome, UserRepository},
};
use crate::models::{
    clicks::{Click, NewClick},
    merchants::{Merchant, NewMerchant},
    transactions::{AffiliateWebhookEvent, TransactionStatus},
    users::{NewUser, User},
    CashbackType,
};

pub async fn user(pool: &PgPool, email: &str, referral_code: Option<&str>) -> User {
    let new_user = NewUser {
        email: email.to_string(),
        name: email.split('@').next().unwrap_or(email).to_string(),
        referral_code: referral_code.map(str::to_string),
    };

    match UserRepository::new(pool.clone())
        .insert_user(&new_user)
        .await
        .unwrap()
    {
        NewUserOutcome::Created(user) => user,
        _ => panic!("could not create user {}", email),
    }
}

pub async fn merchant(
    pool: &PgPool,
    slug: &str,
    cashback_type: CashbackType,
    cashback_value: i64,
) -> Merchant {
    let new_merchant = NewMerchant {
        name: slug.to_string(),
        slug: slug.to_string(),
        website_url: format!("https://{}.example", slug),
        tracking_url_template: format!("https://aff.example/{}?sub={{click_token}}", slug),
        cashback_type,
        cashback_value,
    };

    match MerchantRepository::new(pool.clone())
        .insert_merchant(&new_merchant)
        .await
        .unwrap()
    {
        NewMerchantOutcome::Created(merchant) => merchant,
        NewMerchantOutcome::SlugTaken => panic!("slug {} already taken", slug),
    }
}

pub async fn click(pool: &PgPool, user_id: Option<&str>, merchant_id: &str) -> Click {
    let new_click = NewClick {
        user_id: user_id.map(str::to_string),
        merchant_id: merchant_id.to_string(),
        offer_id: None,
    };

    ClickRepository::new(pool.clone())
        .insert_click(&new_click, Some("10.0.0.1"), Some("test-agent"))
        .await
        .unwrap()
}

pub fn event(
    click: &Click,
    order_id: &str,
    amount: i64,
    status: TransactionStatus,
) -> AffiliateWebhookEvent {
    AffiliateWebhookEvent {
        click_token: click.click_token.clone(),
        order_id: order_id.to_string(),
        order_amount_in_cents: amount,
        status,
    }
}

/// A fresh user holding exactly `cashback` cents of confirmed cashback.
pub async fn user_with_confirmed_cashback(pool: &PgPool, cashback: i64) -> String {
    let tag = uuid::Uuid::new_v4().simple().to_string();
    let user = user(pool, &format!("{}@example.com", tag), None).await;
    let merchant = merchant(pool, &tag, CashbackType::Flat, cashback).await;
    let click = click(pool, Some(user.id.as_str()), &merchant.id).await;

    let outcome = TransactionRepository::new(pool.clone())
        .record_event(
            &event(&click, "ORD-FIXTURE", cashback, TransactionStatus::Confirmed),
            0,
        )
        .await
        .unwrap();
    assert!(matches!(outcome, TransactionOutcome::Recorded(_)));

    user.id
}
