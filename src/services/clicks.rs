use async_trait::async_trait;
use sqlx::PgPool;
use tokio::sync::oneshot;

use super::{RequestHandler, Service, ServiceError};
use crate::{
    models::{clicks, merchants::Merchant, offers::Offer},
    repositories::{
        clicks::ClickRepository, merchants::MerchantRepository, offers::OfferRepository,
        users::UserRepository,
    },
};

/// Request metadata stored with a click.
#[derive(Clone, Debug, Default)]
pub struct ClickContext {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

pub enum ClickRequest {
    TrackClick {
        click: clicks::NewClick,
        context: ClickContext,
        response: oneshot::Sender<Result<clicks::TrackedClick, ServiceError>>,
    },
    TrackMerchantClick {
        slug: String,
        user_id: Option<String>,
        context: ClickContext,
        response: oneshot::Sender<Result<clicks::TrackedClick, ServiceError>>,
    },
    GetClick {
        token: String,
        response: oneshot::Sender<Result<clicks::Click, ServiceError>>,
    },
}

/// A click may only point at an active merchant and, optionally, one of its live offers.
pub fn check_click_target(
    merchant: &Merchant,
    offer: Option<&Offer>,
    now: chrono::NaiveDateTime,
) -> Result<(), ServiceError> {
    if !merchant.active {
        return Err(ServiceError::Validation(format!(
            "Merchant {} is not active.",
            merchant.slug
        )));
    }

    if let Some(offer) = offer {
        if offer.merchant_id != merchant.id {
            return Err(ServiceError::Validation(format!(
                "Offer {} does not belong to merchant {}.",
                offer.id, merchant.slug
            )));
        }
        if !offer.is_live(now) {
            return Err(ServiceError::Validation(format!(
                "Offer {} is not live.",
                offer.id
            )));
        }
    }

    Ok(())
}

#[derive(Clone)]
pub struct ClickRequestHandler {
    clicks: ClickRepository,
    merchants: MerchantRepository,
    offers: OfferRepository,
    users: UserRepository,
}

impl ClickRequestHandler {
    pub fn new(sql_conn: PgPool) -> Self {
        ClickRequestHandler {
            clicks: ClickRepository::new(sql_conn.clone()),
            merchants: MerchantRepository::new(sql_conn.clone()),
            offers: OfferRepository::new(sql_conn.clone()),
            users: UserRepository::new(sql_conn),
        }
    }

    async fn track_click(
        &self,
        click: clicks::NewClick,
        context: ClickContext,
    ) -> Result<clicks::TrackedClick, ServiceError> {
        let merchant = self
            .merchants
            .get_merchant(&click.merchant_id)
            .await
            .map_err(|e| ServiceError::Database(e.to_string()))?
            .ok_or_else(|| ServiceError::NotFound(format!("Merchant {}", click.merchant_id)))?;

        self.record(merchant, click, context).await
    }

    async fn track_merchant_click(
        &self,
        slug: &str,
        user_id: Option<String>,
        context: ClickContext,
    ) -> Result<clicks::TrackedClick, ServiceError> {
        let merchant = self
            .merchants
            .get_merchant_by_slug(slug)
            .await
            .map_err(|e| ServiceError::Database(e.to_string()))?
            .ok_or_else(|| ServiceError::NotFound(format!("Merchant {}", slug)))?;

        let click = clicks::NewClick {
            user_id,
            merchant_id: merchant.id.clone(),
            offer_id: None,
        };

        self.record(merchant, click, context).await
    }

    async fn record(
        &self,
        merchant: Merchant,
        click: clicks::NewClick,
        context: ClickContext,
    ) -> Result<clicks::TrackedClick, ServiceError> {
        let offer = match &click.offer_id {
            Some(offer_id) => Some(
                self.offers
                    .get_offer(offer_id)
                    .await
                    .map_err(|e| ServiceError::Database(e.to_string()))?
                    .ok_or_else(|| ServiceError::NotFound(format!("Offer {}", offer_id)))?,
            ),
            None => None,
        };

        check_click_target(&merchant, offer.as_ref(), chrono::Utc::now().naive_utc())?;

        if let Some(user_id) = &click.user_id {
            self.users
                .get_user_by_id(user_id)
                .await
                .map_err(|e| ServiceError::Database(e.to_string()))?
                .ok_or_else(|| ServiceError::NotFound(format!("User {}", user_id)))?;
        }

        let click = self
            .clicks
            .insert_click(
                &click,
                context.ip_address.as_deref(),
                context.user_agent.as_deref(),
            )
            .await
            .map_err(|e| ServiceError::Repository("Clicks".to_string(), e.to_string()))?;

        log::debug!(
            "Tracked click {} on {} for user {:?}.",
            click.click_token,
            merchant.slug,
            click.user_id
        );

        let redirect_url = merchant.tracking_url(&click.click_token);

        Ok(clicks::TrackedClick {
            click,
            redirect_url,
        })
    }

    async fn get_click(&self, token: &str) -> Result<clicks::Click, ServiceError> {
        self.clicks
            .get_click_by_token(token)
            .await
            .map_err(|e| ServiceError::Database(e.to_string()))?
            .ok_or_else(|| ServiceError::NotFound(format!("Click {}", token)))
    }
}

#[async_trait]
impl RequestHandler<ClickRequest> for ClickRequestHandler {
    async fn handle_request(&self, request: ClickRequest) {
        match request {
            ClickRequest::TrackClick {
                click,
                context,
                response,
            } => {
                let _ = response.send(self.track_click(click, context).await);
            }
            ClickRequest::TrackMerchantClick {
                slug,
                user_id,
                context,
                response,
            } => {
                let tracked = self.track_merchant_click(&slug, user_id, context).await;
                let _ = response.send(tracked);
            }
            ClickRequest::GetClick { token, response } => {
                let _ = response.send(self.get_click(&token).await);
            }
        }
    }
}

pub struct ClickService;

impl ClickService {
    pub fn new() -> Self {
        ClickService {}
    }
}

#[async_trait]
impl Service<ClickRequest, ClickRequestHandler> for ClickService {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CashbackType;
    use chrono::{Duration, NaiveDateTime, Utc};

    fn merchant(active: bool) -> Merchant {
        let now = Utc::now().naive_utc();
        Merchant {
            id: "m1".to_string(),
            name: "Myntra".to_string(),
            slug: "myntra".to_string(),
            website_url: "https://www.myntra.com".to_string(),
            tracking_url_template: "https://aff.example/myntra?sub={click_token}".to_string(),
            cashback_type: CashbackType::Percentage,
            cashback_value: 600,
            active,
            created_at: now,
            updated_at: now,
        }
    }

    fn offer(merchant_id: &str, active: bool, ends_at: Option<NaiveDateTime>) -> Offer {
        let now = Utc::now().naive_utc();
        Offer {
            id: "o1".to_string(),
            merchant_id: merchant_id.to_string(),
            title: "End of season".to_string(),
            description: None,
            coupon_code: Some("EOSS".to_string()),
            cashback_type: CashbackType::Flat,
            cashback_value: 250,
            starts_at: now - Duration::days(1),
            ends_at,
            active,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn active_merchant_without_offer() {
        let now = Utc::now().naive_utc();
        assert!(check_click_target(&merchant(true), None, now).is_ok());
    }

    #[test]
    fn live_offer_of_same_merchant() {
        let now = Utc::now().naive_utc();
        let offer = offer("m1", true, Some(now + Duration::days(2)));
        assert!(check_click_target(&merchant(true), Some(&offer), now).is_ok());
    }

    #[test]
    fn rejects_inactive_merchant() {
        let now = Utc::now().naive_utc();
        assert!(matches!(
            check_click_target(&merchant(false), None, now),
            Err(ServiceError::Validation(_))
        ));
    }

    #[test]
    fn rejects_offer_of_other_merchant() {
        let now = Utc::now().naive_utc();
        let offer = offer("m2", true, None);
        assert!(matches!(
            check_click_target(&merchant(true), Some(&offer), now),
            Err(ServiceError::Validation(msg)) if msg.contains("does not belong")
        ));
    }

    #[test]
    fn rejects_offer_that_is_not_live() {
        let now = Utc::now().naive_utc();

        let expired = offer("m1", true, Some(now - Duration::hours(1)));
        assert!(matches!(
            check_click_target(&merchant(true), Some(&expired), now),
            Err(ServiceError::Validation(msg)) if msg.contains("not live")
        ));

        let disabled = offer("m1", false, None);
        assert!(check_click_target(&merchant(true), Some(&disabled), now).is_err());
    }
}
