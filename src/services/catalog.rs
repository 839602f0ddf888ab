use async_trait::async_trait;
use sqlx::PgPool;
use tokio::sync::oneshot;

use super::{RequestHandler, Service, ServiceError};
use crate::{
    ledger,
    models::{merchants, offers},
    repositories::{
        merchants::{MerchantRepository, NewMerchantOutcome},
        offers::OfferRepository,
    },
};

pub enum CatalogRequest {
    CreateMerchant {
        merchant: merchants::NewMerchant,
        response: oneshot::Sender<Result<merchants::Merchant, ServiceError>>,
    },
    GetMerchant {
        id: String,
        response: oneshot::Sender<Result<merchants::Merchant, ServiceError>>,
    },
    ListMerchants {
        active_only: bool,
        response: oneshot::Sender<Result<Vec<merchants::Merchant>, ServiceError>>,
    },
    UpdateMerchant {
        id: String,
        update: merchants::MerchantUpdate,
        response: oneshot::Sender<Result<merchants::Merchant, ServiceError>>,
    },
    CreateOffer {
        merchant_id: String,
        offer: offers::NewOffer,
        response: oneshot::Sender<Result<offers::Offer, ServiceError>>,
    },
    GetOffer {
        id: String,
        response: oneshot::Sender<Result<offers::Offer, ServiceError>>,
    },
    ListOffers {
        merchant_id: Option<String>,
        live_only: bool,
        response: oneshot::Sender<Result<Vec<offers::Offer>, ServiceError>>,
    },
}

pub fn validate_new_merchant(merchant: &merchants::NewMerchant) -> Result<(), ServiceError> {
    if merchant.name.trim().is_empty() {
        return Err(ServiceError::Validation(
            "Merchant name cannot be empty.".to_string(),
        ));
    }
    if merchant.slug.is_empty()
        || !merchant
            .slug
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-')
    {
        return Err(ServiceError::Validation(format!(
            "Invalid merchant slug: {}.",
            merchant.slug
        )));
    }
    validate_tracking_template(&merchant.tracking_url_template)?;

    ledger::validate_rule(merchant.cashback_rule()).map_err(ServiceError::Validation)
}

pub fn validate_tracking_template(template: &str) -> Result<(), ServiceError> {
    let host = template
        .strip_prefix("https://")
        .or_else(|| template.strip_prefix("http://"));

    match host {
        Some(rest) if !rest.is_empty() && !rest.starts_with(|c| matches!(c, '/' | '?' | '#')) => Ok(()),
        _ => Err(ServiceError::Validation(format!(
            "Tracking URL template must be an http(s) URL: {}.",
            template
        ))),
    }
}

/// Applies `update` to `current` and checks the result.
pub fn validate_merchant_update(
    current: &merchants::Merchant,
    update: &merchants::MerchantUpdate,
) -> Result<(), ServiceError> {
    if let Some(template) = &update.tracking_url_template {
        validate_tracking_template(template)?;
    }

    let mut patched = current.clone();
    if let Some(cashback_type) = update.cashback_type {
        patched.cashback_type = cashback_type;
    }
    if let Some(value) = update.cashback_value {
        patched.cashback_value = value;
    }

    ledger::validate_rule(patched.cashback_rule()).map_err(ServiceError::Validation)
}

pub fn validate_new_offer(
    offer: &offers::NewOffer,
    starts_at: chrono::NaiveDateTime,
) -> Result<(), ServiceError> {
    if offer.title.trim().is_empty() {
        return Err(ServiceError::Validation(
            "Offer title cannot be empty.".to_string(),
        ));
    }
    if let Some(ends_at) = offer.ends_at {
        if ends_at <= starts_at {
            return Err(ServiceError::Validation(
                "Offer must end after it starts.".to_string(),
            ));
        }
    }

    ledger::validate_rule(offer.cashback_rule()).map_err(ServiceError::Validation)
}

#[derive(Clone)]
pub struct CatalogRequestHandler {
    merchants: MerchantRepository,
    offers: OfferRepository,
}

impl CatalogRequestHandler {
    pub fn new(sql_conn: PgPool) -> Self {
        CatalogRequestHandler {
            merchants: MerchantRepository::new(sql_conn.clone()),
            offers: OfferRepository::new(sql_conn),
        }
    }

    async fn create_merchant(
        &self,
        merchant: merchants::NewMerchant,
    ) -> Result<merchants::Merchant, ServiceError> {
        validate_new_merchant(&merchant)?;

        let outcome = self
            .merchants
            .insert_merchant(&merchant)
            .await
            .map_err(|e| ServiceError::Repository("Merchants".to_string(), e.to_string()))?;

        match outcome {
            NewMerchantOutcome::Created(merchant) => {
                log::info!("Created merchant {} ({}).", merchant.slug, merchant.id);
                Ok(merchant)
            }
            NewMerchantOutcome::SlugTaken => Err(ServiceError::Conflict(format!(
                "Merchant slug already in use: {}.",
                merchant.slug
            ))),
        }
    }

    async fn get_merchant(&self, id: &str) -> Result<merchants::Merchant, ServiceError> {
        self.merchants
            .get_merchant(id)
            .await
            .map_err(|e| ServiceError::Database(e.to_string()))?
            .ok_or_else(|| ServiceError::NotFound(format!("Merchant {}", id)))
    }

    async fn list_merchants(
        &self,
        active_only: bool,
    ) -> Result<Vec<merchants::Merchant>, ServiceError> {
        self.merchants
            .list_merchants(active_only)
            .await
            .map_err(|e| ServiceError::Database(e.to_string()))
    }

    async fn update_merchant(
        &self,
        id: &str,
        update: merchants::MerchantUpdate,
    ) -> Result<merchants::Merchant, ServiceError> {
        let current = self.get_merchant(id).await?;
        validate_merchant_update(&current, &update)?;

        self.merchants
            .update_merchant(id, &update)
            .await
            .map_err(|e| ServiceError::Database(e.to_string()))?
            .ok_or_else(|| ServiceError::NotFound(format!("Merchant {}", id)))
    }

    async fn create_offer(
        &self,
        merchant_id: &str,
        offer: offers::NewOffer,
    ) -> Result<offers::Offer, ServiceError> {
        self.get_merchant(merchant_id).await?;

        let starts_at = offer
            .starts_at
            .unwrap_or_else(|| chrono::Utc::now().naive_utc());
        validate_new_offer(&offer, starts_at)?;

        self.offers
            .insert_offer(merchant_id, &offer, starts_at)
            .await
            .map_err(|e| ServiceError::Repository("Offers".to_string(), e.to_string()))
    }

    async fn get_offer(&self, id: &str) -> Result<offers::Offer, ServiceError> {
        self.offers
            .get_offer(id)
            .await
            .map_err(|e| ServiceError::Database(e.to_string()))?
            .ok_or_else(|| ServiceError::NotFound(format!("Offer {}", id)))
    }

    async fn list_offers(
        &self,
        merchant_id: Option<&str>,
        live_only: bool,
    ) -> Result<Vec<offers::Offer>, ServiceError> {
        let now = chrono::Utc::now().naive_utc();

        self.offers
            .list_offers(merchant_id, live_only, now)
            .await
            .map_err(|e| ServiceError::Database(e.to_string()))
    }
}

#[async_trait]
impl RequestHandler<CatalogRequest> for CatalogRequestHandler {
    async fn handle_request(&self, request: CatalogRequest) {
        match request {
            CatalogRequest::CreateMerchant { merchant, response } => {
                let _ = response.send(self.create_merchant(merchant).await);
            }
            CatalogRequest::GetMerchant { id, response } => {
                let _ = response.send(self.get_merchant(&id).await);
            }
            CatalogRequest::ListMerchants {
                active_only,
                response,
            } => {
                let _ = response.send(self.list_merchants(active_only).await);
            }
            CatalogRequest::UpdateMerchant {
                id,
                update,
                response,
            } => {
                let _ = response.send(self.update_merchant(&id, update).await);
            }
            CatalogRequest::CreateOffer {
                merchant_id,
                offer,
                response,
            } => {
                let _ = response.send(self.create_offer(&merchant_id, offer).await);
            }
            CatalogRequest::GetOffer { id, response } => {
                let _ = response.send(self.get_offer(&id).await);
            }
            CatalogRequest::ListOffers {
                merchant_id,
                live_only,
                response,
            } => {
                let offers = self.list_offers(merchant_id.as_deref(), live_only).await;
                let _ = response.send(offers);
            }
        }
    }
}

pub struct CatalogService;

impl CatalogService {
    pub fn new() -> Self {
        CatalogService {}
    }
}

#[async_trait]
impl Service<CatalogRequest, CatalogRequestHandler> for CatalogService {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CashbackType;
    use chrono::{Duration, Utc};

    fn new_merchant() -> merchants::NewMerchant {
        merchants::NewMerchant {
            name: "Flipkart".to_string(),
            slug: "flipkart".to_string(),
            website_url: "https://www.flipkart.com".to_string(),
            tracking_url_template: "https://track.example/fk?sub={click_token}".to_string(),
            cashback_type: CashbackType::Percentage,
            cashback_value: 450,
        }
    }

    fn new_offer(ends_in: Option<Duration>) -> offers::NewOffer {
        offers::NewOffer {
            title: "Big Billion Days".to_string(),
            description: None,
            coupon_code: None,
            cashback_type: CashbackType::Flat,
            cashback_value: 5_000,
            starts_at: None,
            ends_at: ends_in.map(|d| Utc::now().naive_utc() + d),
        }
    }

    #[test]
    fn merchant_validation() {
        assert!(validate_new_merchant(&new_merchant()).is_ok());

        let mut bad_slug = new_merchant();
        bad_slug.slug = "flip kart".to_string();
        assert!(validate_new_merchant(&bad_slug).is_err());

        let mut bad_rate = new_merchant();
        bad_rate.cashback_value = 20_000;
        assert!(validate_new_merchant(&bad_rate).is_err());

        let mut bad_url = new_merchant();
        bad_url.tracking_url_template = "ftp://track".to_string();
        assert!(validate_new_merchant(&bad_url).is_err());
    }

    #[test]
    fn tracking_template_needs_scheme_and_host() {
        assert!(validate_tracking_template("https://track.example/r?sub={click_token}").is_ok());
        assert!(validate_tracking_template("http://track.example").is_ok());

        for template in ["", "httpfoo", "http://", "https:///path", "track.example/r"] {
            assert!(
                matches!(
                    validate_tracking_template(template),
                    Err(ServiceError::Validation(_))
                ),
                "{:?} should be rejected",
                template
            );
        }
    }

    fn merchant() -> merchants::Merchant {
        let now = Utc::now().naive_utc();
        let new = new_merchant();
        merchants::Merchant {
            id: "m1".to_string(),
            name: new.name,
            slug: new.slug,
            website_url: new.website_url,
            tracking_url_template: new.tracking_url_template,
            cashback_type: new.cashback_type,
            cashback_value: new.cashback_value,
            active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn merchant_update_checks_template_and_rule() {
        let current = merchant();

        assert!(validate_merchant_update(&current, &merchants::MerchantUpdate::default()).is_ok());
        assert!(validate_merchant_update(
            &current,
            &merchants::MerchantUpdate {
                active: Some(false),
                tracking_url_template: Some("https://aff.example/new".to_string()),
                ..Default::default()
            }
        )
        .is_ok());

        let empty_template = merchants::MerchantUpdate {
            tracking_url_template: Some(String::new()),
            ..Default::default()
        };
        assert!(matches!(
            validate_merchant_update(&current, &empty_template),
            Err(ServiceError::Validation(_))
        ));

        let to_flat = merchants::MerchantUpdate {
            cashback_type: Some(CashbackType::Flat),
            ..Default::default()
        };
        assert!(validate_merchant_update(&current, &to_flat).is_ok());

        let too_high = merchants::MerchantUpdate {
            cashback_value: Some(20_000),
            ..Default::default()
        };
        assert!(matches!(
            validate_merchant_update(&current, &too_high),
            Err(ServiceError::Validation(_))
        ));
    }

    #[test]
    fn offer_must_end_after_start() {
        let now = Utc::now().naive_utc();
        assert!(validate_new_offer(&new_offer(None), now).is_ok());
        assert!(validate_new_offer(&new_offer(Some(Duration::days(7))), now).is_ok());
        assert!(matches!(
            validate_new_offer(&new_offer(Some(Duration::days(-1))), now),
            Err(ServiceError::Validation(_))
        ));
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn update_keeps_stored_template_valid(pool: PgPool) {
        let handler = CatalogRequestHandler::new(pool);
        let created = handler.create_merchant(new_merchant()).await.unwrap();

        let rejected = handler
            .update_merchant(
                &created.id,
                merchants::MerchantUpdate {
                    tracking_url_template: Some(String::new()),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(rejected, Err(ServiceError::Validation(_))));

        let stored = handler.get_merchant(&created.id).await.unwrap();
        assert_eq!(stored.tracking_url_template, created.tracking_url_template);

        let updated = handler
            .update_merchant(
                &created.id,
                merchants::MerchantUpdate {
                    tracking_url_template: Some("https://aff.example/v2/{click_token}".to_string()),
                    active: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.tracking_url("t0k"), "https://aff.example/v2/t0k");
        assert!(!updated.active);
    }
}
