use crate::models::merchants;

use sqlx::PgPool;

use super::{is_unique_violation, new_id};

pub enum NewMerchantOutcome {
    Created(merchants::Merchant),
    SlugTaken,
}

#[derive(Clone)]
pub struct MerchantRepository {
    conn: PgPool,
}

impl MerchantRepository {
    pub fn new(conn: PgPool) -> Self {
        Self { conn }
    }

    pub async fn insert_merchant(
        &self,
        merchant: &merchants::NewMerchant,
    ) -> Result<NewMerchantOutcome, anyhow::Error> {
        let result = sqlx::query_as::<_, merchants::Merchant>(
            r#"
                INSERT INTO merchants
                (id, name, slug, website_url, tracking_url_template, cashback_type, cashback_value)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                RETURNING *
            "#,
        )
        .bind(new_id())
        .bind(&merchant.name)
        .bind(merchant.slug.to_lowercase())
        .bind(&merchant.website_url)
        .bind(&merchant.tracking_url_template)
        .bind(merchant.cashback_type)
        .bind(merchant.cashback_value)
        .fetch_one(&self.conn)
        .await;

        match result {
            Ok(merchant) => Ok(NewMerchantOutcome::Created(merchant)),
            Err(e) if is_unique_violation(&e, Some("merchants_slug_key")) => {
                Ok(NewMerchantOutcome::SlugTaken)
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn get_merchant(
        &self,
        id: &str,
    ) -> Result<Option<merchants::Merchant>, anyhow::Error> {
        let merchant =
            sqlx::query_as::<_, merchants::Merchant>("SELECT * FROM merchants WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.conn)
                .await?;

        Ok(merchant)
    }

    pub async fn get_merchant_by_slug(
        &self,
        slug: &str,
    ) -> Result<Option<merchants::Merchant>, anyhow::Error> {
        let merchant =
            sqlx::query_as::<_, merchants::Merchant>("SELECT * FROM merchants WHERE slug = $1")
                .bind(slug.to_lowercase())
                .fetch_optional(&self.conn)
                .await?;

        Ok(merchant)
    }

    pub async fn list_merchants(
        &self,
        active_only: bool,
    ) -> Result<Vec<merchants::Merchant>, anyhow::Error> {
        let merchants = sqlx::query_as::<_, merchants::Merchant>(
            "SELECT * FROM merchants WHERE (NOT $1 OR active) ORDER BY name",
        )
        .bind(active_only)
        .fetch_all(&self.conn)
        .await?;

        Ok(merchants)
    }

    pub async fn update_merchant(
        &self,
        id: &str,
        update: &merchants::MerchantUpdate,
    ) -> Result<Option<merchants::Merchant>, anyhow::Error> {
        let merchant = sqlx::query_as::<_, merchants::Merchant>(
            r#"
                UPDATE merchants SET
                    tracking_url_template = COALESCE($2, tracking_url_template),
                    cashback_type = COALESCE($3, cashback_type),
                    cashback_value = COALESCE($4, cashback_value),
                    active = COALESCE($5, active),
                    updated_at = CURRENT_TIMESTAMP
                WHERE id = $1
                RETURNING *
            "#,
        )
        .bind(id)
        .bind(&update.tracking_url_template)
        .bind(update.cashback_type)
        .bind(update.cashback_value)
        .bind(update.active)
        .fetch_optional(&self.conn)
        .await?;

        Ok(merchant)
    }
}
