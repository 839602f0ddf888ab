use crate::models::offers;

use sqlx::PgPool;

use super::new_id;

#[derive(Clone)]
pub struct OfferRepository {
    conn: PgPool,
}

impl OfferRepository {
    pub fn new(conn: PgPool) -> Self {
        Self { conn }
    }

    pub async fn insert_offer(
        &self,
        merchant_id: &str,
        offer: &offers::NewOffer,
        starts_at: chrono::NaiveDateTime,
    ) -> Result<offers::Offer, anyhow::Error> {
        let offer = sqlx::query_as::<_, offers::Offer>(
            r#"
                INSERT INTO offers
                (id, merchant_id, title, description, coupon_code, cashback_type, cashback_value, starts_at, ends_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                RETURNING *
            "#,
        )
        .bind(new_id())
        .bind(merchant_id)
        .bind(&offer.title)
        .bind(&offer.description)
        .bind(&offer.coupon_code)
        .bind(offer.cashback_type)
        .bind(offer.cashback_value)
        .bind(starts_at)
        .bind(offer.ends_at)
        .fetch_one(&self.conn)
        .await?;

        Ok(offer)
    }

    pub async fn get_offer(&self, id: &str) -> Result<Option<offers::Offer>, anyhow::Error> {
        let offer = sqlx::query_as::<_, offers::Offer>("SELECT * FROM offers WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.conn)
            .await?;

        Ok(offer)
    }

    /// Offers, optionally restricted to one merchant and to those live at `now`.
    pub async fn list_offers(
        &self,
        merchant_id: Option<&str>,
        live_only: bool,
        now: chrono::NaiveDateTime,
    ) -> Result<Vec<offers::Offer>, anyhow::Error> {
        let offers = sqlx::query_as::<_, offers::Offer>(
            r#"
                SELECT * FROM offers
                WHERE ($1::TEXT IS NULL OR merchant_id = $1)
                AND (NOT $2 OR (active AND starts_at <= $3 AND (ends_at IS NULL OR ends_at > $3)))
                ORDER BY starts_at DESC
            "#,
        )
        .bind(merchant_id)
        .bind(live_only)
        .bind(now)
        .fetch_all(&self.conn)
        .await?;

        Ok(offers)
    }
}
