use crate::models::clicks::{self, new_click_token};

use sqlx::PgPool;

use super::new_id;

#[derive(Clone)]
pub struct ClickRepository {
    conn: PgPool,
}

impl ClickRepository {
    pub fn new(conn: PgPool) -> Self {
        Self { conn }
    }

    pub async fn insert_click(
        &self,
        click: &clicks::NewClick,
        ip_address: Option<&str>,
        user_agent: Option<&str>,
    ) -> Result<clicks::Click, anyhow::Error> {
        let click = sqlx::query_as::<_, clicks::Click>(
            r#"
                INSERT INTO clicks (id, click_token, user_id, merchant_id, offer_id, ip_address, user_agent)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                RETURNING *
            "#,
        )
        .bind(new_id())
        .bind(new_click_token())
        .bind(&click.user_id)
        .bind(&click.merchant_id)
        .bind(&click.offer_id)
        .bind(ip_address)
        .bind(user_agent)
        .fetch_one(&self.conn)
        .await?;

        Ok(click)
    }

    pub async fn get_click_by_token(
        &self,
        token: &str,
    ) -> Result<Option<clicks::Click>, anyhow::Error> {
        let click =
            sqlx::query_as::<_, clicks::Click>("SELECT * FROM clicks WHERE click_token = $1")
                .bind(token)
                .fetch_optional(&self.conn)
                .await?;

        Ok(click)
    }
}
