use crate::models::wallet::{Wallet, WalletTotals};

use sqlx::{PgExecutor, PgPool};

const WALLET_TOTALS_QUERY: &str = r#"
    SELECT
        COALESCE((SELECT SUM(cashback_in_cents) FROM transactions
            WHERE user_id = $1 AND status = 'pending'), 0)::BIGINT AS pending,
        COALESCE((SELECT SUM(cashback_in_cents) FROM transactions
            WHERE user_id = $1 AND status = 'confirmed'), 0)::BIGINT AS confirmed,
        COALESCE((SELECT SUM(amount_in_cents) FROM referral_bonuses
            WHERE referrer_id = $1), 0)::BIGINT AS referral,
        COALESCE((SELECT SUM(amount_in_cents) FROM withdrawals
            WHERE user_id = $1 AND status IN ('requested', 'paid')), 0)::BIGINT AS withdrawn,
        COALESCE((SELECT SUM(amount_in_cents) FROM withdrawals
            WHERE user_id = $1 AND status = 'paid'), 0)::BIGINT AS paid
"#;

/// Aggregates a user's ledger. Works on a pool or inside an open transaction.
pub async fn fetch_totals<'e, E>(executor: E, user_id: &str) -> Result<WalletTotals, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    sqlx::query_as::<_, WalletTotals>(WALLET_TOTALS_QUERY)
        .bind(user_id)
        .fetch_one(executor)
        .await
}

#[derive(Clone)]
pub struct WalletRepository {
    conn: PgPool,
}

impl WalletRepository {
    pub fn new(conn: PgPool) -> Self {
        Self { conn }
    }

    pub async fn get_wallet(&self, user_id: &str) -> Result<Wallet, anyhow::Error> {
        let totals = fetch_totals(&self.conn, user_id).await?;

        Ok(Wallet::from_totals(totals))
    }
}
