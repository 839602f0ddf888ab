use crate::ledger::{self, LedgerError};
use crate::models::{
    clicks::Click,
    merchants::Merchant,
    offers::Offer,
    transactions::{self, AffiliateWebhookEvent, RecordedTransaction, TransactionStatus},
    CashbackRule,
};

use sqlx::{PgConnection, PgPool};

use super::new_id;

pub enum TransactionOutcome {
    Recorded(RecordedTransaction),
    NotFound,
    OrderMismatch { existing_order_id: String },
    Rejected(LedgerError),
}

#[derive(Clone)]
pub struct TransactionRepository {
    conn: PgPool,
}

impl TransactionRepository {
    pub fn new(conn: PgPool) -> Self {
        TransactionRepository { conn }
    }

    /// Applies an affiliate webhook event.
    ///
    /// The click row is locked for the duration, so concurrent deliveries for the same
    /// click are applied one after the other. `ON CONFLICT (click_id)` keeps one
    /// transaction per click.
    pub async fn record_event(
        &self,
        event: &AffiliateWebhookEvent,
        referral_bonus_in_cents: i64,
    ) -> Result<TransactionOutcome, anyhow::Error> {
        let mut tx = self.conn.begin().await?;

        let click = sqlx::query_as::<_, Click>(
            "SELECT * FROM clicks WHERE click_token = $1 FOR UPDATE",
        )
        .bind(&event.click_token)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(click) = click else {
            return Ok(TransactionOutcome::NotFound);
        };

        let existing = sqlx::query_as::<_, transactions::Transaction>(
            "SELECT * FROM transactions WHERE click_id = $1 FOR UPDATE",
        )
        .bind(&click.id)
        .fetch_optional(&mut *tx)
        .await?;

        if let Some(existing) = &existing {
            if existing.network_order_id != event.order_id {
                return Ok(TransactionOutcome::OrderMismatch {
                    existing_order_id: existing.network_order_id.clone(),
                });
            }
            if let Err(e) = ledger::check_transition(existing.status, event.status) {
                return Ok(TransactionOutcome::Rejected(e));
            }
            if existing.status != TransactionStatus::Pending {
                // Terminal and unchanged: replayed delivery.
                return Ok(TransactionOutcome::Recorded(RecordedTransaction {
                    transaction: existing.clone(),
                    created: false,
                    referral_bonus_paid: false,
                }));
            }
        }

        let rule = cashback_rule_for_click(&mut tx, &click).await?;
        let cashback = ledger::compute_cashback(rule, event.order_amount_in_cents);

        let transaction = sqlx::query_as::<_, transactions::Transaction>(
            r#"
                INSERT INTO transactions
                (id, click_id, user_id, merchant_id, network_order_id, order_amount_in_cents,
                 cashback_in_cents, status, confirmed_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8,
                    CASE WHEN $8 = 'confirmed' THEN CURRENT_TIMESTAMP END)
                ON CONFLICT (click_id) DO UPDATE SET
                    order_amount_in_cents = EXCLUDED.order_amount_in_cents,
                    cashback_in_cents = EXCLUDED.cashback_in_cents,
                    status = EXCLUDED.status,
                    confirmed_at = EXCLUDED.confirmed_at,
                    updated_at = CURRENT_TIMESTAMP
                RETURNING *
            "#,
        )
        .bind(new_id())
        .bind(&click.id)
        .bind(&click.user_id)
        .bind(&click.merchant_id)
        .bind(&event.order_id)
        .bind(event.order_amount_in_cents)
        .bind(cashback)
        .bind(event.status)
        .fetch_one(&mut *tx)
        .await?;

        let previous_status = existing.as_ref().map(|t| t.status);
        let referral_bonus_paid = if ledger::is_first_confirmation(previous_status, transaction.status)
        {
            pay_referral_bonus(&mut tx, &transaction, referral_bonus_in_cents).await?
        } else {
            false
        };

        tx.commit().await?;

        Ok(TransactionOutcome::Recorded(RecordedTransaction {
            transaction,
            created: existing.is_none(),
            referral_bonus_paid,
        }))
    }

    /// Manual status override, bound by the same transition rules as webhooks.
    pub async fn update_transaction_status(
        &self,
        id: &str,
        status: TransactionStatus,
        referral_bonus_in_cents: i64,
    ) -> Result<TransactionOutcome, anyhow::Error> {
        let mut tx = self.conn.begin().await?;

        let existing = sqlx::query_as::<_, transactions::Transaction>(
            "SELECT * FROM transactions WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(existing) = existing else {
            return Ok(TransactionOutcome::NotFound);
        };

        if let Err(e) = ledger::check_transition(existing.status, status) {
            return Ok(TransactionOutcome::Rejected(e));
        }
        if existing.status == status {
            return Ok(TransactionOutcome::Recorded(RecordedTransaction {
                transaction: existing,
                created: false,
                referral_bonus_paid: false,
            }));
        }

        let transaction = sqlx::query_as::<_, transactions::Transaction>(
            r#"
                UPDATE transactions SET
                    status = $2,
                    confirmed_at = CASE WHEN $2 = 'confirmed' THEN CURRENT_TIMESTAMP END,
                    updated_at = CURRENT_TIMESTAMP
                WHERE id = $1
                RETURNING *
            "#,
        )
        .bind(id)
        .bind(status)
        .fetch_one(&mut *tx)
        .await?;

        let referral_bonus_paid =
            if ledger::is_first_confirmation(Some(existing.status), transaction.status) {
                pay_referral_bonus(&mut tx, &transaction, referral_bonus_in_cents).await?
            } else {
                false
            };

        tx.commit().await?;

        Ok(TransactionOutcome::Recorded(RecordedTransaction {
            transaction,
            created: false,
            referral_bonus_paid,
        }))
    }

    pub async fn get_transaction(
        &self,
        id: &str,
    ) -> Result<Option<transactions::Transaction>, anyhow::Error> {
        let transaction = sqlx::query_as::<_, transactions::Transaction>(
            "SELECT * FROM transactions WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.conn)
        .await?;

        Ok(transaction)
    }

    pub async fn get_user_transactions(
        &self,
        user_id: &str,
    ) -> Result<Vec<transactions::Transaction>, anyhow::Error> {
        let transactions = sqlx::query_as::<_, transactions::Transaction>(
            "SELECT * FROM transactions WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.conn)
        .await?;

        Ok(transactions)
    }
}

/// The offer's rule when the click carried one, the merchant's base rule otherwise.
async fn cashback_rule_for_click(
    conn: &mut PgConnection,
    click: &Click,
) -> Result<CashbackRule, anyhow::Error> {
    let rule = match &click.offer_id {
        Some(offer_id) => sqlx::query_as::<_, Offer>("SELECT * FROM offers WHERE id = $1")
            .bind(offer_id)
            .fetch_one(&mut *conn)
            .await?
            .cashback_rule(),
        None => sqlx::query_as::<_, Merchant>("SELECT * FROM merchants WHERE id = $1")
            .bind(&click.merchant_id)
            .fetch_one(&mut *conn)
            .await?
            .cashback_rule(),
    };

    Ok(rule)
}

/// Credits the referrer of the transaction's user, at most once per referred user.
async fn pay_referral_bonus(
    conn: &mut PgConnection,
    transaction: &transactions::Transaction,
    amount_in_cents: i64,
) -> Result<bool, anyhow::Error> {
    let Some(user_id) = &transaction.user_id else {
        return Ok(false);
    };

    let referred_by: Option<String> =
        sqlx::query_scalar("SELECT referred_by FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_one(&mut *conn)
            .await?;

    let already_paid: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM referral_bonuses WHERE referred_user_id = $1)",
    )
    .bind(user_id)
    .fetch_one(&mut *conn)
    .await?;

    if !ledger::referral_bonus_due(referred_by.as_deref(), already_paid, true)
        || amount_in_cents <= 0
    {
        return Ok(false);
    }

    let inserted = sqlx::query(
        r#"
            INSERT INTO referral_bonuses (id, referrer_id, referred_user_id, transaction_id, amount_in_cents)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (referred_user_id) DO NOTHING
        "#,
    )
    .bind(new_id())
    .bind(&referred_by)
    .bind(user_id)
    .bind(&transaction.id)
    .bind(amount_in_cents)
    .execute(&mut *conn)
    .await?
    .rows_affected();

    if inserted == 1 {
        log::info!(
            "Referral bonus of {} cents credited to {:?} for user {}.",
            amount_in_cents,
            referred_by,
            user_id
        );
    }

    Ok(inserted == 1)
}
