use crate::ledger::{self, LedgerError};
use crate::models::{
    wallet::Wallet,
    withdrawals::{self, WithdrawalStatus},
};

use sqlx::PgPool;

use super::{new_id, wallet::fetch_totals};

pub enum WithdrawalOutcome {
    Created(withdrawals::Withdrawal),
    UserNotFound,
    Rejected(LedgerError),
}

pub enum ProcessOutcome {
    Processed(withdrawals::Withdrawal),
    NotFound,
    AlreadyProcessed(WithdrawalStatus),
}

#[derive(Clone)]
pub struct WithdrawalRepository {
    conn: PgPool,
}

impl WithdrawalRepository {
    pub fn new(conn: PgPool) -> Self {
        Self { conn }
    }

    /// Checks the balance and inserts while holding the user's row lock.
    pub async fn request_withdrawal(
        &self,
        user_id: &str,
        request: &withdrawals::NewWithdrawal,
        minimum_in_cents: i64,
    ) -> Result<WithdrawalOutcome, anyhow::Error> {
        let mut tx = self.conn.begin().await?;

        let locked: Option<String> =
            sqlx::query_scalar("SELECT id FROM users WHERE id = $1 FOR UPDATE")
                .bind(user_id)
                .fetch_optional(&mut *tx)
                .await?;

        if locked.is_none() {
            return Ok(WithdrawalOutcome::UserNotFound);
        }

        let wallet = Wallet::from_totals(fetch_totals(&mut *tx, user_id).await?);
        if let Err(e) = ledger::check_withdrawal(&wallet, request.amount_in_cents, minimum_in_cents)
        {
            return Ok(WithdrawalOutcome::Rejected(e));
        }

        let withdrawal = sqlx::query_as::<_, withdrawals::Withdrawal>(
            r#"
                INSERT INTO withdrawals (id, user_id, amount_in_cents, payment_method, payment_details, status)
                VALUES ($1, $2, $3, $4, $5, $6)
                RETURNING *
            "#,
        )
        .bind(new_id())
        .bind(user_id)
        .bind(request.amount_in_cents)
        .bind(request.payment_method)
        .bind(&request.payment_details)
        .bind(WithdrawalStatus::Requested)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(WithdrawalOutcome::Created(withdrawal))
    }

    /// Marks a requested withdrawal as paid or rejected. Rejection releases the funds.
    pub async fn process_withdrawal(
        &self,
        id: &str,
        status: WithdrawalStatus,
    ) -> Result<ProcessOutcome, anyhow::Error> {
        let withdrawal = sqlx::query_as::<_, withdrawals::Withdrawal>(
            r#"
                UPDATE withdrawals SET
                    status = $2,
                    processed_at = CURRENT_TIMESTAMP,
                    updated_at = CURRENT_TIMESTAMP
                WHERE id = $1 AND status = 'requested'
                RETURNING *
            "#,
        )
        .bind(id)
        .bind(status)
        .fetch_optional(&self.conn)
        .await?;

        if let Some(withdrawal) = withdrawal {
            return Ok(ProcessOutcome::Processed(withdrawal));
        }

        let current: Option<WithdrawalStatus> =
            sqlx::query_scalar("SELECT status FROM withdrawals WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.conn)
                .await?;

        match current {
            Some(current) => Ok(ProcessOutcome::AlreadyProcessed(current)),
            None => Ok(ProcessOutcome::NotFound),
        }
    }

    pub async fn get_user_withdrawals(
        &self,
        user_id: &str,
    ) -> Result<Vec<withdrawals::Withdrawal>, anyhow::Error> {
        let withdrawals = sqlx::query_as::<_, withdrawals::Withdrawal>(
            "SELECT * FROM withdrawals WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.conn)
        .await?;

        Ok(withdrawals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::withdrawals::PaymentMethod;
    use crate::repositories::{test_support, wallet::WalletRepository};

    fn new_withdrawal(amount_in_cents: i64) -> withdrawals::NewWithdrawal {
        withdrawals::NewWithdrawal {
            amount_in_cents,
            payment_method: PaymentMethod::BankTransfer,
            payment_details: "IFSC0001 / 1234567890".to_string(),
        }
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn concurrent_requests_never_overdraw(pool: PgPool) {
        let user_id = test_support::user_with_confirmed_cashback(&pool, 5_000).await;
        let repository = WithdrawalRepository::new(pool.clone());

        let mut handles = Vec::new();
        for _ in 0..4 {
            let repository = repository.clone();
            let user_id = user_id.clone();
            handles.push(tokio::spawn(async move {
                repository
                    .request_withdrawal(&user_id, &new_withdrawal(2_000), 100)
                    .await
                    .unwrap()
            }));
        }

        let mut created = 0;
        let mut rejected = 0;
        for handle in handles {
            match handle.await.unwrap() {
                WithdrawalOutcome::Created(_) => created += 1,
                WithdrawalOutcome::Rejected(LedgerError::InsufficientBalance { .. }) => {
                    rejected += 1
                }
                _ => panic!("unexpected withdrawal outcome"),
            }
        }

        assert_eq!(created, 2);
        assert_eq!(rejected, 2);

        let wallet = WalletRepository::new(pool).get_wallet(&user_id).await.unwrap();
        assert_eq!(wallet.withdrawn, 4_000);
        assert_eq!(wallet.available, 1_000);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn processing_is_one_shot(pool: PgPool) {
        let user_id = test_support::user_with_confirmed_cashback(&pool, 3_000).await;
        let repository = WithdrawalRepository::new(pool.clone());

        let WithdrawalOutcome::Created(withdrawal) = repository
            .request_withdrawal(&user_id, &new_withdrawal(3_000), 100)
            .await
            .unwrap()
        else {
            panic!("withdrawal should be created");
        };

        let paid = repository
            .process_withdrawal(&withdrawal.id, WithdrawalStatus::Paid)
            .await
            .unwrap();
        assert!(matches!(
            paid,
            ProcessOutcome::Processed(w) if w.status == WithdrawalStatus::Paid
        ));

        let again = repository
            .process_withdrawal(&withdrawal.id, WithdrawalStatus::Rejected)
            .await
            .unwrap();
        assert!(matches!(
            again,
            ProcessOutcome::AlreadyProcessed(WithdrawalStatus::Paid)
        ));

        assert!(matches!(
            repository
                .process_withdrawal("missing", WithdrawalStatus::Paid)
                .await
                .unwrap(),
            ProcessOutcome::NotFound
        ));

        let wallet = WalletRepository::new(pool).get_wallet(&user_id).await.unwrap();
        assert_eq!(wallet.paid, 3_000);
        assert_eq!(wallet.available, 0);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn unknown_user_is_reported(pool: PgPool) {
        let outcome = WithdrawalRepository::new(pool)
            .request_withdrawal("missing", &new_withdrawal(1_000), 100)
            .await
            .unwrap();

        assert!(matches!(outcome, WithdrawalOutcome::UserNotFound));
    }
}
