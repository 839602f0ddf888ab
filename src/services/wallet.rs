use async_trait::async_trait;
use sqlx::PgPool;
use tokio::sync::oneshot;

use super::{RequestHandler, Service, ServiceError};
use crate::{
    models::{
        wallet::Wallet,
        withdrawals::{self, WithdrawalStatus},
    },
    repositories::{
        users::UserRepository,
        wallet::WalletRepository,
        withdrawals::{ProcessOutcome, WithdrawalOutcome, WithdrawalRepository},
    },
};

pub enum WalletRequest {
    GetWallet {
        user_id: String,
        response: oneshot::Sender<Result<Wallet, ServiceError>>,
    },
    RequestWithdrawal {
        user_id: String,
        withdrawal: withdrawals::NewWithdrawal,
        response: oneshot::Sender<Result<withdrawals::Withdrawal, ServiceError>>,
    },
    ProcessWithdrawal {
        withdrawal_id: String,
        status: WithdrawalStatus,
        response: oneshot::Sender<Result<withdrawals::Withdrawal, ServiceError>>,
    },
    ListWithdrawals {
        user_id: String,
        response: oneshot::Sender<Result<Vec<withdrawals::Withdrawal>, ServiceError>>,
    },
}

/// Shape checks only; the balance gate runs under the user lock in the repository.
pub fn validate_new_withdrawal(withdrawal: &withdrawals::NewWithdrawal) -> Result<(), ServiceError> {
    if withdrawal.payment_details.trim().is_empty() {
        return Err(ServiceError::Validation(
            "Payment details are required.".to_string(),
        ));
    }

    Ok(())
}

pub fn validate_decision(status: WithdrawalStatus) -> Result<(), ServiceError> {
    match status {
        WithdrawalStatus::Paid | WithdrawalStatus::Rejected => Ok(()),
        WithdrawalStatus::Requested => Err(ServiceError::Validation(
            "A withdrawal can only be marked paid or rejected.".to_string(),
        )),
    }
}

#[derive(Clone)]
pub struct WalletRequestHandler {
    wallets: WalletRepository,
    withdrawals: WithdrawalRepository,
    users: UserRepository,
    min_withdrawal_in_cents: i64,
}

impl WalletRequestHandler {
    pub fn new(sql_conn: PgPool, min_withdrawal_in_cents: i64) -> Self {
        WalletRequestHandler {
            wallets: WalletRepository::new(sql_conn.clone()),
            withdrawals: WithdrawalRepository::new(sql_conn.clone()),
            users: UserRepository::new(sql_conn),
            min_withdrawal_in_cents,
        }
    }

    async fn ensure_user(&self, user_id: &str) -> Result<(), ServiceError> {
        self.users
            .get_user_by_id(user_id)
            .await
            .map_err(|e| ServiceError::Database(e.to_string()))?
            .map(|_| ())
            .ok_or_else(|| ServiceError::NotFound(format!("User {}", user_id)))
    }

    async fn get_wallet(&self, user_id: &str) -> Result<Wallet, ServiceError> {
        self.ensure_user(user_id).await?;

        self.wallets
            .get_wallet(user_id)
            .await
            .map_err(|e| ServiceError::Database(e.to_string()))
    }

    async fn request_withdrawal(
        &self,
        user_id: &str,
        withdrawal: withdrawals::NewWithdrawal,
    ) -> Result<withdrawals::Withdrawal, ServiceError> {
        validate_new_withdrawal(&withdrawal)?;

        let outcome = self
            .withdrawals
            .request_withdrawal(user_id, &withdrawal, self.min_withdrawal_in_cents)
            .await
            .map_err(|e| ServiceError::Repository("Withdrawals".to_string(), e.to_string()))?;

        match outcome {
            WithdrawalOutcome::Created(withdrawal) => {
                log::info!(
                    "Withdrawal {} of {} cents requested by {}.",
                    withdrawal.id,
                    withdrawal.amount_in_cents,
                    user_id
                );
                Ok(withdrawal)
            }
            WithdrawalOutcome::UserNotFound => {
                Err(ServiceError::NotFound(format!("User {}", user_id)))
            }
            WithdrawalOutcome::Rejected(e) => {
                log::warn!("Withdrawal rejected for {}: {}", user_id, e);
                Err(e.into())
            }
        }
    }

    async fn process_withdrawal(
        &self,
        withdrawal_id: &str,
        status: WithdrawalStatus,
    ) -> Result<withdrawals::Withdrawal, ServiceError> {
        validate_decision(status)?;

        let outcome = self
            .withdrawals
            .process_withdrawal(withdrawal_id, status)
            .await
            .map_err(|e| ServiceError::Repository("Withdrawals".to_string(), e.to_string()))?;

        match outcome {
            ProcessOutcome::Processed(withdrawal) => {
                log::info!("Withdrawal {} marked {}.", withdrawal.id, withdrawal.status);
                Ok(withdrawal)
            }
            ProcessOutcome::NotFound => Err(ServiceError::NotFound(format!(
                "Withdrawal {}",
                withdrawal_id
            ))),
            ProcessOutcome::AlreadyProcessed(current) => Err(ServiceError::Conflict(format!(
                "Withdrawal {} is already {}.",
                withdrawal_id, current
            ))),
        }
    }

    async fn list_withdrawals(
        &self,
        user_id: &str,
    ) -> Result<Vec<withdrawals::Withdrawal>, ServiceError> {
        self.ensure_user(user_id).await?;

        self.withdrawals
            .get_user_withdrawals(user_id)
            .await
            .map_err(|e| ServiceError::Database(e.to_string()))
    }
}

#[async_trait]
impl RequestHandler<WalletRequest> for WalletRequestHandler {
    async fn handle_request(&self, request: WalletRequest) {
        match request {
            WalletRequest::GetWallet { user_id, response } => {
                let _ = response.send(self.get_wallet(&user_id).await);
            }
            WalletRequest::RequestWithdrawal {
                user_id,
                withdrawal,
                response,
            } => {
                let result = self.request_withdrawal(&user_id, withdrawal).await;
                let _ = response.send(result);
            }
            WalletRequest::ProcessWithdrawal {
                withdrawal_id,
                status,
                response,
            } => {
                let result = self.process_withdrawal(&withdrawal_id, status).await;
                let _ = response.send(result);
            }
            WalletRequest::ListWithdrawals { user_id, response } => {
                let _ = response.send(self.list_withdrawals(&user_id).await);
            }
        }
    }
}

pub struct WalletService;

impl WalletService {
    pub fn new() -> Self {
        WalletService {}
    }
}

#[async_trait]
impl Service<WalletRequest, WalletRequestHandler> for WalletService {}
