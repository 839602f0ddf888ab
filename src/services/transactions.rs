use async_trait::async_trait;
use sqlx::PgPool;
use tokio::sync::oneshot;

use super::{RequestHandler, Service, ServiceError};
use crate::models::transactions::{
    self, AffiliateWebhookEvent, RecordedTransaction, TransactionStatus,
};
use crate::repositories::transactions::{TransactionOutcome, TransactionRepository};

pub enum TransactionServiceRequest {
    RecordWebhook {
        event: AffiliateWebhookEvent,
        response: oneshot::Sender<Result<RecordedTransaction, ServiceError>>,
    },
    UpdateTransactionStatus {
        transaction_id: String,
        status: TransactionStatus,
        response: oneshot::Sender<Result<RecordedTransaction, ServiceError>>,
    },
    GetTransaction {
        transaction_id: String,
        response: oneshot::Sender<Result<transactions::Transaction, ServiceError>>,
    },
    ListUserTransactions {
        user_id: String,
        response: oneshot::Sender<Result<Vec<transactions::Transaction>, ServiceError>>,
    },
}

pub fn validate_event(event: &AffiliateWebhookEvent) -> Result<(), ServiceError> {
    if event.click_token.trim().is_empty() {
        return Err(ServiceError::Validation("Missing click token.".to_string()));
    }
    if event.order_id.trim().is_empty() {
        return Err(ServiceError::Validation("Missing order id.".to_string()));
    }
    if event.order_amount_in_cents < 0 {
        return Err(ServiceError::Validation(
            "Order amount cannot be negative.".to_string(),
        ));
    }

    Ok(())
}

#[derive(Clone)]
pub struct TransactionRequestHandler {
    repository: TransactionRepository,
    referral_bonus_in_cents: i64,
}

impl TransactionRequestHandler {
    pub fn new(sql_conn: PgPool, referral_bonus_in_cents: i64) -> Self {
        let repository = TransactionRepository::new(sql_conn);

        TransactionRequestHandler {
            repository,
            referral_bonus_in_cents,
        }
    }

    async fn record_webhook(
        &self,
        event: AffiliateWebhookEvent,
    ) -> Result<RecordedTransaction, ServiceError> {
        validate_event(&event)?;

        let outcome = self
            .repository
            .record_event(&event, self.referral_bonus_in_cents)
            .await
            .map_err(|e| {
                ServiceError::Repository("TransactionService".to_string(), e.to_string())
            })?;

        let recorded = resolve_outcome(outcome, || format!("Click token {}", event.click_token))?;

        log::info!(
            "Webhook for order {} applied: transaction {} is {} (created: {}).",
            event.order_id,
            recorded.transaction.id,
            recorded.transaction.status,
            recorded.created
        );

        Ok(recorded)
    }

    async fn update_transaction_status(
        &self,
        transaction_id: &str,
        status: TransactionStatus,
    ) -> Result<RecordedTransaction, ServiceError> {
        let outcome = self
            .repository
            .update_transaction_status(transaction_id, status, self.referral_bonus_in_cents)
            .await
            .map_err(|e| {
                ServiceError::Repository("TransactionService".to_string(), e.to_string())
            })?;

        let recorded = resolve_outcome(outcome, || format!("Transaction {}", transaction_id))?;
        log::info!("Transaction {} set to {}.", transaction_id, status);

        Ok(recorded)
    }

    async fn get_transaction(
        &self,
        transaction_id: &str,
    ) -> Result<transactions::Transaction, ServiceError> {
        self.repository
            .get_transaction(transaction_id)
            .await
            .map_err(|e| ServiceError::Database(e.to_string()))?
            .ok_or_else(|| ServiceError::NotFound(format!("Transaction {}", transaction_id)))
    }

    async fn list_user_transactions(
        &self,
        user_id: &str,
    ) -> Result<Vec<transactions::Transaction>, ServiceError> {
        self.repository
            .get_user_transactions(user_id)
            .await
            .map_err(|e| ServiceError::Database(e.to_string()))
    }
}

fn resolve_outcome(
    outcome: TransactionOutcome,
    missing: impl FnOnce() -> String,
) -> Result<RecordedTransaction, ServiceError> {
    match outcome {
        TransactionOutcome::Recorded(recorded) => Ok(recorded),
        TransactionOutcome::NotFound => Err(ServiceError::NotFound(missing())),
        TransactionOutcome::OrderMismatch { existing_order_id } => {
            Err(ServiceError::Conflict(format!(
                "Click already tracked with order {}.",
                existing_order_id
            )))
        }
        TransactionOutcome::Rejected(e) => {
            log::warn!("Rejected transaction update: {}", e);
            Err(e.into())
        }
    }
}

#[async_trait]
impl RequestHandler<TransactionServiceRequest> for TransactionRequestHandler {
    async fn handle_request(&self, request: TransactionServiceRequest) {
        match request {
            TransactionServiceRequest::RecordWebhook { event, response } => {
                let result = self.record_webhook(event).await;
                let _ = response.send(result);
            }
            TransactionServiceRequest::UpdateTransactionStatus {
                transaction_id,
                status,
                response,
            } => {
                let result = self.update_transaction_status(&transaction_id, status).await;
                let _ = response.send(result);
            }
            TransactionServiceRequest::GetTransaction {
                transaction_id,
                response,
            } => {
                let _ = response.send(self.get_transaction(&transaction_id).await);
            }
            TransactionServiceRequest::ListUserTransactions { user_id, response } => {
                let _ = response.send(self.list_user_transactions(&user_id).await);
            }
        }
    }
}

pub struct TransactionService;

impl TransactionService {
    pub fn new() -> Self {
        TransactionService {}
    }
}

#[async_trait]
impl Service<TransactionServiceRequest, TransactionRequestHandler> for TransactionService {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::LedgerError;

    fn event(token: &str, order: &str, amount: i64) -> AffiliateWebhookEvent {
        AffiliateWebhookEvent {
            click_token: token.to_string(),
            order_id: order.to_string(),
            order_amount_in_cents: amount,
            status: TransactionStatus::Pending,
        }
    }

    #[test]
    fn event_validation() {
        assert!(validate_event(&event("tok", "ORD-1", 10_000)).is_ok());
        assert!(validate_event(&event("", "ORD-1", 10_000)).is_err());
        assert!(validate_event(&event("tok", " ", 10_000)).is_err());
        assert!(validate_event(&event("tok", "ORD-1", -1)).is_err());
    }

    #[test]
    fn outcomes_map_to_service_errors() {
        assert!(matches!(
            resolve_outcome(TransactionOutcome::NotFound, || "Click token x".to_string()),
            Err(ServiceError::NotFound(msg)) if msg == "Click token x"
        ));
        assert!(matches!(
            resolve_outcome(
                TransactionOutcome::OrderMismatch {
                    existing_order_id: "ORD-1".to_string()
                },
                String::new
            ),
            Err(ServiceError::Conflict(_))
        ));
        assert!(matches!(
            resolve_outcome(
                TransactionOutcome::Rejected(LedgerError::InvalidTransition {
                    from: TransactionStatus::Cancelled,
                    to: TransactionStatus::Confirmed,
                }),
                String::new
            ),
            Err(ServiceError::InvalidTransition(_))
        ));
    }
}
