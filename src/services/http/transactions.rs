use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    Json,
};

use super::{call, AppState};
use crate::models::transactions::{
    AffiliateWebhookEvent, RecordedTransaction, Transaction, TransactionStatusUpdate,
};
use crate::services::{transactions::TransactionServiceRequest, ServiceError};
use crate::webhook::SIGNATURE_HEADER;

pub async fn affiliate_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<RecordedTransaction>), ServiceError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| ServiceError::Unauthorized("Missing webhook signature.".to_string()))?;

    if !state.verifier.verify(&body, signature) {
        log::warn!("Rejected affiliate webhook with a bad signature.");
        return Err(ServiceError::Unauthorized(
            "Invalid webhook signature.".to_string(),
        ));
    }

    let event: AffiliateWebhookEvent = serde_json::from_slice(&body)
        .map_err(|e| ServiceError::Validation(format!("Malformed webhook payload: {}", e)))?;

    let recorded = call(
        &state.channels.transactions,
        "TransactionService",
        |response| TransactionServiceRequest::RecordWebhook { event, response },
    )
    .await?;

    let status = if recorded.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };

    Ok((status, Json(recorded)))
}

pub async fn get_transaction(
    State(state): State<AppState>,
    Path(transaction_id): Path<String>,
) -> Result<Json<Transaction>, ServiceError> {
    let transaction = call(
        &state.channels.transactions,
        "TransactionService",
        |response| TransactionServiceRequest::GetTransaction {
            transaction_id,
            response,
        },
    )
    .await?;

    Ok(Json(transaction))
}

pub async fn update_transaction_status(
    State(state): State<AppState>,
    Path(transaction_id): Path<String>,
    Json(update): Json<TransactionStatusUpdate>,
) -> Result<Json<RecordedTransaction>, ServiceError> {
    let recorded = call(
        &state.channels.transactions,
        "TransactionService",
        |response| TransactionServiceRequest::UpdateTransactionStatus {
            transaction_id,
            status: update.status,
            response,
        },
    )
    .await?;

    Ok(Json(recorded))
}
