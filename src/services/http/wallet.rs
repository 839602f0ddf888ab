use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use super::{call, AppState};
use crate::models::{wallet::Wallet, withdrawals};
use crate::services::{wallet::WalletRequest, ServiceError};

pub async fn get_wallet(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<Wallet>, ServiceError> {
    let wallet = call(&state.channels.wallet, "WalletService", |response| {
        WalletRequest::GetWallet { user_id, response }
    })
    .await?;

    Ok(Json(wallet))
}

pub async fn request_withdrawal(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(withdrawal): Json<withdrawals::NewWithdrawal>,
) -> Result<(StatusCode, Json<withdrawals::Withdrawal>), ServiceError> {
    let withdrawal = call(&state.channels.wallet, "WalletService", |response| {
        WalletRequest::RequestWithdrawal {
            user_id,
            withdrawal,
            response,
        }
    })
    .await?;

    Ok((StatusCode::CREATED, Json(withdrawal)))
}

pub async fn list_withdrawals(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<withdrawals::Withdrawal>>, ServiceError> {
    let withdrawals = call(&state.channels.wallet, "WalletService", |response| {
        WalletRequest::ListWithdrawals { user_id, response }
    })
    .await?;

    Ok(Json(withdrawals))
}

pub async fn process_withdrawal(
    State(state): State<AppState>,
    Path(withdrawal_id): Path<String>,
    Json(decision): Json<withdrawals::WithdrawalDecision>,
) -> Result<Json<withdrawals::Withdrawal>, ServiceError> {
    let withdrawal = call(&state.channels.wallet, "WalletService", |response| {
        WalletRequest::ProcessWithdrawal {
            withdrawal_id,
            status: decision.status,
            response,
        }
    })
    .await?;

    Ok(Json(withdrawal))
}
