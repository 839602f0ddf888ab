use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use super::{call, AppState};
use crate::models::{referrals::ReferralBonus, transactions::Transaction, users};
use crate::services::{
    transactions::TransactionServiceRequest, users::UserRequest, ServiceError,
};

pub async fn create_user(
    State(state): State<AppState>,
    Json(new_user): Json<users::NewUser>,
) -> Result<(StatusCode, Json<users::User>), ServiceError> {
    let user = call(&state.channels.users, "UserService", |response| {
        UserRequest::CreateUser { new_user, response }
    })
    .await?;

    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn get_user_details(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<users::UserDetails>, ServiceError> {
    let details = call(&state.channels.users, "UserService", |response| {
        UserRequest::GetUserDetails {
            id: user_id,
            response,
        }
    })
    .await?;

    Ok(Json(details))
}

pub async fn list_referrals(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<users::ReferredUser>>, ServiceError> {
    let referrals = call(&state.channels.users, "UserService", |response| {
        UserRequest::ListReferrals {
            id: user_id,
            response,
        }
    })
    .await?;

    Ok(Json(referrals))
}

pub async fn list_referral_bonuses(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<ReferralBonus>>, ServiceError> {
    let bonuses = call(&state.channels.users, "UserService", |response| {
        UserRequest::ListReferralBonuses {
            id: user_id,
            response,
        }
    })
    .await?;

    Ok(Json(bonuses))
}

pub async fn list_user_transactions(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<Transaction>>, ServiceError> {
    call(&state.channels.users, "UserService", |response| {
        UserRequest::GetUser {
            id: user_id.clone(),
            response,
        }
    })
    .await?;

    let transactions = call(
        &state.channels.transactions,
        "TransactionService",
        |response| TransactionServiceRequest::ListUserTransactions { user_id, response },
    )
    .await?;

    Ok(Json(transactions))
}
