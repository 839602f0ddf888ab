use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde_json::json;
use tokio::sync::{mpsc, oneshot};
use tower_http::trace::TraceLayer;

use super::{
    catalog::CatalogRequest, clicks::ClickRequest, transactions::TransactionServiceRequest,
    users::UserRequest, wallet::WalletRequest, ServiceError,
};
use crate::webhook::WebhookVerifier;

mod catalog;
mod clicks;
mod transactions;
mod users;
mod wallet;

/// Senders for every service actor the HTTP layer talks to.
#[derive(Clone)]
pub struct Channels {
    pub users: mpsc::Sender<UserRequest>,
    pub catalog: mpsc::Sender<CatalogRequest>,
    pub clicks: mpsc::Sender<ClickRequest>,
    pub transactions: mpsc::Sender<TransactionServiceRequest>,
    pub wallet: mpsc::Sender<WalletRequest>,
}

#[derive(Clone)]
pub(crate) struct AppState {
    channels: Channels,
    verifier: WebhookVerifier,
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let (status, error) = match &self {
            ServiceError::NotFound(_) => (StatusCode::NOT_FOUND, "Not found"),
            ServiceError::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "Validation error"),
            ServiceError::Conflict(_) => (StatusCode::CONFLICT, "Conflict"),
            ServiceError::InvalidTransition(_) => (StatusCode::CONFLICT, "Invalid transition"),
            ServiceError::InsufficientBalance(_) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "Insufficient balance")
            }
            ServiceError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "Unauthorized"),
            _ => {
                log::error!("Request failed: {}", self);
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({"error": "Internal server error."})),
                )
                    .into_response();
            }
        };

        (
            status,
            Json(json!({
                "error": error,
                "details": self.to_string()
            })),
        )
            .into_response()
    }
}

/// Sends a request to a service actor and waits for its answer.
async fn call<R, T>(
    channel: &mpsc::Sender<R>,
    service: &str,
    request: impl FnOnce(oneshot::Sender<Result<T, ServiceError>>) -> R,
) -> Result<T, ServiceError> {
    let (response_tx, response_rx) = oneshot::channel();

    channel
        .send(request(response_tx))
        .await
        .map_err(|e| ServiceError::Communication(service.to_string(), e.to_string()))?;

    response_rx
        .await
        .map_err(|e| ServiceError::Communication(service.to_string(), e.to_string()))?
}

pub fn router(channels: Channels, verifier: WebhookVerifier) -> Router {
    let app_state = AppState { channels, verifier };

    Router::new()
        .route("/users", post(users::create_user))
        .route("/users/{id}", get(users::get_user_details))
        .route("/users/{id}/referrals", get(users::list_referrals))
        .route(
            "/users/{id}/referral-bonuses",
            get(users::list_referral_bonuses),
        )
        .route("/users/{id}/transactions", get(users::list_user_transactions))
        .route("/users/{id}/wallet", get(wallet::get_wallet))
        .route(
            "/users/{id}/withdrawals",
            get(wallet::list_withdrawals).post(wallet::request_withdrawal),
        )
        .route("/withdrawals/{id}/status", put(wallet::process_withdrawal))
        .route(
            "/merchants",
            get(catalog::list_merchants).post(catalog::create_merchant),
        )
        .route(
            "/merchants/{id}",
            get(catalog::get_merchant).patch(catalog::update_merchant),
        )
        .route(
            "/merchants/{id}/offers",
            get(catalog::list_merchant_offers).post(catalog::create_offer),
        )
        .route("/offers", get(catalog::list_offers))
        .route("/offers/{id}", get(catalog::get_offer))
        .route("/clicks", post(clicks::track_click))
        .route("/clicks/{token}", get(clicks::get_click))
        .route("/go/{slug}", get(clicks::redirect_to_merchant))
        .route("/webhooks/affiliate", post(transactions::affiliate_webhook))
        .route("/transactions/{id}", get(transactions::get_transaction))
        .route(
            "/transactions/{id}/status",
            put(transactions::update_transaction_status),
        )
        .route("/health", get(|| async { "OK" }))
        .with_state(app_state)
        .layer(TraceLayer::new_for_http())
}

pub async fn start_http_server(
    address: &str,
    channels: Channels,
    verifier: WebhookVerifier,
) -> Result<(), anyhow::Error> {
    let app = router(channels, verifier);

    let listener = tokio::net::TcpListener::bind(address).await?;
    log::info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;

    Ok(())
}
