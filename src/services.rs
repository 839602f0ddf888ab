use async_trait::async_trait;
use sqlx::PgPool;
use tokio::sync::mpsc;

use crate::settings::Settings;
use crate::webhook::WebhookVerifier;

pub mod catalog;
pub mod clicks;
pub mod http;
pub mod transactions;
pub mod users;
pub mod wallet;

const CHANNEL_CAPACITY: usize = 512;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    Database(String),
    #[error("Repository error: {0} - {1}")]
    Repository(String, String),
    #[error("Communication error: {0} - {1}")]
    Communication(String, String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
    #[error("Insufficient balance: {0}")]
    InsufficientBalance(String),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
}

impl From<crate::ledger::LedgerError> for ServiceError {
    fn from(err: crate::ledger::LedgerError) -> Self {
        use crate::ledger::LedgerError;

        match err {
            LedgerError::InvalidTransition { .. } => ServiceError::InvalidTransition(err.to_string()),
            LedgerError::InsufficientBalance { .. } => {
                ServiceError::InsufficientBalance(err.to_string())
            }
            LedgerError::NonPositiveAmount | LedgerError::BelowMinimum { .. } => {
                ServiceError::Validation(err.to_string())
            }
        }
    }
}

#[async_trait]
pub trait RequestHandler<T>: Send + Sync + 'static
where
    T: Send + 'static,
{
    async fn handle_request(&self, request: T);
}

#[async_trait]
pub trait Service<T, H>: Send + Sync + 'static
where
    T: Send + 'static,
    H: RequestHandler<T> + Clone + Send,
{
    async fn run(&mut self, handler: H, receiver: &mut mpsc::Receiver<T>) {
        while let Some(request) = receiver.recv().await {
            let handler = handler.clone();

            tokio::spawn(async move {
                handler.handle_request(request).await;
            });
        }
    }
}

pub async fn start_services(pool: PgPool, settings: Settings) -> Result<(), anyhow::Error> {
    let (user_tx, mut user_rx) = mpsc::channel(CHANNEL_CAPACITY);
    let (catalog_tx, mut catalog_rx) = mpsc::channel(CHANNEL_CAPACITY);
    let (click_tx, mut click_rx) = mpsc::channel(CHANNEL_CAPACITY);
    let (transaction_tx, mut transaction_rx) = mpsc::channel(CHANNEL_CAPACITY);
    let (wallet_tx, mut wallet_rx) = mpsc::channel(CHANNEL_CAPACITY);

    let mut user_service = users::UserService::new();
    let mut catalog_service = catalog::CatalogService::new();
    let mut click_service = clicks::ClickService::new();
    let mut transaction_service = transactions::TransactionService::new();
    let mut wallet_service = wallet::WalletService::new();

    log::info!("Starting user service.");
    let user_pool = pool.clone();
    tokio::spawn(async move {
        user_service
            .run(users::UserRequestHandler::new(user_pool), &mut user_rx)
            .await;
    });

    log::info!("Starting catalog service.");
    let catalog_pool = pool.clone();
    tokio::spawn(async move {
        catalog_service
            .run(
                catalog::CatalogRequestHandler::new(catalog_pool),
                &mut catalog_rx,
            )
            .await;
    });

    log::info!("Starting click service.");
    let click_pool = pool.clone();
    tokio::spawn(async move {
        click_service
            .run(clicks::ClickRequestHandler::new(click_pool), &mut click_rx)
            .await;
    });

    log::info!("Starting transaction service.");
    let transaction_pool = pool.clone();
    let referral_bonus = settings.cashback.referral_bonus_in_cents;
    tokio::spawn(async move {
        transaction_service
            .run(
                transactions::TransactionRequestHandler::new(transaction_pool, referral_bonus),
                &mut transaction_rx,
            )
            .await;
    });

    log::info!("Starting wallet service.");
    let wallet_pool = pool.clone();
    let min_withdrawal = settings.cashback.min_withdrawal_in_cents;
    tokio::spawn(async move {
        wallet_service
            .run(
                wallet::WalletRequestHandler::new(wallet_pool, min_withdrawal),
                &mut wallet_rx,
            )
            .await;
    });

    let channels = http::Channels {
        users: user_tx,
        catalog: catalog_tx,
        clicks: click_tx,
        transactions: transaction_tx,
        wallet: wallet_tx,
    };
    let verifier = WebhookVerifier::new(&settings.webhook.secret);
    let address = format!("{}:{}", settings.server.host, settings.server.port);

    log::info!("Starting HTTP server.");
    http::start_http_server(&address, channels, verifier).await
}
