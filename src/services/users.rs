use async_trait::async_trait;
use sqlx::PgPool;
use tokio::sync::oneshot;

use super::{RequestHandler, Service, ServiceError};
use crate::{
    models::{referrals::ReferralBonus, users},
    repositories::{
        users::{NewUserOutcome, UserRepository},
        wallet::WalletRepository,
    },
};

pub enum UserRequest {
    CreateUser {
        new_user: users::NewUser,
        response: oneshot::Sender<Result<users::User, ServiceError>>,
    },
    GetUser {
        id: String,
        response: oneshot::Sender<Result<users::User, ServiceError>>,
    },
    GetUserDetails {
        id: String,
        response: oneshot::Sender<Result<users::UserDetails, ServiceError>>,
    },
    ListReferrals {
        id: String,
        response: oneshot::Sender<Result<Vec<users::ReferredUser>, ServiceError>>,
    },
    ListReferralBonuses {
        id: String,
        response: oneshot::Sender<Result<Vec<ReferralBonus>, ServiceError>>,
    },
}

pub fn validate_new_user(new_user: &users::NewUser) -> Result<(), ServiceError> {
    let email = new_user.email.trim();
    let valid_email = email
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));

    if !valid_email {
        return Err(ServiceError::Validation(format!(
            "Invalid email address: {}.",
            email
        )));
    }
    if new_user.name.trim().is_empty() {
        return Err(ServiceError::Validation("Name cannot be empty.".to_string()));
    }

    Ok(())
}

#[derive(Clone)]
pub struct UserRequestHandler {
    repository: UserRepository,
    wallet_repository: WalletRepository,
}

impl UserRequestHandler {
    pub fn new(sql_conn: PgPool) -> Self {
        let repository = UserRepository::new(sql_conn.clone());
        let wallet_repository = WalletRepository::new(sql_conn);

        UserRequestHandler {
            repository,
            wallet_repository,
        }
    }

    async fn create_user(&self, new_user: users::NewUser) -> Result<users::User, ServiceError> {
        validate_new_user(&new_user)?;

        let outcome = self
            .repository
            .insert_user(&new_user)
            .await
            .map_err(|e| ServiceError::Repository("Users".to_string(), e.to_string()))?;

        match outcome {
            NewUserOutcome::Created(user) => {
                log::info!("Created user {} (referred by {:?}).", user.id, user.referred_by);
                Ok(user)
            }
            NewUserOutcome::UnknownReferralCode => Err(ServiceError::Validation(format!(
                "Unknown referral code: {}.",
                new_user.referral_code.unwrap_or_default()
            ))),
            NewUserOutcome::EmailTaken => Err(ServiceError::Conflict(format!(
                "Email already registered: {}.",
                new_user.email
            ))),
        }
    }

    async fn get_user(&self, id: &str) -> Result<users::User, ServiceError> {
        self.repository
            .get_user_by_id(id)
            .await
            .map_err(|e| ServiceError::Database(e.to_string()))?
            .ok_or_else(|| ServiceError::NotFound(format!("User {}", id)))
    }

    async fn get_user_details(&self, id: &str) -> Result<users::UserDetails, ServiceError> {
        let user = self.get_user(id).await?;

        let wallet = self
            .wallet_repository
            .get_wallet(id)
            .await
            .map_err(|e| ServiceError::Database(e.to_string()))?;

        let referral_count = self
            .repository
            .count_referred_users(id)
            .await
            .map_err(|e| ServiceError::Database(e.to_string()))?;

        Ok(users::UserDetails {
            user,
            wallet,
            referral_count,
        })
    }

    async fn list_referrals(&self, id: &str) -> Result<Vec<users::ReferredUser>, ServiceError> {
        self.get_user(id).await?;

        self.repository
            .get_referred_users(id)
            .await
            .map_err(|e| ServiceError::Database(e.to_string()))
    }

    async fn list_referral_bonuses(&self, id: &str) -> Result<Vec<ReferralBonus>, ServiceError> {
        self.get_user(id).await?;

        self.repository
            .get_referral_bonuses(id)
            .await
            .map_err(|e| ServiceError::Database(e.to_string()))
    }
}

#[async_trait]
impl RequestHandler<UserRequest> for UserRequestHandler {
    async fn handle_request(&self, request: UserRequest) {
        match request {
            UserRequest::CreateUser { new_user, response } => {
                let user = self.create_user(new_user).await;
                let _ = response.send(user);
            }
            UserRequest::GetUser { id, response } => {
                let user = self.get_user(&id).await;
                let _ = response.send(user);
            }
            UserRequest::GetUserDetails { id, response } => {
                let details = self.get_user_details(&id).await;
                let _ = response.send(details);
            }
            UserRequest::ListReferrals { id, response } => {
                let referrals = self.list_referrals(&id).await;
                let _ = response.send(referrals);
            }
            UserRequest::ListReferralBonuses { id, response } => {
                let bonuses = self.list_referral_bonuses(&id).await;
                let _ = response.send(bonuses);
            }
        }
    }
}

pub struct UserService;

impl UserService {
    pub fn new() -> Self {
        UserService {}
    }
}

#[async_trait]
impl Service<UserRequest, UserRequestHandler> for UserService {}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(email: &str, name: &str) -> users::NewUser {
        users::NewUser {
            email: email.to_string(),
            name: name.to_string(),
            referral_code: None,
        }
    }

    #[test]
    fn accepts_plain_addresses() {
        assert!(validate_new_user(&new_user("ana@example.com", "Ana")).is_ok());
        assert!(validate_new_user(&new_user("  ana@example.com ", "Ana")).is_ok());
    }

    #[test]
    fn rejects_bad_input() {
        assert!(matches!(
            validate_new_user(&new_user("ana.example.com", "Ana")),
            Err(ServiceError::Validation(_))
        ));
        assert!(matches!(
            validate_new_user(&new_user("@example.com", "Ana")),
            Err(ServiceError::Validation(_))
        ));
        assert!(matches!(
            validate_new_user(&new_user("ana@example.com", "   ")),
            Err(ServiceError::Validation(_))
        ));
    }
}
