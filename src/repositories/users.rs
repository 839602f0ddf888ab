use crate::models::{referrals, users};

use rand::{distributions::Alphanumeric, Rng};
use sqlx::PgPool;

use super::{is_unique_violation, new_id};

const REFERRAL_CODE_LENGTH: usize = 8;
const REFERRAL_CODE_ATTEMPTS: usize = 5;

pub enum NewUserOutcome {
    Created(users::User),
    UnknownReferralCode,
    EmailTaken,
}

#[derive(Clone)]
pub struct UserRepository {
    conn: PgPool,
}

pub fn generate_referral_code() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(REFERRAL_CODE_LENGTH)
        .map(|c| (c as char).to_ascii_uppercase())
        .collect()
}

impl UserRepository {
    pub fn new(conn: PgPool) -> Self {
        Self { conn }
    }

    pub async fn insert_user(
        &self,
        new_user: &users::NewUser,
    ) -> Result<NewUserOutcome, anyhow::Error> {
        let referred_by: Option<String> = match &new_user.referral_code {
            Some(code) => match self.get_user_by_referral_code(code).await? {
                Some(referrer) => Some(referrer.id),
                None => return Ok(NewUserOutcome::UnknownReferralCode),
            },
            None => None,
        };

        for _ in 0..REFERRAL_CODE_ATTEMPTS {
            let result = sqlx::query_as::<_, users::User>(
                r#"
                    INSERT INTO users (id, email, name, referral_code, referred_by)
                    VALUES ($1, $2, $3, $4, $5)
                    RETURNING *
                "#,
            )
            .bind(new_id())
            .bind(new_user.email.trim().to_lowercase())
            .bind(new_user.name.trim())
            .bind(generate_referral_code())
            .bind(&referred_by)
            .fetch_one(&self.conn)
            .await;

            match result {
                Ok(user) => return Ok(NewUserOutcome::Created(user)),
                Err(e) if is_unique_violation(&e, Some("users_email_key")) => {
                    return Ok(NewUserOutcome::EmailTaken)
                }
                Err(e) if is_unique_violation(&e, Some("users_referral_code_key")) => {
                    log::warn!("Referral code collision, retrying.");
                    continue;
                }
                Err(e) => return Err(e.into()),
            }
        }

        anyhow::bail!("Could not allocate a unique referral code")
    }

    pub async fn get_user_by_id(
        &self,
        user_id: &str,
    ) -> Result<Option<users::User>, anyhow::Error> {
        let user = sqlx::query_as::<_, users::User>("SELECT * FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.conn)
            .await?;

        Ok(user)
    }

    pub async fn get_user_by_referral_code(
        &self,
        code: &str,
    ) -> Result<Option<users::User>, anyhow::Error> {
        let user =
            sqlx::query_as::<_, users::User>("SELECT * FROM users WHERE referral_code = $1")
                .bind(code.trim().to_uppercase())
                .fetch_optional(&self.conn)
                .await?;

        Ok(user)
    }

    pub async fn get_referred_users(
        &self,
        referrer_id: &str,
    ) -> Result<Vec<users::ReferredUser>, anyhow::Error> {
        let referred = sqlx::query_as::<_, users::ReferredUser>(
            r#"
                SELECT u.id, u.name, u.created_at, (rb.id IS NOT NULL) AS bonus_paid
                FROM users u
                LEFT JOIN referral_bonuses rb ON rb.referred_user_id = u.id
                WHERE u.referred_by = $1
                ORDER BY u.created_at DESC
            "#,
        )
        .bind(referrer_id)
        .fetch_all(&self.conn)
        .await?;

        Ok(referred)
    }

    pub async fn get_referral_bonuses(
        &self,
        referrer_id: &str,
    ) -> Result<Vec<referrals::ReferralBonus>, anyhow::Error> {
        let bonuses = sqlx::query_as::<_, referrals::ReferralBonus>(
            "SELECT * FROM referral_bonuses WHERE referrer_id = $1 ORDER BY created_at DESC",
        )
        .bind(referrer_id)
        .fetch_all(&self.conn)
        .await?;

        Ok(bonuses)
    }

    pub async fn count_referred_users(&self, referrer_id: &str) -> Result<i64, anyhow::Error> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM users WHERE referred_by = $1")
            .bind(referrer_id)
            .fetch_one(&self.conn)
            .await?;

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn referral_codes_are_uppercase_alphanumeric() {
        let code = generate_referral_code();
        assert_eq!(code.len(), REFERRAL_CODE_LENGTH);
        assert!(code
            .chars()
            .all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
    }
}
