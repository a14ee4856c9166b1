use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use chrono::{Duration, Utc};
use secrecy::{ExposeSecret, SecretString};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::db::queries::{sessions, users};
use crate::db::User;

pub enum LoginOutcome {
    /// Credentials matched an active account.
    Success(User),
    /// Unknown username or wrong password; callers must not say which.
    InvalidCredentials,
    AccountDisabled,
}

pub fn hash_password(password: &SecretString) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.expose_secret().as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("failed to hash password: {e}"))?;
    Ok(hash.to_string())
}

pub fn verify_password(password: &SecretString, stored_hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored_hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.expose_secret().as_bytes(), &parsed)
        .is_ok()
}

/// The password check runs before the active check, so a wrong password on a
/// deactivated account still reads as invalid credentials.
pub async fn authenticate(
    pool: &SqlitePool,
    username: &str,
    password: &SecretString,
) -> anyhow::Result<LoginOutcome> {
    let Some(user) = users::get_user_by_username(pool, username).await? else {
        return Ok(LoginOutcome::InvalidCredentials);
    };
    if !verify_password(password, &user.password_hash) {
        return Ok(LoginOutcome::InvalidCredentials);
    }
    if !user.active {
        return Ok(LoginOutcome::AccountDisabled);
    }
    Ok(LoginOutcome::Success(user))
}

/// Issue a fresh session token for the user and persist it.
pub async fn start_session(
    pool: &SqlitePool,
    user_id: i64,
    ttl_hours: i64,
) -> anyhow::Result<String> {
    let token = Uuid::new_v4().simple().to_string();
    let expires_at = Utc::now() + Duration::hours(ttl_hours);
    sessions::create_session(pool, &token, user_id, expires_at).await?;
    Ok(token)
}

pub async fn end_session(pool: &SqlitePool, token: &str) -> anyhow::Result<()> {
    sessions::delete_session(pool, token).await?;
    Ok(())
}
