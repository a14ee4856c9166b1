use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use super::users::User;

pub async fn create_session(
    pool: &SqlitePool,
    token: &str,
    user_id: i64,
    expires_at: DateTime<Utc>,
) -> sqlx::Result<()> {
    let mut conn = pool.acquire().await?;

    sqlx::query(
        r#"
INSERT INTO sessions (token, user_id, expires_at) VALUES (?1, ?2, ?3)
        "#,
    )
    .bind(token)
    .bind(user_id)
    .bind(expires_at)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Resolve a session token to its user. Expired sessions and deactivated
/// accounts resolve to nothing.
pub async fn get_session_user(pool: &SqlitePool, token: &str) -> sqlx::Result<Option<User>> {
    sqlx::query_as::<_, User>(
        r#"
SELECT users.id, users.username, users.email, users.password_hash, users.active
FROM sessions
JOIN users ON users.id = sessions.user_id
WHERE sessions.token = ?1 AND sessions.expires_at > ?2 AND users.active = 1
        "#,
    )
    .bind(token)
    .bind(Utc::now())
    .fetch_optional(pool)
    .await
}

pub async fn delete_session(pool: &SqlitePool, token: &str) -> sqlx::Result<()> {
    let mut conn = pool.acquire().await?;

    sqlx::query(
        r#"
DELETE FROM sessions WHERE sessions.token = ?1
        "#,
    )
    .bind(token)
    .execute(&mut *conn)
    .await?;
    Ok(())
}
