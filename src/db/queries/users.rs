use sqlx::{SqliteConnection, SqlitePool};

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub active: bool,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Profile {
    pub user_id: i64,
    pub website: Option<String>,
    pub picture: Option<String>,
}

pub async fn get_user_by_username(pool: &SqlitePool, username: &str) -> sqlx::Result<Option<User>> {
    sqlx::query_as::<_, User>(
        r#"
SELECT id, username, email, password_hash, active
FROM users
WHERE username = ?1
        "#,
    )
    .bind(username)
    .fetch_optional(pool)
    .await
}

// Takes a connection rather than the pool so registration can insert the
// user and its profile inside one transaction.
pub async fn create_user(
    conn: &mut SqliteConnection,
    username: &str,
    email: &str,
    password_hash: &str,
) -> sqlx::Result<i64> {
    let id = sqlx::query(
        r#"
INSERT INTO users (username, email, password_hash, active) VALUES (?1, ?2, ?3, 1)
        "#,
    )
    .bind(username)
    .bind(email)
    .bind(password_hash)
    .execute(conn)
    .await?
    .last_insert_rowid();

    Ok(id)
}

pub async fn create_profile(
    conn: &mut SqliteConnection,
    user_id: i64,
    website: Option<&str>,
    picture: Option<&str>,
) -> sqlx::Result<()> {
    sqlx::query(
        r#"
INSERT INTO profiles (user_id, website, picture) VALUES (?1, ?2, ?3)
        "#,
    )
    .bind(user_id)
    .bind(website)
    .bind(picture)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn get_profile(pool: &SqlitePool, user_id: i64) -> sqlx::Result<Option<Profile>> {
    sqlx::query_as::<_, Profile>(
        r#"
SELECT user_id, website, picture
FROM profiles
WHERE user_id = ?1
        "#,
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await
}

pub async fn set_user_active(pool: &SqlitePool, user_id: i64, active: bool) -> sqlx::Result<()> {
    let mut conn = pool.acquire().await?;

    sqlx::query(
        r#"
UPDATE users SET active=?1 WHERE users.id = ?2
        "#,
    )
    .bind(active)
    .bind(user_id)
    .execute(&mut *conn)
    .await?;
    Ok(())
}
