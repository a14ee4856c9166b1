use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::collections::HashSet;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Page {
    pub id: i64,
    pub category_id: i64,
    pub title: String,
    pub url: String,
    pub views: i64,
}

/// A page always belongs to a category; the view counter starts at zero.
pub async fn create_page(
    pool: &SqlitePool,
    category_id: i64,
    title: &str,
    url: &str,
) -> sqlx::Result<i64> {
    let mut conn = pool.acquire().await?;

    let id = sqlx::query(
        r#"
INSERT INTO pages (category_id, title, url, views) VALUES (?1, ?2, ?3, 0)
        "#,
    )
    .bind(category_id)
    .bind(title)
    .bind(url)
    .execute(&mut *conn)
    .await?
    .last_insert_rowid();

    Ok(id)
}

pub async fn get_pages_for_category(
    pool: &SqlitePool,
    category_id: i64,
) -> sqlx::Result<Vec<Page>> {
    sqlx::query_as::<_, Page>(
        r#"
SELECT id, category_id, title, url, views
FROM pages
WHERE category_id = ?1
        "#,
    )
    .bind(category_id)
    .fetch_all(pool)
    .await
}

pub async fn top_pages_by_views(pool: &SqlitePool, limit: i64) -> sqlx::Result<Vec<Page>> {
    sqlx::query_as::<_, Page>(
        r#"
SELECT id, category_id, title, url, views
FROM pages
ORDER BY views DESC
LIMIT ?1
        "#,
    )
    .bind(limit)
    .fetch_all(pool)
    .await
}

pub async fn get_all_pages(pool: &SqlitePool) -> sqlx::Result<Vec<Page>> {
    sqlx::query_as::<_, Page>(
        r#"
SELECT id, category_id, title, url, views
FROM pages
ORDER BY id
        "#,
    )
    .fetch_all(pool)
    .await
}

pub async fn update_page(pool: &SqlitePool, page: &Page) -> sqlx::Result<()> {
    let mut conn = pool.acquire().await?;

    sqlx::query(
        r#"
UPDATE pages SET category_id=?1, title=?2, url=?3, views=?4 WHERE pages.id = ?5
        "#,
    )
    .bind(page.category_id)
    .bind(&page.title)
    .bind(&page.url)
    .bind(page.views)
    .bind(page.id)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

pub async fn delete_page(pool: &SqlitePool, id: i64) -> sqlx::Result<()> {
    let mut conn = pool.acquire().await?;

    sqlx::query(
        r#"
DELETE FROM pages WHERE pages.id = ?1
        "#,
    )
    .bind(id)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

pub async fn import_pages(pool: &SqlitePool, pages: Vec<Page>) -> sqlx::Result<()> {
    let existing = get_all_pages(pool).await?;
    let existing_ids: HashSet<i64> = existing.iter().map(|p| p.id).collect();
    let new_ids: HashSet<i64> = pages.iter().map(|p| p.id).collect();
    for id in existing_ids.difference(&new_ids) {
        delete_page(pool, *id).await?;
    }
    for page in pages {
        if existing_ids.contains(&page.id) {
            update_page(pool, &page).await?;
        } else {
            sqlx::query(
                r#"
INSERT INTO pages (id, category_id, title, url, views) VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
            )
            .bind(page.id)
            .bind(page.category_id)
            .bind(&page.title)
            .bind(&page.url)
            .bind(page.views)
            .execute(pool)
            .await?;
        }
    }
    Ok(())
}
