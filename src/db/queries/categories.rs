use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::collections::HashSet;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub views: i64,
    pub likes: i64,
}

/// Derive the URL-safe identifier a category is looked up by: lowercase,
/// alphanumeric runs joined by single hyphens.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_hyphen = false;
    for c in name.chars() {
        if c.is_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.extend(c.to_lowercase());
        } else {
            pending_hyphen = true;
        }
    }
    slug
}

/// Counters start at zero; they are only ever adjusted elsewhere.
pub async fn create_category(pool: &SqlitePool, name: &str, slug: &str) -> sqlx::Result<i64> {
    let mut conn = pool.acquire().await?;

    let id = sqlx::query(
        r#"
INSERT INTO categories (name, slug, views, likes) VALUES (?1, ?2, 0, 0)
        "#,
    )
    .bind(name)
    .bind(slug)
    .execute(&mut *conn)
    .await?
    .last_insert_rowid();

    Ok(id)
}

pub async fn get_category_by_slug(pool: &SqlitePool, slug: &str) -> sqlx::Result<Option<Category>> {
    sqlx::query_as::<_, Category>(
        r#"
SELECT id, name, slug, views, likes
FROM categories
WHERE slug = ?1
        "#,
    )
    .bind(slug)
    .fetch_optional(pool)
    .await
}

pub async fn top_categories_by_likes(pool: &SqlitePool, limit: i64) -> sqlx::Result<Vec<Category>> {
    sqlx::query_as::<_, Category>(
        r#"
SELECT id, name, slug, views, likes
FROM categories
ORDER BY likes DESC
LIMIT ?1
        "#,
    )
    .bind(limit)
    .fetch_all(pool)
    .await
}

pub async fn get_all_categories(pool: &SqlitePool) -> sqlx::Result<Vec<Category>> {
    sqlx::query_as::<_, Category>(
        r#"
SELECT id, name, slug, views, likes
FROM categories
ORDER BY id
        "#,
    )
    .fetch_all(pool)
    .await
}

pub async fn update_category(pool: &SqlitePool, category: &Category) -> sqlx::Result<()> {
    let mut conn = pool.acquire().await?;

    sqlx::query(
        r#"
UPDATE categories SET name=?1, slug=?2, views=?3, likes=?4 WHERE categories.id = ?5
        "#,
    )
    .bind(&category.name)
    .bind(&category.slug)
    .bind(category.views)
    .bind(category.likes)
    .bind(category.id)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

pub async fn delete_category(pool: &SqlitePool, id: i64) -> sqlx::Result<()> {
    let mut conn = pool.acquire().await?;

    sqlx::query(
        r#"
DELETE FROM categories WHERE categories.id = ?1
        "#,
    )
    .bind(id)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Reconcile the categories table against an imported snapshot: rows missing
/// from the snapshot are deleted, known ids are updated, new ids inserted
/// with their full row (counters included).
pub async fn import_categories(pool: &SqlitePool, categories: Vec<Category>) -> sqlx::Result<()> {
    let existing = get_all_categories(pool).await?;
    let existing_ids: HashSet<i64> = existing.iter().map(|c| c.id).collect();
    let new_ids: HashSet<i64> = categories.iter().map(|c| c.id).collect();
    for id in existing_ids.difference(&new_ids) {
        delete_category(pool, *id).await?;
    }
    for category in categories {
        if existing_ids.contains(&category.id) {
            update_category(pool, &category).await?;
        } else {
            sqlx::query(
                r#"
INSERT INTO categories (id, name, slug, views, likes) VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
            )
            .bind(category.id)
            .bind(&category.name)
            .bind(&category.slug)
            .bind(category.views)
            .bind(category.likes)
            .execute(pool)
            .await?;
        }
    }
    Ok(())
}
