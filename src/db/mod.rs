pub mod queries;

use sqlx::sqlite::SqlitePool;

pub use queries::categories::Category;
pub use queries::pages::Page;
pub use queries::users::{Profile, User};

use sqlx::Error;

pub async fn establish_connection(path: &str) -> Result<SqlitePool, Error> {
    SqlitePool::connect(format!("sqlite:{}?mode=rwc", path).as_str()).await
}

pub async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}
