use std::fs::create_dir_all;

use anyhow::Context;
use linkdex::db;
use linkdex::server::app::run_server;
use linkdex::settings;
use linkdex::telemetry::init_tracing;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    init_tracing();
    let settings = settings::load().context("Failed to load configuration")?;

    let media_dir = &settings.application.media_dir;
    if !media_dir.exists() {
        create_dir_all(media_dir).context("Failed to create directory for uploaded media")?;
    }
    if !media_dir.is_dir() {
        anyhow::bail!("media_dir should be a directory or not exist");
    }

    let pool = db::establish_connection(&settings.database.path)
        .await
        .context("Cannot connect to DB")?;

    tracing::info!("Running db migrations...");
    db::run_migrations(&pool).await?;

    run_server(pool, &settings).await
}
