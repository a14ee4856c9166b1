use clap::{Parser, Subcommand};
use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::SqlitePool;
use std::error::Error;
use std::path::PathBuf;

use linkdex::db::queries::categories::{get_all_categories, import_categories};
use linkdex::db::queries::pages::{get_all_pages, import_pages};
use linkdex::db::{run_migrations, Category, Page};
use linkdex::telemetry::init_tracing;

#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
struct Cli {
    /// Database path
    db_path: PathBuf,
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import categories and pages from CSV files, reconciling by id.
    /// Doubles as the seeding mechanism for a fresh database.
    Import { path: PathBuf },
    /// Export categories and pages to CSV files
    Export { path: PathBuf },
}

#[tokio::main]
async fn main() {
    init_tracing();
    let cli = Cli::parse();
    let db_path: PathBuf = cli.db_path;
    let pool = SqlitePool::connect(format!("sqlite:{}?mode=rwc", db_path.display()).as_str())
        .await
        .expect("Cannot connect to DB");
    run_migrations(&pool).await.expect("Migrations failed");
    match cli.command {
        Commands::Export { path } => export_data(&pool, path).await.expect("Cannot export"),
        Commands::Import { path } => import_data(&pool, path).await.expect("Cannot import"),
    }
}

fn write_to(path: PathBuf, data: Vec<impl Serialize>) -> Result<(), Box<dyn Error>> {
    let file = std::fs::File::create(path)?;
    let mut wtr = csv::Writer::from_writer(file);
    for line in data {
        wtr.serialize(line)?;
    }
    wtr.flush()?;
    Ok(())
}

fn read_from<T: DeserializeOwned>(path: PathBuf) -> Result<Vec<T>, Box<dyn Error>> {
    let file = std::fs::File::open(path)?;
    let mut rdr = csv::Reader::from_reader(file);
    let mut out = Vec::new();
    for record in rdr.deserialize() {
        let record: T = record?;
        out.push(record);
    }
    Ok(out)
}

async fn export_data(pool: &SqlitePool, path: PathBuf) -> Result<(), Box<dyn Error>> {
    let categories = get_all_categories(pool).await?;
    let pages = get_all_pages(pool).await?;
    if !path.exists() {
        std::fs::create_dir_all(&path)?
    }
    write_to(path.join("categories.csv"), categories)?;
    write_to(path.join("pages.csv"), pages)?;
    Ok(())
}

async fn import_data(pool: &SqlitePool, path: PathBuf) -> Result<(), Box<dyn Error>> {
    let categories: Vec<Category> = read_from(path.join("categories.csv"))?;
    let pages: Vec<Page> = read_from(path.join("pages.csv"))?;
    // Categories first so imported pages can reference them.
    import_categories(pool, categories).await?;
    import_pages(pool, pages).await?;
    Ok(())
}
