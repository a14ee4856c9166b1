use askama::Template;
use askama_web::WebTemplate;
use axum::body::Body;
use axum::http::header;
use axum::response::Response;
use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::get,
    Router,
};
use prometheus::{Encoder, TextEncoder};
use sqlx::SqlitePool;
use std::path::PathBuf;
use tokio::net::TcpListener;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use super::error::ApiResponse;
use super::routes::{category_router, pages_router, users_router};
use crate::db::queries::categories::top_categories_by_likes;
use crate::db::queries::pages::top_pages_by_views;
use crate::db::{Category, Page};
use crate::settings::Settings;

#[derive(FromRef, Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub media_dir: PathBuf,
    pub session_ttl_hours: i64,
}

impl AppState {
    pub fn new(pool: SqlitePool, settings: &Settings) -> Self {
        AppState {
            pool,
            media_dir: settings.application.media_dir.clone(),
            session_ttl_hours: settings.session.ttl_hours,
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/about", get(about))
        .route("/metrics", get(metrics))
        .nest_service("/media", ServeDir::new(state.media_dir.clone()))
        .with_state(state.clone())
        .merge(category_router(state.clone()))
        .merge(pages_router(state.clone()))
        .merge(users_router(state))
        .fallback(|| async {
            tracing::info!("Fallback");
            StatusCode::NOT_FOUND
        })
        .layer(TraceLayer::new_for_http())
}

pub async fn run_server(pool: SqlitePool, settings: &Settings) -> anyhow::Result<()> {
    let addr = settings.application.address();
    let app = build_router(AppState::new(pool, settings));
    let listener = TcpListener::bind(&addr).await?;

    tracing::info!("Serving on {addr}");
    axum::serve(listener, app).await?;
    Ok(())
}

/// The five most liked categories next to the five most viewed pages.
#[derive(Template, WebTemplate)]
#[template(path = "index.html")]
struct IndexPage {
    categories: Vec<Category>,
    pages: Vec<Page>,
}

async fn index(State(pool): State<SqlitePool>) -> ApiResponse<IndexPage> {
    let categories = top_categories_by_likes(&pool, 5).await?;
    let pages = top_pages_by_views(&pool, 5).await?;
    Ok(IndexPage { categories, pages })
}

#[derive(Template, WebTemplate)]
#[template(path = "about.html")]
struct AboutPage;

async fn about() -> AboutPage {
    AboutPage
}

async fn metrics() -> Response {
    let encoder = TextEncoder::new();
    let metrics = prometheus::gather();
    let mut buf = vec![];
    encoder.encode(&metrics, &mut buf).unwrap();
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, encoder.format_type())
        .body(Body::from(buf))
        .unwrap()
}
