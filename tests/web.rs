use axum::body::{to_bytes, Body};
use axum::http::{header, Request, Response, StatusCode};
use secrecy::SecretString;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use tempfile::TempDir;
use tower::util::ServiceExt;

use linkdex::auth;
use linkdex::db::queries::{categories, pages, users};
use linkdex::db::run_migrations;
use linkdex::server::app::{build_router, AppState};

async fn test_state() -> (AppState, TempDir) {
    // A single connection keeps the in-memory database alive and shared.
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    run_migrations(&pool).await.unwrap();
    let media_dir = tempfile::tempdir().unwrap();
    let state = AppState {
        pool,
        media_dir: media_dir.path().to_path_buf(),
        session_ttl_hours: 72,
    };
    (state, media_dir)
}

async fn get(state: &AppState, path: &str) -> Response<Body> {
    let request = Request::builder()
        .uri(path)
        .body(Body::empty())
        .unwrap();
    build_router(state.clone()).oneshot(request).await.unwrap()
}

async fn post_form(
    state: &AppState,
    path: &str,
    body: &str,
    cookie: Option<&str>,
) -> Response<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(path)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    let request = builder.body(Body::from(body.to_owned())).unwrap();
    build_router(state.clone()).oneshot(request).await.unwrap()
}

async fn post_multipart(state: &AppState, path: &str, body: Vec<u8>, boundary: &str) -> Response<Body> {
    let request = Request::builder()
        .method("POST")
        .uri(path)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(Body::from(body))
        .unwrap();
    build_router(state.clone()).oneshot(request).await.unwrap()
}

async fn body_string(response: Response<Body>) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn location(response: &Response<Body>) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

const BOUNDARY: &str = "----linkdex-test-boundary";

fn multipart_body(fields: &[(&str, &str)], file: Option<(&str, &str, &[u8])>) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some((name, filename, contents)) = file {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(contents);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

async fn create_account(pool: &SqlitePool, username: &str, password: &str, active: bool) -> i64 {
    let hash = auth::hash_password(&SecretString::from(password.to_owned())).unwrap();
    let mut conn = pool.acquire().await.unwrap();
    let id = users::create_user(&mut conn, username, "user@example.com", &hash)
        .await
        .unwrap();
    drop(conn);
    if !active {
        users::set_user_active(pool, id, false).await.unwrap();
    }
    id
}

/// Log in through the real endpoint and return the session cookie pair.
async fn login(state: &AppState, username: &str, password: &str) -> String {
    let response = post_form(
        state,
        "/login",
        &format!("username={username}&password={password}"),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .expect("login should set a session cookie")
        .to_str()
        .unwrap();
    cookie.split(';').next().unwrap().to_owned()
}

async fn count(pool: &SqlitePool, table: &str) -> i64 {
    sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM {table}"))
        .fetch_one(pool)
        .await
        .unwrap()
}

#[tokio::test]
async fn home_renders_empty_lists() {
    let (state, _media) = test_state().await;
    let response = get(&state, "/").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_string(response).await;
    assert!(body.contains("There are no categories present."));
    assert!(body.contains("There are no pages present."));
}

#[tokio::test]
async fn home_lists_top_five_by_likes_and_views() {
    let (state, _media) = test_state().await;
    let snapshot: Vec<_> = (0..7)
        .map(|n| categories::Category {
            id: n + 1,
            name: format!("Category {n}"),
            slug: format!("category-{n}"),
            views: 0,
            likes: n,
        })
        .collect();
    categories::import_categories(&state.pool, snapshot).await.unwrap();

    let body = body_string(get(&state, "/").await).await;
    assert!(body.contains("Category 6"));
    assert!(body.contains("Category 2"));
    assert!(!body.contains("Category 1</a>"));
    assert!(!body.contains("Category 0</a>"));
}

#[tokio::test]
async fn unknown_category_slug_renders_empty_state() {
    let (state, _media) = test_state().await;
    let response = get(&state, "/category/no-such-category").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_string(response).await;
    assert!(body.contains("The specified category does not exist."));
}

#[tokio::test]
async fn category_page_lists_its_pages() {
    let (state, _media) = test_state().await;
    let id = categories::create_category(&state.pool, "Rust", "rust")
        .await
        .unwrap();
    pages::create_page(&state.pool, id, "The Book", "https://doc.rust-lang.org/book/")
        .await
        .unwrap();

    let body = body_string(get(&state, "/category/rust").await).await;
    assert!(body.contains("The Book"));
    assert!(body.contains("https://doc.rust-lang.org/book/"));
}

#[tokio::test]
async fn add_category_requires_login_then_forces_zero_counters() {
    let (state, _media) = test_state().await;

    // Unauthenticated: redirected to login, nothing persisted, even though
    // the client smuggled in counter values.
    let response = post_form(
        &state,
        "/add_category",
        "name=Rust+Crates&views=999&likes=999",
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/login");
    assert_eq!(count(&state.pool, "categories").await, 0);

    // Authenticated: created with server-controlled counters and slug.
    create_account(&state.pool, "alice", "wonderland", true).await;
    let cookie = login(&state, "alice", "wonderland").await;
    let response = post_form(
        &state,
        "/add_category",
        "name=Rust+Crates&views=999&likes=999",
        Some(&cookie),
    )
    .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");

    let category = categories::get_category_by_slug(&state.pool, "rust-crates")
        .await
        .unwrap()
        .expect("category should exist");
    assert_eq!(category.name, "Rust Crates");
    assert_eq!(category.views, 0);
    assert_eq!(category.likes, 0);
}

#[tokio::test]
async fn add_category_rerenders_with_errors_on_empty_name() {
    let (state, _media) = test_state().await;
    create_account(&state.pool, "alice", "wonderland", true).await;
    let cookie = login(&state, "alice", "wonderland").await;

    let response = post_form(&state, "/add_category", "name=", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_string(response).await;
    assert!(body.contains("Please enter a category name"));
    assert_eq!(count(&state.pool, "categories").await, 0);
}

#[tokio::test]
async fn add_page_normalizes_bare_urls_and_keeps_schemes() {
    let (state, _media) = test_state().await;
    let id = categories::create_category(&state.pool, "Search", "search")
        .await
        .unwrap();

    let response = post_form(
        &state,
        "/category/search/add_page",
        "title=Example&url=www.example.com",
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/category/search");

    let response = post_form(
        &state,
        "/category/search/add_page",
        "title=Secure&url=https%3A%2F%2Fexample.org%2Fdocs",
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let stored = pages::get_pages_for_category(&state.pool, id).await.unwrap();
    let urls: Vec<&str> = stored.iter().map(|p| p.url.as_str()).collect();
    assert!(urls.contains(&"http://www.example.com"));
    assert!(urls.contains(&"https://example.org/docs"));
    assert!(stored.iter().all(|p| p.views == 0));
}

#[tokio::test]
async fn add_page_to_unknown_category_never_persists() {
    let (state, _media) = test_state().await;
    let response = post_form(
        &state,
        "/category/no-such-category/add_page",
        "title=Orphan&url=http%3A%2F%2Fexample.com",
        None,
    )
    .await;
    // Rendered form again, not a redirect, and no orphan page row.
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(count(&state.pool, "pages").await, 0);
}

#[tokio::test]
async fn add_page_rerenders_with_errors_on_bad_url() {
    let (state, _media) = test_state().await;
    categories::create_category(&state.pool, "Search", "search")
        .await
        .unwrap();
    let response = post_form(
        &state,
        "/category/search/add_page",
        "title=Broken&url=http%3A%2F%2F",
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_string(response).await;
    assert!(body.contains("Please enter a well-formed URL."));
    assert!(body.contains("value=\"Broken\""));
    assert_eq!(count(&state.pool, "pages").await, 0);
}

#[tokio::test]
async fn register_creates_account_profile_and_stores_picture() {
    let (state, media) = test_state().await;
    let body = multipart_body(
        &[
            ("username", "bob"),
            ("email", "bob@example.com"),
            ("password", "builder"),
            ("website", "https://bob.example.com"),
        ],
        Some(("picture", "me.png", b"fake png bytes")),
    );
    let response = post_multipart(&state, "/register", body, BOUNDARY).await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_string(response).await;
    assert!(html.contains("Thank you for registering!"));

    let user = users::get_user_by_username(&state.pool, "bob")
        .await
        .unwrap()
        .expect("user should exist");
    assert!(user.active);
    assert_ne!(user.password_hash, "builder");
    assert!(user.password_hash.starts_with("$argon2"));

    let profile = users::get_profile(&state.pool, user.id)
        .await
        .unwrap()
        .expect("profile should exist");
    assert_eq!(profile.website.as_deref(), Some("https://bob.example.com"));
    let picture = profile.picture.expect("picture should be recorded");
    assert!(picture.ends_with(".png"));
    assert!(media.path().join(&picture).exists());

    // The freshly registered account can log straight in.
    login(&state, "bob", "builder").await;
}

#[tokio::test]
async fn register_with_invalid_email_persists_nothing() {
    let (state, _media) = test_state().await;
    let body = multipart_body(
        &[
            ("username", "bob"),
            ("email", "not-an-email"),
            ("password", "builder"),
        ],
        None,
    );
    let response = post_multipart(&state, "/register", body, BOUNDARY).await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_string(response).await;
    assert!(html.contains("Please enter a valid email address."));
    // Account and profile fail together.
    assert_eq!(count(&state.pool, "users").await, 0);
    assert_eq!(count(&state.pool, "profiles").await, 0);
}

#[tokio::test]
async fn login_with_wrong_password_is_generic() {
    let (state, _media) = test_state().await;
    create_account(&state.pool, "carol", "correct", true).await;
    let response = post_form(&state, "/login", "username=carol&password=wrong", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get(header::SET_COOKIE).is_none());
    let body = body_string(response).await;
    assert!(body.contains("Invalid login details supplied."));
    assert!(!body.contains("disabled"));
}

#[tokio::test]
async fn login_to_disabled_account_is_refused() {
    let (state, _media) = test_state().await;
    create_account(&state.pool, "dave", "correct", false).await;
    let response = post_form(&state, "/login", "username=dave&password=correct", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get(header::SET_COOKIE).is_none());
    let body = body_string(response).await;
    assert_eq!(body, "Your account is disabled.");
    assert_eq!(count(&state.pool, "sessions").await, 0);
}

#[tokio::test]
async fn restricted_page_requires_session_and_logout_ends_it() {
    let (state, _media) = test_state().await;

    let response = get(&state, "/restricted").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/login");

    create_account(&state.pool, "erin", "sesame", true).await;
    let cookie = login(&state, "erin", "sesame").await;

    let request = Request::builder()
        .uri("/restricted")
        .header(header::COOKIE, &cookie)
        .body(Body::empty())
        .unwrap();
    let response = build_router(state.clone()).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_string(response).await.contains("erin"));

    let request = Request::builder()
        .uri("/logout")
        .header(header::COOKIE, &cookie)
        .body(Body::empty())
        .unwrap();
    let response = build_router(state.clone()).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");

    // The old token no longer opens the door.
    let request = Request::builder()
        .uri("/restricted")
        .header(header::COOKIE, &cookie)
        .body(Body::empty())
        .unwrap();
    let response = build_router(state.clone()).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
}
