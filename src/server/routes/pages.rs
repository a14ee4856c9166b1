use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
    routing::get,
    Form, Router,
};
use sqlx::SqlitePool;

use crate::db::queries::categories::get_category_by_slug;
use crate::db::queries::pages::create_page;
use crate::db::Category;
use crate::forms::{check, FormErrors, PageForm};
use crate::server::app::AppState;
use crate::server::error::ApiResponse;

#[derive(Template, WebTemplate)]
#[template(path = "add_page.html")]
struct AddPagePage {
    category: Option<Category>,
    slug: String,
    form: PageForm,
    errors: FormErrors,
}

async fn add_page_form(
    State(pool): State<SqlitePool>,
    Path(slug): Path<String>,
) -> ApiResponse<AddPagePage> {
    let category = get_category_by_slug(&pool, &slug).await?;
    Ok(AddPagePage {
        category,
        slug,
        form: PageForm::default(),
        errors: FormErrors::default(),
    })
}

async fn add_page(
    State(pool): State<SqlitePool>,
    Path(slug): Path<String>,
    Form(mut form): Form<PageForm>,
) -> ApiResponse<Response> {
    let category = get_category_by_slug(&pool, &slug).await?;
    form.normalize();
    let errors = check(&form);
    // A page is never persisted without a resolved category.
    if errors.is_empty() {
        if let Some(category) = &category {
            create_page(&pool, category.id, &form.title, &form.url).await?;
            return Ok(Redirect::to(&format!("/category/{}", category.slug)).into_response());
        }
    }
    Ok(AddPagePage {
        category,
        slug,
        form,
        errors,
    }
    .into_response())
}

pub fn pages_router(state: AppState) -> Router {
    Router::new()
        .route("/category/{slug}/add_page", get(add_page_form).post(add_page))
        .with_state(state)
}
