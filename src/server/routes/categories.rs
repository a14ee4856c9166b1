use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
    routing::get,
    Form, Router,
};
use sqlx::error::DatabaseError;
use sqlx::SqlitePool;

use crate::db::queries::categories::{self, get_category_by_slug, slugify};
use crate::db::queries::pages::get_pages_for_category;
use crate::db::{Category, Page};
use crate::forms::{check, CategoryForm, FormErrors};
use crate::server::app::AppState;
use crate::server::error::ApiResponse;
use crate::server::extract::AuthUser;
use crate::telemetry::CATEGORY_VIEW_CNTR;

#[derive(Template, WebTemplate)]
#[template(path = "category.html")]
struct CategoryPage {
    category: Option<Category>,
    pages: Vec<Page>,
}

#[derive(Template, WebTemplate)]
#[template(path = "add_category.html")]
struct AddCategoryPage {
    form: CategoryForm,
    errors: FormErrors,
}

/// An unknown slug is an expected state, not an error: the template gets an
/// empty context and the response is still a 200.
async fn show_category(
    State(pool): State<SqlitePool>,
    Path(slug): Path<String>,
) -> ApiResponse<CategoryPage> {
    let category = get_category_by_slug(&pool, &slug).await?;
    let pages = match &category {
        Some(category) => {
            CATEGORY_VIEW_CNTR
                .with_label_values(&[category.slug.as_str()])
                .inc();
            get_pages_for_category(&pool, category.id).await?
        }
        None => Vec::new(),
    };
    Ok(CategoryPage { category, pages })
}

async fn add_category_form(_user: AuthUser) -> AddCategoryPage {
    AddCategoryPage {
        form: CategoryForm::default(),
        errors: FormErrors::default(),
    }
}

async fn add_category(
    _user: AuthUser,
    State(pool): State<SqlitePool>,
    Form(form): Form<CategoryForm>,
) -> ApiResponse<Response> {
    let mut errors = check(&form);
    if errors.is_empty() {
        let slug = slugify(&form.name);
        if slug.is_empty() {
            errors.add("name", "Category name must contain letters or digits.");
        } else {
            match categories::create_category(&pool, &form.name, &slug).await {
                Ok(_) => return Ok(Redirect::to("/").into_response()),
                Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                    errors.add("name", "A category with this name already exists.");
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
    Ok(AddCategoryPage { form, errors }.into_response())
}

pub fn category_router(state: AppState) -> Router {
    Router::new()
        .route("/category/{slug}", get(show_category))
        .route("/add_category", get(add_category_form).post(add_category))
        .with_state(state)
}
