use askama::Template;
use askama_web::WebTemplate;
use axum::http::header::SET_COOKIE;
use axum::response::{AppendHeaders, IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::{extract::State, Form, Router};
use axum_typed_multipart::{FieldData, TryFromMultipart, TypedMultipart};
use secrecy::SecretString;
use serde::Deserialize;
use sqlx::error::DatabaseError;
use sqlx::SqlitePool;
use std::path::PathBuf;
use tempfile::NamedTempFile;
use uuid::Uuid;

use crate::auth::{self, LoginOutcome};
use crate::db::queries::users;
use crate::forms::{check, FormErrors, ProfileForm, UserForm};
use crate::server::app::AppState;
use crate::server::error::ApiResponse;
use crate::server::extract::{clear_session_cookie, session_cookie, AuthUser};

#[derive(TryFromMultipart)]
struct RegisterForm {
    username: String,
    email: String,
    password: String,
    website: Option<String>,
    #[form_data(limit = "10MiB")]
    picture: Option<FieldData<NamedTempFile>>,
}

#[derive(Deserialize)]
struct LoginForm {
    username: String,
    password: SecretString,
}

#[derive(Template, WebTemplate)]
#[template(path = "register.html")]
struct RegisterPage {
    registered: bool,
    user_form: UserForm,
    profile_form: ProfileForm,
    errors: FormErrors,
}

impl RegisterPage {
    fn empty() -> Self {
        RegisterPage {
            registered: false,
            user_form: UserForm::default(),
            profile_form: ProfileForm::default(),
            errors: FormErrors::default(),
        }
    }
}

#[derive(Template, WebTemplate)]
#[template(path = "login.html")]
struct LoginPage;

#[derive(Template, WebTemplate)]
#[template(path = "restricted.html")]
struct RestrictedPage {
    username: String,
}

async fn register_form() -> RegisterPage {
    RegisterPage::empty()
}

/// Account and profile are validated together and persisted in one
/// transaction; a failure on either side leaves the database untouched.
async fn register(
    State(pool): State<SqlitePool>,
    State(media_dir): State<PathBuf>,
    TypedMultipart(form): TypedMultipart<RegisterForm>,
) -> ApiResponse<Response> {
    let user_form = UserForm {
        username: form.username,
        email: form.email,
        password: form.password,
    };
    let mut profile_form = ProfileForm {
        website: form.website,
    };
    profile_form.normalize();

    let mut errors = check(&user_form);
    errors.merge(check(&profile_form));

    let rerender = |user_form: UserForm, profile_form: ProfileForm, errors: FormErrors| {
        // The password is never echoed back into the form.
        RegisterPage {
            registered: false,
            user_form: UserForm {
                password: String::new(),
                ..user_form
            },
            profile_form,
            errors,
        }
        .into_response()
    };

    if !errors.is_empty() {
        return Ok(rerender(user_form, profile_form, errors));
    }

    let password_hash = auth::hash_password(&SecretString::from(user_form.password.clone()))?;
    let picture_name = form.picture.as_ref().map(|field| {
        let ext = field
            .metadata
            .file_name
            .as_deref()
            .and_then(|name| name.rsplit_once('.'))
            .map(|(_, ext)| format!(".{ext}"))
            .unwrap_or_default();
        format!("{}{}", Uuid::new_v4().simple(), ext)
    });

    let mut tx = pool.begin().await?;
    let user_id =
        match users::create_user(&mut *tx, &user_form.username, &user_form.email, &password_hash)
            .await
        {
            Ok(id) => id,
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                errors.add("username", "That username is already taken.");
                return Ok(rerender(user_form, profile_form, errors));
            }
            Err(e) => return Err(e.into()),
        };
    users::create_profile(
        &mut *tx,
        user_id,
        profile_form.website.as_deref(),
        picture_name.as_deref(),
    )
    .await?;
    tx.commit().await?;

    if let (Some(field), Some(name)) = (form.picture, picture_name.as_deref()) {
        field
            .contents
            .persist(media_dir.join(name))
            .map_err(|e| anyhow::anyhow!("failed to store uploaded picture: {e}"))?;
    }

    tracing::info!(username = %user_form.username, "new account registered");
    Ok(RegisterPage {
        registered: true,
        user_form: UserForm::default(),
        profile_form: ProfileForm::default(),
        errors: FormErrors::default(),
    }
    .into_response())
}

async fn login_form() -> LoginPage {
    LoginPage
}

async fn login(
    State(state): State<AppState>,
    Form(form): Form<LoginForm>,
) -> ApiResponse<Response> {
    match auth::authenticate(&state.pool, &form.username, &form.password).await? {
        LoginOutcome::Success(user) => {
            let token = auth::start_session(&state.pool, user.id, state.session_ttl_hours).await?;
            tracing::info!(username = %user.username, "user logged in");
            Ok((
                AppendHeaders([(
                    SET_COOKIE,
                    session_cookie(&token, state.session_ttl_hours),
                )]),
                Redirect::to("/"),
            )
                .into_response())
        }
        LoginOutcome::InvalidCredentials => {
            tracing::info!(username = %form.username, "invalid login details");
            Ok("Invalid login details supplied.".into_response())
        }
        LoginOutcome::AccountDisabled => {
            tracing::info!(username = %form.username, "login attempt on disabled account");
            Ok("Your account is disabled.".into_response())
        }
    }
}

async fn restricted(session: AuthUser) -> RestrictedPage {
    RestrictedPage {
        username: session.user.username,
    }
}

async fn logout(session: AuthUser, State(pool): State<SqlitePool>) -> ApiResponse<Response> {
    auth::end_session(&pool, &session.token).await?;
    Ok((
        AppendHeaders([(SET_COOKIE, clear_session_cookie())]),
        Redirect::to("/"),
    )
        .into_response())
}

pub fn users_router(state: AppState) -> Router {
    Router::new()
        .route("/register", get(register_form).post(register))
        .route("/login", get(login_form).post(login))
        .route("/logout", get(logout))
        .route("/restricted", get(restricted))
        .with_state(state)
}
