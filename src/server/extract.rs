use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts, HeaderMap};
use axum::response::Redirect;

use super::app::AppState;
use crate::db::queries::sessions::get_session_user;
use crate::db::User;

pub const SESSION_COOKIE: &str = "linkdex_session";

pub fn session_cookie(token: &str, ttl_hours: i64) -> String {
    format!(
        "{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        ttl_hours * 3600
    )
}

pub fn clear_session_cookie() -> String {
    format!("{SESSION_COOKIE}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}

fn session_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, token)| token.to_owned())
}

/// The logged-in user behind the current request. Protected handlers take
/// this as an argument; requests without a live session are redirected to
/// the login page before the handler runs.
pub struct AuthUser {
    pub user: User,
    pub token: String,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = Redirect;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = session_token(&parts.headers).ok_or_else(|| Redirect::to("/login"))?;
        let user = get_session_user(&state.pool, &token)
            .await
            .ok()
            .flatten()
            .ok_or_else(|| Redirect::to("/login"))?;
        Ok(AuthUser { user, token })
    }
}
