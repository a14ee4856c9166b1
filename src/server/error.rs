use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

pub type ApiResponse<T> = Result<T, AppError>;

/// Internal failure while handling a request. Everything a user can recover
/// from (validation, lookup misses, bad credentials) is modelled in the
/// handlers; whatever reaches this type renders as a plain 500.
pub struct AppError(anyhow::Error);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        tracing::error!("request failed: {:#}", self.0);
        StatusCode::INTERNAL_SERVER_ERROR.into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        AppError(err.into())
    }
}
