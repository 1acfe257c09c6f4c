use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::db::StoreError;
use crate::session::AuthError;
use crate::utils::error_response;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate(what) => AppError::Conflict(format!("{what} already in use")),
            other => AppError::Store(other),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match &self {
            AppError::BadRequest(message) => error_response(StatusCode::BAD_REQUEST, message),
            AppError::Forbidden(message) => error_response(StatusCode::FORBIDDEN, message),
            AppError::NotFound(message) => error_response(StatusCode::NOT_FOUND, message),
            AppError::Conflict(message) => error_response(StatusCode::CONFLICT, message),
            AppError::Auth(AuthError::InvalidCredentials) => {
                error_response(StatusCode::UNAUTHORIZED, "Incorrect email or password")
            }
            AppError::Auth(AuthError::Unauthorized) => {
                error_response(StatusCode::UNAUTHORIZED, "Unauthorized")
            }
            AppError::Auth(e) => {
                tracing::error!("auth fault: {e}");
                error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
            AppError::Store(e) => {
                tracing::error!("database error: {e:?}");
                error_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Database operation failed",
                )
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
