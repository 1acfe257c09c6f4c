use axum::{extract::FromRequestParts, http::request::Parts};
use mongodb::bson::oid::ObjectId;

use crate::app::AppState;
use crate::error::AppError;

/// The user behind a valid access token.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser {
    pub user_id: ObjectId,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user_id = state.sessions.authenticate(&parts.headers)?;
        Ok(AuthUser { user_id })
    }
}

/// A trusted machine caller that presented the shared API key.
#[derive(Debug, Clone, Copy)]
pub struct ApiKeyCaller;

impl FromRequestParts<AppState> for ApiKeyCaller {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        state.sessions.check_api_key(&parts.headers)?;
        Ok(ApiKeyCaller)
    }
}
