use axum::{
    extract::{Json, State},
    http::StatusCode,
    response::Response,
};
use mongodb::bson::oid::ObjectId;
use tracing::info;

use crate::{
    app::AppState,
    config::Constants,
    error::{AppError, Result},
    middleware::auth::AuthUser,
    structure::users::{User, UserCredentialsRequest, UserResponse},
    utils::success_response,
};

fn validate_credentials(payload: &UserCredentialsRequest) -> Result<()> {
    if payload.email.trim().is_empty() || !payload.email.contains('@') {
        return Err(AppError::BadRequest("A valid email is required".into()));
    }
    if payload.password.is_empty() {
        return Err(AppError::BadRequest("Password is required".into()));
    }
    if payload.password.len() > Constants::MAX_PASSWORD_BYTES {
        return Err(AppError::BadRequest("Password is too long".into()));
    }
    Ok(())
}

pub async fn create_user_handler(
    State(state): State<AppState>,
    Json(payload): Json<UserCredentialsRequest>,
) -> Result<Response> {
    validate_credentials(&payload)?;

    let hashed_password = state.sessions.hash_password(&payload.password).await?;
    let now = state.sessions.now();
    let user = state
        .users
        .create(User {
            id: ObjectId::new(),
            created_at: now,
            updated_at: now,
            email: payload.email,
            hashed_password,
            is_chirpy_red: false,
        })
        .await?;

    info!(user_id = %user.id, "user created");
    Ok(success_response(StatusCode::CREATED, UserResponse::from(&user)))
}

/// Change email and password of the caller. Outstanding refresh tokens are
/// revoked so other sessions have to log in again.
pub async fn update_user_handler(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<UserCredentialsRequest>,
) -> Result<Response> {
    validate_credentials(&payload)?;

    let hashed_password = state.sessions.hash_password(&payload.password).await?;
    let updated = state
        .users
        .update_credentials(
            &user.user_id,
            &payload.email,
            &hashed_password,
            state.sessions.now(),
        )
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;

    let revoked = state.sessions.revoke_all_for_user(&user.user_id).await?;
    info!(user_id = %user.user_id, revoked, "credentials changed, refresh tokens revoked");

    Ok(success_response(StatusCode::OK, UserResponse::from(&updated)))
}
