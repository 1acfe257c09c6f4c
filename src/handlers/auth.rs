use axum::{
    extract::{Json, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};

use crate::{
    app::AppState,
    error::Result,
    structure::users::{LoginResponse, RefreshResponse, UserCredentialsRequest, UserResponse},
    utils::success_response,
};

pub async fn login_handler(
    State(state): State<AppState>,
    Json(payload): Json<UserCredentialsRequest>,
) -> Result<Response> {
    let outcome = state
        .sessions
        .login(&payload.email, &payload.password)
        .await?;

    Ok(success_response(
        StatusCode::OK,
        LoginResponse {
            user: UserResponse::from(&outcome.user),
            token: outcome.access_token,
            refresh_token: outcome.refresh_token,
        },
    ))
}

pub async fn refresh_handler(State(state): State<AppState>, headers: HeaderMap) -> Result<Response> {
    let token = state.sessions.refresh(&headers).await?;
    Ok(success_response(StatusCode::OK, RefreshResponse { token }))
}

pub async fn revoke_handler(State(state): State<AppState>, headers: HeaderMap) -> Result<Response> {
    state.sessions.revoke(&headers).await?;
    Ok(StatusCode::NO_CONTENT.into_response())
}
