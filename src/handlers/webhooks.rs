use axum::{
    extract::{Json, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use mongodb::bson::oid::ObjectId;
use tracing::{debug, info};

use crate::{
    app::AppState,
    error::{AppError, Result},
    middleware::auth::ApiKeyCaller,
    structure::webhooks::{PolkaWebhook, USER_UPGRADED_EVENT},
};

/// Payment provider callback. Only `user.upgraded` changes state; every
/// other event is acknowledged and ignored.
pub async fn polka_webhook_handler(
    State(state): State<AppState>,
    _caller: ApiKeyCaller,
    Json(payload): Json<PolkaWebhook>,
) -> Result<Response> {
    if payload.event != USER_UPGRADED_EVENT {
        debug!(event = %payload.event, "ignoring webhook event");
        return Ok(StatusCode::NO_CONTENT.into_response());
    }

    let user_id = ObjectId::parse_str(&payload.data.user_id)
        .map_err(|_| AppError::BadRequest("Invalid user id".into()))?;

    if !state
        .users
        .upgrade_to_chirpy_red(&user_id, state.sessions.now())
        .await?
    {
        return Err(AppError::NotFound("User not found".into()));
    }

    info!(user_id = %user_id, "user upgraded to Chirpy Red");
    Ok(StatusCode::NO_CONTENT.into_response())
}
