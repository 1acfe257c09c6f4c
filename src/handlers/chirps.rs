use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use mongodb::bson::oid::ObjectId;

use crate::{
    app::AppState,
    config::Constants,
    error::{AppError, Result},
    middleware::auth::AuthUser,
    structure::chirps::{Chirp, ChirpListQuery, ChirpResponse, NewChirpRequest},
    utils::success_response,
};

fn parse_chirp_id(id: &str) -> Result<ObjectId> {
    ObjectId::parse_str(id).map_err(|_| AppError::BadRequest("Invalid chirp id".into()))
}

pub async fn create_chirp_handler(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<NewChirpRequest>,
) -> Result<Response> {
    if payload.body.chars().count() > Constants::MAX_CHIRP_LENGTH {
        return Err(AppError::BadRequest("Chirp is too long".into()));
    }

    let now = state.sessions.now();
    let chirp = state
        .chirps
        .create(Chirp {
            id: ObjectId::new(),
            created_at: now,
            updated_at: now,
            body: payload.body,
            user_id: user.user_id,
        })
        .await?;

    Ok(success_response(StatusCode::CREATED, ChirpResponse::from(chirp)))
}

pub async fn list_chirps_handler(
    State(state): State<AppState>,
    Query(params): Query<ChirpListQuery>,
) -> Result<Response> {
    let author = params
        .author_id
        .as_deref()
        .map(ObjectId::parse_str)
        .transpose()
        .map_err(|_| AppError::BadRequest("Invalid author id".into()))?;

    let chirps = state.chirps.list(author.as_ref(), params.sort).await?;
    let results: Vec<ChirpResponse> = chirps.into_iter().map(ChirpResponse::from).collect();
    Ok(Json(results).into_response())
}

pub async fn get_chirp_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response> {
    let id = parse_chirp_id(&id)?;
    let chirp = state
        .chirps
        .find_by_id(&id)
        .await?
        .ok_or_else(|| AppError::NotFound("Chirp not found".into()))?;

    Ok(Json(ChirpResponse::from(chirp)).into_response())
}

/// Only the author may delete a chirp.
pub async fn delete_chirp_handler(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Response> {
    let id = parse_chirp_id(&id)?;
    let chirp = state
        .chirps
        .find_by_id(&id)
        .await?
        .ok_or_else(|| AppError::NotFound("Chirp not found".into()))?;

    if chirp.user_id != user.user_id {
        return Err(AppError::Forbidden("You can't delete this chirp".into()));
    }

    if !state.chirps.delete(&id).await? {
        return Err(AppError::NotFound("Chirp not found".into()));
    }
    Ok(StatusCode::NO_CONTENT.into_response())
}
