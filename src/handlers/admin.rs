use std::sync::atomic::Ordering;

use axum::{
    extract::State,
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
};
use tracing::info;

use crate::{
    app::AppState,
    error::{AppError, Result},
};

pub async fn health_handler() -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        "OK",
    )
}

pub async fn metrics_handler(State(state): State<AppState>) -> Html<String> {
    let hits = state.file_server_hits.load(Ordering::Relaxed);
    Html(format!(
        "<html>
  <body>
    <h1>Welcome, Chirpy Admin</h1>
    <p>Chirpy has been visited {hits} times!</p>
  </body>
</html>"
    ))
}

/// Wipe users and chirps and zero the hit counter. Dev platform only.
pub async fn reset_handler(State(state): State<AppState>) -> Result<Response> {
    if !state.config.is_dev() {
        return Err(AppError::Forbidden(
            "Reset is only allowed in dev environment.".into(),
        ));
    }

    let chirps = state.chirps.delete_all().await?;
    let users = state.users.delete_all().await?;
    state.file_server_hits.store(0, Ordering::Relaxed);
    info!(users, chirps, "store reset");

    Ok((StatusCode::OK, "Hits reset to 0").into_response())
}
