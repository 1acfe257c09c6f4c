use std::sync::atomic::Ordering;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::app::AppState;

/// Count every request that reaches the static file server.
pub async fn count_file_server_hits(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Response {
    state.file_server_hits.fetch_add(1, Ordering::Relaxed);
    next.run(req).await
}
