use std::sync::Arc;
use std::sync::atomic::AtomicU32;

use axum::{
    Router,
    middleware::from_fn_with_state,
    routing::{get, post},
};
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::clock::Clock;
use crate::config::Config;
use crate::db::{ChirpRepository, Repositories, UserRepository};
use crate::handlers::{admin, auth, chirps, users, webhooks};
use crate::middleware::metrics::count_file_server_hits;
use crate::session::SessionService;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub sessions: Arc<SessionService>,
    pub users: Arc<dyn UserRepository>,
    pub chirps: Arc<dyn ChirpRepository>,
    pub file_server_hits: Arc<AtomicU32>,
}

impl AppState {
    pub fn new(config: Config, repos: Repositories, clock: Arc<dyn Clock>) -> Self {
        let sessions = SessionService::new(&config, &repos, clock);
        Self {
            config: Arc::new(config),
            sessions: Arc::new(sessions),
            users: repos.users,
            chirps: repos.chirps,
            file_server_hits: Arc::new(AtomicU32::new(0)),
        }
    }
}

pub fn router(state: AppState) -> Router {
    let file_server = Router::new()
        .nest_service("/app", ServeDir::new(&state.config.filepath_root))
        .layer(from_fn_with_state(state.clone(), count_file_server_hits));

    Router::new()
        .route("/api/healthz", get(admin::health_handler))
        .route("/admin/metrics", get(admin::metrics_handler))
        .route("/admin/reset", post(admin::reset_handler))
        .route(
            "/api/users",
            post(users::create_user_handler).put(users::update_user_handler),
        )
        .route("/api/login", post(auth::login_handler))
        .route("/api/refresh", post(auth::refresh_handler))
        .route("/api/revoke", post(auth::revoke_handler))
        .route(
            "/api/chirps",
            get(chirps::list_chirps_handler).post(chirps::create_chirp_handler),
        )
        .route(
            "/api/chirps/{id}",
            get(chirps::get_chirp_handler).delete(chirps::delete_chirp_handler),
        )
        .route("/api/polka/webhooks", post(webhooks::polka_webhook_handler))
        .merge(file_server)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}
