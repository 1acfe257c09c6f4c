#![allow(dead_code)]

use std::sync::Arc;

use chirpy::app::AppState;
use chirpy::clock::ManualClock;
use chirpy::config::Config;
use chirpy::db::Repositories;
use chirpy::session::SessionService;
use chrono::{DateTime, Duration, Utc};

pub const JWT_SECRET: &str = "test-jwt-secret";
pub const POLKA_KEY: &str = "f271c81ff7084ee5b99a5091b42d486e";

pub fn start() -> DateTime<Utc> {
    DateTime::from_timestamp(1_700_000_000, 0).unwrap()
}

pub fn test_config() -> Config {
    Config {
        platform: "dev".to_string(),
        port: 0,
        filepath_root: ".".to_string(),
        mongo_db_url: None,
        jwt_secret: JWT_SECRET.to_string(),
        polka_key: POLKA_KEY.to_string(),
        bcrypt_cost: 4,
        access_token_ttl: Duration::hours(1),
        refresh_token_ttl: Duration::days(60),
    }
}

pub struct Harness {
    pub clock: Arc<ManualClock>,
    pub repos: Repositories,
    pub sessions: SessionService,
}

pub fn session_harness() -> Harness {
    let clock = Arc::new(ManualClock::new(start()));
    let repos = Repositories::in_memory();
    let sessions = SessionService::new(&test_config(), &repos, clock.clone());
    Harness {
        clock,
        repos,
        sessions,
    }
}

pub fn app_state(config: Config) -> (AppState, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(start()));
    let state = AppState::new(config, Repositories::in_memory(), clock.clone());
    (state, clock)
}
