pub mod chirps;
pub mod refresh_tokens;
pub mod users;
pub mod webhooks;
