//! Chirpy: a small posting API with password login, short-lived JWT access
//! tokens and revocable opaque refresh tokens.

pub mod app;
pub mod clock;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod session;
pub mod structure;
pub mod utils;
