//! Login, refresh and revoke flows plus the checks protected routes run.
//!
//! Failures that would tell a caller *why* a credential was refused are
//! folded into [`AuthError::InvalidCredentials`] (login) or
//! [`AuthError::Unauthorized`] (everything after login). The specific reason
//! is only logged at debug level.

use std::sync::Arc;

use axum::http::HeaderMap;
use chrono::{DateTime, Duration, Utc};
use mongodb::bson::oid::ObjectId;
use subtle::ConstantTimeEq;
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::config::Config;
use crate::db::{Repositories, StoreError, UserRepository};
use crate::structure::users::User;
use crate::utils::headers::{get_api_key, get_bearer_token};
use crate::utils::jwt::{make_jwt, validate_jwt};
use crate::utils::password::{PasswordError, PasswordHasher};

pub mod refresh;

use refresh::{RefreshTokenError, RefreshTokens};

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("incorrect email or password")]
    InvalidCredentials,

    #[error("unauthorized")]
    Unauthorized,

    #[error("password hashing failed: {0}")]
    Hashing(String),

    #[error("secure random source unavailable: {0}")]
    EntropySource(String),

    #[error("failed to sign access token: {0}")]
    Signing(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<RefreshTokenError> for AuthError {
    fn from(err: RefreshTokenError) -> Self {
        match err {
            RefreshTokenError::Unknown | RefreshTokenError::Expired | RefreshTokenError::Revoked => {
                AuthError::Unauthorized
            }
            RefreshTokenError::EntropySource(msg) => AuthError::EntropySource(msg),
            RefreshTokenError::Store(e) => AuthError::Store(e),
        }
    }
}

#[derive(Debug)]
pub struct LoginOutcome {
    pub user: User,
    pub access_token: String,
    pub refresh_token: String,
}

pub struct SessionService {
    users: Arc<dyn UserRepository>,
    refresh_tokens: RefreshTokens,
    hasher: PasswordHasher,
    clock: Arc<dyn Clock>,
    jwt_secret: Vec<u8>,
    api_key: String,
    access_token_ttl: Duration,
}

impl SessionService {
    pub fn new(config: &Config, repos: &Repositories, clock: Arc<dyn Clock>) -> Self {
        Self {
            users: repos.users.clone(),
            refresh_tokens: RefreshTokens::new(
                repos.refresh_tokens.clone(),
                config.refresh_token_ttl,
            ),
            hasher: PasswordHasher::new(config.bcrypt_cost),
            clock,
            jwt_secret: config.jwt_secret.as_bytes().to_vec(),
            api_key: config.polka_key.clone(),
            access_token_ttl: config.access_token_ttl,
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub async fn hash_password(&self, password: &str) -> Result<String, AuthError> {
        self.hasher
            .hash(password.to_string())
            .await
            .map_err(|e| AuthError::Hashing(e.to_string()))
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<LoginOutcome, AuthError> {
        let Some(user) = self.users.find_by_email(email).await? else {
            debug!("login rejected: no user for email");
            return Err(AuthError::InvalidCredentials);
        };

        match self
            .hasher
            .verify(password.to_string(), user.hashed_password.clone())
            .await
        {
            Ok(()) => {}
            Err(PasswordError::Mismatch) => {
                debug!(user_id = %user.id, "login rejected: password mismatch");
                return Err(AuthError::InvalidCredentials);
            }
            Err(PasswordError::MalformedHash(msg)) => {
                warn!(user_id = %user.id, "stored password hash is malformed: {msg}");
                return Err(AuthError::InvalidCredentials);
            }
            Err(PasswordError::Hashing(msg)) => return Err(AuthError::Hashing(msg)),
        }

        let now = self.clock.now();
        let access_token = self.issue_access_token(&user.id, now)?;
        let refresh_token = self.refresh_tokens.issue(&user.id, now).await?;
        info!(user_id = %user.id, "user logged in");

        Ok(LoginOutcome {
            user,
            access_token,
            refresh_token,
        })
    }

    /// Exchange the refresh token presented as a bearer credential for a new
    /// access token. The refresh token itself is not rotated.
    pub async fn refresh(&self, headers: &HeaderMap) -> Result<String, AuthError> {
        let token = get_bearer_token(headers).map_err(|e| {
            debug!("refresh rejected: {e}");
            AuthError::Unauthorized
        })?;

        let now = self.clock.now();
        let record = self.refresh_tokens.lookup(&token, now).await.map_err(|e| {
            if matches!(
                e,
                RefreshTokenError::Unknown | RefreshTokenError::Expired | RefreshTokenError::Revoked
            ) {
                debug!("refresh rejected: {e}");
            }
            AuthError::from(e)
        })?;

        if self.users.find_by_id(&record.user_id).await?.is_none() {
            debug!(user_id = %record.user_id, "refresh rejected: owner no longer exists");
            return Err(AuthError::Unauthorized);
        }

        self.issue_access_token(&record.user_id, now)
    }

    /// Revoke the refresh token presented as a bearer credential.
    ///
    /// Succeeds whether or not the token existed, and also when no usable
    /// header was sent. Only store faults surface.
    pub async fn revoke(&self, headers: &HeaderMap) -> Result<(), AuthError> {
        let token = match get_bearer_token(headers) {
            Ok(token) => token,
            Err(e) => {
                debug!("revoke without token: {e}");
                return Ok(());
            }
        };

        let revoked = self.refresh_tokens.revoke(&token, self.clock.now()).await?;
        debug!(revoked, "refresh token revoke requested");
        Ok(())
    }

    pub async fn revoke_all_for_user(&self, user_id: &ObjectId) -> Result<u64, AuthError> {
        Ok(self
            .refresh_tokens
            .revoke_all_for_user(user_id, self.clock.now())
            .await?)
    }

    /// Resolve the acting user from `Authorization: Bearer <access token>`.
    pub fn authenticate(&self, headers: &HeaderMap) -> Result<ObjectId, AuthError> {
        let token = get_bearer_token(headers).map_err(|e| {
            debug!("access denied: {e}");
            AuthError::Unauthorized
        })?;

        validate_jwt(&token, &self.jwt_secret, self.clock.now()).map_err(|e| {
            debug!("access denied: {e}");
            AuthError::Unauthorized
        })
    }

    /// Check `Authorization: ApiKey <key>` against the configured key.
    pub fn check_api_key(&self, headers: &HeaderMap) -> Result<(), AuthError> {
        let key = get_api_key(headers).map_err(|e| {
            debug!("machine call denied: {e}");
            AuthError::Unauthorized
        })?;

        if !bool::from(key.as_bytes().ct_eq(self.api_key.as_bytes())) {
            debug!("machine call denied: key mismatch");
            return Err(AuthError::Unauthorized);
        }
        Ok(())
    }

    fn issue_access_token(
        &self,
        user_id: &ObjectId,
        now: DateTime<Utc>,
    ) -> Result<String, AuthError> {
        make_jwt(user_id, &self.jwt_secret, now, self.access_token_ttl)
            .map_err(|e| AuthError::Signing(e.to_string()))
    }
}
