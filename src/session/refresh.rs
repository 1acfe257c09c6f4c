use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use mongodb::bson::oid::ObjectId;

use crate::db::{RefreshTokenRepository, StoreError};
use crate::structure::refresh_tokens::RefreshTokenRecord;
use crate::utils::refresh_token::generate_refresh_token;

#[derive(Debug, thiserror::Error)]
pub enum RefreshTokenError {
    #[error("unknown refresh token")]
    Unknown,

    #[error("refresh token has expired")]
    Expired,

    #[error("refresh token has been revoked")]
    Revoked,

    #[error("secure random source unavailable: {0}")]
    EntropySource(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Lifecycle of opaque refresh tokens on top of a [`RefreshTokenRepository`].
#[derive(Clone)]
pub struct RefreshTokens {
    repo: Arc<dyn RefreshTokenRepository>,
    ttl: Duration,
}

impl RefreshTokens {
    pub fn new(repo: Arc<dyn RefreshTokenRepository>, ttl: Duration) -> Self {
        Self { repo, ttl }
    }

    pub fn generate() -> Result<String, RefreshTokenError> {
        generate_refresh_token().map_err(|e| RefreshTokenError::EntropySource(e.to_string()))
    }

    /// Persist a fresh token for `user_id`. The raw value is only ever
    /// handed out here.
    pub async fn issue(
        &self,
        user_id: &ObjectId,
        now: DateTime<Utc>,
    ) -> Result<String, RefreshTokenError> {
        let token = Self::generate()?;
        self.repo
            .insert(RefreshTokenRecord {
                token: token.clone(),
                user_id: *user_id,
                created_at: now,
                expires_at: now + self.ttl,
                revoked_at: None,
            })
            .await?;
        Ok(token)
    }

    pub async fn lookup(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<RefreshTokenRecord, RefreshTokenError> {
        let record = self
            .repo
            .find(token)
            .await?
            .ok_or(RefreshTokenError::Unknown)?;

        if record.revoked_at.is_some() {
            return Err(RefreshTokenError::Revoked);
        }
        if now >= record.expires_at {
            return Err(RefreshTokenError::Expired);
        }
        Ok(record)
    }

    /// Idempotent: unknown and already revoked tokens are left alone.
    pub async fn revoke(&self, token: &str, now: DateTime<Utc>) -> Result<bool, StoreError> {
        self.repo.revoke(token, now).await
    }

    pub async fn revoke_all_for_user(
        &self,
        user_id: &ObjectId,
        now: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        self.repo.revoke_all_for_user(user_id, now).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory::MemoryRefreshTokenRepository;

    fn start() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    fn tokens() -> RefreshTokens {
        RefreshTokens::new(
            Arc::new(MemoryRefreshTokenRepository::default()),
            Duration::days(60),
        )
    }

    #[tokio::test]
    async fn issued_token_looks_up_to_owner() {
        let tokens = tokens();
        let owner = ObjectId::new();
        let raw = tokens.issue(&owner, start()).await.unwrap();

        let record = tokens.lookup(&raw, start()).await.unwrap();
        assert_eq!(record.user_id, owner);
        assert_eq!(record.created_at, start());
        assert_eq!(record.expires_at, start() + Duration::days(60));
        assert!(record.revoked_at.is_none());
    }

    #[tokio::test]
    async fn revoked_token_stays_invalid() {
        let tokens = tokens();
        let raw = tokens.issue(&ObjectId::new(), start()).await.unwrap();

        assert!(tokens.revoke(&raw, start()).await.unwrap());
        assert!(matches!(
            tokens.lookup(&raw, start()).await,
            Err(RefreshTokenError::Revoked)
        ));

        // second revoke is a no-op, not an error
        assert!(!tokens.revoke(&raw, start()).await.unwrap());
        assert!(matches!(
            tokens.lookup(&raw, start()).await,
            Err(RefreshTokenError::Revoked)
        ));
    }

    #[tokio::test]
    async fn unknown_token() {
        let tokens = tokens();
        assert!(!tokens.revoke("never-issued", start()).await.unwrap());
        assert!(matches!(
            tokens.lookup("never-issued", start()).await,
            Err(RefreshTokenError::Unknown)
        ));
    }

    #[tokio::test]
    async fn expires_after_ttl() {
        let tokens = tokens();
        let raw = tokens.issue(&ObjectId::new(), start()).await.unwrap();

        assert!(tokens
            .lookup(&raw, start() + Duration::days(60) - Duration::seconds(1))
            .await
            .is_ok());
        assert!(matches!(
            tokens.lookup(&raw, start() + Duration::days(60)).await,
            Err(RefreshTokenError::Expired)
        ));
    }
}
